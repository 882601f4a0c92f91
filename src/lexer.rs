//! The lexer: splits lowercased source text into a list of word handles.
//!
//! Each call to [`Lexer::next_word`] classifies one span of the input and
//! resolves it to a [`WordId`]: literals are interned as fresh constant
//! words, identifiers are looked up in the dictionary (creating a
//! generated variable on a miss), and operator spans must already be
//! present in the dictionary.

use crate::engine::ParserConfig;
use crate::error::{ExprError, Result};
use crate::words::{Word, WordId, WordStore};
use crate::Real;

const DIGRAPH_STARTS: &str = "<>=&|:!";
const DIGRAPHS: [&str; 10] = [
    "<=", "<<", "<>", ">=", ">>", "==", ":=", "!=", "&&", "||",
];
const SINGLE_OPS: &str = "+-*/\\^%~$()";

pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    cfg: ParserConfig,
}

impl<'a> Lexer<'a> {
    /// `input` must already be lowercased and trimmed.
    pub fn new(input: &'a str, cfg: ParserConfig) -> Self {
        Self { input, pos: 0, cfg }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes the whole input, returning the token list.
    pub fn tokenize(mut self, store: &mut WordStore) -> Result<Vec<WordId>> {
        let mut tokens = Vec::new();
        while let Some(id) = self.next_word(store)? {
            tokens.push(id);
        }
        Ok(tokens)
    }

    fn next_word(&mut self, store: &mut WordStore) -> Result<Option<WordId>> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let id = if c == self.cfg.hex_char {
            self.read_hex(store)?
        } else if c == self.cfg.decimal_sep
            && self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit())
        {
            self.read_number(store)?
        } else if c == '\'' {
            self.read_string(store)?
        } else if c.is_ascii_lowercase() || c == '_' {
            self.read_identifier(String::new(), store)?
        } else if c == self.cfg.arg_sep {
            self.advance();
            let name = self.cfg.arg_sep.to_string();
            store
                .lookup(&name)
                .ok_or(ExprError::UnknownOperator(name))?
        } else if DIGRAPH_STARTS.contains(c) || SINGLE_OPS.contains(c) {
            self.read_operator(c, store)?
        } else if c.is_ascii_digit() {
            self.read_number(store)?
        } else {
            return Err(ExprError::Syntax(format!("unexpected character '{}'", c)));
        };
        Ok(Some(id))
    }

    /// Hex literal after the configured prefix. With no hex digits the
    /// span falls back to an identifier that includes the prefix.
    fn read_hex(&mut self, store: &mut WordStore) -> Result<WordId> {
        self.advance();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        let digits = &self.input[start..self.pos];
        if digits.is_empty() {
            return self.read_identifier(self.cfg.hex_char.to_string(), store);
        }
        let value = u64::from_str_radix(digits, 16).map_err(|_| {
            ExprError::Syntax(format!(
                "invalid hexadecimal number '{}{}'",
                self.cfg.hex_char, digits
            ))
        })?;
        // The word carries the decimal text form as its name.
        let name = format!("{}", value);
        Ok(store.intern(Word::number(&name, value as Real)))
    }

    /// Numeric literal: digits, optional fraction on the configured
    /// decimal separator, optional exponent.
    fn read_number(&mut self, store: &mut WordStore) -> Result<WordId> {
        let start = self.pos;
        let sep = self.cfg.decimal_sep;
        let mut saw_sep = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == sep && !saw_sep {
                if self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit()) {
                    saw_sep = true;
                    self.advance();
                } else {
                    break;
                }
            } else if c == 'e' {
                // Exponent only when digits follow; otherwise the 'e'
                // belongs to the next token.
                let sign_ok = matches!(self.peek_ahead(1), Some('+') | Some('-'))
                    && self.peek_ahead(2).is_some_and(|d| d.is_ascii_digit());
                let plain_ok = self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit());
                if sign_ok || plain_ok {
                    self.advance();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.advance();
                    }
                    while self.peek().is_some_and(|d| d.is_ascii_digit()) {
                        self.advance();
                    }
                }
                break;
            } else {
                break;
            }
        }
        let span = &self.input[start..self.pos];
        let text: String = span.chars().map(|c| if c == sep { '.' } else { c }).collect();
        let value: Real = text
            .parse()
            .map_err(|_| ExprError::Syntax(format!("invalid number '{}'", span)))?;
        Ok(store.intern(Word::number(span, value)))
    }

    /// Quote-delimited string literal; the word keeps its quotes.
    fn read_string(&mut self, store: &mut WordStore) -> Result<WordId> {
        self.advance();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\'' {
                break;
            }
            self.advance();
        }
        if self.peek().is_none() {
            return Err(ExprError::Syntax("unterminated string".to_string()));
        }
        let inner = &self.input[start..self.pos];
        self.advance();
        let text = format!("'{}'", inner);
        Ok(store.intern(Word::string_literal(&text)))
    }

    /// Identifier: dictionary hit shares the existing word, a miss creates
    /// a generated variable and enters it in the dictionary.
    fn read_identifier(&mut self, mut name: String, store: &mut WordStore) -> Result<WordId> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match store.lookup(&name) {
            Some(id) => Ok(id),
            None => store.insert(Word::generated(&name)),
        }
    }

    /// Operator span, with digraph lookahead after `< > = & | : !`.
    fn read_operator(&mut self, c: char, store: &mut WordStore) -> Result<WordId> {
        let mut name = String::from(c);
        self.advance();
        if DIGRAPH_STARTS.contains(c) {
            if let Some(next) = self.peek() {
                let mut pair = name.clone();
                pair.push(next);
                if DIGRAPHS.contains(&pair.as_str()) {
                    name = pair;
                    self.advance();
                }
            }
        }
        store
            .lookup(&name)
            .ok_or(ExprError::UnknownOperator(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::install_default_words;

    fn tokens(input: &str) -> Result<(Vec<WordId>, WordStore)> {
        let mut store = WordStore::new();
        install_default_words(&mut store, ',');
        let toks = Lexer::new(input, ParserConfig::default()).tokenize(&mut store)?;
        Ok((toks, store))
    }

    fn names(input: &str) -> Vec<String> {
        let (toks, store) = tokens(input).unwrap();
        toks.iter().map(|id| store.word(*id).name.clone()).collect()
    }

    #[test]
    fn test_lexer_basic_arithmetic() {
        assert_eq!(names("1 + foo_bar * (2.5e-1)"), vec![
            "1", "+", "foo_bar", "*", "(", "2.5e-1", ")"
        ]);
    }

    #[test]
    fn test_lexer_digraph_operators() {
        assert_eq!(names("a <= b <> c >= d := e"), vec![
            "a", "<=", "b", "<>", "c", ">=", "d", ":=", "e"
        ]);
    }

    #[test]
    fn test_lexer_hex_literal_becomes_decimal_word() {
        assert_eq!(names("$ff + 1"), vec!["255", "+", "1"]);
    }

    #[test]
    fn test_lexer_hex_prefix_without_digits_reads_identifier() {
        let (toks, store) = tokens("$x").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(store.word(toks[0]).name, "$x");
        assert!(store.word(toks[0]).is_generated_variable());
    }

    #[test]
    fn test_lexer_string_literal_keeps_quotes() {
        let (toks, store) = tokens("'hello world'").unwrap();
        assert_eq!(store.word(toks[0]).name, "'hello world'");
    }

    #[test]
    fn test_lexer_unterminated_string() {
        assert!(matches!(
            tokens("'abc"),
            Err(ExprError::Syntax(msg)) if msg.contains("unterminated")
        ));
    }

    #[test]
    fn test_lexer_leading_dot_number() {
        assert_eq!(names(".5 + 2"), vec![".5", "+", "2"]);
    }

    #[test]
    fn test_lexer_comma_decimal_locale() {
        let mut store = WordStore::new();
        install_default_words(&mut store, ';');
        let cfg = ParserConfig::with_decimal_sep(',');
        let toks = Lexer::new("max(1,5; 2)", cfg).tokenize(&mut store).unwrap();
        let names: Vec<_> = toks.iter().map(|id| store.word(*id).name.clone()).collect();
        assert_eq!(names, vec!["max", "(", "1,5", ";", "2", ")"]);
    }

    #[test]
    fn test_lexer_unknown_operator() {
        assert!(matches!(tokens("1 & 2"), Err(ExprError::UnknownOperator(op)) if op == "&"));
    }

    #[test]
    fn test_lexer_generated_variable_enters_dictionary() {
        let (_, store) = tokens("undeclared + 1").unwrap();
        assert!(store.lookup("undeclared").is_some());
    }
}
