//! The word dictionary: compile-time descriptors for every lexeme.
//!
//! A [`Word`] describes one lexeme of the expression language: an operator,
//! a function, a literal, a variable or a piece of punctuation. Words are
//! owned by the [`WordStore`]; tokens, trees and compiled programs refer to
//! them through [`WordId`] handles. Dictionary words (operators, builtins,
//! registered and generated variables) are additionally kept in a list
//! sorted by name so lookups are a binary search. Words created ad hoc
//! during a compilation (numeric and string literals, fused string
//! comparisons, folded constants) are interned outside the dictionary and
//! live as long as the store.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{ExprError, Result};
use crate::Real;

/// Maximum number of arguments a function word may take.
pub const MAX_ARGS: usize = 4;

/// Handle to a [`Word`] inside a [`WordStore`].
pub type WordId = usize;

/// Numeric kernel invoked at evaluation time. Receives one slot per
/// declared argument.
pub type Kernel = Rc<dyn Fn(&[Real]) -> Real>;

/// Marks the two operators later pipeline stages must recognize regardless
/// of how the active dialect spells them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpTag {
    None,
    /// The assignment operator (`:=`, or `=` in the C dialect).
    Assign,
    /// The boolean negation prefix (`not`, or `!` in the C dialect).
    Not,
}

/// Payload of a function or operator word.
#[derive(Clone)]
pub struct FuncWord {
    pub kernel: Kernel,
    pub n_args: usize,
    /// Smaller binds tighter. Only meaningful when `is_operator` is set.
    pub precedence: u32,
    pub is_operator: bool,
    /// True for nondeterministic kernels (a random source) and for
    /// assignment; such subtrees are never constant-folded.
    pub can_vary: bool,
    /// The result carries boolean semantics (0.0 / 1.0).
    pub boolean: bool,
    pub tag: OpTag,
}

/// Comparison operator of a fused string comparison.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StrCmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Membership in a comma-separated list.
    In,
}

/// One side of a fused string comparison.
#[derive(Clone)]
pub enum StrOperand {
    /// A quoted literal, stored with its quotes.
    Literal(String),
    /// A host-owned string cell.
    Variable(Rc<RefCell<String>>),
}

impl StrOperand {
    fn value(&self) -> String {
        match self {
            StrOperand::Literal(text) => strip_quotes(text).to_ascii_lowercase(),
            StrOperand::Variable(cell) => cell.borrow().to_ascii_lowercase(),
        }
    }

    fn varies(&self) -> bool {
        matches!(self, StrOperand::Variable(_))
    }
}

/// A comparison over two string operands, synthesized by the shaper from a
/// `string op string` token triple. Acts as a boolean-valued leaf.
#[derive(Clone)]
pub struct StrCompare {
    pub op: StrCmpOp,
    pub left: StrOperand,
    pub right: StrOperand,
}

impl StrCompare {
    /// Compares case-insensitively; quotes around literals are stripped.
    pub fn eval(&self) -> Real {
        let left = self.left.value();
        let right = self.right.value();
        let hit = match self.op {
            StrCmpOp::Eq => left == right,
            StrCmpOp::Ne => left != right,
            StrCmpOp::Lt => left < right,
            StrCmpOp::Le => left <= right,
            StrCmpOp::Gt => left > right,
            StrCmpOp::Ge => left >= right,
            StrCmpOp::In => right.split(',').any(|item| item == left),
        };
        if hit { 1.0 } else { 0.0 }
    }
}

pub(crate) fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text)
}

/// The kind of a word, with its payload.
#[derive(Clone)]
pub enum WordKind {
    LeftBracket,
    RightBracket,
    /// The argument separator (`,`, or `;` in comma-decimal locales).
    Separator,
    /// A numeric constant. `boolean` marks 0.0/1.0 values that carry
    /// boolean semantics.
    Constant { cell: Rc<Cell<Real>>, boolean: bool },
    /// A quoted string literal, stored with its quotes.
    StringConstant { text: String },
    /// A numeric variable. The cell is shared with the host; `generated`
    /// marks identifiers that appeared before any registration.
    Variable {
        cell: Rc<Cell<Real>>,
        generated: bool,
    },
    /// A host-owned string variable.
    StringVariable { cell: Rc<RefCell<String>> },
    Function(FuncWord),
    StringCompare(StrCompare),
}

/// A compile-time descriptor of a lexeme. Names are always lowercase.
#[derive(Clone)]
pub struct Word {
    pub name: String,
    pub kind: WordKind,
}

impl Word {
    /// A numeric literal carrying its source text as the name.
    pub fn number(name: &str, value: Real) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Constant {
                cell: Rc::new(Cell::new(value)),
                boolean: false,
            },
        }
    }

    /// A synthesized constant, named after its value.
    pub(crate) fn constant(value: Real, boolean: bool) -> Self {
        let name = if boolean {
            if value != 0.0 { "true" } else { "false" }.to_string()
        } else {
            format!("{}", value)
        };
        Word {
            name,
            kind: WordKind::Constant {
                cell: Rc::new(Cell::new(value)),
                boolean,
            },
        }
    }

    /// A named dictionary constant such as `pi`.
    pub fn constant_named(name: &str, value: Real, boolean: bool) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Constant {
                cell: Rc::new(Cell::new(value)),
                boolean,
            },
        }
    }

    /// A string literal; `text` keeps its quotes.
    pub fn string_literal(text: &str) -> Self {
        Word {
            name: text.to_string(),
            kind: WordKind::StringConstant {
                text: text.to_string(),
            },
        }
    }

    /// A numeric variable backed by a host-shared cell.
    pub fn variable(name: &str, cell: Rc<Cell<Real>>) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Variable {
                cell,
                generated: false,
            },
        }
    }

    /// A variable synthesized for an identifier used before declaration.
    pub(crate) fn generated(name: &str) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Variable {
                cell: Rc::new(Cell::new(0.0)),
                generated: true,
            },
        }
    }

    /// A string variable backed by a host-shared cell.
    pub fn string_variable(name: &str, cell: Rc<RefCell<String>>) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::StringVariable { cell },
        }
    }

    /// A numeric function of `n_args` arguments.
    pub fn function(name: &str, n_args: usize, kernel: Kernel) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Function(FuncWord {
                kernel,
                n_args,
                precedence: 0,
                is_operator: false,
                can_vary: false,
                boolean: false,
                tag: OpTag::None,
            }),
        }
    }

    /// A function whose result carries boolean semantics.
    pub fn boolean_function(name: &str, n_args: usize, kernel: Kernel) -> Self {
        let mut word = Word::function(name, n_args, kernel);
        if let WordKind::Function(f) = &mut word.kind {
            f.boolean = true;
        }
        word
    }

    /// A nondeterministic function (e.g. a random source); never folded.
    pub fn impure_function(name: &str, n_args: usize, kernel: Kernel) -> Self {
        let mut word = Word::function(name, n_args, kernel);
        if let WordKind::Function(f) = &mut word.kind {
            f.can_vary = true;
        }
        word
    }

    /// An operator word. Assignment operators are marked `can_vary` so
    /// that folding never executes their side effect at compile time.
    pub(crate) fn operator(
        name: &str,
        n_args: usize,
        precedence: u32,
        boolean: bool,
        tag: OpTag,
        kernel: Kernel,
    ) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::Function(FuncWord {
                kernel,
                n_args,
                precedence,
                is_operator: true,
                can_vary: tag == OpTag::Assign,
                boolean,
                tag,
            }),
        }
    }

    pub(crate) fn string_compare(
        name: &str,
        op: StrCmpOp,
        left: StrOperand,
        right: StrOperand,
    ) -> Self {
        Word {
            name: name.to_string(),
            kind: WordKind::StringCompare(StrCompare { op, left, right }),
        }
    }

    pub(crate) fn punctuation(name: &str, kind: WordKind) -> Self {
        Word {
            name: name.to_string(),
            kind,
        }
    }

    /// Number of evaluation-time arguments.
    pub fn n_args(&self) -> usize {
        match &self.kind {
            WordKind::Function(f) => f.n_args,
            _ => 0,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(&self.kind, WordKind::Function(f) if f.is_operator)
    }

    /// True when the subtree rooted at this word may change between
    /// evaluations: variables, assignments, nondeterministic kernels, and
    /// string comparisons over variables.
    pub fn can_vary(&self) -> bool {
        match &self.kind {
            WordKind::Variable { .. } | WordKind::StringVariable { .. } => true,
            WordKind::Function(f) => f.can_vary,
            WordKind::StringCompare(sc) => sc.left.varies() || sc.right.varies(),
            _ => false,
        }
    }

    /// True when the word's value carries boolean semantics.
    pub fn is_boolean(&self) -> bool {
        match &self.kind {
            WordKind::Constant { boolean, .. } => *boolean,
            WordKind::Function(f) => f.boolean,
            WordKind::StringCompare(_) => true,
            _ => false,
        }
    }

    /// The numeric backing cell, for constants and variables.
    pub(crate) fn cell(&self) -> Option<Rc<Cell<Real>>> {
        match &self.kind {
            WordKind::Constant { cell, .. } | WordKind::Variable { cell, .. } => Some(cell.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_generated_variable(&self) -> bool {
        matches!(
            &self.kind,
            WordKind::Variable {
                generated: true,
                ..
            }
        )
    }

    /// True for words that stand for a value in the token stream:
    /// constants, variables, fused comparisons and zero-argument
    /// functions.
    pub(crate) fn is_operand(&self) -> bool {
        match &self.kind {
            WordKind::Constant { .. }
            | WordKind::StringConstant { .. }
            | WordKind::Variable { .. }
            | WordKind::StringVariable { .. }
            | WordKind::StringCompare(_) => true,
            WordKind::Function(f) => f.n_args == 0 && !f.is_operator,
            _ => false,
        }
    }

    pub(crate) fn is_string_operand(&self) -> bool {
        matches!(
            &self.kind,
            WordKind::StringConstant { .. } | WordKind::StringVariable { .. }
        )
    }
}

/// Owner of all words. The sorted `dict` list is the dictionary proper;
/// everything else in `words` is the constants list.
pub struct WordStore {
    words: Vec<Word>,
    dict: Vec<WordId>,
}

impl WordStore {
    pub fn new() -> Self {
        WordStore {
            words: Vec::new(),
            dict: Vec::new(),
        }
    }

    pub fn word(&self, id: WordId) -> &Word {
        &self.words[id]
    }

    /// Adds a word to the store without entering it in the dictionary.
    pub fn intern(&mut self, word: Word) -> WordId {
        self.words.push(word);
        self.words.len() - 1
    }

    /// Binary search of the dictionary. `Ok` carries the dictionary
    /// position of a match, `Err` the insertion point.
    pub fn search(&self, name: &str) -> core::result::Result<usize, usize> {
        self.dict
            .binary_search_by(|id| self.words[*id].name.as_str().cmp(name))
    }

    pub fn lookup(&self, name: &str) -> Option<WordId> {
        self.search(name).ok().map(|pos| self.dict[pos])
    }

    /// Inserts a new dictionary word. Names must be unique.
    pub fn insert(&mut self, word: Word) -> Result<WordId> {
        match self.search(&word.name) {
            Ok(_) => Err(ExprError::Syntax(format!(
                "'{}' is already defined",
                word.name
            ))),
            Err(pos) => {
                let id = self.intern(word);
                self.dict.insert(pos, id);
                Ok(id)
            }
        }
    }

    /// Replaces the word behind `id` in place. When the name changes, the
    /// dictionary ordering is repaired.
    pub fn replace_slot(&mut self, id: WordId, word: Word) {
        if self.words[id].name != word.name {
            if let Ok(pos) = self.search(&self.words[id].name) {
                self.dict.remove(pos);
            }
            match self.search(&word.name) {
                Ok(pos) => self.dict[pos] = id,
                Err(pos) => self.dict.insert(pos, id),
            }
        }
        self.words[id] = word;
    }

    /// Removes a name from the dictionary. The word itself stays interned
    /// so existing handles remain valid.
    pub fn remove(&mut self, name: &str) -> Option<WordId> {
        match self.search(name) {
            Ok(pos) => Some(self.dict.remove(pos)),
            Err(_) => None,
        }
    }

    /// All generated variables currently in the dictionary, with their
    /// backing cells.
    pub fn generated_variables(&self) -> Vec<(String, Rc<Cell<Real>>)> {
        self.dict
            .iter()
            .filter_map(|id| {
                let word = &self.words[*id];
                match &word.kind {
                    WordKind::Variable {
                        cell,
                        generated: true,
                    } => Some((word.name.clone(), cell.clone())),
                    _ => None,
                }
            })
            .collect()
    }
}

impl Default for WordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_is_sorted() {
        let mut store = WordStore::new();
        store.insert(Word::generated("zeta")).unwrap();
        store.insert(Word::generated("alpha")).unwrap();
        store.insert(Word::generated("mid")).unwrap();
        assert!(store.lookup("alpha").is_some());
        assert!(store.lookup("zeta").is_some());
        assert!(store.lookup("beta").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = WordStore::new();
        store.insert(Word::generated("x")).unwrap();
        assert!(store.insert(Word::generated("x")).is_err());
    }

    #[test]
    fn test_interned_words_stay_out_of_dictionary() {
        let mut store = WordStore::new();
        let id = store.intern(Word::number("42", 42.0));
        assert!(store.lookup("42").is_none());
        assert_eq!(store.word(id).name, "42");
    }

    #[test]
    fn test_replace_slot_keeps_handle() {
        let mut store = WordStore::new();
        let id = store.insert(Word::generated("x")).unwrap();
        let cell = Rc::new(Cell::new(7.0));
        store.replace_slot(id, Word::variable("x", cell));
        assert_eq!(store.lookup("x"), Some(id));
        assert!(!store.word(id).is_generated_variable());
    }

    #[test]
    fn test_string_compare_eval() {
        let cmp = StrCompare {
            op: StrCmpOp::In,
            left: StrOperand::Literal("'a'".into()),
            right: StrOperand::Literal("'dasad,sdsd,a,sds'".into()),
        };
        assert_eq!(cmp.eval(), 1.0);
        let cmp = StrCompare {
            op: StrCmpOp::Eq,
            left: StrOperand::Literal("'A'".into()),
            right: StrOperand::Literal("'a'".into()),
        };
        assert_eq!(cmp.eval(), 1.0);
    }
}
