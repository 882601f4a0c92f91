//! The public façade: compiling, caching and evaluating expressions.
//!
//! [`ExpressionParser`] owns the word dictionary and the list of compiled
//! expressions. Compilation runs the whole pipeline (lex, shape, build,
//! fold, linearize) and stores the resulting program under an integer
//! index keyed by the expression text; evaluating an index walks the
//! stored program. External variables are `Rc<Cell<f64>>` cells shared
//! with the host, so updating a cell and re-evaluating needs no
//! recompilation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::error::{ExprError, Result};
use crate::functions::{install_c_style_words, install_default_words};
use crate::lexer::Lexer;
use crate::optimizer::fold_constants;
use crate::parser::{check_brackets, TreeBuilder};
use crate::program::{assemble, OpCode, Program};
use crate::shaper::shape;
use crate::words::{OpTag, Word, WordId, WordKind, WordStore, MAX_ARGS};
use crate::Real;

/// Locale and syntax knobs, fixed at construction. No ambient state.
#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
    /// Decimal separator of numeric literals.
    pub decimal_sep: char,
    /// Separator of function-call arguments.
    pub arg_sep: char,
    /// Prefix of hexadecimal literals.
    pub hex_char: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            decimal_sep: '.',
            arg_sep: ',',
            hex_char: '$',
        }
    }
}

impl ParserConfig {
    /// Config for a given decimal separator. A `,` decimal switches the
    /// argument separator to `;` so the two can never collide.
    pub fn with_decimal_sep(decimal_sep: char) -> Self {
        Self {
            decimal_sep,
            arg_sep: if decimal_sep == ',' { ';' } else { ',' },
            hex_char: '$',
        }
    }
}

struct CompiledExpr {
    text: String,
    program: Program,
}

/// The expression compiler and evaluator.
///
/// # Examples
///
/// ```
/// use std::{cell::Cell, rc::Rc};
/// use formulon::ExpressionParser;
///
/// let mut parser = ExpressionParser::new();
/// let x = Rc::new(Cell::new(3.0));
/// parser.define_variable("x", x.clone()).unwrap();
///
/// let idx = parser.add_expression("4*4*x").unwrap();
/// assert_eq!(parser.result(idx).unwrap(), 48.0);
///
/// x.set(5.0);
/// assert_eq!(parser.result(idx).unwrap(), 80.0);
/// ```
pub struct ExpressionParser {
    store: WordStore,
    exprs: Vec<CompiledExpr>,
    current: Option<usize>,
    cfg: ParserConfig,
    optimize: bool,
}

impl ExpressionParser {
    /// A parser with the default dialect and locale.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// A parser with the default dialect and a custom locale.
    pub fn with_config(cfg: ParserConfig) -> Self {
        let mut store = WordStore::new();
        install_default_words(&mut store, cfg.arg_sep);
        Self {
            store,
            exprs: Vec::new(),
            current: None,
            cfg,
            optimize: true,
        }
    }

    /// A parser speaking the C-flavored dialect: `==`, `!=`, `&&`, `||`,
    /// prefix `!`, `=` assignment, `%` remainder, and `fact`/`perc`/`div`
    /// as functions.
    pub fn c_style() -> Self {
        Self::c_style_with_config(ParserConfig::default())
    }

    pub fn c_style_with_config(cfg: ParserConfig) -> Self {
        let mut store = WordStore::new();
        install_c_style_words(&mut store, cfg.arg_sep);
        Self {
            store,
            exprs: Vec::new(),
            current: None,
            cfg,
            optimize: true,
        }
    }

    /// Toggles constant folding for subsequent compilations. On by
    /// default.
    pub fn set_optimize(&mut self, on: bool) {
        self.optimize = on;
    }

    /// Registers (or redefines) a numeric variable backed by a cell the
    /// host keeps. Redefinition rewrites all compiled programs.
    pub fn define_variable(&mut self, name: &str, cell: Rc<Cell<Real>>) -> Result<()> {
        self.define_word(Word::variable(&name.trim().to_ascii_lowercase(), cell))
    }

    /// Registers (or redefines) a string variable.
    pub fn define_string_variable(
        &mut self,
        name: &str,
        cell: Rc<RefCell<String>>,
    ) -> Result<()> {
        self.define_word(Word::string_variable(
            &name.trim().to_ascii_lowercase(),
            cell,
        ))
    }

    /// Registers (or redefines) a numeric function of up to
    /// [`MAX_ARGS`] arguments.
    pub fn define_function(
        &mut self,
        name: &str,
        n_args: usize,
        kernel: impl Fn(&[Real]) -> Real + 'static,
    ) -> Result<()> {
        self.check_arity(name, n_args)?;
        self.define_word(Word::function(
            &name.trim().to_ascii_lowercase(),
            n_args,
            Rc::new(kernel),
        ))
    }

    /// Like [`define_function`](Self::define_function), but the result
    /// carries boolean semantics for formatting purposes.
    pub fn define_boolean_function(
        &mut self,
        name: &str,
        n_args: usize,
        kernel: impl Fn(&[Real]) -> Real + 'static,
    ) -> Result<()> {
        self.check_arity(name, n_args)?;
        self.define_word(Word::boolean_function(
            &name.trim().to_ascii_lowercase(),
            n_args,
            Rc::new(kernel),
        ))
    }

    /// Registers a preconstructed word under `name`, replacing an
    /// existing entry of the same arity if present.
    pub fn replace_function(&mut self, name: &str, word: Word) -> Result<()> {
        let name = name.trim().to_ascii_lowercase();
        match self.store.lookup(&name) {
            Some(old) => self.replace_word(old, word),
            None => {
                self.store.insert(word)?;
                Ok(())
            }
        }
    }

    fn check_arity(&self, name: &str, n_args: usize) -> Result<()> {
        if n_args > MAX_ARGS {
            return Err(ExprError::InvalidFunctionCall {
                name: name.to_string(),
                expected: MAX_ARGS,
                found: n_args,
            });
        }
        Ok(())
    }

    fn define_word(&mut self, word: Word) -> Result<()> {
        match self.store.lookup(&word.name) {
            Some(old) => self.replace_word(old, word),
            None => {
                self.store.insert(word)?;
                Ok(())
            }
        }
    }

    /// Replace-in-place: after the arity check, every compiled program is
    /// rewritten so records built from the old word dispatch to the new
    /// one and input slots aimed at the old backing cell read the new
    /// cell. The dictionary slot is then swapped.
    fn replace_word(&mut self, old_id: WordId, word: Word) -> Result<()> {
        let old = self.store.word(old_id);
        if old.n_args() != word.n_args() {
            return Err(ExprError::ArityMismatch {
                name: word.name.clone(),
                old: old.n_args(),
                new: word.n_args(),
            });
        }
        let old_cell = old.cell();
        let new_cell = word.cell();
        let new_op = match &word.kind {
            WordKind::Function(f) => Some(if f.tag == OpTag::Assign {
                OpCode::Assign
            } else {
                OpCode::Call(f.kernel.clone())
            }),
            _ => None,
        };
        debug!(
            "replacing word '{}' across {} compiled expression(s)",
            word.name,
            self.exprs.len()
        );
        for entry in &mut self.exprs {
            entry.program.rewire(
                old_id,
                new_op.as_ref(),
                old_cell.as_ref(),
                new_cell.as_ref(),
            );
        }
        self.store.replace_slot(old_id, word);
        Ok(())
    }

    /// Compiles `text` and returns its index, or returns the index of an
    /// earlier compilation of the same text. Sets the current expression.
    pub fn add_expression(&mut self, text: &str) -> Result<usize> {
        let key = text.trim().to_ascii_lowercase();
        if let Some(idx) = self.exprs.iter().position(|e| e.text == key) {
            debug!("cache hit for expression {:?}", key);
            self.current = Some(idx);
            return Ok(idx);
        }
        debug!("compiling expression {:?}", key);
        let program = self.compile(&key)?;
        self.exprs.push(CompiledExpr { text: key, program });
        let idx = self.exprs.len() - 1;
        self.current = Some(idx);
        Ok(idx)
    }

    fn compile(&mut self, text: &str) -> Result<Program> {
        let mut tokens = Lexer::new(text, self.cfg).tokenize(&mut self.store)?;
        check_brackets(&tokens, &self.store)?;
        shape(&mut tokens, &mut self.store, self.cfg)?;
        let (mut nodes, root) = {
            let mut builder = TreeBuilder::new(&self.store);
            let root = builder.build(&tokens)?;
            (builder.nodes, root)
        };
        if self.optimize {
            fold_constants(&mut nodes, &mut self.store, root)?;
        }
        assemble(nodes, &self.store, root)
    }

    /// Compiles (or finds) `text` and evaluates it. Empty input yields
    /// NaN without error.
    pub fn evaluate(&mut self, text: &str) -> Result<Real> {
        if text.trim().is_empty() {
            return Ok(Real::NAN);
        }
        let idx = self.add_expression(text)?;
        self.result(idx)
    }

    /// Evaluates the most recently compiled or looked-up expression.
    pub fn evaluate_current(&mut self) -> Result<Real> {
        let idx = self.current.ok_or(ExprError::NoExpression)?;
        self.result(idx)
    }

    /// Evaluates the expression stored under `index`.
    pub fn result(&mut self, index: usize) -> Result<Real> {
        if index >= self.exprs.len() {
            return Err(ExprError::BadIndex(index));
        }
        self.exprs[index].program.run(&self.store)
    }

    /// Evaluates and formats: `true`/`false` for boolean-typed
    /// expressions, the number otherwise.
    pub fn as_string(&mut self, index: usize) -> Result<String> {
        let value = self.result(index)?;
        if self.exprs[index].program.is_boolean() {
            Ok(if value != 0.0 { "true" } else { "false" }.to_string())
        } else {
            Ok(format!("{}", value))
        }
    }

    /// Evaluates a boolean-typed expression. Numeric expressions are
    /// rejected.
    pub fn as_boolean(&mut self, index: usize) -> Result<bool> {
        if index >= self.exprs.len() {
            return Err(ExprError::BadIndex(index));
        }
        if !self.exprs[index].program.is_boolean() {
            return Err(ExprError::NotBoolean);
        }
        Ok(self.result(index)? != 0.0)
    }

    /// Evaluates and formats the rounded result as a hexadecimal literal
    /// with the configured prefix.
    pub fn as_hex(&mut self, index: usize) -> Result<String> {
        let value = self.result(index)?;
        let n = libm::round(value) as i64;
        Ok(if n < 0 {
            format!("-{}{:X}", self.cfg.hex_char, n.unsigned_abs())
        } else {
            format!("{}{:X}", self.cfg.hex_char, n)
        })
    }

    /// The backing cell of a registered or generated numeric variable.
    pub fn variable(&self, name: &str) -> Option<Rc<Cell<Real>>> {
        let id = self.store.lookup(&name.trim().to_ascii_lowercase())?;
        match &self.store.word(id).kind {
            WordKind::Variable { cell, .. } => Some(cell.clone()),
            _ => None,
        }
    }

    /// All variables the compiled expressions introduced by using an
    /// identifier before any registration.
    pub fn generated_variables(&self) -> Vec<(String, Rc<Cell<Real>>)> {
        self.store.generated_variables()
    }

    /// Word names of a compiled program in execution order. An expression
    /// reduced to a plain variable reports an empty list.
    pub fn compiled_ops(&self, index: usize) -> Result<Vec<String>> {
        if index >= self.exprs.len() {
            return Err(ExprError::BadIndex(index));
        }
        Ok(self.exprs[index].program.op_names(&self.store))
    }

    /// Number of compiled expressions.
    pub fn expression_count(&self) -> usize {
        self.exprs.len()
    }

    /// Index of the current expression, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Disposes all compiled programs and clears the current index. The
    /// dictionary, including generated variables, is kept.
    pub fn clear_expressions(&mut self) {
        self.exprs.clear();
        self.current = None;
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_returns_same_index() {
        let mut parser = ExpressionParser::new();
        let a = parser.add_expression("1 + 2").unwrap();
        let b = parser.add_expression("3 * 4").unwrap();
        let again = parser.add_expression("1 + 2").unwrap();
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(parser.expression_count(), 2);
        assert_eq!(parser.current_index(), Some(a));
    }

    #[test]
    fn test_cache_is_case_insensitive() {
        let mut parser = ExpressionParser::new();
        let a = parser.add_expression("SIN(0)").unwrap();
        let b = parser.add_expression("sin(0)").unwrap();
        assert_eq!(a, b);
        assert_eq!(parser.expression_count(), 1);
    }

    #[test]
    fn test_empty_input_is_nan() {
        let mut parser = ExpressionParser::new();
        assert!(parser.evaluate("").unwrap().is_nan());
        assert!(parser.evaluate("   ").unwrap().is_nan());
    }

    #[test]
    fn test_clear_expressions_resets_current() {
        let mut parser = ExpressionParser::new();
        parser.add_expression("1 + 2").unwrap();
        parser.clear_expressions();
        assert_eq!(parser.expression_count(), 0);
        assert!(matches!(
            parser.evaluate_current(),
            Err(ExprError::NoExpression)
        ));
    }

    #[test]
    fn test_bad_index_rejected() {
        let mut parser = ExpressionParser::new();
        assert!(matches!(parser.result(7), Err(ExprError::BadIndex(7))));
    }

    #[test]
    fn test_failed_compilation_stores_nothing() {
        let mut parser = ExpressionParser::new();
        assert!(parser.add_expression("1 + * 2").is_err());
        assert_eq!(parser.expression_count(), 0);
        assert_eq!(parser.current_index(), None);
    }
}
