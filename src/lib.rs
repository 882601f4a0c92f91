//! # formulon
//!
//! A compile-once, evaluate-many formula engine. Expressions written in a
//! case-insensitive infix syntax — arithmetic, comparisons, logicals,
//! strings, hex literals, assignment, user functions — are compiled into
//! a compact linked program that can be re-evaluated at high speed while
//! external variables change. Typical hosts: spreadsheet-like cells,
//! scriptable formulas inside simulation or modeling tools.
//!
//! ## Quick start
//!
//! ```
//! use formulon::ExpressionParser;
//!
//! let mut parser = ExpressionParser::new();
//! assert_eq!(parser.evaluate("2 + 3 * 4").unwrap(), 14.0);
//! assert_eq!(parser.evaluate("5!").unwrap(), 120.0);
//! assert_eq!(parser.evaluate("$ff + 1").unwrap(), 256.0);
//! ```
//!
//! ## Variables
//!
//! External variables are `Rc<Cell<f64>>` cells shared between the host
//! and the compiled programs. Updating a cell and re-evaluating needs no
//! recompilation:
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//! use formulon::ExpressionParser;
//!
//! let mut parser = ExpressionParser::new();
//! let x = Rc::new(Cell::new(2.0));
//! parser.define_variable("x", x.clone()).unwrap();
//!
//! let idx = parser.add_expression("x^2 + 1").unwrap();
//! assert_eq!(parser.result(idx).unwrap(), 5.0);
//! x.set(3.0);
//! assert_eq!(parser.result(idx).unwrap(), 10.0);
//! ```
//!
//! Identifiers used before declaration become *generated variables*: the
//! engine synthesizes storage for them, and the host can enumerate and
//! bind them afterwards through
//! [`ExpressionParser::generated_variables`].
//!
//! ## User functions
//!
//! ```
//! use formulon::ExpressionParser;
//!
//! let mut parser = ExpressionParser::new();
//! parser
//!     .define_function("hypot", 2, |a| (a[0] * a[0] + a[1] * a[1]).sqrt())
//!     .unwrap();
//! assert_eq!(parser.evaluate("hypot(3, 4)").unwrap(), 5.0);
//! ```
//!
//! ## How it works
//!
//! Compilation lexes the text into dictionary words, shapes the token
//! list (unary signs, `not not` collapsing, string-comparison fusion,
//! integer-power promotion), builds an operator tree by precedence,
//! folds invariant subtrees into constants, and flattens the tree into a
//! linked list of operation records. Evaluation walks the list with one
//! indirect call per record; records read their inputs straight from
//! predecessor scratch cells or variable cells. Programs are cached by
//! expression text.

pub mod engine;
pub mod error;
pub mod functions;
pub mod program;
pub mod words;

mod lexer;
mod optimizer;
mod parser;
mod shaper;

pub use engine::{ExpressionParser, ParserConfig};
pub use error::{ExprError, Result};
pub use program::Program;
pub use words::{Kernel, Word, WordStore, MAX_ARGS};

/// The floating-point type used throughout the crate.
pub type Real = f64;

pub mod constants {
    use super::Real;

    pub const PI: Real = core::f64::consts::PI;
    pub const E: Real = core::f64::consts::E;
    pub const TEST_PRECISION: Real = 1e-10;
}

/// Checks that two floating point values are approximately equal within
/// an epsilon (default [`constants::TEST_PRECISION`]). NaN equals NaN for
/// the purposes of this macro.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $crate::constants::TEST_PRECISION)
    };
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;
        if left_val.is_nan() && right_val.is_nan() {
            // NaN == NaN for our purposes
        } else {
            assert!(
                (left_val - right_val).abs() < eps,
                "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
                left_val,
                right_val,
                eps
            );
        }
    }};
}
