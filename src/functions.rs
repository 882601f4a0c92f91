//! Built-in numeric kernels and the default word tables.
//!
//! Kernels receive one slot per declared argument and return a plain
//! value; domain violations surface as NaN or infinity, which the
//! evaluator turns into a math error naming the word. Transcendentals go
//! through `libm`.

use std::rc::Rc;

use crate::words::{OpTag, Word, WordKind, WordStore};
use crate::Real;

/// Absolute tolerance of the `=`/`<>` comparisons.
const CMP_EPS: Real = 1e-30;

fn truth(hit: bool) -> Real {
    if hit {
        1.0
    } else {
        0.0
    }
}

/// Factorial over the rounded argument. Overflows to infinity quickly,
/// which the evaluator reports as a math error.
pub fn factorial(args: &[Real]) -> Real {
    let n = libm::round(args[0]) as i64;
    if n <= 1 {
        return 1.0;
    }
    let mut acc = 1.0;
    for i in 2..=n {
        acc *= i as Real;
        if !acc.is_finite() {
            break;
        }
    }
    acc
}

/// Integer power by squaring; negative exponents invert the base.
pub fn int_power(args: &[Real]) -> Real {
    let mut base = args[0];
    let mut exp = libm::round(args[1]) as i64;
    if exp < 0 {
        base = 1.0 / base;
        exp = -exp;
    }
    let mut acc = 1.0;
    while exp > 0 {
        if exp & 1 == 1 {
            acc *= base;
        }
        base *= base;
        exp >>= 1;
    }
    acc
}

/// Integer division over rounded operands; a zero divisor yields NaN.
pub fn int_div(args: &[Real]) -> Real {
    let divisor = libm::round(args[1]) as i64;
    if divisor == 0 {
        return Real::NAN;
    }
    (libm::round(args[0]) as i64 / divisor) as Real
}

/// Integer remainder over rounded operands; a zero divisor yields NaN.
pub fn int_mod(args: &[Real]) -> Real {
    let divisor = libm::round(args[1]) as i64;
    if divisor == 0 {
        return Real::NAN;
    }
    (libm::round(args[0]) as i64 % divisor) as Real
}

/// Equality within an absolute tolerance.
pub fn near_eq(args: &[Real]) -> Real {
    truth(libm::fabs(args[0] - args[1]) < CMP_EPS)
}

pub fn near_ne(args: &[Real]) -> Real {
    truth(libm::fabs(args[0] - args[1]) >= CMP_EPS)
}

/// `>=` biases the right side down by the tolerance; `<=` biases it up.
/// The asymmetry is intentional.
pub fn ge_biased(args: &[Real]) -> Real {
    truth(args[0] >= args[1] - CMP_EPS)
}

pub fn le_biased(args: &[Real]) -> Real {
    truth(args[0] <= args[1] + CMP_EPS)
}

/// Bitwise logicals operate over rounded integers.
pub fn bit_and(args: &[Real]) -> Real {
    ((libm::round(args[0]) as i64) & (libm::round(args[1]) as i64)) as Real
}

pub fn bit_or(args: &[Real]) -> Real {
    ((libm::round(args[0]) as i64) | (libm::round(args[1]) as i64)) as Real
}

pub fn bit_xor(args: &[Real]) -> Real {
    ((libm::round(args[0]) as i64) ^ (libm::round(args[1]) as i64)) as Real
}

/// Boolean negation of the rounded argument.
pub fn bool_not(args: &[Real]) -> Real {
    truth(libm::round(args[0]) as i64 == 0)
}

fn guarded_asin(x: Real) -> Real {
    if !(-1.0..=1.0).contains(&x) {
        Real::NAN
    } else {
        libm::asin(x)
    }
}

fn guarded_acos(x: Real) -> Real {
    if !(-1.0..=1.0).contains(&x) {
        Real::NAN
    } else {
        libm::acos(x)
    }
}

fn op(
    store: &mut WordStore,
    name: &str,
    n_args: usize,
    precedence: u32,
    boolean: bool,
    tag: OpTag,
    kernel: impl Fn(&[Real]) -> Real + 'static,
) {
    let _ = store.insert(Word::operator(
        name,
        n_args,
        precedence,
        boolean,
        tag,
        Rc::new(kernel),
    ));
}

fn fun(store: &mut WordStore, name: &str, n_args: usize, kernel: impl Fn(&[Real]) -> Real + 'static) {
    let _ = store.insert(Word::function(name, n_args, Rc::new(kernel)));
}

/// Populates the dictionary of the default dialect. `arg_sep` names the
/// separator word (`,`, or `;` in comma-decimal locales).
pub(crate) fn install_default_words(store: &mut WordStore, arg_sep: char) {
    let _ = store.insert(Word::punctuation("(", WordKind::LeftBracket));
    let _ = store.insert(Word::punctuation(")", WordKind::RightBracket));
    let _ = store.insert(Word::punctuation(&arg_sep.to_string(), WordKind::Separator));

    // Operators, tightest first. `+@`/`-@` are the unary signs the shaper
    // synthesizes; their names cannot be lexed.
    op(store, "!", 1, 10, false, OpTag::None, factorial);
    op(store, "%", 1, 10, false, OpTag::None, |a| a[0] * 0.01);
    op(store, "-@", 1, 10, false, OpTag::None, |a| -a[0]);
    op(store, "+@", 1, 10, false, OpTag::None, |a| a[0]);
    op(store, "in", 2, 10, true, OpTag::None, near_eq);
    op(store, "^", 2, 20, false, OpTag::None, |a| libm::pow(a[0], a[1]));
    op(store, "^@", 2, 20, false, OpTag::None, int_power);
    op(store, "*", 2, 30, false, OpTag::None, |a| a[0] * a[1]);
    op(store, "/", 2, 30, false, OpTag::None, |a| a[0] / a[1]);
    op(store, "div", 2, 30, false, OpTag::None, int_div);
    op(store, "mod", 2, 30, false, OpTag::None, int_mod);
    op(store, "+", 2, 40, false, OpTag::None, |a| a[0] + a[1]);
    op(store, "-", 2, 40, false, OpTag::None, |a| a[0] - a[1]);
    op(store, ">", 2, 50, true, OpTag::None, |a| truth(a[0] > a[1]));
    op(store, ">=", 2, 50, true, OpTag::None, ge_biased);
    op(store, "<", 2, 50, true, OpTag::None, |a| truth(a[0] < a[1]));
    op(store, "<=", 2, 50, true, OpTag::None, le_biased);
    op(store, "<>", 2, 50, true, OpTag::None, near_ne);
    op(store, "=", 2, 50, true, OpTag::None, near_eq);
    op(store, "not", 1, 60, true, OpTag::Not, bool_not);
    op(store, "or", 2, 70, true, OpTag::None, bit_or);
    op(store, "and", 2, 70, true, OpTag::None, bit_and);
    op(store, "xor", 2, 70, true, OpTag::None, bit_xor);
    op(store, ":=", 2, 200, false, OpTag::Assign, |a| a[1]);

    install_common_functions(store);
}

fn install_common_functions(store: &mut WordStore) {
    fun(store, "abs", 1, |a| libm::fabs(a[0]));
    fun(store, "sign", 1, |a| {
        if a[0] > 0.0 {
            1.0
        } else if a[0] < 0.0 {
            -1.0
        } else {
            0.0
        }
    });
    fun(store, "sqr", 1, |a| a[0] * a[0]);
    fun(store, "sqrt", 1, |a| libm::sqrt(a[0]));
    fun(store, "sin", 1, |a| libm::sin(a[0]));
    fun(store, "cos", 1, |a| libm::cos(a[0]));
    fun(store, "tan", 1, |a| libm::tan(a[0]));
    fun(store, "asin", 1, |a| guarded_asin(a[0]));
    fun(store, "acos", 1, |a| guarded_acos(a[0]));
    fun(store, "atan", 1, |a| libm::atan(a[0]));
    fun(store, "sinh", 1, |a| libm::sinh(a[0]));
    fun(store, "cosh", 1, |a| libm::cosh(a[0]));
    fun(store, "tanh", 1, |a| libm::tanh(a[0]));
    fun(store, "exp", 1, |a| libm::exp(a[0]));
    fun(store, "ln", 1, |a| libm::log(a[0]));
    fun(store, "log10", 1, |a| libm::log10(a[0]));
    fun(store, "floor", 1, |a| libm::floor(a[0]));
    fun(store, "ceil", 1, |a| libm::ceil(a[0]));
    fun(store, "round", 1, |a| libm::round(a[0]));
    fun(store, "trunc", 1, |a| libm::trunc(a[0]));
    fun(store, "min", 2, |a| if a[0] < a[1] { a[0] } else { a[1] });
    fun(store, "max", 2, |a| if a[0] > a[1] { a[0] } else { a[1] });
    fun(store, "pow", 2, |a| libm::pow(a[0], a[1]));
    fun(store, "if", 3, |a| if a[0] != 0.0 { a[1] } else { a[2] });
    let _ = store.insert(Word::impure_function(
        "random",
        0,
        Rc::new(|_: &[Real]| rand::random::<Real>()),
    ));

    let _ = store.insert(Word::constant_named("pi", crate::constants::PI, false));
    let _ = store.insert(Word::constant_named("e", crate::constants::E, false));
    let _ = store.insert(Word::constant_named("true", 1.0, true));
    let _ = store.insert(Word::constant_named("false", 0.0, true));
}

/// Populates the dictionary of the C-flavored dialect: `fact`/`perc`/`div`
/// as functions, `%` as the remainder, `&&`/`||`, `=` assignment, `==`,
/// `!=` and prefix `!`.
pub(crate) fn install_c_style_words(store: &mut WordStore, arg_sep: char) {
    install_default_words(store, arg_sep);
    for name in ["!", "%", "div", "mod", "or", "and", "not", ":=", "=", "<>"] {
        store.remove(name);
    }
    fun(store, "fact", 1, factorial);
    fun(store, "perc", 1, |a| a[0] * 0.01);
    fun(store, "div", 2, int_div);
    op(store, "%", 2, 30, false, OpTag::None, int_mod);
    op(store, "||", 2, 70, true, OpTag::None, bit_or);
    op(store, "&&", 2, 70, true, OpTag::None, bit_and);
    op(store, "=", 2, 200, false, OpTag::Assign, |a| a[1]);
    op(store, "==", 2, 50, true, OpTag::None, near_eq);
    op(store, "!=", 2, 50, true, OpTag::None, near_ne);
    op(store, "!", 1, 60, true, OpTag::Not, bool_not);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(&[5.0]), 120.0);
        assert_eq!(factorial(&[0.0]), 1.0);
        assert_eq!(factorial(&[1.0]), 1.0);
        assert!(!factorial(&[500.0]).is_finite());
    }

    #[test]
    fn test_int_power() {
        assert_eq!(int_power(&[2.0, 10.0]), 1024.0);
        assert_eq!(int_power(&[2.0, 0.0]), 1.0);
        assert_eq!(int_power(&[2.0, -2.0]), 0.25);
        assert_eq!(int_power(&[-3.0, 3.0]), -27.0);
    }

    #[test]
    fn test_int_div_mod() {
        assert_eq!(int_div(&[7.0, 2.0]), 3.0);
        assert_eq!(int_mod(&[7.0, 2.0]), 1.0);
        assert!(int_div(&[1.0, 0.0]).is_nan());
    }

    #[test]
    fn test_comparisons_tolerate_rounding() {
        assert_eq!(near_eq(&[1.0, 1.0]), 1.0);
        assert_eq!(near_eq(&[1.0, 1.0000001]), 0.0);
        assert_eq!(ge_biased(&[1.0, 1.0]), 1.0);
        assert_eq!(le_biased(&[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_bitwise_logicals() {
        assert_eq!(bit_and(&[6.0, 3.0]), 2.0);
        assert_eq!(bit_or(&[6.0, 3.0]), 7.0);
        assert_eq!(bit_xor(&[6.0, 3.0]), 5.0);
        assert_eq!(bool_not(&[0.0]), 1.0);
        assert_eq!(bool_not(&[2.0]), 0.0);
    }
}
