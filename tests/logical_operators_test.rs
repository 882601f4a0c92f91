//! Tests for `and`/`or`/`xor`/`not` and the `not not` collapsing.

use formulon::ExpressionParser;
use std::{cell::Cell, rc::Rc};

#[test]
fn test_logicals_are_bitwise_over_rounded_integers() {
    let mut parser = ExpressionParser::new();
    assert_eq!(parser.evaluate("6 and 3").unwrap(), 2.0);
    assert_eq!(parser.evaluate("6 or 3").unwrap(), 7.0);
    assert_eq!(parser.evaluate("6 xor 3").unwrap(), 5.0);
    assert_eq!(parser.evaluate("1 and 1").unwrap(), 1.0);
    assert_eq!(parser.evaluate("1 or 0").unwrap(), 1.0);
}

#[test]
fn test_not() {
    let mut parser = ExpressionParser::new();
    assert_eq!(parser.evaluate("not 0").unwrap(), 1.0);
    assert_eq!(parser.evaluate("not 1").unwrap(), 0.0);
    assert_eq!(parser.evaluate("not 5").unwrap(), 0.0);
}

#[test]
fn test_not_binds_between_comparison_and_logicals() {
    let mut parser = ExpressionParser::new();
    // not (1 = 2), not (not 1) = 2
    assert_eq!(parser.evaluate("not 1 = 2").unwrap(), 1.0);
    // (not 0) and 1
    assert_eq!(parser.evaluate("1 and not 0").unwrap(), 1.0);
}

#[test]
fn test_double_not_vanishes_from_the_program() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(1.0));
    parser.define_variable("x", x).unwrap();
    let idx = parser.add_expression("not not x").unwrap();
    assert_eq!(parser.result(idx).unwrap(), 1.0);
    let ops = parser.compiled_ops(idx).unwrap();
    assert!(
        !ops.iter().any(|op| op == "not"),
        "program should contain no 'not' node, got {:?}",
        ops
    );
}

#[test]
fn test_not_chain_parity() {
    let mut parser = ExpressionParser::new();
    assert_eq!(parser.evaluate("not not true").unwrap(), 1.0);
    assert_eq!(parser.evaluate("not not not true").unwrap(), 0.0);
    assert_eq!(parser.evaluate("not not not not true").unwrap(), 1.0);
}

#[test]
fn test_logical_with_comparisons() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(5.0));
    parser.define_variable("x", x.clone()).unwrap();
    let idx = parser.add_expression("x > 0 and x < 10").unwrap();
    assert_eq!(parser.result(idx).unwrap(), 1.0);
    x.set(-3.0);
    assert_eq!(parser.result(idx).unwrap(), 0.0);
}
