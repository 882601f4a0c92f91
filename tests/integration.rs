//! End-to-end scenarios exercising the whole pipeline.

use formulon::{assert_approx_eq, ExprError, ExpressionParser};
use std::{cell::Cell, rc::Rc};

#[test]
fn test_spreadsheet_style_cells() {
    let mut parser = ExpressionParser::new();
    let price = Rc::new(Cell::new(12.5));
    let qty = Rc::new(Cell::new(4.0));
    parser.define_variable("price", price.clone()).unwrap();
    parser.define_variable("qty", qty.clone()).unwrap();

    let subtotal = parser.add_expression("price * qty").unwrap();
    let total = parser.add_expression("price * qty * (1 + 19%)").unwrap();

    assert_eq!(parser.result(subtotal).unwrap(), 50.0);
    assert_approx_eq!(parser.result(total).unwrap(), 59.5);

    qty.set(10.0);
    assert_eq!(parser.result(subtotal).unwrap(), 125.0);
    assert_approx_eq!(parser.result(total).unwrap(), 148.75);
}

#[test]
fn test_conditional_with_both_branches_evaluated() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(-7.0));
    parser.define_variable("x", x.clone()).unwrap();
    let idx = parser.add_expression("if(x > 0, x, -x)").unwrap();
    assert_eq!(parser.result(idx).unwrap(), 7.0);
    x.set(9.0);
    assert_eq!(parser.result(idx).unwrap(), 9.0);
}

#[test]
fn test_conditional_does_not_short_circuit() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(0.0));
    parser.define_variable("x", x).unwrap();
    // both branches run, so the untaken 1/x still raises
    assert!(matches!(
        parser.evaluate("if(x = 0, 0, 1/x)"),
        Err(ExprError::Math { .. })
    ));
}

#[test]
fn test_chained_assignments_across_expressions() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(5.0));
    parser.define_variable("x", x).unwrap();
    let first = parser.add_expression("y := x*2").unwrap();
    let second = parser.add_expression("z := y + 1").unwrap();
    let third = parser.add_expression("y + z").unwrap();
    assert_eq!(parser.result(first).unwrap(), 10.0);
    assert_eq!(parser.result(second).unwrap(), 11.0);
    assert_eq!(parser.result(third).unwrap(), 21.0);
}

#[test]
fn test_program_chain_is_finite_and_ordered() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(1.0));
    parser.define_variable("x", x).unwrap();
    let idx = parser
        .add_expression("sin(x) * sin(x) + cos(x) * cos(x) + x - x")
        .unwrap();
    // walking the chain terminates and visits one record per operation
    let ops = parser.compiled_ops(idx).unwrap();
    assert_eq!(ops.len(), 9);
    assert_eq!(ops.last().unwrap(), "-");
    assert_approx_eq!(parser.result(idx).unwrap(), 1.0);
}

#[test]
fn test_recompilation_is_cached() {
    let mut parser = ExpressionParser::new();
    let a = parser.add_expression("1 + 2").unwrap();
    parser.add_expression("2 + 3").unwrap();
    let c = parser.add_expression("1 + 2").unwrap();
    assert_eq!(a, c);
    assert_eq!(parser.expression_count(), 2);
}

#[test]
fn test_evaluate_current_follows_add_expression() {
    let mut parser = ExpressionParser::new();
    parser.add_expression("40 + 2").unwrap();
    assert_eq!(parser.evaluate_current().unwrap(), 42.0);
    parser.add_expression("6 * 7").unwrap();
    assert_eq!(parser.evaluate_current().unwrap(), 42.0);
}

#[test]
fn test_kitchen_sink() {
    let mut parser = ExpressionParser::new();
    let x = Rc::new(Cell::new(2.0));
    parser.define_variable("x", x).unwrap();
    parser
        .define_function("clamp01", 1, |a| a[0].clamp(0.0, 1.0))
        .unwrap();
    assert_approx_eq!(
        parser
            .evaluate("clamp01(x / 4) + if(x > 1, 10, 20) + $f + 3!")
            .unwrap(),
        0.5 + 10.0 + 15.0 + 6.0
    );
}
