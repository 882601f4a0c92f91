//! Tests for the syntax diagnostics.

use formulon::{ExprError, ExpressionParser};

fn syntax_message(parser: &mut ExpressionParser, text: &str) -> String {
    match parser.evaluate(text) {
        Err(err) => err.to_string(),
        Ok(value) => panic!("expected an error for {:?}, got {}", text, value),
    }
}

#[test]
fn test_adjacent_bracket_groups() {
    let mut parser = ExpressionParser::new();
    let msg = syntax_message(&mut parser, "(x+1)(24-3)");
    assert!(
        msg.contains("missing operand between ) and ("),
        "got: {}",
        msg
    );
}

#[test]
fn test_adjacent_operands() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("2 3"),
        Err(ExprError::Syntax(msg)) if msg.contains("missing operator")
    ));
    assert!(matches!(
        parser.evaluate("x y"),
        Err(ExprError::Syntax(_))
    ));
}

#[test]
fn test_empty_brackets() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("sin()"),
        Err(ExprError::Syntax(msg)) if msg.contains("empty brackets")
    ));
}

#[test]
fn test_unknown_identifier_before_bracket() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("nosuch(3)"),
        Err(ExprError::Syntax(msg)) if msg.contains("unknown function 'nosuch'")
    ));
}

#[test]
fn test_variable_before_bracket() {
    let mut parser = ExpressionParser::new();
    let x = std::rc::Rc::new(std::cell::Cell::new(1.0));
    parser.define_variable("x", x).unwrap();
    assert!(matches!(
        parser.evaluate("x(3)"),
        Err(ExprError::Syntax(_))
    ));
}

#[test]
fn test_bracket_followed_by_value() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("(1+2) 3"),
        Err(ExprError::Syntax(_))
    ));
}

#[test]
fn test_unbalanced_brackets() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("(1 + 2"),
        Err(ExprError::UnmatchedBracket(_))
    ));
    assert!(matches!(
        parser.evaluate("1 + 2)"),
        Err(ExprError::UnmatchedBracket(_))
    ));
}

#[test]
fn test_missing_operands() {
    let mut parser = ExpressionParser::new();
    assert!(parser.evaluate("1 +").is_err());
    assert!(parser.evaluate("* 2").is_err());
    assert!(parser.evaluate("1 + * 2").is_err());
}

#[test]
fn test_unknown_operator() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("1 ~ 2"),
        Err(ExprError::UnknownOperator(op)) if op == "~"
    ));
    // `&&` only exists in the C dialect
    assert!(matches!(
        parser.evaluate("1 && 2"),
        Err(ExprError::UnknownOperator(_))
    ));
}

#[test]
fn test_unexpected_character() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("1 # 2"),
        Err(ExprError::Syntax(msg)) if msg.contains("unexpected character")
    ));
}

#[test]
fn test_wrong_argument_count() {
    let mut parser = ExpressionParser::new();
    assert!(matches!(
        parser.evaluate("max(1, 2, 3)"),
        Err(ExprError::InvalidFunctionCall {
            expected: 2,
            found: 3,
            ..
        })
    ));
    assert!(matches!(
        parser.evaluate("sin(1, 2)"),
        Err(ExprError::InvalidFunctionCall { .. })
    ));
}

#[test]
fn test_errors_leave_the_cache_clean() {
    let mut parser = ExpressionParser::new();
    assert!(parser.evaluate("1 + * 2").is_err());
    assert_eq!(parser.expression_count(), 0);
    assert_eq!(parser.evaluate("1 + 2").unwrap(), 3.0);
    assert_eq!(parser.expression_count(), 1);
}
