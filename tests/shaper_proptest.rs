//! Property tests for the shaping pass: sign runs and `not` runs collapse
//! by parity, for any run length.

use formulon::ExpressionParser;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_sign_chain_parity(k in 1usize..40) {
        let mut parser = ExpressionParser::new();
        let expr = format!("{}3", "-".repeat(k));
        let expected = if k % 2 == 0 { 3.0 } else { -3.0 };
        prop_assert_eq!(parser.evaluate(&expr).unwrap(), expected);
    }

    #[test]
    fn prop_plus_chain_is_identity(k in 1usize..40) {
        let mut parser = ExpressionParser::new();
        let expr = format!("{}7", "+".repeat(k));
        prop_assert_eq!(parser.evaluate(&expr).unwrap(), 7.0);
    }

    #[test]
    fn prop_not_chain_parity(k in 1usize..40) {
        let mut parser = ExpressionParser::new();
        let expr = format!("{}true", "not ".repeat(k));
        let expected = if k % 2 == 0 { 1.0 } else { 0.0 };
        prop_assert_eq!(parser.evaluate(&expr).unwrap(), expected);
    }

    #[test]
    fn prop_mixed_sign_chain(k in 1usize..20, j in 1usize..20) {
        // j leading '+' signs never change the parity decided by k '-'
        let mut parser = ExpressionParser::new();
        let expr = format!("{}{}5", "+".repeat(j), "-".repeat(k));
        let expected = if k % 2 == 0 { 5.0 } else { -5.0 };
        prop_assert_eq!(parser.evaluate(&expr).unwrap(), expected);
    }
}
