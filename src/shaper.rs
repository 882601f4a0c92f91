//! The shaping pass: in-place rewriting of the token list.
//!
//! Runs between the lexer and the tree builder. Resolves the
//! unary-vs-binary reading of `+`/`-`, collapses `not not` chains,
//! rejects ill-formed adjacencies, promotes `^` with an integer exponent
//! to the integer-power operator, and fuses `string op string` triples
//! into single string-comparison words.

use crate::engine::ParserConfig;
use crate::error::{ExprError, Result};
use crate::words::{
    OpTag, StrCmpOp, StrOperand, Word, WordId, WordKind, WordStore,
};

pub(crate) fn shape(
    tokens: &mut Vec<WordId>,
    store: &mut WordStore,
    cfg: ParserConfig,
) -> Result<()> {
    collapse_signs(tokens, store)?;
    collapse_not(tokens, store);
    check_adjacency(tokens, store)?;
    promote_integer_power(tokens, store, cfg.decimal_sep);
    fuse_string_compares(tokens, store)?;
    reject_loose_in(tokens, store)?;
    Ok(())
}

/// True when a `+`/`-` at this position reads as a sign: at the start,
/// after `(`, after the separator, or after a binary operator.
fn sign_context(store: &WordStore, prev: Option<WordId>) -> bool {
    match prev {
        None => true,
        Some(id) => match &store.word(id).kind {
            WordKind::LeftBracket | WordKind::Separator => true,
            WordKind::Function(f) => f.is_operator && f.n_args == 2,
            _ => false,
        },
    }
}

/// The `not` context additionally admits any operator.
fn not_context(store: &WordStore, prev: Option<WordId>) -> bool {
    match prev {
        None => true,
        Some(id) => match &store.word(id).kind {
            WordKind::LeftBracket | WordKind::Separator => true,
            WordKind::Function(f) => f.is_operator,
            _ => false,
        },
    }
}

fn is_sign(store: &WordStore, id: WordId) -> bool {
    let word = store.word(id);
    (word.name == "+" || word.name == "-") && word.is_operator()
}

fn is_not(store: &WordStore, id: WordId) -> bool {
    matches!(&store.word(id).kind, WordKind::Function(f) if f.tag == OpTag::Not)
}

/// Replaces a run of sign tokens in unary position with a single `+@` or
/// `-@` word, depending on the product of the signs.
fn collapse_signs(tokens: &mut Vec<WordId>, store: &WordStore) -> Result<()> {
    let mut i = 0;
    while i < tokens.len() {
        let prev = if i == 0 { None } else { Some(tokens[i - 1]) };
        if is_sign(store, tokens[i]) && sign_context(store, prev) {
            let mut sign = 1;
            let mut j = i;
            while j < tokens.len() && is_sign(store, tokens[j]) {
                if store.word(tokens[j]).name == "-" {
                    sign = -sign;
                }
                j += 1;
            }
            let unary = if sign < 0 { "-@" } else { "+@" };
            tokens[i] = store
                .lookup(unary)
                .ok_or_else(|| ExprError::UnknownOperator(unary.to_string()))?;
            tokens.drain(i + 1..j);
        }
        i += 1;
    }
    Ok(())
}

/// Removes `not not` pairs: an even run disappears, an odd run keeps one.
fn collapse_not(tokens: &mut Vec<WordId>, store: &WordStore) {
    let mut i = 0;
    while i < tokens.len() {
        let prev = if i == 0 { None } else { Some(tokens[i - 1]) };
        if is_not(store, tokens[i]) && not_context(store, prev) {
            let mut j = i;
            while j < tokens.len() && is_not(store, tokens[j]) {
                j += 1;
            }
            if (j - i) % 2 == 0 {
                tokens.drain(i..j);
                continue;
            }
            tokens.drain(i + 1..j);
        }
        i += 1;
    }
}

/// Rejects token adjacencies that can never parse.
fn check_adjacency(tokens: &[WordId], store: &WordStore) -> Result<()> {
    for pair in tokens.windows(2) {
        let (a, b) = (store.word(pair[0]), store.word(pair[1]));
        match (&a.kind, &b.kind) {
            (WordKind::LeftBracket, WordKind::RightBracket) => {
                return Err(ExprError::Syntax("empty brackets ()".to_string()));
            }
            (WordKind::RightBracket, WordKind::LeftBracket) => {
                return Err(ExprError::Syntax(
                    "missing operand between ) and (".to_string(),
                ));
            }
            _ => {}
        }
        if a.is_operand() && b.is_operand() {
            return Err(ExprError::Syntax(format!(
                "missing operator between '{}' and '{}'",
                a.name, b.name
            )));
        }
        if matches!(&b.kind, WordKind::LeftBracket) {
            if a.is_generated_variable() {
                return Err(ExprError::Syntax(format!("unknown function '{}'", a.name)));
            }
            if a.is_operand() {
                return Err(ExprError::Syntax(format!(
                    "missing operator between '{}' and '('",
                    a.name
                )));
            }
        }
        if matches!(&a.kind, WordKind::RightBracket) && b.is_operand() {
            return Err(ExprError::Syntax(format!(
                "missing operator between ) and '{}'",
                b.name
            )));
        }
    }
    Ok(())
}

/// `^` with an integer constant on the right becomes the cheaper `^@`.
/// The constant's name must be free of the decimal separator and of an
/// exponent marker, so `x^2e-1` stays on the float-power kernel.
fn promote_integer_power(tokens: &mut [WordId], store: &WordStore, decimal_sep: char) {
    let Some(int_pow) = store.lookup("^@") else {
        return;
    };
    for i in 0..tokens.len().saturating_sub(1) {
        if store.word(tokens[i]).name != "^" || !store.word(tokens[i]).is_operator() {
            continue;
        }
        let right = store.word(tokens[i + 1]);
        let plain_integer = matches!(&right.kind, WordKind::Constant { boolean: false, .. })
            && !right.name.contains(decimal_sep)
            && !right.name.contains('e');
        if plain_integer {
            tokens[i] = int_pow;
        }
    }
}

fn str_operand(word: &Word) -> Option<StrOperand> {
    match &word.kind {
        WordKind::StringConstant { text } => Some(StrOperand::Literal(text.clone())),
        WordKind::StringVariable { cell } => Some(StrOperand::Variable(cell.clone())),
        _ => None,
    }
}

fn str_cmp_op(name: &str) -> Option<StrCmpOp> {
    match name {
        "=" | "==" => Some(StrCmpOp::Eq),
        "<>" | "!=" => Some(StrCmpOp::Ne),
        "<" => Some(StrCmpOp::Lt),
        "<=" => Some(StrCmpOp::Le),
        ">" => Some(StrCmpOp::Gt),
        ">=" => Some(StrCmpOp::Ge),
        "in" => Some(StrCmpOp::In),
        _ => None,
    }
}

/// Reverse pass: every `string op string` triple collapses into a single
/// boolean-valued comparison word owned by the constants list.
fn fuse_string_compares(tokens: &mut Vec<WordId>, store: &mut WordStore) -> Result<()> {
    if tokens.len() < 3 {
        return Ok(());
    }
    let mut mid = tokens.len() - 2;
    while mid >= 1 && tokens.len() >= 3 {
        // a fusion shrinks the list; keep the scan window in bounds
        if mid + 1 >= tokens.len() {
            mid -= 1;
            continue;
        }
        let left = store.word(tokens[mid - 1]);
        let op_word = store.word(tokens[mid]);
        let right = store.word(tokens[mid + 1]);
        // Assignment operators never fuse, whatever the dialect spells
        // them as.
        let assigns = matches!(&op_word.kind, WordKind::Function(f) if f.tag == OpTag::Assign);
        if left.is_string_operand() && right.is_string_operand() && op_word.is_operator() && !assigns
        {
            let Some(op) = str_cmp_op(&op_word.name) else {
                return Err(ExprError::Syntax(format!(
                    "operator '{}' is not defined for strings",
                    op_word.name
                )));
            };
            let name = op_word.name.clone();
            let fused = Word::string_compare(
                &name,
                op,
                str_operand(left).expect("string operand"),
                str_operand(right).expect("string operand"),
            );
            let id = store.intern(fused);
            tokens[mid - 1] = id;
            tokens.drain(mid..=mid + 1);
        }
        if mid == 1 {
            break;
        }
        mid -= 1;
    }
    Ok(())
}

/// `in` is defined over strings only; the fusion pass consumes every
/// valid use, so any survivor is a numeric `in`.
fn reject_loose_in(tokens: &[WordId], store: &WordStore) -> Result<()> {
    for id in tokens {
        let word = store.word(*id);
        if word.name == "in" && word.is_operator() {
            return Err(ExprError::Syntax(
                "'in' requires string operands".to_string(),
            ));
        }
    }
    Ok(())
}
