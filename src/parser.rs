//! The tree builder: converts a shaped token list to an operator tree.
//!
//! A recursive scan over token slices. The first top-level operator in a
//! slice becomes a node; the slice before it is the left operand, the
//! slice up to the next operator of looser-or-equal precedence is the
//! right operand, and further operators chain with the finished node as
//! their new left operand. A slice with no top-level operator is either a
//! single leaf or a function call with a parenthesized argument list.

use crate::error::{ExprError, Result};
use crate::program::ExprRec;
use crate::words::{FuncWord, WordId, WordKind, WordStore, MAX_ARGS};

/// Rejects unbalanced bracket nesting before any tree work starts.
pub(crate) fn check_brackets(tokens: &[WordId], store: &WordStore) -> Result<()> {
    let mut depth: i32 = 0;
    for (i, id) in tokens.iter().enumerate() {
        match &store.word(*id).kind {
            WordKind::LeftBracket => depth += 1,
            WordKind::RightBracket => {
                depth -= 1;
                if depth < 0 {
                    return Err(ExprError::UnmatchedBracket(i));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ExprError::UnmatchedBracket(tokens.len()));
    }
    Ok(())
}

pub(crate) struct TreeBuilder<'s> {
    store: &'s WordStore,
    pub nodes: Vec<ExprRec>,
}

impl<'s> TreeBuilder<'s> {
    pub fn new(store: &'s WordStore) -> Self {
        Self {
            store,
            nodes: Vec::new(),
        }
    }

    /// Builds the tree for a whole token list and validates every node's
    /// argument slots. Returns the root node.
    pub fn build(&mut self, tokens: &[WordId]) -> Result<usize> {
        let root = self.subtree(tokens)?;
        self.validate(root)?;
        Ok(root)
    }

    fn new_node(&mut self, word: WordId) -> usize {
        self.nodes.push(ExprRec::new(word));
        self.nodes.len() - 1
    }

    fn func(&self, id: WordId) -> Result<FuncWord> {
        match &self.store.word(id).kind {
            WordKind::Function(f) => Ok(f.clone()),
            _ => Err(ExprError::Syntax("cannot find operand".to_string())),
        }
    }

    fn subtree(&mut self, span: &[WordId]) -> Result<usize> {
        let span = self.strip_outer_brackets(span)?;
        match span {
            [] => Err(ExprError::Syntax("cannot find operand".to_string())),
            [single] => self.leaf(*single),
            _ => match self.next_oper(span, 0, None) {
                None => self.call(span),
                Some(opi) => self.operator_chain(span, opi),
            },
        }
    }

    /// The scan-and-chain loop over a slice whose first top-level operator
    /// sits at `opi`.
    fn operator_chain(&mut self, span: &[WordId], mut opi: usize) -> Result<usize> {
        let mut left = if opi > 0 {
            Some(self.subtree(&span[..opi])?)
        } else {
            None
        };
        loop {
            let f = self.func(span[opi])?;
            let node = self.new_node(span[opi]);
            let mut slot = 0;
            if let Some(l) = left {
                if f.n_args == 0 {
                    return Err(ExprError::Syntax(format!(
                        "missing operator before '{}'",
                        self.store.word(span[opi]).name
                    )));
                }
                self.nodes[node].arg_trees[0] = Some(l);
                slot = 1;
            }
            let next = self.next_oper(span, opi + 1, Some(f.precedence));
            let end = next.unwrap_or(span.len());
            let rhs = &span[opi + 1..end];
            if slot < f.n_args {
                if rhs.is_empty() {
                    return Err(ExprError::Syntax("cannot find operand".to_string()));
                }
                let right = self.subtree(rhs)?;
                self.nodes[node].arg_trees[slot] = Some(right);
            } else if !rhs.is_empty() {
                return Err(ExprError::Syntax(format!(
                    "missing operator after '{}'",
                    self.store.word(span[opi]).name
                )));
            }
            match next {
                None => return Ok(node),
                Some(n) => {
                    left = Some(node);
                    opi = n;
                }
            }
        }
    }

    /// Single-token leaf: a constant, a variable, a fused string
    /// comparison, or a zero-argument function.
    fn leaf(&mut self, id: WordId) -> Result<usize> {
        let word = self.store.word(id);
        match &word.kind {
            WordKind::Constant { .. }
            | WordKind::Variable { .. }
            | WordKind::StringCompare(_) => Ok(self.new_node(id)),
            WordKind::Function(f) if f.n_args == 0 && !f.is_operator => Ok(self.new_node(id)),
            WordKind::StringConstant { .. } | WordKind::StringVariable { .. } => {
                Err(ExprError::Syntax(format!(
                    "string '{}' is only valid in comparisons",
                    word.name
                )))
            }
            _ => Err(ExprError::Syntax("cannot find operand".to_string())),
        }
    }

    /// `name ( args )` covering the whole slice. Argument spans are split
    /// on top-level separators and built recursively.
    fn call(&mut self, span: &[WordId]) -> Result<usize> {
        let f = match &self.store.word(span[0]).kind {
            WordKind::Function(f) if !f.is_operator => f.clone(),
            _ => {
                return Err(ExprError::Syntax(format!(
                    "missing operator near '{}'",
                    self.store.word(span[0]).name
                )));
            }
        };
        let name = self.store.word(span[0]).name.clone();
        if span.len() < 3 || !matches!(&self.store.word(span[1]).kind, WordKind::LeftBracket) {
            return Err(ExprError::Syntax(format!(
                "expected '(' after function '{}'",
                name
            )));
        }
        let close = self.matching_bracket(span, 1)?;
        if close != span.len() - 1 {
            return Err(ExprError::Syntax(format!(
                "missing operator after '{}(...)'",
                name
            )));
        }
        let inner = &span[2..span.len() - 1];
        let pieces = self.split_arguments(inner);
        if pieces.len() != f.n_args || f.n_args > MAX_ARGS {
            return Err(ExprError::InvalidFunctionCall {
                name,
                expected: f.n_args,
                found: pieces.len(),
            });
        }
        let node = self.new_node(span[0]);
        for (k, piece) in pieces.into_iter().enumerate() {
            let arg = self.subtree(piece)?;
            self.nodes[node].arg_trees[k] = Some(arg);
        }
        Ok(node)
    }

    fn split_arguments<'t>(&self, inner: &'t [WordId]) -> Vec<&'t [WordId]> {
        if inner.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        let mut depth = 0i32;
        let mut start = 0;
        for (i, id) in inner.iter().enumerate() {
            match &self.store.word(*id).kind {
                WordKind::LeftBracket => depth += 1,
                WordKind::RightBracket => depth -= 1,
                WordKind::Separator if depth == 0 => {
                    pieces.push(&inner[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        pieces.push(&inner[start..]);
        pieces
    }

    /// Strips `( ... )` pairs that enclose the entire slice.
    fn strip_outer_brackets<'t>(&self, mut span: &'t [WordId]) -> Result<&'t [WordId]> {
        while span.len() >= 2
            && matches!(&self.store.word(span[0]).kind, WordKind::LeftBracket)
            && self.matching_bracket(span, 0)? == span.len() - 1
        {
            span = &span[1..span.len() - 1];
        }
        Ok(span)
    }

    fn matching_bracket(&self, span: &[WordId], open: usize) -> Result<usize> {
        let mut depth = 0i32;
        for (i, id) in span.iter().enumerate().skip(open) {
            match &self.store.word(*id).kind {
                WordKind::LeftBracket => depth += 1,
                WordKind::RightBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(ExprError::UnmatchedBracket(open))
    }

    /// First top-level operator at or after `from`. With `min_prec`, only
    /// operators of looser-or-equal binding (numerically greater-or-equal
    /// precedence) are considered, which makes equal-precedence operators
    /// chain left-to-right.
    fn next_oper(&self, span: &[WordId], from: usize, min_prec: Option<u32>) -> Option<usize> {
        let mut depth = 0i32;
        for (i, id) in span.iter().enumerate().skip(from) {
            match &self.store.word(*id).kind {
                WordKind::LeftBracket => depth += 1,
                WordKind::RightBracket => depth -= 1,
                WordKind::Function(f) if depth == 0 && f.is_operator => {
                    if min_prec.map_or(true, |p| f.precedence >= p) {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Every argument slot a word declares must be populated.
    fn validate(&self, id: usize) -> Result<()> {
        let n = self.store.word(self.nodes[id].word).n_args();
        for k in 0..n {
            match self.nodes[id].arg_trees[k] {
                Some(child) => self.validate(child)?,
                None => {
                    return Err(ExprError::Syntax(
                        "function or operand has too few arguments".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
