//! Constant folding: subtrees that cannot vary are evaluated once at
//! compile time and replaced with a constant leaf.
//!
//! A subtree varies when any word in it does: variables, assignment,
//! nondeterministic kernels, string comparisons over string variables.
//! Everything else is linearized into a scratch chain, evaluated, and
//! collapsed to a freshly interned constant that remembers whether the
//! folded value was boolean. Math errors raised here abort the
//! compilation.

use crate::error::Result;
use crate::program::{link, run_walk, Chain, ExprRec};
use crate::words::{Word, WordKind, WordStore, MAX_ARGS};

pub(crate) fn fold_constants(
    nodes: &mut Vec<ExprRec>,
    store: &mut WordStore,
    root: usize,
) -> Result<()> {
    if subtree_varies(nodes, store, root) {
        for k in 0..MAX_ARGS {
            if let Some(child) = nodes[root].arg_trees[k] {
                fold_constants(nodes, store, child)?;
            }
        }
        return Ok(());
    }
    // A bare constant leaf is already as folded as it gets.
    if matches!(&store.word(nodes[root].word).kind, WordKind::Constant { .. }) {
        return Ok(());
    }

    let mut chain = Chain::new();
    link(nodes, store, root, &mut chain)?;
    run_walk(nodes, store, chain.first)?;
    let value = nodes[root].res;
    let boolean = store.word(nodes[root].word).is_boolean();

    let id = store.intern(Word::constant(value, boolean));
    let cell = match &store.word(id).kind {
        WordKind::Constant { cell, .. } => cell.clone(),
        _ => unreachable!(),
    };
    nodes[root].reset_to_constant(id, cell, value);
    Ok(())
}

fn subtree_varies(nodes: &[ExprRec], store: &WordStore, id: usize) -> bool {
    if store.word(nodes[id].word).can_vary() {
        return true;
    }
    (0..MAX_ARGS).any(|k| {
        nodes[id].arg_trees[k]
            .map(|child| subtree_varies(nodes, store, child))
            .unwrap_or(false)
    })
}
