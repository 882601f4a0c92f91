//! The pseudo-compiled program: a linked sequence of operation records.
//!
//! [`ExprRec`] serves two phases. During tree building, `arg_trees` holds
//! child node indices. Linearization flattens the tree post-order into a
//! `first`/`next` chain through the same arena, wiring each record's
//! `args` slots to either a predecessor's `res` scratch or a value cell.
//! Variable and constant leaves vanish in the process: their backing cell
//! becomes the parent's input, so evaluation is one dispatch per
//! remaining record, in list order.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{ExprError, Result};
use crate::words::{Kernel, OpTag, WordId, WordKind, WordStore, MAX_ARGS};
use crate::Real;

/// Handle to an [`ExprRec`] inside a program's arena.
pub type NodeId = usize;

/// An evaluation-time input slot: a predecessor record's scratch cell or
/// a numeric value cell (variable or constant).
#[derive(Clone)]
pub enum Operand {
    None,
    Node(NodeId),
    Value(Rc<Cell<Real>>),
}

/// Dispatch selector of a record.
#[derive(Clone)]
pub enum OpCode {
    /// Copy the value cell in `args[0]` to `res`.
    Load,
    /// Invoke a numeric kernel over the gathered inputs.
    Call(Kernel),
    /// Write the value of `args[1]` through the cell in `args[0]`.
    Assign,
    /// Evaluate the record's fused string comparison.
    StrCompare,
}

/// One cell of the tree and, later, of the linked program.
pub struct ExprRec {
    pub word: WordId,
    pub arg_trees: [Option<NodeId>; MAX_ARGS],
    pub args: [Operand; MAX_ARGS],
    pub res: Real,
    pub op: OpCode,
    pub next: Option<NodeId>,
}

fn no_args() -> [Operand; MAX_ARGS] {
    [Operand::None, Operand::None, Operand::None, Operand::None]
}

impl ExprRec {
    pub(crate) fn new(word: WordId) -> Self {
        ExprRec {
            word,
            arg_trees: [None; MAX_ARGS],
            args: no_args(),
            res: 0.0,
            op: OpCode::Load,
            next: None,
        }
    }

    pub(crate) fn reset_to_constant(&mut self, word: WordId, cell: Rc<Cell<Real>>, value: Real) {
        self.word = word;
        self.arg_trees = [None; MAX_ARGS];
        self.args = no_args();
        self.args[0] = Operand::Value(cell);
        self.op = OpCode::Load;
        self.next = None;
        self.res = value;
    }
}

/// Head and tail of a chain under construction.
pub(crate) struct Chain {
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
}

impl Chain {
    pub fn new() -> Self {
        Chain {
            first: None,
            last: None,
        }
    }
}

fn push_chain(nodes: &mut [ExprRec], chain: &mut Chain, id: NodeId) {
    nodes[id].next = None;
    match chain.last {
        Some(last) => nodes[last].next = Some(id),
        None => chain.first = Some(id),
    }
    chain.last = Some(id);
}

/// Post-order linearization of the subtree rooted at `id` onto `chain`.
/// Returns the operand the parent should read: a value cell for vanished
/// variable/constant leaves, the node's own `res` otherwise.
pub(crate) fn link(
    nodes: &mut [ExprRec],
    store: &WordStore,
    id: NodeId,
    chain: &mut Chain,
) -> Result<Operand> {
    let kind = store.word(nodes[id].word).kind.clone();
    match kind {
        WordKind::Variable { cell, .. } | WordKind::Constant { cell, .. } => {
            Ok(Operand::Value(cell))
        }
        WordKind::StringConstant { .. } | WordKind::StringVariable { .. } => Err(
            ExprError::Syntax("string operand outside a string comparison".to_string()),
        ),
        WordKind::StringCompare(_) => {
            nodes[id].op = OpCode::StrCompare;
            push_chain(nodes, chain, id);
            Ok(Operand::Node(id))
        }
        WordKind::Function(f) => {
            if f.tag == OpTag::Assign {
                let target = nodes[id].arg_trees[0].ok_or_else(too_few)?;
                if !matches!(
                    &store.word(nodes[target].word).kind,
                    WordKind::Variable { .. }
                ) {
                    return Err(ExprError::Syntax(
                        "assignment target must be a variable".to_string(),
                    ));
                }
            }
            for k in 0..f.n_args {
                let child = nodes[id].arg_trees[k].take().ok_or_else(too_few)?;
                let operand = link(nodes, store, child, chain)?;
                nodes[id].args[k] = operand;
            }
            nodes[id].op = if f.tag == OpTag::Assign {
                OpCode::Assign
            } else {
                OpCode::Call(f.kernel.clone())
            };
            push_chain(nodes, chain, id);
            Ok(Operand::Node(id))
        }
        _ => Err(ExprError::Syntax("cannot find operand".to_string())),
    }
}

fn too_few() -> ExprError {
    ExprError::Syntax("function or operand has too few arguments".to_string())
}

/// Walks a chain, dispatching one operation per record. Non-finite kernel
/// results abort with a math error naming the word.
pub(crate) fn run_walk(
    nodes: &mut [ExprRec],
    store: &WordStore,
    first: Option<NodeId>,
) -> Result<()> {
    let mut cur = first;
    while let Some(i) = cur {
        let word = store.word(nodes[i].word);
        let n = word.n_args();
        let mut vals = [0.0; MAX_ARGS];
        for (k, val) in vals.iter_mut().enumerate().take(n) {
            *val = match &nodes[i].args[k] {
                Operand::Node(j) => nodes[*j].res,
                Operand::Value(cell) => cell.get(),
                Operand::None => Real::NAN,
            };
        }
        let res = match &nodes[i].op {
            OpCode::Load => match &nodes[i].args[0] {
                Operand::Value(cell) => cell.get(),
                _ => Real::NAN,
            },
            OpCode::Call(kernel) => {
                let r = kernel(&vals[..n]);
                if !r.is_finite() {
                    return Err(ExprError::Math {
                        op: word.name.clone(),
                    });
                }
                r
            }
            OpCode::Assign => match &nodes[i].args[0] {
                Operand::Value(cell) => {
                    cell.set(vals[1]);
                    vals[1]
                }
                _ => {
                    return Err(ExprError::Syntax(
                        "assignment target must be a variable".to_string(),
                    ));
                }
            },
            OpCode::StrCompare => match &word.kind {
                WordKind::StringCompare(cmp) => cmp.eval(),
                _ => Real::NAN,
            },
        };
        nodes[i].res = res;
        cur = nodes[i].next;
    }
    Ok(())
}

/// A compiled expression: the record arena, the execution chain and the
/// slot holding the final value.
pub struct Program {
    nodes: Vec<ExprRec>,
    first: Option<NodeId>,
    result: Operand,
    boolean: bool,
}

impl Program {
    /// True when the terminal word carries boolean semantics.
    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    /// Evaluates the program. Reuses the per-record scratch cells, so a
    /// program must not be run from two threads at once.
    pub fn run(&mut self, store: &WordStore) -> Result<Real> {
        run_walk(&mut self.nodes, store, self.first)?;
        Ok(match &self.result {
            Operand::Node(i) => self.nodes[*i].res,
            Operand::Value(cell) => cell.get(),
            Operand::None => Real::NAN,
        })
    }

    /// Word names of the chain in execution order. Introspection for
    /// hosts and tests; an expression reduced to a plain variable has an
    /// empty chain.
    pub fn op_names(&self, store: &WordStore) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = self.first;
        while let Some(i) = cur {
            out.push(store.word(self.nodes[i].word).name.clone());
            cur = self.nodes[i].next;
        }
        out
    }

    /// Redirects every reference to a replaced word: dispatch for records
    /// built from it, and input slots aimed at its backing cell.
    pub(crate) fn rewire(
        &mut self,
        old_word: WordId,
        new_op: Option<&OpCode>,
        old_cell: Option<&Rc<Cell<Real>>>,
        new_cell: Option<&Rc<Cell<Real>>>,
    ) {
        for node in &mut self.nodes {
            if node.word == old_word {
                if let Some(op) = new_op {
                    node.op = op.clone();
                }
            }
            for arg in &mut node.args {
                let hit = match (&*arg, old_cell) {
                    (Operand::Value(cell), Some(old)) => Rc::ptr_eq(cell, old),
                    _ => false,
                };
                if hit {
                    if let Some(new) = new_cell {
                        *arg = Operand::Value(new.clone());
                    }
                }
            }
        }
        let hit = match (&self.result, old_cell) {
            (Operand::Value(cell), Some(old)) => Rc::ptr_eq(cell, old),
            _ => false,
        };
        if hit {
            if let Some(new) = new_cell {
                self.result = Operand::Value(new.clone());
            }
        }
    }
}

/// Assembles the final program for a tree. A bare variable yields the
/// null-head program reading the cell directly; a bare constant still
/// emits one `Load` record so the program is non-empty.
pub(crate) fn assemble(mut nodes: Vec<ExprRec>, store: &WordStore, root: NodeId) -> Result<Program> {
    let word = store.word(nodes[root].word);
    let boolean = word.is_boolean();
    match &word.kind {
        WordKind::Variable { cell, .. } => Ok(Program {
            nodes: Vec::new(),
            first: None,
            result: Operand::Value(cell.clone()),
            boolean,
        }),
        WordKind::Constant { cell, .. } => {
            let mut record = ExprRec::new(nodes[root].word);
            record.args[0] = Operand::Value(cell.clone());
            record.op = OpCode::Load;
            Ok(Program {
                nodes: vec![record],
                first: Some(0),
                result: Operand::Node(0),
                boolean,
            })
        }
        _ => {
            let mut chain = Chain::new();
            let result = link(&mut nodes, store, root, &mut chain)?;
            Ok(Program {
                nodes,
                first: chain.first,
                result,
                boolean,
            })
        }
    }
}
