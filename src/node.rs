//! The DAG node model: the tagged-variant representation of every value
//! that can appear in a circuit under construction.
//!
//! Nodes never mutate after creation and never cross session boundaries;
//! a [`Session`](crate::session::Session) owns an arena of them and hands
//! out [`NodeId`] indices to callers wrapped in [`Expr`](crate::expr::Expr)
//! handles.

use std::fmt;

/// A stable index into a session's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// The algebraic world a node's value lives in. Operators combine worlds
/// according to a small table (see [`crate::expr`]); `detach`/`attach` are
/// the only explicit coercions between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum World {
    /// A circuit signal, bound by `<==`/`===`.
    Signal,
    /// An off-circuit witness value, bound by `<--`.
    Witness,
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            World::Signal => write!(f, "signal"),
            World::Witness => write!(f, "witness"),
        }
    }
}

/// One bound input to an `ExternOp`: either a single scalar operand, a
/// vector bound element-wise to `n` operands, or a vector wired wholesale
/// from another component's output array.
#[derive(Debug, Clone)]
pub(crate) enum ExternBinding {
    Scalar { field: String, operand: NodeId },
    Vector { field: String, operands: Vec<NodeId> },
    ArrayWired {
        field: String,
        width: usize,
        source_extern: NodeId,
        source_field: String,
    },
}

/// The operator/leaf kind a node represents. Binary and ternary operators
/// reference their operands through `NodeData::children`; this enum only
/// carries data that isn't already a child index.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Input { private: bool },
    Constant { value: i64 },

    Add,
    Sub,
    Mul,

    VarAdd,
    VarSub,
    VarMul,
    VarDiv,
    VarMod,
    VarEq,
    VarNeq,
    VarAnd,
    /// children = [pred, if_true, if_false]
    VarCond,

    /// children = [signal]
    Detachment,
    /// children = [witness]
    Attachment,
    /// children = [inner]
    IdentityOp,

    ExternOp {
        template: String,
        args: Vec<i64>,
        component_name: String,
        bindings: Vec<ExternBinding>,
    },
    /// children = [extern_op]
    ExternOutput { field: String },
    /// children = [extern_op]
    ExternArray { field: String },
    /// children = [extern_op]
    ExternArrayElem { field: String, index: usize },
}

/// A single node in the DAG: its kind, its operand indices, its world,
/// and its two names.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub world: World,
    /// Passthrough nodes contribute no `signal ...;` declaration and are
    /// exempt from name-uniqueness registration.
    pub passthrough: bool,
    /// The operator-derived token used to build names of nodes built atop
    /// this one (never carries the `__` suffix or dotted component path).
    pub short_name: String,
    /// The token that appears in emitted text for this node.
    pub full_name: String,
}
