//! The builder surface: a single handle type, [`Expr`], representing any
//! value in the DAG, plus the operators and named methods that build new
//! nodes from existing ones.
//!
//! Two-world dispatch (§4.1 of the design) is a small table evaluated at
//! each call: `signal ⊕ signal → signal`, everything else involving a
//! witness operand → witness. Division and modulo are only defined once
//! at least one side is already witness-world — there is no signal-world
//! division, by construction, so you must `detach` the dividend first.

use std::ops;

use crate::error::DslError;
use crate::node::{NodeId, NodeKind, World};
use crate::session::Session;

/// A handle to one node in a session's DAG. Cheap to clone (an `Rc` clone
/// plus a `usize`); never valid outside the session that created it.
#[derive(Clone)]
pub struct Expr {
    session: Session,
    id: NodeId,
}

/// Something that can appear on the right of an arithmetic/comparison
/// call: an existing node, or an integer literal to be lifted to a fresh
/// [`crate::node::NodeKind::Constant`].
pub enum Operand {
    Node(Expr),
    Int(i64),
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Node(e)
    }
}

impl From<&Expr> for Operand {
    fn from(e: &Expr) -> Self {
        Operand::Node(e.clone())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Int(v)
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Int(v as i64)
    }
}

pub(crate) fn resolve(operand: impl Into<Operand>, session: &Session) -> Result<Expr, DslError> {
    match operand.into() {
        Operand::Node(e) => {
            if !session.same_session(&e.session) {
                return Err(DslError::SessionMismatch);
            }
            Ok(e)
        }
        Operand::Int(v) => Ok(session.constant(v)),
    }
}

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl Expr {
    pub(crate) fn new(session: Session, id: NodeId) -> Expr {
        Expr { session, id }
    }

    pub(crate) fn session(&self) -> Session {
        self.session.clone()
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    fn short_name(&self) -> String {
        self.session.0.borrow().node(self.id).short_name.clone()
    }

    /// The token that will appear in emitted text for this node.
    pub fn full_name(&self) -> String {
        self.session.0.borrow().node(self.id).full_name.clone()
    }

    /// The algebraic world this value lives in.
    pub fn world(&self) -> World {
        self.session.0.borrow().node(self.id).world
    }

    /// Whether this node contributes its own `signal ...;` declaration.
    pub fn is_passthrough(&self) -> bool {
        self.session.0.borrow().node(self.id).passthrough
    }

    fn arith(&self, other: impl Into<Operand>, op: ArithOp) -> Result<Expr, DslError> {
        let other = resolve(other, &self.session)?;
        let world = if self.world() == World::Signal && other.world() == World::Signal {
            World::Signal
        } else {
            World::Witness
        };
        let (kind, combinator) = match (op, world) {
            (ArithOp::Add, World::Signal) => (NodeKind::Add, "plus"),
            (ArithOp::Add, World::Witness) => (NodeKind::VarAdd, "plus"),
            (ArithOp::Sub, World::Signal) => (NodeKind::Sub, "minus"),
            (ArithOp::Sub, World::Witness) => (NodeKind::VarSub, "minus"),
            (ArithOp::Mul, World::Signal) => (NodeKind::Mul, "times"),
            (ArithOp::Mul, World::Witness) => (NodeKind::VarMul, "times"),
        };
        let short_base = format!("{}_{}_{}", self.short_name(), combinator, other.short_name());
        let id = self
            .session
            .0
            .borrow_mut()
            .alloc(&short_base, kind, vec![self.id, other.id], world);
        Ok(Expr::new(self.session.clone(), id))
    }

    /// Signal-world `out <== L + R;` if both operands are signal-world,
    /// witness-world `out <-- L + R;` otherwise.
    pub fn add(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.arith(other, ArithOp::Add)
    }

    /// See [`Expr::add`]; subtraction.
    pub fn sub(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.arith(other, ArithOp::Sub)
    }

    /// See [`Expr::add`]; multiplication.
    pub fn mul(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.arith(other, ArithOp::Mul)
    }

    fn div_like(
        &self,
        other: impl Into<Operand>,
        kind: NodeKind,
        combinator: &str,
        op_name: &str,
    ) -> Result<Expr, DslError> {
        let other = resolve(other, &self.session)?;
        if self.world() != World::Witness && other.world() != World::Witness {
            return Err(DslError::WorldMismatch(format!(
                "{op_name} requires at least one operand to be witness-world; detach the dividend first"
            )));
        }
        let short_base = format!("{}_{}_{}", self.short_name(), combinator, other.short_name());
        let id = self.session.0.borrow_mut().alloc(
            &short_base,
            kind,
            vec![self.id, other.id],
            World::Witness,
        );
        Ok(Expr::new(self.session.clone(), id))
    }

    /// Witness-world division: `out <-- L / R;`. At least one of `self`/
    /// `other` must already be witness-world (division has no signal-world
    /// form — detach the dividend to enter witness world first).
    pub fn div(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.div_like(other, NodeKind::VarDiv, "div", "division")
    }

    /// Witness-world modulo: `out <-- L % R;`. Same witness requirement as
    /// [`Expr::div`].
    pub fn rem(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.div_like(other, NodeKind::VarMod, "mod", "modulo")
    }

    fn comparison(
        &self,
        other: impl Into<Operand>,
        kind: NodeKind,
        combinator: &str,
        op_name: &str,
    ) -> Result<Expr, DslError> {
        if self.world() != World::Witness {
            return Err(DslError::WorldMismatch(format!(
                "{op_name} is only defined on a witness-world left-hand operand"
            )));
        }
        let other = resolve(other, &self.session)?;
        let short_base = format!("{}_{}_{}", self.short_name(), combinator, other.short_name());
        let id = self.session.0.borrow_mut().alloc(
            &short_base,
            kind,
            vec![self.id, other.id],
            World::Witness,
        );
        Ok(Expr::new(self.session.clone(), id))
    }

    /// Witness-world equality test: `out <-- L == R;`.
    pub fn var_eq(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.comparison(other, NodeKind::VarEq, "eq", "equality comparison")
    }

    /// Witness-world inequality test: `out <-- L != R;`.
    pub fn var_neq(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.comparison(other, NodeKind::VarNeq, "neq", "inequality comparison")
    }

    /// Witness-world logical and: `out <-- L && R;`.
    pub fn var_and(&self, other: impl Into<Operand>) -> Result<Expr, DslError> {
        self.comparison(other, NodeKind::VarAnd, "and", "logical and")
    }

    /// Re-labels a signal-world node as witness-world. Passthrough: no
    /// declaration, no statement, same `full_name` as `self`.
    pub fn detach(&self) -> Result<Expr, DslError> {
        if self.world() != World::Signal {
            return Err(DslError::WorldMismatch(
                "detach requires a signal-world operand".to_string(),
            ));
        }
        let (short_name, full_name) = {
            let inner = self.session.0.borrow();
            let node = inner.node(self.id);
            (node.short_name.clone(), node.full_name.clone())
        };
        let id = self.session.0.borrow_mut().alloc_passthrough(
            short_name,
            full_name,
            NodeKind::Detachment,
            vec![self.id],
            World::Witness,
        );
        Ok(Expr::new(self.session.clone(), id))
    }

    /// Re-labels a witness-world node as signal-world. Passthrough: no
    /// declaration, no statement, same `full_name` as `self`.
    pub fn attach(&self) -> Result<Expr, DslError> {
        if self.world() != World::Witness {
            return Err(DslError::WorldMismatch(
                "attach requires a witness-world operand".to_string(),
            ));
        }
        let (short_name, full_name) = {
            let inner = self.session.0.borrow();
            let node = inner.node(self.id);
            (node.short_name.clone(), node.full_name.clone())
        };
        let id = self.session.0.borrow_mut().alloc_passthrough(
            short_name,
            full_name,
            NodeKind::Attachment,
            vec![self.id],
            World::Signal,
        );
        Ok(Expr::new(self.session.clone(), id))
    }

    /// Records `self === other;` in the session's constraint list. Both
    /// sides must be signal-world; integer literals on `other` are lifted
    /// to a `Constant`.
    pub fn check_equals(&self, other: impl Into<Operand>) -> Result<(), DslError> {
        if self.world() != World::Signal {
            return Err(DslError::WorldMismatch(
                "check_equals requires a signal-world left-hand operand".to_string(),
            ));
        }
        let other = resolve(other, &self.session)?;
        if other.world() != World::Signal {
            return Err(DslError::WorldMismatch(
                "check_equals requires a signal-world right-hand operand".to_string(),
            ));
        }
        self.session
            .0
            .borrow_mut()
            .constraints
            .push((self.id, other.id));
        Ok(())
    }
}

macro_rules! impl_fallible_op {
    ($trait_:ident, $method:ident, $via:ident) => {
        impl ops::$trait_<Expr> for Expr {
            type Output = Result<Expr, DslError>;
            fn $method(self, rhs: Expr) -> Self::Output {
                Expr::$via(&self, rhs)
            }
        }
        impl ops::$trait_<i64> for Expr {
            type Output = Result<Expr, DslError>;
            fn $method(self, rhs: i64) -> Self::Output {
                Expr::$via(&self, rhs)
            }
        }
        impl ops::$trait_<&Expr> for &Expr {
            type Output = Result<Expr, DslError>;
            fn $method(self, rhs: &Expr) -> Self::Output {
                Expr::$via(self, rhs)
            }
        }
    };
}

impl_fallible_op!(Add, add, add);
impl_fallible_op!(Sub, sub, sub);
impl_fallible_op!(Mul, mul, mul);
impl_fallible_op!(Div, div, div);
impl_fallible_op!(Rem, rem, rem);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn world_propagation_picks_signal_only_when_both_sides_are() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let b = s.input("b", false).unwrap();
        assert_eq!(a.add(&b).unwrap().world(), World::Signal);

        let w = a.detach().unwrap();
        assert_eq!(a.add(&w).unwrap().world(), World::Witness);
        assert_eq!(w.add(&b).unwrap().world(), World::Witness);
    }

    #[test]
    fn detach_requires_signal_world() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let w = a.detach().unwrap();
        assert_eq!(w.detach().unwrap_err(), DslError::WorldMismatch(
            "detach requires a signal-world operand".to_string()
        ));
    }

    #[test]
    fn attach_requires_witness_world() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        assert_eq!(a.attach().unwrap_err(), DslError::WorldMismatch(
            "attach requires a witness-world operand".to_string()
        ));
    }

    #[test]
    fn division_requires_a_witness_world_operand() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let b = s.input("b", false).unwrap();
        assert!(matches!(a.div(&b).unwrap_err(), DslError::WorldMismatch(_)));
        // once either side is witness-world, division is allowed.
        assert!(a.detach().unwrap().div(&b).is_ok());
    }

    #[test]
    fn comparisons_require_a_witness_world_left_operand() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let b = s.input("b", false).unwrap();
        assert!(matches!(a.var_eq(&b).unwrap_err(), DslError::WorldMismatch(_)));
        assert!(a.detach().unwrap().var_eq(&b).is_ok());
    }

    #[test]
    fn check_equals_requires_signal_world_on_both_sides() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let w = a.detach().unwrap();
        assert!(matches!(a.check_equals(&w).unwrap_err(), DslError::WorldMismatch(_)));
        assert!(matches!(w.check_equals(&a).unwrap_err(), DslError::WorldMismatch(_)));
    }

    #[test]
    fn operands_from_different_sessions_are_rejected() {
        let s1 = Session::new();
        let s2 = Session::new();
        let a = s1.input("a", false).unwrap();
        let b = s2.input("b", false).unwrap();
        assert_eq!(a.add(&b).unwrap_err(), DslError::SessionMismatch);
    }

    #[test]
    fn integer_literals_are_lifted_to_signal_world_constants() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let sum = a.add(5).unwrap();
        assert_eq!(sum.world(), World::Signal);
    }

    #[test]
    fn detach_and_attach_are_passthrough_and_preserve_the_full_name() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let w = a.detach().unwrap();
        assert!(w.is_passthrough());
        assert_eq!(w.full_name(), a.full_name());

        let back = w.attach().unwrap();
        assert!(back.is_passthrough());
        assert_eq!(back.full_name(), a.full_name());
    }
}
