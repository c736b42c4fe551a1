//! The session: a process-local workspace owning the node arena and the
//! two name registries (signals, component instances).
//!
//! A [`Session`] is a cheap-to-clone handle (an `Rc<RefCell<_>>>` around
//! the actual arena) so that [`Expr`](crate::expr::Expr) values can carry
//! their owning session along without borrowing from it. This mirrors the
//! non-goal of concurrent session use directly in the type: neither
//! `Session` nor `Expr` is `Send` or `Sync`, so a session can never
//! silently end up shared across threads.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use log::trace;

use crate::emit;
use crate::error::DslError;
use crate::expr::Expr;
use crate::node::{NodeData, NodeId, NodeKind, World};

pub(crate) struct SessionInner {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) names: HashSet<String>,
    pub(crate) component_names: HashSet<String>,
    pub(crate) constraints: Vec<(NodeId, NodeId)>,
    /// Every `ExternOp` is recorded here so its statements are emitted even
    /// when no path from the requested output reaches it (§4.3, §9).
    pub(crate) roots: Vec<NodeId>,
    pub(crate) includes: Vec<String>,
    includes_seen: HashSet<String>,
}

impl SessionInner {
    fn new() -> Self {
        SessionInner {
            nodes: Vec::new(),
            names: HashSet::new(),
            component_names: HashSet::new(),
            constraints: Vec::new(),
            roots: Vec::new(),
            includes: Vec::new(),
            includes_seen: HashSet::new(),
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// Claims a unique full name of the form `{base}__`, `{base}_0__`,
    /// `{base}_1__`, ... and registers it. Returns `(short_name, full_name)`.
    fn claim_signal_name(&mut self, base: &str) -> (String, String) {
        let mut candidate_full = format!("{base}__");
        if !self.names.contains(&candidate_full) {
            self.names.insert(candidate_full.clone());
            return (base.to_string(), candidate_full);
        }
        trace!("name `{candidate_full}` taken, resolving collision with a suffix");
        let mut suffix = 0u64;
        loop {
            let candidate_short = format!("{base}_{suffix}");
            candidate_full = format!("{candidate_short}__");
            if !self.names.contains(&candidate_full) {
                self.names.insert(candidate_full.clone());
                return (candidate_short, candidate_full);
            }
            suffix += 1;
        }
    }

    /// Allocates a non-passthrough node: registers a unique full name
    /// derived from `short_base` and pushes the node into the arena.
    pub(crate) fn alloc(
        &mut self,
        short_base: &str,
        kind: NodeKind,
        children: Vec<NodeId>,
        world: World,
    ) -> NodeId {
        let (short_name, full_name) = self.claim_signal_name(short_base);
        self.nodes.push(NodeData {
            kind,
            children,
            world,
            passthrough: false,
            short_name,
            full_name,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Allocates a passthrough node: no name registration, caller supplies
    /// both names directly (typically derived from, or delegated to, a
    /// child).
    pub(crate) fn alloc_passthrough(
        &mut self,
        short_name: String,
        full_name: String,
        kind: NodeKind,
        children: Vec<NodeId>,
        world: World,
    ) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            children,
            world,
            passthrough: true,
            short_name,
            full_name,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Claims `"{template}_{k}"` for the smallest non-negative `k` that is
    /// free in the component-name registry, which is disjoint from the
    /// signal-name registry.
    pub(crate) fn claim_component_name(&mut self, template: &str) -> String {
        let mut suffix = 0u64;
        loop {
            let candidate = format!("{template}_{suffix}");
            if !self.component_names.contains(&candidate) {
                self.component_names.insert(candidate.clone());
                return candidate;
            }
            suffix += 1;
        }
    }

    pub(crate) fn add_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    fn record_include(&mut self, path: String) {
        if self.includes_seen.insert(path.clone()) {
            self.includes.push(path);
        }
    }
}

/// The builder's entry point. Create one with [`Session::new`], build up a
/// DAG of [`Expr`] values against it, then call [`Session::generate`] once
/// to obtain the emitted circuit text.
#[derive(Clone)]
pub struct Session(pub(crate) Rc<RefCell<SessionInner>>);

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a fresh, empty session.
    pub fn new() -> Self {
        Session(Rc::new(RefCell::new(SessionInner::new())))
    }

    pub(crate) fn same_session(&self, other: &Session) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Declares a named input signal. `private` marks it `signal private
    /// input`; otherwise it is a public input.
    ///
    /// Fails with [`DslError::NameClash`] if `name` was already claimed by
    /// any node in this session (another input, or an intermediate whose
    /// full name happens to collide with a raw input name).
    pub fn input(&self, name: impl Into<String>, private: bool) -> Result<Expr, DslError> {
        let name = name.into();
        let mut inner = self.0.borrow_mut();
        if inner.names.contains(&name) {
            return Err(DslError::NameClash(name));
        }
        inner.names.insert(name.clone());
        let id = inner.alloc_input_node(name.clone(), NodeKind::Input { private }, World::Signal);
        drop(inner);
        Ok(Expr::new(self.clone(), id))
    }

    /// Creates a passthrough integer constant; contributes no declaration.
    pub fn constant(&self, value: i64) -> Expr {
        let mut inner = self.0.borrow_mut();
        let short = format!("c{}", value.unsigned_abs());
        let full = value.to_string();
        let id = inner.alloc_passthrough(short, full, NodeKind::Constant { value }, vec![], World::Signal);
        drop(inner);
        Expr::new(self.clone(), id)
    }

    /// Records an `include "path";` line. Duplicates are coalesced; the
    /// set of includes is otherwise unordered beyond "before `template
    /// Main()`", so insertion order is used for determinism.
    pub fn include(&self, path: impl Into<String>) {
        self.0.borrow_mut().record_include(path.into());
    }

    /// A witness-world ternary: `if (pred == 1) { .. <-- t; } else { ..
    /// <-- f; }`. `pred`, `t`, and `f` may be signal- or witness-world;
    /// the result is always witness-world.
    pub fn cond(
        &self,
        pred: &Expr,
        t: &Expr,
        f: &Expr,
    ) -> Result<Expr, DslError> {
        for operand in [pred, t, f] {
            if !self.same_session(&operand.session()) {
                return Err(DslError::SessionMismatch);
            }
        }
        let mut inner = self.0.borrow_mut();
        let short_base = format!("if_{}", inner.node(pred.id()).short_name);
        let id = inner.alloc(
            &short_base,
            NodeKind::VarCond,
            vec![pred.id(), t.id(), f.id()],
            World::Witness,
        );
        drop(inner);
        Ok(Expr::new(self.clone(), id))
    }

    /// Walks the DAG rooted at `output` (plus every registered extern
    /// root, plus every constraint operand) exactly once and renders the
    /// final circuit text.
    ///
    /// Fails with [`DslError::UnreachableOutput`] if `output` was not
    /// built against this session.
    pub fn generate(&self, output: &Expr) -> Result<String, DslError> {
        if !self.same_session(&output.session()) {
            return Err(DslError::UnreachableOutput);
        }
        trace!(
            "generate: {} node(s), {} constraint(s), {} extern root(s)",
            self.0.borrow().nodes.len(),
            self.0.borrow().constraints.len(),
            self.0.borrow().roots.len(),
        );
        emit::generate(self, output)
    }
}

impl SessionInner {
    /// Used only for `Input`: the full name is the raw name itself (no
    /// `__` suffix, no collision loop — `Session::input` already enforces
    /// hard uniqueness before calling this). Inputs are *not* passthrough:
    /// they contribute their own `signal input ...;` declaration.
    fn alloc_input_node(
        &mut self,
        name: String,
        kind: NodeKind,
        world: World,
    ) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            children: vec![],
            world,
            passthrough: false,
            short_name: name.clone(),
            full_name: name,
        });
        NodeId(self.nodes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DslError;

    #[test]
    fn duplicate_input_names_are_rejected() {
        let s = Session::new();
        s.input("a", false).unwrap();
        assert_eq!(s.input("a", false).unwrap_err(), DslError::NameClash("a".to_string()));
    }

    #[test]
    fn generate_rejects_an_output_from_another_session() {
        let s1 = Session::new();
        let s2 = Session::new();
        let a = s2.input("a", false).unwrap();
        assert_eq!(s1.generate(&a).unwrap_err(), DslError::UnreachableOutput);
    }

    #[test]
    fn cond_rejects_operands_from_another_session() {
        let s1 = Session::new();
        let s2 = Session::new();
        let pred = s1.input("p", false).unwrap().detach().unwrap();
        let t = s1.input("t", false).unwrap().detach().unwrap();
        let f = s2.input("f", false).unwrap().detach().unwrap();
        assert_eq!(s1.cond(&pred, &t, &f).unwrap_err(), DslError::SessionMismatch);
    }

    #[test]
    fn includes_are_deduplicated_and_keep_insertion_order() {
        let s = Session::new();
        s.include("a.circom");
        s.include("b.circom");
        s.include("a.circom");
        assert_eq!(s.0.borrow().includes, vec!["a.circom".to_string(), "b.circom".to_string()]);
    }

    #[test]
    fn colliding_short_names_get_suffixed_until_unique() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let x1 = a.add(&a).unwrap();
        let x2 = a.add(&a).unwrap();
        assert_ne!(x1.full_name(), x2.full_name());
        assert_eq!(x1.full_name(), "a_plus_a__");
        assert_eq!(x2.full_name(), "a_plus_a_0__");
    }

    #[test]
    fn input_full_name_is_the_raw_name_with_no_suffix() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        assert_eq!(a.full_name(), "a");
    }
}
