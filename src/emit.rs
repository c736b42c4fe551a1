//! The topological-walk code generator: turns a session's accumulated DAG
//! into the final `template Main() { .. } component main = Main();` text.
//!
//! The walk is post-order and shares one visited set across the output
//! subtree, every registered extern root, and every constraint operand, so
//! a node shared between several of those (§8 E6's DAG-sharing case)
//! contributes exactly one declaration and one statement.

use std::collections::HashSet;

use itertools::Itertools;

use crate::error::DslError;
use crate::expr::Expr;
use crate::externs::component_name_of;
use crate::node::{ExternBinding, NodeId, NodeKind, World};
use crate::session::Session;

struct Emitter<'a> {
    session: &'a Session,
    output_id: NodeId,
    visited: HashSet<NodeId>,
    declarations: Vec<String>,
    statements: Vec<String>,
}

impl<'a> Emitter<'a> {
    fn full_name_of(&self, id: NodeId) -> String {
        self.session.0.borrow().node(id).full_name.clone()
    }

    fn visit(&mut self, id: NodeId) {
        if !self.visited.insert(id) {
            return;
        }
        let (kind, children, passthrough, full_name) = {
            let inner = self.session.0.borrow();
            let node = inner.node(id);
            (
                node.kind.clone(),
                node.children.clone(),
                node.passthrough,
                node.full_name.clone(),
            )
        };
        for child in &children {
            self.visit(*child);
        }
        if !passthrough && id != self.output_id {
            self.declarations.push(declaration_for(&kind, &full_name));
        }
        self.emit_statements(&kind, &children, &full_name);
    }

    fn binary_stmt(&self, children: &[NodeId], full_name: &str, bind: &str, op: &str) -> String {
        let l = self.full_name_of(children[0]);
        let r = self.full_name_of(children[1]);
        format!("{full_name} {bind} {l} {op} {r};")
    }

    fn emit_statements(&mut self, kind: &NodeKind, children: &[NodeId], full_name: &str) {
        match kind {
            NodeKind::Add => {
                let s = self.binary_stmt(children, full_name, "<==", "+");
                self.statements.push(s);
            }
            NodeKind::Sub => {
                let s = self.binary_stmt(children, full_name, "<==", "-");
                self.statements.push(s);
            }
            NodeKind::Mul => {
                let s = self.binary_stmt(children, full_name, "<==", "*");
                self.statements.push(s);
            }
            NodeKind::VarAdd => {
                let s = self.binary_stmt(children, full_name, "<--", "+");
                self.statements.push(s);
            }
            NodeKind::VarSub => {
                let s = self.binary_stmt(children, full_name, "<--", "-");
                self.statements.push(s);
            }
            NodeKind::VarMul => {
                let s = self.binary_stmt(children, full_name, "<--", "*");
                self.statements.push(s);
            }
            NodeKind::VarDiv => {
                let s = self.binary_stmt(children, full_name, "<--", "/");
                self.statements.push(s);
            }
            NodeKind::VarMod => {
                let s = self.binary_stmt(children, full_name, "<--", "%");
                self.statements.push(s);
            }
            NodeKind::VarEq => {
                let s = self.binary_stmt(children, full_name, "<--", "==");
                self.statements.push(s);
            }
            NodeKind::VarNeq => {
                let s = self.binary_stmt(children, full_name, "<--", "!=");
                self.statements.push(s);
            }
            NodeKind::VarAnd => {
                let s = self.binary_stmt(children, full_name, "<--", "&&");
                self.statements.push(s);
            }
            NodeKind::VarCond => {
                let pred = self.full_name_of(children[0]);
                let t = self.full_name_of(children[1]);
                let f = self.full_name_of(children[2]);
                self.statements.push(format!(
                    "if ({pred} == 1) {{ {full_name} <-- {t}; }} else {{ {full_name} <-- {f}; }}"
                ));
            }
            NodeKind::IdentityOp => {
                let child = self.full_name_of(children[0]);
                self.statements.push(format!("{full_name} <== {child};"));
            }
            NodeKind::ExternOp {
                template,
                args,
                component_name,
                bindings,
            } => {
                let arg_list = args.iter().map(i64::to_string).join(", ");
                self.statements
                    .push(format!("component {component_name} = {template}({arg_list});"));
                for binding in bindings {
                    match binding {
                        ExternBinding::Scalar { field, operand } => {
                            let operand_name = self.full_name_of(*operand);
                            self.statements
                                .push(format!("{component_name}.{field} <== {operand_name};"));
                        }
                        ExternBinding::Vector { field, operands } => {
                            for (i, operand) in operands.iter().enumerate() {
                                let operand_name = self.full_name_of(*operand);
                                self.statements.push(format!(
                                    "{component_name}.{field}[{i}] <== {operand_name};"
                                ));
                            }
                        }
                        ExternBinding::ArrayWired {
                            field,
                            width,
                            source_extern,
                            source_field,
                        } => {
                            let source_component = component_name_of(self.session, *source_extern);
                            self.statements.push(format!(
                                "for (var i__ = 0; i__ < {width}; i__++) {{ {component_name}.{field}[i__] <== {source_component}.{source_field}[i__] }}"
                            ));
                        }
                    }
                }
            }
            NodeKind::Input { .. }
            | NodeKind::Constant { .. }
            | NodeKind::Detachment
            | NodeKind::Attachment
            | NodeKind::ExternOutput { .. }
            | NodeKind::ExternArray { .. }
            | NodeKind::ExternArrayElem { .. } => {}
        }
    }
}

fn declaration_for(kind: &NodeKind, full_name: &str) -> String {
    match kind {
        NodeKind::Input { private: true } => format!("signal private input {full_name};"),
        NodeKind::Input { private: false } => format!("signal input {full_name};"),
        _ => format!("signal {full_name};"),
    }
}

fn assemble(includes: &[String], declarations: &[String], statements: &[String]) -> String {
    let mut out = String::new();
    for include in includes {
        out.push_str(&format!("include \"{include}\";\n"));
    }
    out.push('\n');
    out.push_str("template Main() {\n");
    for decl in declarations {
        out.push_str("    ");
        out.push_str(decl);
        out.push('\n');
    }
    out.push('\n');
    for stmt in statements {
        out.push_str("    ");
        out.push_str(stmt);
        out.push('\n');
    }
    out.push_str("}\n\ncomponent main = Main();\n");
    out
}

/// Renders `session`'s accumulated DAG into the final circuit text, with
/// `output` as the `signal output` line. See module docs for the walk
/// order; §4.4 for the algorithm this mirrors.
pub(crate) fn generate(session: &Session, output: &Expr) -> Result<String, DslError> {
    let materialized = if output.is_passthrough() {
        let id = session.0.borrow_mut().alloc(
            "out",
            NodeKind::IdentityOp,
            vec![output.id()],
            World::Signal,
        );
        Expr::new(session.clone(), id)
    } else {
        output.clone()
    };

    let mut emitter = Emitter {
        session,
        output_id: materialized.id(),
        visited: HashSet::new(),
        declarations: Vec::new(),
        statements: Vec::new(),
    };
    emitter.visit(materialized.id());

    let roots = session.0.borrow().roots.clone();
    for root in roots {
        emitter.visit(root);
    }

    let constraints = session.0.borrow().constraints.clone();
    for (l, r) in constraints {
        emitter.visit(l);
        emitter.visit(r);
        let l_name = emitter.full_name_of(l);
        let r_name = emitter.full_name_of(r);
        emitter.statements.push(format!("{l_name} === {r_name};"));
    }

    emitter
        .declarations
        .push(format!("signal output {};", materialized.full_name()));

    let includes = session.0.borrow().includes.clone();
    Ok(assemble(&includes, &emitter.declarations, &emitter.statements))
}
