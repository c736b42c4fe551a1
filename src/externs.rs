//! The external-template call protocol: declaring an [`ExternTemplate`]
//! descriptor, binding arguments at a call site, and the three kinds of
//! handle a call can hand back (none, a scalar output, or an indexable
//! output array).

use std::collections::HashMap;

use crate::error::DslError;
use crate::expr::{resolve, Expr, Operand};
use crate::node::{ExternBinding, NodeId, NodeKind, World};
use crate::session::Session;

/// The shape of one declared template input: a single signal, or a fixed-
/// width vector of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Vector(usize),
}

/// The shape of a template's output: none, a single scalar field, or a
/// single vector field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    None,
    Scalar(String),
    Vector(String),
}

/// A validated, reusable descriptor for an external template. Call it with
/// [`ExternTemplate::call`] to instantiate one `component`.
pub struct ExternTemplate {
    session: Session,
    name: String,
    inputs: Vec<(String, Shape)>,
    output: Output,
    args: Vec<i64>,
}

/// How one declared input is bound at a call site.
pub enum InputArg {
    Scalar(Operand),
    Vector(Vec<Operand>),
    Array(ExternArray),
}

impl InputArg {
    pub fn scalar(operand: impl Into<Operand>) -> InputArg {
        InputArg::Scalar(operand.into())
    }

    pub fn vector<I, T>(items: I) -> InputArg
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        InputArg::Vector(items.into_iter().map(Into::into).collect())
    }

    pub fn array(array: ExternArray) -> InputArg {
        InputArg::Array(array)
    }
}

/// A handle to a vector-shaped external-template output, indexable into
/// individual elements and wireable wholesale into a later call's vector
/// input (§4.3's array-to-array wiring).
#[derive(Clone)]
pub struct ExternArray(Expr);

impl ExternArray {
    fn extern_op_and_field(&self) -> (NodeId, String) {
        let inner = self.0.session().0.borrow();
        let node = inner.node(self.0.id());
        let field = match &node.kind {
            NodeKind::ExternArray { field } => field.clone(),
            _ => unreachable!("ExternArray always wraps a NodeKind::ExternArray node"),
        };
        (node.children[0], field)
    }

    /// Addresses `component.field[index]`. No bounds checking is
    /// performed against the external template's actual declared width —
    /// that width is opaque to this library (§4.3, §9).
    pub fn get(&self, index: usize) -> Expr {
        let (extern_op, field) = self.extern_op_and_field();
        let session = self.0.session();
        let component_name = component_name_of(&session, extern_op);
        let full_name = format!("{component_name}.{field}[{index}]");
        let id = session.0.borrow_mut().alloc_passthrough(
            component_name,
            full_name,
            NodeKind::ExternArrayElem {
                field,
                index,
            },
            vec![extern_op],
            World::Signal,
        );
        Expr::new(session, id)
    }
}

/// What an `ExternTemplate::call` hands back, depending on the
/// descriptor's declared output shape.
pub enum CallOutput {
    None,
    Scalar(Expr),
    Array(ExternArray),
}

pub(crate) fn component_name_of(session: &Session, extern_op: NodeId) -> String {
    let inner = session.0.borrow();
    match &inner.node(extern_op).kind {
        NodeKind::ExternOp { component_name, .. } => component_name.clone(),
        _ => unreachable!("extern_op index always points at a NodeKind::ExternOp node"),
    }
}

impl Session {
    /// Declares an external template descriptor. `inputs` is the ordered
    /// signature (name → shape); `output` is the template's output shape;
    /// `args` are the template's integer parameters (e.g. a bit width).
    ///
    /// Fails with [`DslError::BadExternSignature`] if `inputs` declares the
    /// same name twice, or a vector input of width zero.
    pub fn r#extern(
        &self,
        name: impl Into<String>,
        inputs: Vec<(impl Into<String>, Shape)>,
        output: Output,
        args: Vec<i64>,
    ) -> Result<ExternTemplate, DslError> {
        let mut seen = std::collections::HashSet::new();
        let mut normalized = Vec::with_capacity(inputs.len());
        for (input_name, shape) in inputs {
            let input_name = input_name.into();
            if let Shape::Vector(0) = shape {
                return Err(DslError::BadExternSignature(format!(
                    "vector input `{input_name}` declares width 0"
                )));
            }
            if !seen.insert(input_name.clone()) {
                return Err(DslError::BadExternSignature(format!(
                    "input `{input_name}` declared more than once"
                )));
            }
            normalized.push((input_name, shape));
        }
        Ok(ExternTemplate {
            session: self.clone(),
            name: name.into(),
            inputs: normalized,
            output,
            args,
        })
    }
}

impl ExternTemplate {
    /// Binds every declared input exactly once (extras or omissions are a
    /// [`DslError::ShapeMismatch`]), instantiates one `component`, and
    /// registers it as a session root. Keys prefixed with `_` have the
    /// underscore stripped before matching, mirroring the Extern protocol's
    /// accommodation for reserved template-field names (e.g. `in`).
    pub fn call(&self, bindings: Vec<(&str, InputArg)>) -> Result<CallOutput, DslError> {
        let mut by_name: HashMap<String, InputArg> = HashMap::new();
        for (key, arg) in bindings {
            let key = key.strip_prefix('_').unwrap_or(key).to_string();
            if by_name.insert(key.clone(), arg).is_some() {
                return Err(DslError::ShapeMismatch(format!(
                    "input `{key}` bound more than once in this call"
                )));
            }
        }
        if by_name.len() != self.inputs.len() {
            return Err(DslError::ShapeMismatch(format!(
                "`{}` expects {} input(s), got {}",
                self.name,
                self.inputs.len(),
                by_name.len()
            )));
        }

        let mut children = Vec::new();
        let mut node_bindings = Vec::new();
        for (input_name, shape) in &self.inputs {
            let arg = by_name.remove(input_name).ok_or_else(|| {
                DslError::ShapeMismatch(format!(
                    "`{}` input `{input_name}` was not bound",
                    self.name
                ))
            })?;
            match (shape, arg) {
                (Shape::Scalar, InputArg::Scalar(operand)) => {
                    let operand = resolve(operand, &self.session)?;
                    children.push(operand.id());
                    node_bindings.push(ExternBinding::Scalar {
                        field: input_name.clone(),
                        operand: operand.id(),
                    });
                }
                (Shape::Vector(n), InputArg::Vector(operands)) => {
                    if operands.len() != *n {
                        return Err(DslError::ShapeMismatch(format!(
                            "`{}` input `{input_name}` expects {n} operand(s), got {}",
                            self.name,
                            operands.len()
                        )));
                    }
                    let mut ids = Vec::with_capacity(operands.len());
                    for operand in operands {
                        let operand = resolve(operand, &self.session)?;
                        children.push(operand.id());
                        ids.push(operand.id());
                    }
                    node_bindings.push(ExternBinding::Vector {
                        field: input_name.clone(),
                        operands: ids,
                    });
                }
                (Shape::Vector(n), InputArg::Array(array)) => {
                    let (source_extern, source_field) = array.extern_op_and_field();
                    children.push(array.0.id());
                    node_bindings.push(ExternBinding::ArrayWired {
                        field: input_name.clone(),
                        width: *n,
                        source_extern,
                        source_field,
                    });
                }
                (Shape::Scalar, InputArg::Vector(_)) | (Shape::Scalar, InputArg::Array(_)) => {
                    return Err(DslError::ShapeMismatch(format!(
                        "`{}` input `{input_name}` is scalar but was bound to a vector",
                        self.name
                    )));
                }
                (Shape::Vector(_), InputArg::Scalar(_)) => {
                    return Err(DslError::ShapeMismatch(format!(
                        "`{}` input `{input_name}` is a vector but was bound to a scalar",
                        self.name
                    )));
                }
            }
        }

        let component_name = self
            .session
            .0
            .borrow_mut()
            .claim_component_name(&self.name);
        let extern_op = self.session.0.borrow_mut().alloc_passthrough(
            self.name.clone(),
            format!("{}__", self.name),
            NodeKind::ExternOp {
                template: self.name.clone(),
                args: self.args.clone(),
                component_name: component_name.clone(),
                bindings: node_bindings,
            },
            children,
            World::Signal,
        );
        self.session.0.borrow_mut().add_root(extern_op);

        Ok(match &self.output {
            Output::None => CallOutput::None,
            Output::Scalar(field) => {
                let full_name = format!("{component_name}.{field}");
                let id = self.session.0.borrow_mut().alloc_passthrough(
                    component_name,
                    full_name,
                    NodeKind::ExternOutput { field: field.clone() },
                    vec![extern_op],
                    World::Signal,
                );
                CallOutput::Scalar(Expr::new(self.session.clone(), id))
            }
            Output::Vector(field) => {
                let full_name = format!("{component_name}.{field}");
                let id = self.session.0.borrow_mut().alloc_passthrough(
                    component_name,
                    full_name,
                    NodeKind::ExternArray { field: field.clone() },
                    vec![extern_op],
                    World::Signal,
                );
                CallOutput::Array(ExternArray(Expr::new(self.session.clone(), id)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DslError;

    #[test]
    fn bad_extern_signature_rejects_duplicate_input_names() {
        let s = Session::new();
        let err = s
            .r#extern(
                "T",
                vec![("in", Shape::Scalar), ("in", Shape::Scalar)],
                Output::None,
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, DslError::BadExternSignature(_)));
    }

    #[test]
    fn bad_extern_signature_rejects_a_zero_width_vector() {
        let s = Session::new();
        let err = s
            .r#extern("T", vec![("in", Shape::Vector(0))], Output::None, vec![])
            .unwrap_err();
        assert!(matches!(err, DslError::BadExternSignature(_)));
    }

    #[test]
    fn call_rejects_an_unbound_input() {
        let s = Session::new();
        let t = s
            .r#extern("T", vec![("in", Shape::Scalar)], Output::None, vec![])
            .unwrap();
        let err = t.call(vec![]).unwrap_err();
        assert!(matches!(err, DslError::ShapeMismatch(_)));
    }

    #[test]
    fn call_rejects_an_extra_binding() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let t = s.r#extern("T", vec![("in", Shape::Scalar)], Output::None, vec![]).unwrap();
        let err = t
            .call(vec![("in", InputArg::scalar(&a)), ("extra", InputArg::scalar(&a))])
            .unwrap_err();
        assert!(matches!(err, DslError::ShapeMismatch(_)));
    }

    #[test]
    fn call_rejects_wrong_vector_width() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let t = s
            .r#extern("T", vec![("in", Shape::Vector(2))], Output::None, vec![])
            .unwrap();
        let err = t.call(vec![("in", InputArg::vector([a.clone()]))]).unwrap_err();
        assert!(matches!(err, DslError::ShapeMismatch(_)));
    }

    #[test]
    fn call_rejects_scalar_vector_confusion_in_both_directions() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let scalar_t = s
            .r#extern("Scal", vec![("in", Shape::Scalar)], Output::None, vec![])
            .unwrap();
        assert!(matches!(
            scalar_t.call(vec![("in", InputArg::vector([a.clone()]))]).unwrap_err(),
            DslError::ShapeMismatch(_)
        ));

        let vector_t = s
            .r#extern("Vec", vec![("in", Shape::Vector(1))], Output::None, vec![])
            .unwrap();
        assert!(matches!(
            vector_t.call(vec![("in", InputArg::scalar(&a))]).unwrap_err(),
            DslError::ShapeMismatch(_)
        ));
    }

    #[test]
    fn underscore_prefixed_binding_keys_match_the_bare_field_name() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let t = s
            .r#extern("T", vec![("in", Shape::Scalar)], Output::None, vec![])
            .unwrap();
        assert!(t.call(vec![("_in", InputArg::scalar(&a))]).is_ok());
    }

    #[test]
    fn duplicate_template_calls_get_distinct_component_names() {
        let s = Session::new();
        let a = s.input("a", false).unwrap();
        let t = s
            .r#extern("LessThan", vec![("in", Shape::Scalar)], Output::Scalar("out".to_string()), vec![8])
            .unwrap();
        let first = t.call(vec![("in", InputArg::scalar(&a))]).unwrap();
        let second = t.call(vec![("in", InputArg::scalar(&a))]).unwrap();
        let name_of = |out: CallOutput| match out {
            CallOutput::Scalar(e) => e.full_name(),
            _ => unreachable!(),
        };
        assert_eq!(name_of(first), "LessThan_0.out");
        assert_eq!(name_of(second), "LessThan_1.out");
    }
}

