//! `arc-dsl` is a crate for building Circom-style arithmetic circuits. It
//! provides a two-world expression DAG: **signals**, bound by quadratic
//! constraints in the target language, and **witness variables**, computed
//! off-circuit and carrying no algebraic guarantee. A deterministic code
//! generator turns a session's accumulated graph into a single
//! `template Main() { .. } component main = Main();` program.
//!
//! # Example: division with a reintroduced constraint
//!
//! Division has no signal-world form (it isn't expressible as a quadratic
//! constraint), so the idiom is: detach the dividend into witness world,
//! perform the unsound off-circuit division there, attach the result back
//! into signal world, then reintroduce soundness with an explicit
//! `check_equals`.
//!
//! ```
//! use arc_dsl::Session;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new();
//! let a = session.input("a", false)?;
//! let b = session.input("b", true)?;
//!
//! let raw = a.detach()?.div(2)?;
//! let c = raw.attach()?;
//! let d = a.detach()?.rem(2)?.attach()?;
//!
//! let reconstructed = c.mul(2)?.add(&d)?;
//! a.check_equals(&reconstructed)?;
//!
//! let one_minus_d = session.constant(1).sub(&d)?;
//! let boolean_check = d.mul(&one_minus_d)?;
//! boolean_check.check_equals(0)?;
//!
//! let output = d.add(&b)?.add(2)?;
//! let text = session.generate(&output)?;
//! assert!(text.contains("signal input a;"));
//! assert!(text.contains("signal private input b;"));
//! # Ok(())
//! # }
//! ```
//!
//! # Non-goals
//!
//! This crate only builds and renders circuit text; it does not evaluate
//! constraints, assign witnesses, or interface with a proving back-end, and
//! a [`Session`] is never shared across threads (see the crate's design
//! notes for the full list).

mod emit;
mod error;
mod expr;
mod externs;
mod node;
mod session;

pub use error::DslError;
pub use expr::{Expr, Operand};
pub use externs::{CallOutput, ExternArray, ExternTemplate, InputArg, Output, Shape};
pub use node::World;
pub use session::Session;
