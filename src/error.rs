//! The error taxonomy for the builder surface.
//!
//! Every fallible entry point in this crate returns `Result<_, DslError>`.
//! `DslError` has one variant per deterministic failure kind; there is no
//! separate error type per call site and no panicking fallback in library
//! code.

use thiserror::Error;

/// A single variant-tagged error covering every way a circuit construction
/// can fail. All failures here are caller bugs: a well-formed caller never
/// observes one, and recovering from one (other than by fixing the call
/// site) is not supported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    /// An input name was registered twice in the same session.
    #[error("input named `{0}` is not unique in this session")]
    NameClash(String),

    /// Two operands used together did not originate from the same session.
    #[error("operand was created in a different session than its operator")]
    SessionMismatch,

    /// A signal-world value was used where a witness-world value was
    /// required, or vice versa, without an explicit `detach`/`attach`
    /// coercion; or a division/modulo right-hand operand was not
    /// witness-world.
    #[error("{0}")]
    WorldMismatch(String),

    /// An external template call bound an input with the wrong arity,
    /// mixed a scalar and a vector, or left an input unbound.
    #[error("{0}")]
    ShapeMismatch(String),

    /// An `Extern` descriptor itself was malformed (bad output shape, or
    /// a vector-input shape that is not a one-element width list).
    #[error("{0}")]
    BadExternSignature(String),

    /// `generate` was called with an output node that does not belong to
    /// the session being generated.
    #[error("output node does not belong to this session")]
    UnreachableOutput,
}
