//! `Session` and `Expr` must never be `Send`/`Sync`: a session's arena is
//! behind `Rc<RefCell<_>>`, never `Arc<Mutex<_>>`, so "no concurrent session
//! use" is a property of the type system, not a comment.

use arc_dsl::{Expr, Session};
use static_assertions::assert_not_impl_any;

assert_not_impl_any!(Session: Send, Sync);
assert_not_impl_any!(Expr: Send, Sync);
