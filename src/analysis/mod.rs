//! Symbolic analysis of function bodies
//!
//! - [`engine`]: the evaluator that walks functions and tracks state
//! - [`struct_assign`]: member-by-member expansion of whole-struct copies
//! - [`context`]: the evaluator interface the expansion runs against, plus
//!   the recursion guard
//! - [`hooks`]: per-function-name call hooks
//! - [`errors`]: analysis error types
//!
//! # Evaluation Model
//!
//! Each function is analyzed from an empty state. Statements update a
//! [`crate::state::StateList`] of value ranges; `if` arms are analyzed on
//! copies of the state and merged afterwards, and loop bodies run once and
//! merge with the state that skipped them. Every plain assignment is handed
//! to [`struct_assign::fake_struct_member_assignments`], which turns struct
//! and struct-pointer copies into member assignments that are evaluated in
//! turn. Calls run their registered hooks (`memcpy`, `memset`, ...); a call
//! with no hook is assumed to overwrite whatever its pointer arguments reach.

pub mod context;
pub mod engine;
pub mod errors;
mod expressions;
pub mod hooks;
mod statements;
pub mod struct_assign;
