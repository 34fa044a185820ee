//! The evaluator seam used by the aggregate expander
//!
//! [`AnalysisContext`] is everything the expander needs from the rest of the
//! analyzer: declared types, a way to execute a synthesized assignment, the
//! current state list, and the recursion guard that keeps synthesized
//! assignments from being expanded again.

use crate::analysis::errors::AnalysisError;
use crate::parser::ast::{AstNode, StructDef, Type};
use crate::state::StateList;
use std::cell::Cell;
use std::rc::Rc;

pub trait AnalysisContext {
    /// Declared type of `expr`, if it can be resolved
    fn type_of(&self, expr: &AstNode) -> Option<Type>;

    fn struct_def(&self, name: &str) -> Option<Rc<StructDef>>;

    /// Execute `expr` against the current state
    fn evaluate(&mut self, expr: &AstNode) -> Result<(), AnalysisError>;

    fn recursion_guard(&self) -> &RecursionGuard;

    /// Current state list; `None` at an unreachable program point
    fn states(&self) -> Option<&StateList>;

    /// Struct type of `expr`, or of what it points to
    fn struct_type(&self, expr: &AstNode) -> Option<Rc<StructDef>> {
        let ty = self.type_of(expr)?;
        let ty = if ty.is_pointer() { ty.pointee()? } else { ty };
        self.struct_def(ty.struct_name()?)
    }

    fn is_pointer(&self, expr: &AstNode) -> bool {
        self.type_of(expr).is_some_and(|ty| ty.is_pointer())
    }
}

/// Depth of nested synthetic evaluation
///
/// Clones share one counter. [`RecursionGuard::enter`] bumps it and returns
/// a [`DepthScope`] that puts it back when dropped, so the count is restored
/// on every exit path.
#[derive(Debug, Clone, Default)]
pub struct RecursionGuard {
    depth: Rc<Cell<usize>>,
}

impl RecursionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_active(&self) -> bool {
        self.depth.get() > 0
    }

    #[must_use = "the depth is released as soon as the scope is dropped"]
    pub fn enter(&self) -> DepthScope {
        self.depth.set(self.depth.get() + 1);
        DepthScope {
            depth: Rc::clone(&self.depth),
        }
    }
}

#[derive(Debug)]
pub struct DepthScope {
    depth: Rc<Cell<usize>>,
}

impl Drop for DepthScope {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_depth() {
        let guard = RecursionGuard::new();
        assert!(!guard.is_active());

        {
            let _outer = guard.enter();
            let shared = guard.clone();
            let _inner = shared.enter();
            assert_eq!(guard.depth(), 2);
        }

        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_scope_released_on_early_return() {
        fn bail(guard: &RecursionGuard) -> Result<(), ()> {
            let _scope = guard.enter();
            Err(())
        }

        let guard = RecursionGuard::new();
        assert!(bail(&guard).is_err());
        assert_eq!(guard.depth(), 0);
    }
}
