//! Function-call hooks
//!
//! A [`HookRegistry`] maps callee names to callbacks the evaluator runs when
//! it reaches a call to that function. One registry is built per analysis
//! run and owned by the engine.

use crate::analysis::context::AnalysisContext;
use crate::parser::ast::AstNode;
use rustc_hash::{FxHashMap, FxHashSet};

/// Callback run for a hooked call: `(ctx, callee, args, param)`
pub type HookFn = fn(&mut dyn AnalysisContext, &str, &[AstNode], Option<usize>);

#[derive(Clone, Copy)]
pub struct CallHook {
    pub callback: HookFn,
    /// Opaque per-registration value, e.g. an argument index
    pub param: Option<usize>,
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: FxHashMap<String, Vec<CallHook>>,
    modules: FxHashSet<&'static str>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks run in registration order
    pub fn add_hook(&mut self, function: &str, callback: HookFn, param: Option<usize>) {
        self.hooks
            .entry(function.to_string())
            .or_default()
            .push(CallHook { callback, param });
    }

    pub fn hooks_for(&self, function: &str) -> &[CallHook] {
        self.hooks.get(function).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_hooked(&self, function: &str) -> bool {
        !self.hooks_for(function).is_empty()
    }

    /// Run `register` unless `module` has already registered in this
    /// registry; returns whether it ran
    pub fn register_once(&mut self, module: &'static str, register: impl FnOnce(&mut Self)) -> bool {
        if !self.modules.insert(module) {
            return false;
        }
        register(self);
        true
    }

    /// Number of hooked function names
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut dyn AnalysisContext, _: &str, _: &[AstNode], _: Option<usize>) {}

    #[test]
    fn test_hooks_in_registration_order() {
        let mut registry = HookRegistry::new();
        registry.add_hook("f", noop, Some(1));
        registry.add_hook("f", noop, Some(2));

        let params: Vec<_> = registry.hooks_for("f").iter().map(|h| h.param).collect();
        assert_eq!(params, vec![Some(1), Some(2)]);
        assert!(registry.hooks_for("g").is_empty());
    }

    #[test]
    fn test_register_once() {
        let mut registry = HookRegistry::new();

        assert!(registry.register_once("m", |r| r.add_hook("f", noop, None)));
        assert!(!registry.register_once("m", |r| r.add_hook("f", noop, None)));
        assert_eq!(registry.hooks_for("f").len(), 1);
    }
}
