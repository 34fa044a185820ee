// Intraprocedural symbolic evaluator

use crate::analysis::context::{AnalysisContext, RecursionGuard};
use crate::analysis::errors::AnalysisError;
use crate::analysis::hooks::HookRegistry;
use crate::analysis::struct_assign::register_struct_assignment;
use crate::config::ProjectConfig;
use crate::parser::ast::*;
use crate::state::{StateList, StateOwner, ValueRange};
use crate::types::TypeResolver;
use std::mem;
use std::rc::Rc;
use tracing::{debug, warn};

/// Final state of one analyzed function
#[derive(Debug, Clone)]
pub struct FunctionReport {
    pub name: String,
    pub location: SourceLocation,
    /// States at function exit, merged over every `return` and the fall-through
    pub states: StateList,
    /// Statements that could not be evaluated, in source order
    pub errors: Vec<AnalysisError>,
}

impl FunctionReport {
    /// Known range of a path, looked up by its printed form (`one.x`, `p->y`)
    pub fn value_of(&self, path: &str) -> Option<ValueRange> {
        self.states
            .iter()
            .find(|sm| sm.owner == StateOwner::Extra && sm.path.to_string() == path)
            .map(|sm| sm.value)
    }

    pub fn is_modified(&self, path: &str) -> bool {
        self.states
            .iter()
            .any(|sm| sm.owner == StateOwner::Modified && sm.path.to_string() == path)
    }
}

/// `break` and `continue` states of the innermost loop
#[derive(Debug, Default)]
pub(super) struct LoopFrame {
    pub(super) breaks: Option<StateList>,
    pub(super) continues: Option<StateList>,
}

/// Walks function bodies, tracking value ranges per variable path
///
/// Each function is analyzed on its own, starting from an empty state list.
/// Branches are analyzed separately and merged; loop bodies run once and are
/// merged with the state that skipped them.
pub struct Engine {
    program: Rc<Program>,
    pub(super) types: TypeResolver,
    pub(super) hooks: HookRegistry,
    guard: RecursionGuard,

    /// State at the current program point; `None` once control cannot reach it
    pub(super) cur: Option<StateList>,
    /// Merged states of every `return` seen so far
    pub(super) returns: Option<StateList>,
    pub(super) loops: Vec<LoopFrame>,
    pub(super) errors: Vec<AnalysisError>,
}

impl Engine {
    pub fn new(program: Program, config: &ProjectConfig) -> Self {
        let types = TypeResolver::from_program(&program);
        let mut hooks = HookRegistry::new();
        register_struct_assignment(&mut hooks, config);
        debug!(hooked = hooks.len(), "call hooks registered");

        Engine {
            program: Rc::new(program),
            types,
            hooks,
            guard: RecursionGuard::new(),
            cur: None,
            returns: None,
            loops: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Registry for extra hooks, before [`Engine::analyze`] runs
    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Analyze every function definition in source order
    pub fn analyze(&mut self) -> Vec<FunctionReport> {
        let program = Rc::clone(&self.program);
        program
            .nodes
            .iter()
            .filter_map(|node| self.analyze_node(node))
            .collect()
    }

    /// Analyze one function definition by name
    pub fn analyze_function(&mut self, name: &str) -> Option<FunctionReport> {
        let program = Rc::clone(&self.program);
        let node = program.nodes.iter().find(
            |node| matches!(node, AstNode::FunctionDef { name: n, .. } if n == name),
        )?;
        self.analyze_node(node)
    }

    fn analyze_node(&mut self, node: &AstNode) -> Option<FunctionReport> {
        let AstNode::FunctionDef {
            name,
            params,
            body,
            location,
            ..
        } = node
        else {
            return None;
        };

        debug!(function = %name, "analyzing");

        self.types.push_scope();
        for param in params {
            if let Some(param_name) = &param.name {
                self.types.declare(param_name, param.param_type.clone());
            }
        }

        self.cur = Some(StateList::new());
        self.returns = None;
        self.loops.clear();
        self.errors.clear();

        self.exec_block(body);

        let exit = merge_states(self.returns.take(), self.cur.take());
        self.types.pop_scope();

        Some(FunctionReport {
            name: name.clone(),
            location: *location,
            states: exit.unwrap_or_default(),
            errors: mem::take(&mut self.errors),
        })
    }

    /// Record a statement-level failure and carry on
    pub(super) fn report(&mut self, result: Result<ValueRange, AnalysisError>) {
        if let Err(err) = result {
            warn!("{}", err);
            self.errors.push(err);
        }
    }
}

impl AnalysisContext for Engine {
    fn type_of(&self, expr: &AstNode) -> Option<Type> {
        self.types.type_of(expr)
    }

    fn struct_def(&self, name: &str) -> Option<Rc<StructDef>> {
        self.types.struct_def(name)
    }

    fn evaluate(&mut self, expr: &AstNode) -> Result<(), AnalysisError> {
        self.eval_expr(expr).map(|_| ())
    }

    fn recursion_guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn states(&self) -> Option<&StateList> {
        self.cur.as_ref()
    }
}

/// Join two control-flow predecessors; `None` is an unreachable side
pub(super) fn merge_states(a: Option<StateList>, b: Option<StateList>) -> Option<StateList> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}
