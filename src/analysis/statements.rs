// Statement execution for the analysis engine

use crate::analysis::engine::{merge_states, Engine, LoopFrame};
use crate::parser::ast::{AstNode, StructDef};
use crate::state::{StateList, StateOwner, StatePath};
use std::mem;
use tracing::warn;

impl Engine {
    /// Execute a `{ ... }` body in its own scope
    pub(super) fn exec_block(&mut self, statements: &[AstNode]) {
        self.types.push_scope();
        for stmt in statements {
            self.exec_statement(stmt);
        }
        self.types.pop_scope();
    }

    pub(super) fn exec_statement(&mut self, stmt: &AstNode) {
        match stmt {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                self.types.declare(name, var_type.clone());

                // A new declaration shadows whatever was known about the name
                if let Some(states) = self.cur.as_mut() {
                    let path = StatePath::variable(name);
                    states.remove(StateOwner::Extra, &path);
                    states.clear_members(StateOwner::Extra, &path);
                }

                if let Some(init) = init {
                    let target = AstNode::Variable(name.clone(), *location);
                    let result = self.assign(&target, init);
                    self.report(result);
                }
            }

            AstNode::StructDef { name, fields, .. } => {
                self.types.define_struct(StructDef {
                    name: name.clone(),
                    fields: fields.clone(),
                });
            }

            AstNode::Block { statements, .. } => self.exec_block(statements),

            AstNode::ExpressionStatement { expr, .. } => {
                let result = self.eval_expr(expr);
                self.report(result);
            }

            AstNode::Return { expr, .. } => {
                if let Some(expr) = expr {
                    let result = self.eval_expr(expr);
                    self.report(result);
                }
                let exiting = self.cur.take();
                self.returns = merge_states(self.returns.take(), exiting);
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let result = self.eval_expr(condition);
                self.report(result);

                let before = self.cur.clone();
                self.exec_block(then_branch);
                let after_then = mem::replace(&mut self.cur, before);
                if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch);
                }
                self.cur = merge_states(after_then, self.cur.take());
            }

            AstNode::While {
                condition, body, ..
            } => {
                let result = self.eval_expr(condition);
                self.report(result);

                let skipped = self.cur.clone();
                self.exec_loop(body, skipped, None);
            }

            AstNode::DoWhile {
                body, condition, ..
            } => {
                self.loops.push(LoopFrame::default());
                self.exec_block(body);
                let frame = self.loops.pop().unwrap_or_default();

                self.cur = merge_states(self.cur.take(), frame.continues);
                let result = self.eval_expr(condition);
                self.report(result);
                self.cur = merge_states(self.cur.take(), frame.breaks);
            }

            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                self.types.push_scope();

                if let Some(init) = init {
                    self.exec_for_init(init);
                }
                if let Some(condition) = condition {
                    let result = self.eval_expr(condition);
                    self.report(result);
                }

                let skipped = self.cur.clone();
                let increment = increment.as_deref();
                self.exec_loop(body, skipped, increment);

                self.types.pop_scope();
            }

            AstNode::Break { location } => match self.loops.last_mut() {
                Some(frame) => {
                    frame.breaks = merge_states(frame.breaks.take(), self.cur.take());
                }
                None => warn!(%location, "break outside of a loop"),
            },

            AstNode::Continue { location } => match self.loops.last_mut() {
                Some(frame) => {
                    frame.continues = merge_states(frame.continues.take(), self.cur.take());
                }
                None => warn!(%location, "continue outside of a loop"),
            },

            // Expressions used directly as statements (for-loop clauses)
            expr => {
                let result = self.eval_expr(expr);
                self.report(result);
            }
        }
    }

    /// `for` initializers: a declaration list shares the loop's scope
    fn exec_for_init(&mut self, init: &AstNode) {
        match init {
            AstNode::Block { statements, .. } => {
                for stmt in statements {
                    self.exec_statement(stmt);
                }
            }
            other => self.exec_statement(other),
        }
    }

    /// Run a loop body once, then join the states that leave the loop:
    /// the one that skipped the body, the fall-through and `continue` states
    /// (after `increment`), and every `break`
    fn exec_loop(
        &mut self,
        body: &[AstNode],
        skipped: Option<StateList>,
        increment: Option<&AstNode>,
    ) {
        self.loops.push(LoopFrame::default());
        self.exec_block(body);
        let frame = self.loops.pop().unwrap_or_default();

        self.cur = merge_states(self.cur.take(), frame.continues);
        if let Some(increment) = increment {
            let result = self.eval_expr(increment);
            self.report(result);
        }

        self.cur = merge_states(merge_states(skipped, self.cur.take()), frame.breaks);
    }
}
