// Expression evaluation for the analysis engine

use crate::analysis::context::AnalysisContext;
use crate::analysis::engine::{merge_states, Engine};
use crate::analysis::errors::AnalysisError;
use crate::analysis::struct_assign::{
    fake_struct_member_assignments, has_known_member_states, struct_members_copy, CopyMode,
};
use crate::parser::ast::*;
use crate::parser::build::{dereference, remove_addr, strip_wrapping};
use crate::state::{StateOwner, StatePath, ValueRange};
use std::mem;
use tracing::{debug, trace};

impl Engine {
    /// Evaluate `expr` for its value and side effects on the current state
    pub(super) fn eval_expr(&mut self, expr: &AstNode) -> Result<ValueRange, AnalysisError> {
        match expr {
            AstNode::IntLiteral(n, _) => Ok(ValueRange::exact(*n)),
            AstNode::CharLiteral(c, _) => Ok(ValueRange::exact(*c as i64)),
            AstNode::StringLiteral(..) => Ok(ValueRange::new(1, i64::MAX)),
            AstNode::Null { .. } => Ok(ValueRange::exact(0)),

            AstNode::Variable(..)
            | AstNode::MemberAccess { .. }
            | AstNode::PointerMemberAccess { .. } => {
                let ty = self.lvalue_type(expr)?;
                Ok(self.read(expr, &ty))
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => self.eval_unary(expr, *op, operand, *location),

            AstNode::BinaryOp {
                op, left, right, ..
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                Ok(self.binary_value(expr, *op, left, right))
            }

            AstNode::Assignment { lhs, rhs, .. } => self.assign(lhs, rhs),

            AstNode::CompoundAssignment { lhs, op, rhs, .. } => {
                let right = self.eval_expr(rhs)?;
                let ty = self.lvalue_type(lhs)?;
                let current = self.read(lhs, &ty);
                let value = self.binary_value(expr, *op, current, right);
                self.store(lhs, &ty, value);
                Ok(value)
            }

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                self.eval_expr(condition)?;

                let before = self.cur.clone();
                let when_true = self.eval_expr(true_expr)?;
                let after_true = mem::replace(&mut self.cur, before);
                let when_false = self.eval_expr(false_expr)?;
                self.cur = merge_states(after_true, self.cur.take());

                Ok(when_true.union(&when_false))
            }

            AstNode::FunctionCall { name, args, .. } => self.eval_call(expr, name, args),

            AstNode::ArrayAccess { array, index, .. } => {
                self.eval_expr(array)?;
                self.eval_expr(index)?;
                let ty = self.types.type_of(expr).ok_or_else(|| AnalysisError::TypeError {
                    expected: "array or pointer".to_string(),
                    got: self.type_name(array),
                    location: expr.location(),
                })?;
                Ok(ValueRange::whole(&ty))
            }

            AstNode::Cast {
                target_type,
                expr: inner,
                ..
            } => Ok(self.eval_expr(inner)?.cast_to(target_type)),

            AstNode::SizeofType { target_type, .. } => Ok(self.size_value(Some(target_type.clone()))),

            // The operand of sizeof is not evaluated
            AstNode::SizeofExpr { expr: inner, .. } => Ok(self.size_value(self.types.type_of(inner))),

            AstNode::Unknown { ty, .. } => Ok(ValueRange::whole(ty)),

            other => Err(AnalysisError::TypeError {
                expected: "expression".to_string(),
                got: other.to_string(),
                location: other.location(),
            }),
        }
    }

    fn eval_unary(
        &mut self,
        expr: &AstNode,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<ValueRange, AnalysisError> {
        match op {
            UnOp::Deref => {
                let ty = self.lvalue_type(expr)?;
                Ok(self.read(expr, &ty))
            }

            UnOp::AddrOf => {
                self.lvalue_type(operand)?;
                Ok(ValueRange::new(1, i64::MAX))
            }

            UnOp::Neg => {
                let value = self.eval_expr(operand)?;
                let ty = self.result_type(expr);
                Ok(value
                    .negate()
                    .map(|v| v.cast_to(&ty))
                    .unwrap_or_else(|| ValueRange::whole(&ty)))
            }

            UnOp::Not => {
                let value = self.eval_expr(operand)?;
                Ok(if excludes_zero(&value) {
                    ValueRange::exact(0)
                } else if value == ValueRange::exact(0) {
                    ValueRange::exact(1)
                } else {
                    ValueRange::boolean()
                })
            }

            UnOp::BitNot => {
                let value = self.eval_expr(operand)?;
                let ty = self.result_type(expr);
                Ok(match value.as_exact() {
                    Some(n) => ValueRange::exact(!n).cast_to(&ty),
                    None => ValueRange::whole(&ty),
                })
            }

            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                let ty = self.lvalue_type(operand)?;
                if !ty.is_scalar() {
                    return Err(AnalysisError::TypeError {
                        expected: "scalar".to_string(),
                        got: ty.to_string(),
                        location,
                    });
                }

                let old = self.read(operand, &ty);
                let step = if matches!(op, UnOp::PreInc | UnOp::PostInc) {
                    ValueRange::exact(1)
                } else {
                    ValueRange::exact(-1)
                };
                let new = match old.add(&step) {
                    Some(v) if !ty.is_pointer() => v.cast_to(&ty),
                    _ => ValueRange::whole(&ty),
                };
                self.store(operand, &ty, new);

                Ok(if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                    new
                } else {
                    old
                })
            }
        }
    }

    /// `lhs = rhs`, followed by member-wise expansion when `lhs` is a struct
    /// or a pointer to one
    pub(super) fn assign(&mut self, lhs: &AstNode, rhs: &AstNode) -> Result<ValueRange, AnalysisError> {
        let value = self.eval_expr(rhs)?;
        let ty = self.lvalue_type(lhs)?;
        let value = if ty.is_scalar() {
            value.cast_to(&ty)
        } else {
            ValueRange::whole(&ty)
        };

        // The expansion rewrites every member of a struct target, so they
        // stay readable until then: `one = one` must not lose `one.x`
        let expands = !self.recursion_guard().is_active()
            && self.types.struct_type(strip_wrapping(lhs)).is_some();
        self.write(lhs, &ty, value, expands);
        fake_struct_member_assignments(self, lhs, rhs);

        Ok(value)
    }

    /// Check that `target` names storage, evaluating its subexpressions, and
    /// return its declared type
    fn lvalue_type(&mut self, target: &AstNode) -> Result<Type, AnalysisError> {
        let location = target.location();
        let target = strip_wrapping(target);
        match target {
            AstNode::Variable(name, _) => self.types.variable_type(name).cloned().ok_or_else(|| {
                AnalysisError::UndefinedVariable {
                    name: name.clone(),
                    location,
                }
            }),

            AstNode::MemberAccess { object, member, .. }
            | AstNode::PointerMemberAccess { object, member, .. } => {
                self.eval_expr(object)?;
                self.types
                    .type_of(target)
                    .ok_or_else(|| AnalysisError::UnknownMember {
                        ty: self.type_name(object),
                        member: member.clone(),
                        location,
                    })
            }

            AstNode::UnaryOp {
                op: UnOp::Deref,
                operand,
                ..
            } => {
                self.eval_expr(operand)?;
                self.types
                    .type_of(target)
                    .ok_or_else(|| AnalysisError::TypeError {
                        expected: "pointer".to_string(),
                        got: self.type_name(operand),
                        location,
                    })
            }

            AstNode::ArrayAccess { .. } => {
                self.eval_expr(target)?;
                self.types.type_of(target).ok_or(AnalysisError::NotAnLvalue {
                    expr: target.to_string(),
                    location,
                })
            }

            other => Err(AnalysisError::NotAnLvalue {
                expr: other.to_string(),
                location,
            }),
        }
    }

    /// Tracked value of `expr`, or everything `ty` can hold
    fn read(&self, expr: &AstNode, ty: &Type) -> ValueRange {
        StatePath::from_expr(expr)
            .and_then(|path| self.cur.as_ref()?.value(&path))
            .unwrap_or_else(|| ValueRange::whole(ty))
    }

    /// Record a write of `value` to `target`
    ///
    /// Whatever was known about members of `target` is forgotten first.
    /// Aggregates have no value of their own; only the write is recorded.
    fn store(&mut self, target: &AstNode, ty: &Type, value: ValueRange) {
        self.write(target, ty, value, false);
    }

    fn write(&mut self, target: &AstNode, ty: &Type, value: ValueRange, keep_members: bool) {
        let Some(path) = StatePath::from_expr(target) else {
            return;
        };
        let Some(states) = self.cur.as_mut() else {
            return;
        };

        if !keep_members {
            states.clear_members(StateOwner::Extra, &path);
        }
        if ty.is_scalar() {
            states.set(StateOwner::Extra, path.clone(), value);
        } else {
            states.remove(StateOwner::Extra, &path);
        }
        trace!("{} = {}", path, value);
        states.set(StateOwner::Modified, path, value);
    }

    fn eval_call(
        &mut self,
        call: &AstNode,
        name: &str,
        args: &[AstNode],
    ) -> Result<ValueRange, AnalysisError> {
        for arg in args {
            self.eval_expr(arg)?;
        }

        // Copied out: hooks borrow the engine mutably
        let hooks = self.hooks.hooks_for(name).to_vec();
        if hooks.is_empty() {
            self.clobber_escaped_arguments(name, args);
        }
        for hook in hooks {
            (hook.callback)(self, name, args, hook.param);
        }

        Ok(ValueRange::whole(&self.result_type(call)))
    }

    /// An unknown callee may write through any non-const pointer it is given
    ///
    /// Struct arguments only lose their members when some member is tracked;
    /// scalar pointees are reset to unknown.
    fn clobber_escaped_arguments(&mut self, callee: &str, args: &[AstNode]) {
        for (index, arg) in args.iter().enumerate() {
            let arg = strip_wrapping(arg);
            let Some(ty) = self.types.type_of(arg) else {
                continue;
            };
            let read_only = self
                .types
                .param_type(callee, index)
                .is_some_and(|param| param.is_pointer() && param.is_const);
            if !ty.is_pointer() || ty.is_const || read_only {
                continue;
            }

            if self.types.struct_type(arg).is_some() {
                if has_known_member_states(&*self, arg) {
                    debug!("{} may overwrite the members of {}", callee, remove_addr(arg));
                    struct_members_copy(self, CopyMode::MemCopy, remove_addr(arg), None);
                }
                continue;
            }

            if let Some(pointee) = ty.pointee().filter(|t| t.is_scalar()) {
                let target = dereference(arg);
                self.store(&target, &pointee, ValueRange::whole(&pointee));
            }
        }
    }

    fn binary_value(&self, expr: &AstNode, op: BinOp, left: ValueRange, right: ValueRange) -> ValueRange {
        let ty = self.result_type(expr);
        if ty.is_pointer() {
            return ValueRange::whole(&ty);
        }

        let value = match op {
            BinOp::Add => left.add(&right),
            BinOp::Sub => left.sub(&right),
            BinOp::Mul => left.mul(&right),
            BinOp::Div => exact_pair(left, right, i64::checked_div),
            BinOp::Mod => exact_pair(left, right, i64::checked_rem),
            BinOp::BitAnd => exact_pair(left, right, |a, b| Some(a & b)),
            BinOp::BitOr => exact_pair(left, right, |a, b| Some(a | b)),
            BinOp::BitXor => exact_pair(left, right, |a, b| Some(a ^ b)),
            BinOp::BitShl => exact_pair(left, right, |a, b| a.checked_shl(u32::try_from(b).ok()?)),
            BinOp::BitShr => exact_pair(left, right, |a, b| a.checked_shr(u32::try_from(b).ok()?)),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                Some(compare(op, &left, &right))
            }
            BinOp::And => Some(if is_zero(&left) || is_zero(&right) {
                ValueRange::exact(0)
            } else if excludes_zero(&left) && excludes_zero(&right) {
                ValueRange::exact(1)
            } else {
                ValueRange::boolean()
            }),
            BinOp::Or => Some(if excludes_zero(&left) || excludes_zero(&right) {
                ValueRange::exact(1)
            } else if is_zero(&left) && is_zero(&right) {
                ValueRange::exact(0)
            } else {
                ValueRange::boolean()
            }),
        };

        value
            .map(|v| v.cast_to(&ty))
            .unwrap_or_else(|| ValueRange::whole(&ty))
    }

    fn size_value(&self, ty: Option<Type>) -> ValueRange {
        match ty.and_then(|ty| self.types.sizeof(&ty)) {
            Some(size) => ValueRange::exact(size as i64),
            None => ValueRange::whole(&Type::new(BaseType::UnsignedLong)),
        }
    }

    fn result_type(&self, expr: &AstNode) -> Type {
        self.types
            .type_of(expr)
            .unwrap_or_else(|| Type::new(BaseType::Long))
    }

    fn type_name(&self, expr: &AstNode) -> String {
        self.type_of(expr)
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "unknown type".to_string())
    }
}

fn exact_pair(
    left: ValueRange,
    right: ValueRange,
    op: impl Fn(i64, i64) -> Option<i64>,
) -> Option<ValueRange> {
    op(left.as_exact()?, right.as_exact()?).map(ValueRange::exact)
}

fn is_zero(value: &ValueRange) -> bool {
    *value == ValueRange::exact(0)
}

fn excludes_zero(value: &ValueRange) -> bool {
    value.min() > 0 || value.max() < 0
}

/// Comparison result: decided when the ranges settle it, else `0-1`
fn compare(op: BinOp, left: &ValueRange, right: &ValueRange) -> ValueRange {
    let disjoint = left.max() < right.min() || right.max() < left.min();
    let same_point = left.is_exact() && left == right;

    let (always, never) = match op {
        BinOp::Eq => (same_point, disjoint),
        BinOp::Ne => (disjoint, same_point),
        BinOp::Lt => (left.max() < right.min(), left.min() >= right.max()),
        BinOp::Le => (left.max() <= right.min(), left.min() > right.max()),
        BinOp::Gt => (left.min() > right.max(), left.max() <= right.min()),
        BinOp::Ge => (left.min() >= right.max(), left.max() < right.min()),
        _ => (false, false),
    };

    if always {
        ValueRange::exact(1)
    } else if never {
        ValueRange::exact(0)
    } else {
        ValueRange::boolean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::engine::FunctionReport;
    use crate::config::ProjectConfig;
    use crate::parser::parser::Parser;

    fn run(source: &str) -> FunctionReport {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut reports = Engine::new(program, &ProjectConfig::default()).analyze();
        reports.pop().unwrap()
    }

    #[test]
    fn test_arithmetic_ranges() {
        let report = run(r#"
            void f() {
                int a = 2 + 3 * 4;
                int b = a / 2;
                int c = a % 5;
                char d = 200;
                unsigned int e = -1;
                int g = 1 << 4;
            }
        "#);

        assert_eq!(report.value_of("a"), Some(ValueRange::exact(14)));
        assert_eq!(report.value_of("b"), Some(ValueRange::exact(7)));
        assert_eq!(report.value_of("c"), Some(ValueRange::exact(4)));
        assert_eq!(report.value_of("d"), Some(ValueRange::exact(-56)));
        assert_eq!(report.value_of("e"), Some(ValueRange::exact(u32::MAX as i64)));
        assert_eq!(report.value_of("g"), Some(ValueRange::exact(16)));
    }

    #[test]
    fn test_unknown_inputs_widen() {
        let report = run("void f(int n) { int a = n; int b = n / 0; short c = n; }");

        assert_eq!(report.value_of("a").unwrap().to_string(), "s32min-s32max");
        assert_eq!(report.value_of("b").unwrap().to_string(), "s32min-s32max");
        assert_eq!(report.value_of("c").unwrap().to_string(), "s16min-s16max");
    }

    #[test]
    fn test_comparisons() {
        let report = run(r#"
            void f(int n) {
                int a = 3 < 4;
                int b = 3 == 4;
                int c = n > 5;
                int d = !0;
                int e = 1 && n;
            }
        "#);

        assert_eq!(report.value_of("a"), Some(ValueRange::exact(1)));
        assert_eq!(report.value_of("b"), Some(ValueRange::exact(0)));
        assert_eq!(report.value_of("c"), Some(ValueRange::boolean()));
        assert_eq!(report.value_of("d"), Some(ValueRange::exact(1)));
        assert_eq!(report.value_of("e"), Some(ValueRange::boolean()));
    }

    #[test]
    fn test_increments_and_compound_assignment() {
        let report = run(r#"
            void f() {
                int i = 0;
                int j = i++;
                int k = ++i;
                i += 10;
                k -= 1;
            }
        "#);

        assert_eq!(report.value_of("i"), Some(ValueRange::exact(12)));
        assert_eq!(report.value_of("j"), Some(ValueRange::exact(0)));
        assert_eq!(report.value_of("k"), Some(ValueRange::exact(1)));
    }

    #[test]
    fn test_sizeof_and_ternary() {
        let report = run(r#"
            struct pair { int a; long b; };
            void f(int n) {
                struct pair p;
                long s = sizeof(struct pair);
                long t = sizeof p.b;
                int u = n ? 1 : 5;
            }
        "#);

        assert_eq!(report.value_of("s"), Some(ValueRange::exact(12)));
        assert_eq!(report.value_of("t"), Some(ValueRange::exact(8)));
        assert_eq!(report.value_of("u"), Some(ValueRange::new(1, 5)));
    }

    #[test]
    fn test_member_errors() {
        let report = run(r#"
            struct pair { int a; };
            void f() {
                struct pair p;
                p.missing = 1;
                3 = 4;
            }
        "#);

        assert!(matches!(
            report.errors[0],
            AnalysisError::UnknownMember { ref member, .. } if member == "missing"
        ));
        assert!(matches!(report.errors[1], AnalysisError::NotAnLvalue { .. }));
    }

    #[test]
    fn test_scalar_pointer_argument_is_clobbered() {
        let report = run(r#"
            void fill(int *out);
            void f() {
                int x = 4;
                int y = 5;
                fill(&x);
            }
        "#);

        assert_eq!(report.value_of("x").unwrap().to_string(), "s32min-s32max");
        assert_eq!(report.value_of("y"), Some(ValueRange::exact(5)));
    }
}
