//! Member-by-member expansion of whole-struct copies
//!
//! Copying a struct as a unit tells a per-path state tracker nothing about
//! the members. This pass rewrites
//!
//! ```text
//! struct foo one, two;
//! one = two;
//! ```
//!
//! into the equivalent sequence of member assignments
//!
//! ```text
//! one.x = two.x;
//! one.y = two.y;
//! ```
//!
//! and hands each one back to the evaluator. The same expansion serves
//! pointer assignment (`p1 = p2` becomes `p1->x = p2->x; ...`), `memcpy`
//! and `memmove` (the same as `one = two`), `memset` (every member gets the
//! fill value), and project functions known to wipe an argument (every
//! member becomes unknown).
//!
//! # Limits
//!
//! - Exactly one member level is copied. A struct-valued member is assigned
//!   as a unit and is not expanded further; `p1->a->b->c` chains are not
//!   followed.
//! - Array members are skipped.
//! - An anonymous struct member is expanded into its own named members,
//!   which C names through the parent (`one.b` for `struct { int b; };`).
//! - Nothing filters the resulting "could be anything" assignments.

use crate::analysis::context::AnalysisContext;
use crate::analysis::hooks::HookRegistry;
use crate::config::{load_clears_argument, ProjectConfig};
use crate::parser::ast::{AccessKind, AstNode, Field, StructDef};
use crate::parser::build::{assignment, member_access, remove_addr, strip_wrapping, unknown_value};
use crate::state::StatePath;
use tracing::{debug, trace};

/// How the right-hand side of a member assignment is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// `left = right`; members are matched by name
    Normal,
    /// `memcpy(left, right, n)`; matched like `Normal`
    MemCopy,
    /// `memset(left, right, n)`; `right` is the fill value for every member
    MemSet,
}

/// `right.member` or `right->member` when `right` has the same struct type
/// as `left_struct`
pub fn matching_member_expr(
    ctx: &dyn AnalysisContext,
    left_struct: &StructDef,
    right: &AstNode,
    left_member: &Field,
) -> Option<AstNode> {
    let name = left_member.name.as_deref()?;

    let right_struct = ctx.struct_type(right)?;
    if right_struct.name != left_struct.name {
        return None;
    }

    let right = remove_addr(right);
    let kind = if ctx.is_pointer(right) {
        AccessKind::Dereference
    } else {
        AccessKind::Direct
    };

    Some(member_access(right, kind, name))
}

/// Evaluate one synthetic assignment per non-array member of `left`
///
/// Does nothing while another expansion is being evaluated, or when `left`
/// is neither a struct nor a pointer to one. A `right` of `None` makes every
/// member unknown.
pub fn struct_members_copy(
    ctx: &mut dyn AnalysisContext,
    mode: CopyMode,
    left: &AstNode,
    right: Option<&AstNode>,
) {
    if ctx.recursion_guard().is_active() {
        return;
    }

    let left = strip_wrapping(left);
    let right = right.map(strip_wrapping);

    let Some(struct_def) = ctx.struct_type(left) else {
        return;
    };

    let kind = if ctx.is_pointer(left) {
        AccessKind::Dereference
    } else {
        AccessKind::Direct
    };

    for field in &struct_def.fields {
        if field.field_type.is_array() {
            continue;
        }
        if field.name.is_some() {
            copy_member(ctx, mode, &struct_def, left, kind, right, field);
            continue;
        }

        // Members of an anonymous struct are named through the parent
        let Some(inner) = field
            .field_type
            .struct_name()
            .and_then(|tag| ctx.struct_def(tag))
        else {
            trace!(left = %left, "skipping anonymous member of struct {}", struct_def.name);
            continue;
        };
        for inner_field in &inner.fields {
            if inner_field.name.is_some() && !inner_field.field_type.is_array() {
                copy_member(ctx, mode, &struct_def, left, kind, right, inner_field);
            }
        }
    }
}

/// Build and evaluate `left.member = <right side>` for one named member
fn copy_member(
    ctx: &mut dyn AnalysisContext,
    mode: CopyMode,
    struct_def: &StructDef,
    left: &AstNode,
    kind: AccessKind,
    right: Option<&AstNode>,
    field: &Field,
) {
    let Some(name) = field.name.as_deref() else {
        return;
    };

    let left_member = member_access(left, kind, name);
    let right_member = match mode {
        CopyMode::Normal | CopyMode::MemCopy => {
            right.and_then(|right| matching_member_expr(&*ctx, struct_def, right, field))
        }
        CopyMode::MemSet => right.cloned(),
    }
    .unwrap_or_else(|| unknown_value(&field.field_type, left.location()));

    let assign = assignment(left_member, right_member);
    debug!(?mode, "fake assignment: {}", assign);

    let _scope = ctx.recursion_guard().enter();
    if let Err(err) = ctx.evaluate(&assign) {
        debug!("fake assignment '{}' failed: {}", assign, err);
    }
}

/// Expand a plain `lhs = rhs` that the evaluator has just executed
pub fn fake_struct_member_assignments(ctx: &mut dyn AnalysisContext, lhs: &AstNode, rhs: &AstNode) {
    struct_members_copy(ctx, CopyMode::Normal, lhs, Some(rhs));
}

/// `memset(buf, val, size)`
pub fn match_memset(ctx: &mut dyn AnalysisContext, _function: &str, args: &[AstNode], _param: Option<usize>) {
    let Some(buf) = args.first() else {
        return;
    };
    struct_members_copy(ctx, CopyMode::MemSet, remove_addr(buf), args.get(1));
}

/// `memcpy(dest, src, size)` and `memmove(dest, src, size)`
pub fn match_memcpy(ctx: &mut dyn AnalysisContext, _function: &str, args: &[AstNode], _param: Option<usize>) {
    let Some(dest) = args.first() else {
        return;
    };
    let src = args.get(1).map(remove_addr);
    struct_members_copy(ctx, CopyMode::MemCopy, remove_addr(dest), src);
}

/// A project function that wipes argument `param`
pub fn match_clears_argument(
    ctx: &mut dyn AnalysisContext,
    function: &str,
    args: &[AstNode],
    param: Option<usize>,
) {
    let Some(arg) = param.and_then(|n| args.get(n)) else {
        trace!("{} called without its cleared argument {:?}", function, param);
        return;
    };
    struct_members_copy(ctx, CopyMode::MemCopy, remove_addr(arg), None);
}

/// Whether any member of the variable `expr` names (or points at, through
/// `&`) already has a tracked value
pub fn has_known_member_states(ctx: &dyn AnalysisContext, expr: &AstNode) -> bool {
    let Some(path) = StatePath::from_expr(remove_addr(expr)) else {
        return false;
    };
    ctx.states()
        .is_some_and(|states| states.has_member_states(&path))
}

/// Install the `memset`/`memcpy`/`memmove` hooks and the project's
/// `clears_argument` hooks. Repeat calls on one registry do nothing.
pub fn register_struct_assignment(registry: &mut HookRegistry, config: &ProjectConfig) {
    registry.register_once("struct_assignment", |registry| {
        registry.add_hook("memset", match_memset, None);
        registry.add_hook("memcpy", match_memcpy, Some(0));
        registry.add_hook("memmove", match_memcpy, Some(0));

        for directive in load_clears_argument(config) {
            debug!(
                "{} clears argument {}",
                directive.function, directive.param
            );
            registry.add_hook(&directive.function, match_clears_argument, Some(directive.param));
        }
    });
}
