//! Constructors and normalizers for synthesized expressions
//!
//! The aggregate expander builds its fake assignments out of these; nothing
//! here consults types or state.

use crate::parser::ast::{AccessKind, AstNode, SourceLocation, Type, UnOp};

/// Strip syntactic wrapping that does not change which object is named
pub fn strip_wrapping(mut expr: &AstNode) -> &AstNode {
    while let AstNode::Cast { expr: inner, .. } = expr {
        expr = inner;
    }
    expr
}

/// `&x` becomes `x`; anything else is only unwrapped
pub fn remove_addr(expr: &AstNode) -> &AstNode {
    match strip_wrapping(expr) {
        AstNode::UnaryOp {
            op: UnOp::AddrOf,
            operand,
            ..
        } => strip_wrapping(operand),
        other => other,
    }
}

/// `base.member` or `base->member`
pub fn member_access(base: &AstNode, kind: AccessKind, member: &str) -> AstNode {
    let object = Box::new(base.clone());
    let member = member.to_string();
    let location = base.location();
    match kind {
        AccessKind::Direct => AstNode::MemberAccess {
            object,
            member,
            location,
        },
        AccessKind::Dereference => AstNode::PointerMemberAccess {
            object,
            member,
            location,
        },
    }
}

/// `*expr`, folding `*&x` back to `x`
pub fn dereference(expr: &AstNode) -> AstNode {
    match strip_wrapping(expr) {
        AstNode::UnaryOp {
            op: UnOp::AddrOf,
            operand,
            ..
        } => (**operand).clone(),
        other => AstNode::UnaryOp {
            op: UnOp::Deref,
            operand: Box::new(other.clone()),
            location: other.location(),
        },
    }
}

pub fn assignment(lhs: AstNode, rhs: AstNode) -> AstNode {
    let location = lhs.location();
    AstNode::Assignment {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        location,
    }
}

/// The "could be anything" sentinel, typed like the location it is stored to
pub fn unknown_value(ty: &Type, location: SourceLocation) -> AstNode {
    AstNode::Unknown {
        ty: ty.clone(),
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BaseType;

    fn var(name: &str) -> AstNode {
        AstNode::Variable(name.to_string(), SourceLocation::new(1, 1))
    }

    #[test]
    fn test_remove_addr_through_cast() {
        let expr = AstNode::Cast {
            target_type: Type::new(BaseType::Void).with_pointer(),
            expr: Box::new(AstNode::UnaryOp {
                op: UnOp::AddrOf,
                operand: Box::new(var("v")),
                location: SourceLocation::new(1, 1),
            }),
            location: SourceLocation::new(1, 1),
        };
        assert_eq!(remove_addr(&expr), &var("v"));
    }

    #[test]
    fn test_member_access_kinds() {
        let direct = member_access(&var("one"), AccessKind::Direct, "x");
        let deref = member_access(&var("p"), AccessKind::Dereference, "x");
        let assign = assignment(direct, deref);
        assert_eq!(assign.to_string(), "one.x = p->x");
    }

    #[test]
    fn test_dereference_folds_address_of() {
        let addr = AstNode::UnaryOp {
            op: UnOp::AddrOf,
            operand: Box::new(var("v")),
            location: SourceLocation::new(1, 1),
        };
        assert_eq!(dereference(&addr), var("v"));
        assert_eq!(dereference(&var("p")).to_string(), "*p");
    }
}
