//! Type resolution for analyzed programs
//!
//! [`TypeResolver`] answers "what is the declared type of this expression?"
//! for the analyzer. It indexes the program's struct definitions, function
//! return types and globals, and keeps a stack of block scopes for locals.
//!
//! # Type Rules
//!
//! - Integer literals are `int` (or `long` when they do not fit), character
//!   literals are `char`
//! - Variables are looked up innermost scope first, then globals
//! - `*p` yields the pointee, `&x` one more level of pointer
//! - `s.m` and `p->m` yield the member's declared type, including members
//!   of an anonymous nested struct
//! - Calls to undeclared functions are implicitly `int`
//! - `sizeof` is `unsigned long`
//!
//! # Sizes
//!
//! Fixed, platform-independent sizes: `char` 1, `short` 2, `int` 4, `long`
//! and pointers 8. Structs are the sum of their member sizes (no padding).

use crate::parser::ast::*;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Declared types visible at the current program point
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    structs: FxHashMap<String, Rc<StructDef>>,
    functions: FxHashMap<String, Type>,
    params: FxHashMap<String, Vec<Type>>,
    globals: FxHashMap<String, Type>,
    scopes: Vec<FxHashMap<String, Type>>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index structs, function signatures and globals of a program
    pub fn from_program(program: &Program) -> Self {
        let mut resolver = Self::new();

        for node in &program.nodes {
            match node {
                AstNode::StructDef { name, fields, .. } => {
                    resolver.define_struct(StructDef {
                        name: name.clone(),
                        fields: fields.clone(),
                    });
                }
                AstNode::FunctionDef {
                    name,
                    params,
                    return_type,
                    ..
                }
                | AstNode::FunctionDecl {
                    name,
                    params,
                    return_type,
                    ..
                } => {
                    resolver.functions.insert(name.clone(), return_type.clone());
                    resolver.params.insert(
                        name.clone(),
                        params.iter().map(|p| p.param_type.clone()).collect(),
                    );
                }
                AstNode::VarDecl { name, var_type, .. } => {
                    resolver.globals.insert(name.clone(), var_type.clone());
                }
                _ => {}
            }
        }

        resolver
    }

    pub fn define_struct(&mut self, def: StructDef) {
        self.structs.insert(def.name.clone(), Rc::new(def));
    }

    pub fn struct_def(&self, name: &str) -> Option<Rc<StructDef>> {
        self.structs.get(name).cloned()
    }

    /// Declared type of parameter `index` of `function`, when prototyped
    pub fn param_type(&self, function: &str, index: usize) -> Option<&Type> {
        self.params.get(function)?.get(index)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare a local in the innermost scope (a global when no scope is open)
    pub fn declare(&mut self, name: &str, ty: Type) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), ty);
            }
            None => {
                self.globals.insert(name.to_string(), ty);
            }
        }
    }

    pub fn variable_type(&self, name: &str) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Struct behind `expr`, looking through one level of pointer
    pub fn struct_type(&self, expr: &AstNode) -> Option<Rc<StructDef>> {
        let ty = self.type_of(expr)?;
        let ty = if ty.is_pointer() { ty.pointee()? } else { ty };
        self.struct_def(ty.struct_name()?)
    }

    /// Declared type of a member reached from an object of type `object_type`
    pub fn member_type(&self, object_type: &Type, kind: AccessKind, member: &str) -> Option<Type> {
        let struct_type = match kind {
            AccessKind::Direct => object_type.clone(),
            AccessKind::Dereference => object_type.pointee()?,
        };
        let def = self.struct_def(struct_type.struct_name()?)?;
        self.field_type(&def, member)
    }

    /// Declared type of a named member, looking inside anonymous members
    fn field_type(&self, def: &StructDef, member: &str) -> Option<Type> {
        if let Some(field) = def.field(member) {
            return Some(field.field_type.clone());
        }

        def.fields
            .iter()
            .filter(|f| f.name.is_none())
            .filter_map(|f| self.struct_def(f.field_type.struct_name()?))
            .find_map(|inner| self.field_type(&inner, member))
    }

    /// Infer the type of an expression; `None` for statements and for
    /// expressions naming undeclared variables or members
    pub fn type_of(&self, expr: &AstNode) -> Option<Type> {
        match expr {
            AstNode::IntLiteral(n, _) => {
                if i32::try_from(*n).is_ok() {
                    Some(Type::new(BaseType::Int))
                } else {
                    Some(Type::new(BaseType::Long))
                }
            }
            AstNode::CharLiteral(..) => Some(Type::new(BaseType::Char)),
            AstNode::StringLiteral(..) => Some(Type::new(BaseType::Char).with_pointer()),
            AstNode::Null { .. } => Some(Type::new(BaseType::Void).with_pointer()),
            AstNode::Variable(name, _) => self.variable_type(name).cloned(),

            AstNode::Assignment { lhs, .. } | AstNode::CompoundAssignment { lhs, .. } => {
                self.type_of(lhs)
            }

            AstNode::BinaryOp {
                op, left, right, ..
            } => match op {
                BinOp::Add | BinOp::Sub => {
                    let left_type = self.type_of(left)?;
                    let right_type = self.type_of(right)?;
                    if left_type.is_pointer() || left_type.is_array() {
                        if *op == BinOp::Sub && (right_type.is_pointer() || right_type.is_array()) {
                            return Some(Type::new(BaseType::Long));
                        }
                        Some(decay(left_type))
                    } else if right_type.is_pointer() || right_type.is_array() {
                        Some(decay(right_type))
                    } else {
                        Some(arithmetic_result(&left_type, &right_type))
                    }
                }
                BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::And
                | BinOp::Or => Some(Type::new(BaseType::Int)),
                BinOp::BitShl | BinOp::BitShr => self.type_of(left).map(|t| promote(&t)),
                BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                    Some(arithmetic_result(&self.type_of(left)?, &self.type_of(right)?))
                }
            },

            AstNode::UnaryOp { op, operand, .. } => match op {
                UnOp::Deref => {
                    let operand_type = self.type_of(operand)?;
                    operand_type.pointee().or_else(|| operand_type.element())
                }
                UnOp::AddrOf => self.type_of(operand).map(|t| t.address_of()),
                UnOp::Not => Some(Type::new(BaseType::Int)),
                UnOp::Neg | UnOp::BitNot => self.type_of(operand).map(|t| promote(&t)),
                UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => self.type_of(operand),
            },

            AstNode::TernaryOp { true_expr, .. } => self.type_of(true_expr),

            AstNode::FunctionCall { name, .. } => Some(
                self.functions
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Type::new(BaseType::Int)),
            ),

            AstNode::ArrayAccess { array, .. } => {
                let array_type = self.type_of(array)?;
                array_type.element().or_else(|| array_type.pointee())
            }

            AstNode::MemberAccess { object, member, .. } => {
                self.member_type(&self.type_of(object)?, AccessKind::Direct, member)
            }

            AstNode::PointerMemberAccess { object, member, .. } => {
                self.member_type(&decay(self.type_of(object)?), AccessKind::Dereference, member)
            }

            AstNode::Cast { target_type, .. } => Some(target_type.clone()),

            AstNode::SizeofType { .. } | AstNode::SizeofExpr { .. } => {
                Some(Type::new(BaseType::UnsignedLong))
            }

            AstNode::Unknown { ty, .. } => Some(ty.clone()),

            _ => None,
        }
    }

    /// Size of a type in bytes; `None` for incomplete types
    pub fn sizeof(&self, ty: &Type) -> Option<usize> {
        let elem_size = if ty.pointer_depth > 0 {
            8
        } else {
            match &ty.base {
                BaseType::Char | BaseType::UnsignedChar => 1,
                BaseType::Short | BaseType::UnsignedShort => 2,
                BaseType::Int | BaseType::UnsignedInt => 4,
                BaseType::Long | BaseType::UnsignedLong => 8,
                BaseType::Void => 1,
                BaseType::Struct(name) => {
                    let def = self.struct_def(name)?;
                    def.fields
                        .iter()
                        .map(|f| self.sizeof(&f.field_type))
                        .sum::<Option<usize>>()?
                }
            }
        };

        ty.array_dims
            .iter()
            .try_fold(elem_size, |size, dim| dim.map(|n| size * n))
    }
}

/// Arrays used as values decay to a pointer to their first element
fn decay(ty: Type) -> Type {
    if ty.is_array() {
        let mut elem = ty;
        elem.array_dims.remove(0);
        elem.with_pointer()
    } else {
        ty
    }
}

/// Integer promotion: anything narrower than `int` becomes `int`
fn promote(ty: &Type) -> Type {
    match ty.base {
        BaseType::Char | BaseType::UnsignedChar | BaseType::Short | BaseType::UnsignedShort
            if ty.pointer_depth == 0 =>
        {
            Type::new(BaseType::Int)
        }
        _ => ty.clone(),
    }
}

/// Usual arithmetic conversions, restricted to the supported integer types
fn arithmetic_result(left: &Type, right: &Type) -> Type {
    fn rank(base: &BaseType) -> u8 {
        match base {
            BaseType::UnsignedLong => 4,
            BaseType::Long => 3,
            BaseType::UnsignedInt => 2,
            _ => 1,
        }
    }

    let (left, right) = (promote(left), promote(right));
    if rank(&left.base) >= rank(&right.base) {
        Type::new(left.base)
    } else {
        Type::new(right.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::Parser;

    fn resolver(source: &str) -> TypeResolver {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        TypeResolver::from_program(&program)
    }

    fn expr(source: &str) -> AstNode {
        let program = Parser::new(&format!("void __probe() {{ {}; }}", source))
            .unwrap()
            .parse_program()
            .unwrap();
        match program.nodes.into_iter().next() {
            Some(AstNode::FunctionDef { mut body, .. }) => match body.remove(0) {
                AstNode::ExpressionStatement { expr, .. } => *expr,
                other => panic!("Expected expression statement, got {:?}", other),
            },
            other => panic!("Expected function, got {:?}", other),
        }
    }

    const SOURCE: &str = r#"
        struct point { int x; int y; };
        struct box { struct point tl; struct point *br; char tag[4]; };
        struct box b;
        struct box *pb;
        long count(void);
    "#;

    #[test]
    fn test_member_types() {
        let types = resolver(SOURCE);

        assert_eq!(types.type_of(&expr("b.tl.x")), Some(Type::new(BaseType::Int)));
        assert_eq!(
            types.type_of(&expr("pb->br")),
            Some(Type::new(BaseType::Struct("point".to_string())).with_pointer())
        );
        assert_eq!(types.type_of(&expr("pb->br->y")), Some(Type::new(BaseType::Int)));
        assert_eq!(types.type_of(&expr("(*pb).tag[1]")), Some(Type::new(BaseType::Char)));
        assert_eq!(types.type_of(&expr("b.missing")), None);
    }

    #[test]
    fn test_members_of_anonymous_struct() {
        let types = resolver("struct s { int a; struct { char b; }; }; struct s v;");

        assert_eq!(types.type_of(&expr("v.b")), Some(Type::new(BaseType::Char)));
        assert_eq!(types.type_of(&expr("(&v)->b")), Some(Type::new(BaseType::Char)));
        assert_eq!(types.type_of(&expr("v.c")), None);
    }

    #[test]
    fn test_struct_type_is_pointer_aware() {
        let types = resolver(SOURCE);

        assert_eq!(types.struct_type(&expr("b")).unwrap().name, "box");
        assert_eq!(types.struct_type(&expr("pb")).unwrap().name, "box");
        assert_eq!(types.struct_type(&expr("&b")).unwrap().name, "box");
        assert!(types.struct_type(&expr("b.tag")).is_none());
        assert!(types.struct_type(&expr("b.tl.x")).is_none());
    }

    #[test]
    fn test_calls_and_sizeof() {
        let types = resolver(SOURCE);

        assert_eq!(types.type_of(&expr("count()")), Some(Type::new(BaseType::Long)));
        assert_eq!(types.type_of(&expr("undeclared(1)")), Some(Type::new(BaseType::Int)));
        assert!(types.param_type("count", 0).is_none());
        assert_eq!(
            types.sizeof(&Type::new(BaseType::Struct("box".to_string()))),
            Some(8 + 8 + 4)
        );
        assert_eq!(types.sizeof(&Type::new(BaseType::Struct("nope".to_string()))), None);
    }

    #[test]
    fn test_scopes_shadow_globals() {
        let mut types = resolver(SOURCE);

        types.push_scope();
        types.declare("b", Type::new(BaseType::Int));
        assert_eq!(types.variable_type("b"), Some(&Type::new(BaseType::Int)));
        types.pop_scope();
        assert_eq!(
            types.variable_type("b"),
            Some(&Type::new(BaseType::Struct("box".to_string())))
        );
    }
}
