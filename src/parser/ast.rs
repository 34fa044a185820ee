// AST (Abstract Syntax Tree) definitions for the analyzed C subset

use std::fmt;

/// Source location information for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Base types understood by the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Char,
    Short,
    Int,
    Long,
    UnsignedChar,
    UnsignedShort,
    UnsignedInt,
    UnsignedLong,
    Void,
    Struct(String), // Struct tag (anonymous structs get a synthetic tag)
}

/// Type representation with const qualifier, pointers, and arrays
///
/// Array dimensions bind tighter than pointers: `int *a[4]` is an array of
/// four `int *`, stored as `pointer_depth = 1, array_dims = [Some(4)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub is_const: bool,
    pub pointer_depth: usize, // 0 = not pointer, 1 = *, 2 = **, etc.
    pub array_dims: Vec<Option<usize>>, // None for unsized dimension (function params)
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            is_const: false,
            pointer_depth: 0,
            array_dims: Vec::new(),
        }
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn with_array(mut self, size: Option<usize>) -> Self {
        self.array_dims.push(size);
        self
    }

    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0 && self.array_dims.is_empty()
    }

    /// A struct value: not a pointer to one, not an array of them.
    pub fn is_struct(&self) -> bool {
        self.pointer_depth == 0
            && self.array_dims.is_empty()
            && matches!(self.base, BaseType::Struct(_))
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_array() && !self.is_struct() && !self.is_void()
    }

    pub fn is_void(&self) -> bool {
        self.pointer_depth == 0 && self.array_dims.is_empty() && self.base == BaseType::Void
    }

    /// The struct tag when this type is a struct value
    pub fn struct_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Struct(name) if self.is_struct() => Some(name),
            _ => None,
        }
    }

    /// `T` for `T *`; `None` for anything that is not a pointer
    pub fn pointee(&self) -> Option<Type> {
        if !self.is_pointer() {
            return None;
        }
        let mut inner = self.clone();
        inner.pointer_depth -= 1;
        inner.is_const = false;
        Some(inner)
    }

    /// `T` for `T[N]`; arrays decay one dimension at a time
    pub fn element(&self) -> Option<Type> {
        if !self.is_array() {
            return None;
        }
        let mut inner = self.clone();
        inner.array_dims.remove(0);
        Some(inner)
    }

    /// Type of `&expr` where `expr: self`
    pub fn address_of(&self) -> Type {
        let mut outer = self.clone();
        if outer.is_array() {
            outer.array_dims.remove(0);
        }
        outer.pointer_depth += 1;
        outer
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Char => write!(f, "char"),
            BaseType::Short => write!(f, "short"),
            BaseType::Int => write!(f, "int"),
            BaseType::Long => write!(f, "long"),
            BaseType::UnsignedChar => write!(f, "unsigned char"),
            BaseType::UnsignedShort => write!(f, "unsigned short"),
            BaseType::UnsignedInt => write!(f, "unsigned int"),
            BaseType::UnsignedLong => write!(f, "unsigned long"),
            BaseType::Void => write!(f, "void"),
            BaseType::Struct(name) => write!(f, "struct {}", name),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}", self.base)?;
        if self.pointer_depth > 0 {
            write!(f, " {}", "*".repeat(self.pointer_depth))?;
        }
        for dim in &self.array_dims {
            match dim {
                Some(n) => write!(f, "[{}]", n)?,
                None => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitShl => "<<",
            BinOp::BitShr => ">>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

/// How a member is reached from its base expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessKind {
    /// `base.member`
    Direct,
    /// `base->member`, i.e. `(*base).member`
    Dereference,
}

impl AccessKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            AccessKind::Direct => ".",
            AccessKind::Dereference => "->",
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>, // prototypes may omit parameter names
    pub param_type: Type,
}

/// Struct member; `name` is `None` for an anonymous nested struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub field_type: Type,
}

/// Struct definition with members in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
    }
}

/// AST nodes representing declarations, statements and expressions
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Top-level declarations
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<AstNode>,
        return_type: Type,
        location: SourceLocation,
    },
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        return_type: Type,
        location: SourceLocation,
    },
    StructDef {
        name: String,
        fields: Vec<Field>,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        name: String,
        var_type: Type,
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    DoWhile {
        body: Vec<AstNode>,
        condition: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(i64, SourceLocation),
    CharLiteral(i8, SourceLocation),
    StringLiteral(String, SourceLocation),
    Null {
        location: SourceLocation,
    },
    Variable(String, SourceLocation),
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundAssignment {
        lhs: Box<AstNode>,
        op: BinOp,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    TernaryOp {
        condition: Box<AstNode>,
        true_expr: Box<AstNode>,
        false_expr: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    ArrayAccess {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    MemberAccess {
        object: Box<AstNode>,
        member: String,
        location: SourceLocation,
    },
    PointerMemberAccess {
        object: Box<AstNode>,
        member: String,
        location: SourceLocation,
    },
    Cast {
        target_type: Type,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    SizeofType {
        target_type: Type,
        location: SourceLocation,
    },
    SizeofExpr {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    /// Synthesized "could be anything" value of the given type
    Unknown {
        ty: Type,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. }
            | AstNode::FunctionDecl { location, .. }
            | AstNode::StructDef { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::DoWhile { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Null { location }
            | AstNode::Assignment { location, .. }
            | AstNode::CompoundAssignment { location, .. }
            | AstNode::BinaryOp { location, .. }
            | AstNode::UnaryOp { location, .. }
            | AstNode::TernaryOp { location, .. }
            | AstNode::FunctionCall { location, .. }
            | AstNode::ArrayAccess { location, .. }
            | AstNode::MemberAccess { location, .. }
            | AstNode::PointerMemberAccess { location, .. }
            | AstNode::Cast { location, .. }
            | AstNode::SizeofType { location, .. }
            | AstNode::SizeofExpr { location, .. }
            | AstNode::Unknown { location, .. } => *location,
            AstNode::IntLiteral(_, loc)
            | AstNode::CharLiteral(_, loc)
            | AstNode::StringLiteral(_, loc)
            | AstNode::Variable(_, loc) => *loc,
        }
    }

    /// Whether this node binds tighter than any binary operator when printed
    fn is_postfix_or_primary(&self) -> bool {
        matches!(
            self,
            AstNode::IntLiteral(..)
                | AstNode::CharLiteral(..)
                | AstNode::StringLiteral(..)
                | AstNode::Null { .. }
                | AstNode::Variable(..)
                | AstNode::FunctionCall { .. }
                | AstNode::ArrayAccess { .. }
                | AstNode::MemberAccess { .. }
                | AstNode::PointerMemberAccess { .. }
                | AstNode::Unknown { .. }
        )
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_postfix_or_primary() {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

/// C-like rendering, used in logs and test assertions
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::IntLiteral(n, _) => write!(f, "{}", n),
            AstNode::CharLiteral(c, _) => write!(f, "{}", c),
            AstNode::StringLiteral(s, _) => write!(f, "\"{}\"", s),
            AstNode::Null { .. } => write!(f, "NULL"),
            AstNode::Variable(name, _) => write!(f, "{}", name),
            AstNode::Assignment { lhs, rhs, .. } => write!(f, "{} = {}", lhs, rhs),
            AstNode::CompoundAssignment { lhs, op, rhs, .. } => {
                write!(f, "{} {}= {}", lhs, op.symbol(), rhs)
            }
            AstNode::BinaryOp {
                op, left, right, ..
            } => {
                left.fmt_operand(f)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f)
            }
            AstNode::UnaryOp { op, operand, .. } => match op {
                UnOp::PostInc | UnOp::PostDec => {
                    operand.fmt_operand(f)?;
                    write!(f, "{}", if *op == UnOp::PostInc { "++" } else { "--" })
                }
                _ => {
                    let prefix = match op {
                        UnOp::Neg => "-",
                        UnOp::Not => "!",
                        UnOp::BitNot => "~",
                        UnOp::PreInc => "++",
                        UnOp::PreDec => "--",
                        UnOp::Deref => "*",
                        UnOp::AddrOf => "&",
                        UnOp::PostInc | UnOp::PostDec => unreachable!(),
                    };
                    write!(f, "{}", prefix)?;
                    operand.fmt_operand(f)
                }
            },
            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                condition.fmt_operand(f)?;
                write!(f, " ? ")?;
                true_expr.fmt_operand(f)?;
                write!(f, " : ")?;
                false_expr.fmt_operand(f)
            }
            AstNode::FunctionCall { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            AstNode::ArrayAccess { array, index, .. } => {
                array.fmt_operand(f)?;
                write!(f, "[{}]", index)
            }
            AstNode::MemberAccess { object, member, .. } => {
                object.fmt_operand(f)?;
                write!(f, ".{}", member)
            }
            AstNode::PointerMemberAccess { object, member, .. } => {
                object.fmt_operand(f)?;
                write!(f, "->{}", member)
            }
            AstNode::Cast {
                target_type, expr, ..
            } => {
                write!(f, "({})", target_type)?;
                expr.fmt_operand(f)
            }
            AstNode::SizeofType { target_type, .. } => write!(f, "sizeof({})", target_type),
            AstNode::SizeofExpr { expr, .. } => write!(f, "sizeof({})", expr),
            AstNode::Unknown { .. } => write!(f, "unknown"),
            AstNode::ExpressionStatement { expr, .. } => write!(f, "{};", expr),
            AstNode::VarDecl { name, var_type, .. } => write!(f, "{} {};", var_type, name),
            AstNode::FunctionDef { name, .. } | AstNode::FunctionDecl { name, .. } => {
                write!(f, "function {}", name)
            }
            AstNode::StructDef { name, .. } => write!(f, "struct {}", name),
            AstNode::Block { .. } => write!(f, "{{ ... }}"),
            AstNode::Return { expr: Some(e), .. } => write!(f, "return {};", e),
            AstNode::Return { expr: None, .. } => write!(f, "return;"),
            AstNode::If { .. } => write!(f, "if (...)"),
            AstNode::While { .. } | AstNode::DoWhile { .. } => write!(f, "while (...)"),
            AstNode::For { .. } => write!(f, "for (...)"),
            AstNode::Break { .. } => write!(f, "break;"),
            AstNode::Continue { .. } => write!(f, "continue;"),
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // Top-level declarations in source order
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
