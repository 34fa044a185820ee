use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use std::mem;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the analyzed C subset
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Struct definitions found while parsing a type, emitted ahead of the
    /// declaration that contained them
    pending_structs: Vec<AstNode>,
    anon_count: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            pending_structs: Vec::new(),
            anon_count: 0,
        })
    }

    /// Parse the entire program (top-level declarations)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            let decls = self.parse_external_declaration()?;
            program.nodes.append(&mut self.pending_structs);
            program.nodes.extend(decls);
        }

        Ok(program)
    }

    /// Struct definition, forward declaration, prototype, function definition
    /// or global variable list
    fn parse_external_declaration(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let loc = self.current_location();
        let base_type = self.parse_base_type()?;

        // `struct foo { ... };` or `struct foo;`
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(Vec::new());
        }

        let (ty, name) = self.parse_declarator(base_type.clone())?;

        if self.match_token(&TokenKind::LParen) {
            let params = self.parse_parameter_list()?;
            self.expect_token(&TokenKind::RParen, "Expected ')' after parameters")?;

            if self.match_token(&TokenKind::Semicolon) {
                return Ok(vec![AstNode::FunctionDecl {
                    name,
                    params,
                    return_type: ty,
                    location: loc,
                }]);
            }

            self.expect_token(&TokenKind::LBrace, "Expected '{' before function body")?;
            let body = self.parse_block_statements()?;
            self.expect_token(&TokenKind::RBrace, "Expected '}' after function body")?;

            return Ok(vec![AstNode::FunctionDef {
                name,
                params,
                body,
                return_type: ty,
                location: loc,
            }]);
        }

        self.finish_variable_declarations(base_type, ty, name, loc)
    }

    /// `[const] base [const] *...`, defining any struct body it contains
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let mut ty = self.parse_base_type()?;
        while self.match_token(&TokenKind::Star) {
            ty = ty.with_pointer();
            self.match_token(&TokenKind::Const);
        }
        Ok(ty)
    }

    /// The type specifier shared by every declarator of one declaration
    fn parse_base_type(&mut self) -> Result<Type, ParseError> {
        let mut is_const = self.match_token(&TokenKind::Const);

        let base = if self.match_token(&TokenKind::Struct) {
            self.parse_struct_specifier()?
        } else if self.match_token(&TokenKind::Void) {
            BaseType::Void
        } else {
            self.parse_integer_type()?
        };

        is_const |= self.match_token(&TokenKind::Const);

        let ty = Type::new(base);
        Ok(if is_const { ty.with_const() } else { ty })
    }

    fn parse_integer_type(&mut self) -> Result<BaseType, ParseError> {
        let location = self.current_location();
        let unsigned = self.match_token(&TokenKind::Unsigned);
        let signed = !unsigned && self.match_token(&TokenKind::Signed);

        let base = if self.match_token(&TokenKind::Char) {
            if unsigned {
                BaseType::UnsignedChar
            } else {
                BaseType::Char
            }
        } else if self.match_token(&TokenKind::Short) {
            self.match_token(&TokenKind::Int);
            if unsigned {
                BaseType::UnsignedShort
            } else {
                BaseType::Short
            }
        } else if self.match_token(&TokenKind::Long) {
            self.match_token(&TokenKind::Long);
            self.match_token(&TokenKind::Int);
            if unsigned {
                BaseType::UnsignedLong
            } else {
                BaseType::Long
            }
        } else if self.match_token(&TokenKind::Int) || unsigned || signed {
            if unsigned {
                BaseType::UnsignedInt
            } else {
                BaseType::Int
            }
        } else {
            return Err(ParseError {
                message: format!("Expected type, found {}", self.peek()),
                location,
            });
        };

        Ok(base)
    }

    /// After `struct`: `Tag`, `Tag { ... }` or `{ ... }`
    fn parse_struct_specifier(&mut self) -> Result<BaseType, ParseError> {
        let loc = self.previous_location();

        let tag = if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        if !self.check(&TokenKind::LBrace) {
            return match tag {
                Some(name) => Ok(BaseType::Struct(name)),
                None => Err(ParseError {
                    message: format!("Expected struct tag or '{{', found {}", self.peek()),
                    location: self.current_location(),
                }),
            };
        }

        let name = tag.unwrap_or_else(|| {
            self.anon_count += 1;
            format!("__anon_{}", self.anon_count)
        });

        self.advance(); // '{'
        let fields = self.parse_struct_fields()?;
        self.expect_token(&TokenKind::RBrace, "Expected '}' after struct fields")?;

        self.pending_structs.push(AstNode::StructDef {
            name: name.clone(),
            fields,
            location: loc,
        });

        Ok(BaseType::Struct(name))
    }

    fn parse_struct_fields(&mut self) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let base_type = self.parse_base_type()?;

            // Anonymous member: `struct { int a; };`
            if self.match_token(&TokenKind::Semicolon) {
                fields.push(Field {
                    name: None,
                    field_type: base_type,
                });
                continue;
            }

            loop {
                let (field_type, name) = self.parse_declarator(base_type.clone())?;
                fields.push(Field {
                    name: Some(name),
                    field_type,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after struct field")?;
        }

        Ok(fields)
    }

    /// Extra `*`s, the name, then any `[N]` suffixes
    fn parse_declarator(&mut self, mut ty: Type) -> Result<(Type, String), ParseError> {
        while self.match_token(&TokenKind::Star) {
            ty = ty.with_pointer();
            self.match_token(&TokenKind::Const);
        }
        let name = self.expect_identifier()?;
        let ty = self.parse_array_suffixes(ty)?;
        Ok((ty, name))
    }

    fn parse_array_suffixes(&mut self, mut ty: Type) -> Result<Type, ParseError> {
        while self.match_token(&TokenKind::LBracket) {
            if self.match_token(&TokenKind::RBracket) {
                ty = ty.with_array(None);
                continue;
            }
            let location = self.current_location();
            let size = match self.parse_expression()? {
                AstNode::IntLiteral(n, _) if n >= 0 => n as usize,
                _ => {
                    return Err(ParseError {
                        message: "Array size must be a constant integer".to_string(),
                        location,
                    })
                }
            };
            self.expect_token(&TokenKind::RBracket, "Expected ']' after array size")?;
            ty = ty.with_array(Some(size));
        }
        Ok(ty)
    }

    /// Parse parameter list: (type [name], ...)
    fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }

        // (void) means no parameters in C
        if self.check(&TokenKind::Void)
            && matches!(self.peek_ahead(1).map(|t| &t.kind), Some(TokenKind::RParen))
        {
            self.advance();
            return Ok(params);
        }

        loop {
            let mut param_type = self.parse_type()?;
            let name = if let TokenKind::Ident(name) = &self.peek().kind {
                let name = name.clone();
                self.advance();
                param_type = self.parse_array_suffixes(param_type)?;
                Some(name)
            } else {
                None
            };
            params.push(Param { name, param_type });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// Declarators after the first one, up to and including the `;`
    fn finish_variable_declarations(
        &mut self,
        base_type: Type,
        first_type: Type,
        first_name: String,
        loc: SourceLocation,
    ) -> Result<Vec<AstNode>, ParseError> {
        let mut decls = Vec::new();
        let (mut var_type, mut name, mut location) = (first_type, first_name, loc);

        loop {
            let init = if self.match_token(&TokenKind::Eq) {
                Some(Box::new(self.parse_assignment()?))
            } else {
                None
            };
            decls.push(AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            location = self.current_location();
            (var_type, name) = self.parse_declarator(base_type.clone())?;
        }

        self.expect_token(&TokenKind::Semicolon, "Expected ';' after variable declaration")?;
        Ok(decls)
    }

    fn parse_variable_declarations(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let loc = self.current_location();
        let base_type = self.parse_base_type()?;
        if self.match_token(&TokenKind::Semicolon) {
            // A local struct definition without a variable
            return Ok(Vec::new());
        }
        let (ty, name) = self.parse_declarator(base_type.clone())?;
        self.finish_variable_declarations(base_type, ty, name, loc)
    }

    /// Parse block statements (inside braces, excluding the braces themselves)
    fn parse_block_statements(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.is_type_start() {
                let decls = self.parse_variable_declarations()?;
                statements.append(&mut self.pending_structs);
                statements.extend(decls);
            } else {
                statements.push(self.parse_statement()?);
            }
        }

        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&TokenKind::LBrace) {
            let statements = self.parse_block_statements()?;
            self.expect_token(&TokenKind::RBrace, "Expected '}' after block")?;
            return Ok(AstNode::Block {
                statements,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Return) {
            let expr = if self.check(&TokenKind::Semicolon) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after return")?;
            return Ok(AstNode::Return { expr, location: loc });
        }

        if self.match_token(&TokenKind::If) {
            return self.parse_if_statement(loc);
        }

        if self.match_token(&TokenKind::While) {
            self.expect_token(&TokenKind::LParen, "Expected '(' after 'while'")?;
            let condition = Box::new(self.parse_expression()?);
            self.expect_token(&TokenKind::RParen, "Expected ')' after while condition")?;
            let body = self.parse_statement_or_block()?;
            return Ok(AstNode::While {
                condition,
                body,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Do) {
            let body = self.parse_statement_or_block()?;
            self.expect_token(&TokenKind::While, "Expected 'while' after do body")?;
            self.expect_token(&TokenKind::LParen, "Expected '(' after 'while'")?;
            let condition = Box::new(self.parse_expression()?);
            self.expect_token(&TokenKind::RParen, "Expected ')' after do-while condition")?;
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after do-while")?;
            return Ok(AstNode::DoWhile {
                body,
                condition,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::For) {
            return self.parse_for_statement(loc);
        }

        if self.match_token(&TokenKind::Break) {
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&TokenKind::Continue) {
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        if self.is_type_start() {
            let mut statements = self.parse_variable_declarations()?;
            statements.splice(0..0, mem::take(&mut self.pending_structs));
            return Ok(if statements.len() == 1 {
                statements.remove(0)
            } else {
                AstNode::Block {
                    statements,
                    location: loc,
                }
            });
        }

        // Empty statement
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(AstNode::Block {
                statements: Vec::new(),
                location: loc,
            });
        }

        let expr = self.parse_expression()?;
        self.expect_token(&TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(AstNode::ExpressionStatement {
            expr: Box::new(expr),
            location: loc,
        })
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        self.expect_token(&TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_token(&TokenKind::RParen, "Expected ')' after if condition")?;

        let then_branch = self.parse_statement_or_block()?;

        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(self.parse_statement_or_block()?)
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        self.expect_token(&TokenKind::LParen, "Expected '(' after 'for'")?;

        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.is_type_start() {
            // Declaration consumes its own ';'
            Some(Box::new(self.parse_statement()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect_token(&TokenKind::Semicolon, "Expected ';' after for init")?;
            Some(Box::new(expr))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_token(&TokenKind::Semicolon, "Expected ';' after for condition")?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_token(&TokenKind::RParen, "Expected ')' after for clauses")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// Parse statement or block (for if/while/for bodies)
    fn parse_statement_or_block(&mut self) -> Result<Vec<AstNode>, ParseError> {
        if self.match_token(&TokenKind::LBrace) {
            let statements = self.parse_block_statements()?;
            self.expect_token(&TokenKind::RBrace, "Expected '}' after block")?;
            Ok(statements)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    // ===== Expressions =====

    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_assignment()?;
        // Comma operator: keep the last operand, discard the rest
        while self.match_token(&TokenKind::Comma) {
            expr = self.parse_assignment()?;
        }
        Ok(expr)
    }

    /// Parse assignment or ternary (right-associative)
    fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_ternary()?;

        let loc = self.current_location();
        if self.match_token(&TokenKind::Eq) {
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::Assignment {
                lhs: Box::new(expr),
                rhs,
                location: loc,
            });
        }

        let compound_op = match self.peek().kind {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => None,
        };

        if let Some(op) = compound_op {
            self.advance();
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::CompoundAssignment {
                lhs: Box::new(expr),
                op,
                rhs,
                location: loc,
            });
        }

        Ok(expr)
    }

    fn parse_ternary(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_binary(0)?;

        if self.match_token(&TokenKind::Question) {
            let loc = self.previous_location();
            let true_expr = Box::new(self.parse_expression()?);
            self.expect_token(&TokenKind::Colon, "Expected ':' in ternary expression")?;
            let false_expr = Box::new(self.parse_ternary()?);

            return Ok(AstNode::TernaryOp {
                condition: Box::new(expr),
                true_expr,
                false_expr,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Binary operator at the current token with its precedence (higher binds tighter)
    fn binary_operator(&self) -> Option<(BinOp, u8)> {
        let op = match self.peek().kind {
            TokenKind::OrOr => (BinOp::Or, 1),
            TokenKind::AndAnd => (BinOp::And, 2),
            TokenKind::Pipe => (BinOp::BitOr, 3),
            TokenKind::Caret => (BinOp::BitXor, 4),
            TokenKind::Amp => (BinOp::BitAnd, 5),
            TokenKind::EqEq => (BinOp::Eq, 6),
            TokenKind::NotEq => (BinOp::Ne, 6),
            TokenKind::Lt => (BinOp::Lt, 7),
            TokenKind::Le => (BinOp::Le, 7),
            TokenKind::Gt => (BinOp::Gt, 7),
            TokenKind::Ge => (BinOp::Ge, 7),
            TokenKind::LtLt => (BinOp::BitShl, 8),
            TokenKind::GtGt => (BinOp::BitShr, 8),
            TokenKind::Plus => (BinOp::Add, 9),
            TokenKind::Minus => (BinOp::Sub, 9),
            TokenKind::Star => (BinOp::Mul, 10),
            TokenKind::Slash => (BinOp::Div, 10),
            TokenKind::Percent => (BinOp::Mod, 10),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over all left-associative binary operators
    fn parse_binary(&mut self, min_prec: u8) -> Result<AstNode, ParseError> {
        let mut left = self.parse_cast()?;

        while let Some((op, prec)) = self.binary_operator() {
            if prec <= min_prec {
                break;
            }
            let loc = self.current_location();
            self.advance();
            let right = self.parse_binary(prec)?;
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse cast: (Type*)expr
    fn parse_cast(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();
        if self.check(&TokenKind::LParen) && self.is_type_start_at(1) {
            self.advance(); // '('
            let target_type = self.parse_type()?;
            self.expect_token(&TokenKind::RParen, "Expected ')' after cast type")?;
            let expr = Box::new(self.parse_cast()?);
            return Ok(AstNode::Cast {
                target_type,
                expr,
                location: loc,
            });
        }

        self.parse_unary()
    }

    /// Parse unary (! ~ - + & * ++ -- sizeof)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Amp => Some(UnOp::AddrOf),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_cast()?;
            // Fold negative literals so array sizes and directives stay literal
            if let (UnOp::Neg, AstNode::IntLiteral(n, _)) = (op, &operand) {
                return Ok(AstNode::IntLiteral(-n, loc));
            }
            return Ok(AstNode::UnaryOp {
                op,
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Plus) {
            return self.parse_cast();
        }

        if self.match_token(&TokenKind::Sizeof) {
            if self.check(&TokenKind::LParen) && self.is_type_start_at(1) {
                self.advance();
                let target_type = self.parse_type()?;
                let target_type = self.parse_array_suffixes(target_type)?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after sizeof type")?;
                return Ok(AstNode::SizeofType {
                    target_type,
                    location: loc,
                });
            }

            let expr = Box::new(self.parse_unary()?);
            return Ok(AstNode::SizeofExpr {
                expr,
                location: loc,
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix (++ -- [] . -> ())
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&TokenKind::PlusPlus) {
                expr = AstNode::UnaryOp {
                    op: UnOp::PostInc,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&TokenKind::MinusMinus) {
                expr = AstNode::UnaryOp {
                    op: UnOp::PostDec,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = Box::new(self.parse_expression()?);
                self.expect_token(&TokenKind::RBracket, "Expected ']' after array index")?;
                expr = AstNode::ArrayAccess {
                    array: Box::new(expr),
                    index,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::Dot) {
                let member = self.expect_identifier()?;
                expr = AstNode::MemberAccess {
                    object: Box::new(expr),
                    member,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::Arrow) {
                let member = self.expect_identifier()?;
                expr = AstNode::PointerMemberAccess {
                    object: Box::new(expr),
                    member,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::LParen) {
                let args = self.parse_argument_list()?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after function arguments")?;

                let name = match expr {
                    AstNode::Variable(name, _) => name,
                    _ => {
                        return Err(ParseError {
                            message: "Function call must be on identifier".to_string(),
                            location: loc,
                        })
                    }
                };

                expr = AstNode::FunctionCall {
                    name,
                    args,
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let token = self.peek().clone();
        let loc = token.location;

        let node = match token.kind {
            TokenKind::IntLiteral(n) => AstNode::IntLiteral(n, loc),
            TokenKind::CharLiteral(c) => AstNode::CharLiteral(c, loc),
            TokenKind::StringLiteral(s) => AstNode::StringLiteral(s, loc),
            TokenKind::Null => AstNode::Null { location: loc },
            TokenKind::Ident(name) => AstNode::Variable(name, loc),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(&TokenKind::RParen, "Expected ')' after expression")?;
                return Ok(expr);
            }
            _ => {
                return Err(ParseError {
                    message: format!("Unexpected token: {}", token),
                    location: loc,
                })
            }
        };

        self.advance();
        Ok(node)
    }

    // ===== Helper methods =====

    fn is_type_start(&self) -> bool {
        self.is_type_start_at(0)
    }

    fn is_type_start_at(&self, n: usize) -> bool {
        matches!(
            self.peek_ahead(n).map(|t| &t.kind),
            Some(
                TokenKind::Int
                    | TokenKind::Char
                    | TokenKind::Short
                    | TokenKind::Long
                    | TokenKind::Signed
                    | TokenKind::Unsigned
                    | TokenKind::Void
                    | TokenKind::Struct
                    | TokenKind::Const
            )
        )
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.peek().kind) == mem::discriminant(kind)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.position - 1]
    }

    fn previous_location(&self) -> SourceLocation {
        self.previous().location
    }

    fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek()),
                location: self.current_location(),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseError {
                message: format!("Expected identifier, found {}", self.peek()),
                location: self.current_location(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }");

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::FunctionDef {
                name,
                params,
                return_type,
                body,
                ..
            } => {
                assert_eq!(name, "main");
                assert_eq!(params.len(), 0);
                assert_eq!(return_type.base, BaseType::Int);
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_prototypes_compare_by_signature() {
        let first = parse("void wipe(struct foo *dst, int n);");
        let second = parse("void wipe(struct foo *dst, int n);");
        let renamed = parse("void wipe(struct foo *out, int n);");

        assert_eq!(first.nodes, second.nodes);
        assert_ne!(first.nodes, renamed.nodes);
    }

    #[test]
    fn test_parse_struct_with_array_and_pointer_members() {
        let program = parse("struct foo { int a; char buf[16]; struct foo *next; };");

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::StructDef { name, fields, .. } => {
                assert_eq!(name, "foo");
                assert_eq!(fields.len(), 3);
                assert!(fields[1].field_type.is_array());
                assert!(fields[2].field_type.is_pointer());
                assert_eq!(fields[2].field_type.base, BaseType::Struct("foo".to_string()));
            }
            _ => panic!("Expected struct definition"),
        }
    }

    #[test]
    fn test_parse_nested_and_anonymous_members() {
        let program = parse(
            "struct outer { struct inner { int x; } in; struct { int y; }; int a, b; };",
        );

        // inner, the anonymous struct, then outer
        assert_eq!(program.nodes.len(), 3);
        let names: Vec<_> = program
            .nodes
            .iter()
            .map(|n| match n {
                AstNode::StructDef { name, .. } => name.clone(),
                _ => panic!("Expected struct definition"),
            })
            .collect();
        assert_eq!(names, vec!["inner", "__anon_1", "outer"]);

        match &program.nodes[2] {
            AstNode::StructDef { fields, .. } => {
                assert_eq!(fields.len(), 4);
                assert_eq!(fields[0].name.as_deref(), Some("in"));
                assert_eq!(fields[1].name, None);
                assert_eq!(fields[3].name.as_deref(), Some("b"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_prototype_and_globals() {
        let program = parse("void *memset(void *, int c, unsigned long n);\nint g = 3, *gp;");

        assert_eq!(program.nodes.len(), 3);
        match &program.nodes[0] {
            AstNode::FunctionDecl {
                name,
                params,
                return_type,
                ..
            } => {
                assert_eq!(name, "memset");
                assert!(return_type.is_pointer());
                assert_eq!(params[0].name, None);
                assert_eq!(params[2].param_type.base, BaseType::UnsignedLong);
            }
            _ => panic!("Expected prototype"),
        }
        assert!(matches!(
            &program.nodes[2],
            AstNode::VarDecl { name, var_type, init: None, .. } if name == "gp" && var_type.is_pointer()
        ));
    }

    #[test]
    fn test_parse_member_chain_display() {
        let program = parse("void f(struct s *p) { p->a.b = (*p).c + 1; }");
        match &program.nodes[0] {
            AstNode::FunctionDef { params, body, .. } => {
                assert_eq!(params[0].name.as_deref(), Some("p"));
                assert_eq!(body[0].to_string(), "p->a.b = (*p).c + 1;");
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_memcpy_call_with_casts() {
        let program = parse(
            "struct s { int x; }; void f() { struct s a, b; memcpy((void *)&a, &b, sizeof(struct s)); }",
        );
        match &program.nodes[1] {
            AstNode::FunctionDef { body, .. } => {
                assert_eq!(body.len(), 3);
                assert_eq!(
                    body[2].to_string(),
                    "memcpy((void *)(&a), &b, sizeof(struct s));"
                );
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse("int main() { return 1 + 2 * 3 == 7 && 1; }");
        match &program.nodes[0] {
            AstNode::FunctionDef { body, .. } => {
                assert_eq!(body[0].to_string(), "return ((1 + (2 * 3)) == 7) && 1;");
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_error_location() {
        let err = Parser::new("int main() { return 0 }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("Expected ';' after return"));
        assert_eq!(err.location.line, 1);
    }
}
