//! C source code parser
//!
//! This module transforms C source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions
//! - [`build`]: constructors for synthesized expressions
//!
//! # Supported C Subset
//!
//! - Types: `char`, `short`, `int`, `long` (signed and unsigned), `void`,
//!   structs (named, nested, anonymous), pointers, fixed-size arrays
//! - Declarations: struct definitions, prototypes, function definitions,
//!   global and local variables with comma-separated declarators
//! - Statements: blocks, `if`/`else`, `while`, `do`/`while`, `for`,
//!   `break`, `continue`, `return`, expression statements
//! - Expressions: the usual C operators, casts, `sizeof`, calls by name
//! - Preprocessor lines are skipped; no typedefs, unions, enums or function
//!   pointers
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.

pub mod ast;
pub mod build;
pub mod lexer;
pub mod parser;
