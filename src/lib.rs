//! # Introduction
//!
//! fieldflow is a small flow-sensitive analyzer for a subset of C. It tracks
//! the integer value range of every variable path (`x`, `s.field`,
//! `p->field`, `*p`) through each function, and breaks whole-struct copies
//! (`one = two`, `p1 = p2`, `memcpy`, `memset`) into member assignments so
//! that field values follow the copy.
//!
//! ## Analysis pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Engine (+ call hooks) → FunctionReports
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds an AST.
//! 2. [`types`] — resolves declared types of expressions and struct layouts.
//! 3. [`state`] — value ranges keyed by variable path, kept sorted by path.
//! 4. [`analysis`] — the evaluator, the struct-copy expansion and the call
//!    hook registry.
//! 5. [`config`] — project options and per-project directive files such as
//!    `<project>.clears_argument`.
//!
//! ## Example
//!
//! ```
//! use fieldflow::{Engine, ProjectConfig};
//! use fieldflow::parser::parser::Parser;
//!
//! let source = r#"
//!     struct point { int x; int y; };
//!     void f() {
//!         struct point a, b;
//!         b.x = 1;
//!         b.y = 2;
//!         a = b;
//!     }
//! "#;
//! let program = Parser::new(source).unwrap().parse_program().unwrap();
//! let reports = Engine::new(program, &ProjectConfig::default()).analyze();
//! assert_eq!(reports[0].value_of("a.y").unwrap().to_string(), "2");
//! ```

pub mod analysis;
pub mod config;
pub mod parser;
pub mod state;
pub mod types;

pub use analysis::engine::{Engine, FunctionReport};
pub use config::ProjectConfig;
