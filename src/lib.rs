//! # QuailBASIC
//!
//! Compiler front-end and typed intermediate representation for the
//! QuailBASIC dialect: suffix-sigil types, line numbers, DEF FN user
//! functions, DIM'd arrays, and statement-oriented control flow.
//!
//! ## Architecture
//!
//! ```text
//! Source (.bas) → [external parser] → Parse tree → Lowering → IR → [interpreter]
//! ```
//!
//! The bracketed stages live outside this crate. The parse tree arrives
//! as the [`ast`] node types; this crate's lowering pass walks it once
//! and produces a linear, typed, three-address IR plus the symbol table
//! its operand ids resolve in:
//!
//! - [`ast`] - Parse-tree adapter (node kinds, spans)
//! - [`symbols`] - Symbol table, data types, promotion lattice
//! - [`ir`] - Opcode set, instruction stream, operand patching
//! - [`lowering`] - The tree walk: semantic checks and IR emission
//! - [`numbers`] - Numeric literal parsing
//! - [`error`] - Semantic and internal error types
//!
//! ## Example
//!
//! ```
//! use quailbasic::ast::{Expr, Line, Program, Statement, StatementKind, VarRef};
//! use quailbasic::lowering::{lower, Options};
//! use quailbasic::symbols::TypeSuffix;
//!
//! // 10 LET X% = 2 + 3
//! let program = Program::new(vec![Line::numbered(
//!     10,
//!     vec![Statement::of(StatementKind::Let {
//!         target: VarRef::suffixed("X", TypeSuffix::Percent),
//!         value: Expr::binary(
//!             quailbasic::ast::BinaryOp::Add,
//!             Expr::integer("2"),
//!             Expr::integer("3"),
//!         ),
//!     })],
//! )]);
//!
//! let compilation = lower("", &program, Options::default()).expect("lowering failed");
//! assert!(!compilation.ir.is_empty());
//! ```

pub mod ast;
pub mod error;
pub mod ir;
pub mod lowering;
pub mod numbers;
pub mod symbols;

/// Re-export of commonly used types.
pub mod prelude {
    pub use crate::ast::{Expr, ExprKind, Line, Program, Span, Statement, StatementKind, VarRef};
    pub use crate::error::{CompileError, ErrorKind, InternalError, SemanticError};
    pub use crate::ir::{Instruction, Ir, OpCode};
    pub use crate::lowering::{lower, Compilation, Options};
    pub use crate::symbols::{DataType, SymbolEntry, SymbolId, SymbolTable, TypeSuffix};
}
