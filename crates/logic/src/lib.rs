//! Conditional-visibility logic interpreter.
//!
//! Field-visibility expressions (`[has_symptom]=1 and [age] > 18`) are
//! parsed into an explicit AST and evaluated directly against one
//! record. There is no dynamic code execution surface: bracketed field
//! references resolve to record values at evaluation time.
//!
//! Failure semantics are deliberately asymmetric and must stay so:
//! an expression tripping the security screen fails **closed** (the
//! field is treated as hidden), while a malformed expression fails
//! **open** (the field is treated as visible) so that an unparseable
//! rule never suppresses a required-field check.

#![warn(missing_docs)]

mod ast;
mod parser;
mod interpreter;

pub use ast::{CmpOp, Expr, Operand};
pub use interpreter::{evaluate, is_blocked_expression};
pub use parser::{parse, LogicError};
