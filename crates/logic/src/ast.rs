//! Expression AST.

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=` (single equals in the source syntax)
    Eq,
    /// `<>` or `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

/// A comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Field reference; checkbox references `[f(3)]` arrive here
    /// already resolved to the synthetic key `f___3`.
    FieldRef(String),
    /// Quoted string literal
    Str(String),
    /// Numeric literal
    Num(f64),
}

/// A parsed visibility expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `lhs or rhs`
    Or(Box<Expr>, Box<Expr>),
    /// `lhs and rhs`
    And(Box<Expr>, Box<Expr>),
    /// `lhs op rhs`
    Cmp(Operand, CmpOp, Operand),
    /// Bare operand evaluated for truthiness
    Truthy(Operand),
}
