//! Lexer and recursive-descent parser for visibility expressions.

use crate::ast::{CmpOp, Expr, Operand};
use thiserror::Error;

/// Parse errors. Callers treat any of these as "fail open".
#[derive(Debug, Error)]
pub enum LogicError {
    /// Unexpected character during lexing
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    /// Unterminated field reference or string literal
    #[error("unterminated {0}")]
    Unterminated(&'static str),

    /// Unknown bare word (only `and`/`or` are keywords)
    #[error("unknown token '{0}'")]
    UnknownWord(String),

    /// Structural error during parsing
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A token that cannot start or continue the current production
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    FieldRef(String),
    Str(String),
    Num(f64),
    Op(CmpOp),
    And,
    Or,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, LogicError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or(LogicError::Unterminated("field reference"))?;
                let inner: String = chars[i + 1..i + 1 + close].iter().collect();
                tokens.push(Token::FieldRef(resolve_field_ref(inner.trim())));
                i += close + 2;
            }
            '\'' | '"' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or(LogicError::Unterminated("string literal"))?;
                let lit: String = chars[i + 1..i + 1 + close].iter().collect();
                tokens.push(Token::Str(lit));
                i += close + 2;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                } else if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    i += 1;
                }
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                } else {
                    return Err(LogicError::UnexpectedChar('!', i));
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| LogicError::UnknownWord(text))?;
                tokens.push(Token::Num(num));
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.to_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    _ => return Err(LogicError::UnknownWord(word)),
                }
            }
            other => return Err(LogicError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

/// Resolve `name` or `name(code)` to the record key it reads.
fn resolve_field_ref(inner: &str) -> String {
    if let Some(open) = inner.find('(') {
        if let Some(close) = inner.rfind(')') {
            if close > open {
                let base = inner[..open].trim();
                let code = inner[open + 1..close].trim();
                return format!("{base}___{code}");
            }
        }
    }
    inner.to_string()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expr(&mut self) -> Result<Expr, LogicError> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, LogicError> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, LogicError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.next();
            let inner = self.expr()?;
            match self.next() {
                Some(Token::RParen) => Ok(inner),
                Some(_) => Err(LogicError::UnexpectedToken(self.pos)),
                None => Err(LogicError::UnexpectedEnd),
            }
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Expr, LogicError> {
        let lhs = self.operand()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.next();
            let rhs = self.operand()?;
            Ok(Expr::Cmp(lhs, op, rhs))
        } else {
            Ok(Expr::Truthy(lhs))
        }
    }

    fn operand(&mut self) -> Result<Operand, LogicError> {
        match self.next() {
            Some(Token::FieldRef(name)) => Ok(Operand::FieldRef(name)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(Token::Num(n)) => Ok(Operand::Num(n)),
            Some(_) => Err(LogicError::UnexpectedToken(self.pos)),
            None => Err(LogicError::UnexpectedEnd),
        }
    }
}

/// Parse an expression into its AST.
pub fn parse(input: &str) -> Result<Expr, LogicError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(LogicError::UnexpectedEnd);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if parser.peek().is_some() {
        return Err(LogicError::UnexpectedToken(parser.pos));
    }
    Ok(expr)
}
