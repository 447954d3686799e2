// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Arithmetic expression evaluation for the function template.
//!
//! Grammar (recursive descent, usual precedence, `^` right-associative):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := power (('*' | '/' | '%') power)*
//! power  := unary ('^' power)?
//! unary  := '-' unary | atom
//! atom   := number | '(' expr ')'
//! ```
//!
//! Input is capped at [`MAX_EXPRESSION_LEN`] characters and nesting of
//! parentheses, unary minus and exponents at [`MAX_NESTING_DEPTH`].

use thiserror::Error;

pub const MAX_EXPRESSION_LEN: usize = 4096;
pub const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
    #[error("expression is longer than {} characters", MAX_EXPRESSION_LEN)]
    TooLong,
    #[error("expression nests deeper than {} levels", MAX_NESTING_DEPTH)]
    TooDeep,
}

pub fn evaluate(input: &str) -> Result<f64, ExpressionError> {
    if input.chars().count() > MAX_EXPRESSION_LEN {
        return Err(ExpressionError::TooLong);
    }
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(ExpressionError::UnexpectedChar(c, parser.pos));
    }
    if !value.is_finite() {
        return Err(ExpressionError::NonFinite);
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.power()?;
        loop {
            if self.eat('*') {
                value *= self.power()?;
            } else if self.eat('/') {
                let rhs = self.power()?;
                if rhs == 0.0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                value /= rhs;
            } else if self.eat('%') {
                let rhs = self.power()?;
                if rhs == 0.0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                value %= rhs;
            } else {
                return Ok(value);
            }
        }
    }

    fn power(&mut self) -> Result<f64, ExpressionError> {
        let base = self.unary()?;
        if self.eat('^') {
            self.descend()?;
            let exponent = self.power()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, ExpressionError> {
        if self.eat('-') {
            self.descend()?;
            let value = self.unary()?;
            self.depth -= 1;
            return Ok(-value);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<f64, ExpressionError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                if !self.eat(')') {
                    return match self.peek() {
                        Some(c) => Err(ExpressionError::UnexpectedChar(c, self.pos)),
                        None => Err(ExpressionError::UnexpectedEnd),
                    };
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let literal: String = self.chars[start..self.pos].iter().collect();
                literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber(literal))
            }
            Some(c) => Err(ExpressionError::UnexpectedChar(c, self.pos)),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
