//! Calculator tool, evaluates arithmetic expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+')* power
//! power   := atom ('^' unary)?
//! atom    := number | '(' sum ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus on its left,
//! so `-2^2` is `-4`.

use async_trait::async_trait;
use reactor_core::error::ToolError;
use reactor_core::tool::{Arguments, ParamKind, ParamSpec, Tool};
use serde_json::Value;
use std::iter::Peekable;
use std::str::CharIndices;

/// Deepest nesting of parentheses and exponents accepted.
const MAX_DEPTH: usize = 128;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression with + - * / % ^ and parentheses."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("expression", ParamKind::String)
                .with_description("e.g. '(2 + 3) * 4'"),
        ]
    }

    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let expr = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid("calculator", "'expression' must be a string"))?;

        let value = evaluate(expr).map_err(|e| ToolError::failed("calculator", e))?;

        // Whole results print without a trailing ".0".
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Ok(Value::from(value as i64))
        } else {
            Ok(Value::from(value))
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let mut eval = Evaluator {
        chars: expr.char_indices().peekable(),
        depth: 0,
    };
    let value = eval.sum()?;
    eval.skip_ws();
    if let Some((pos, c)) = eval.chars.peek().copied() {
        return Err(format!("unexpected '{c}' at offset {pos}"));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(value)
}

struct Evaluator<'a> {
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl Evaluator<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    /// Consume `op` if it is the next non-blank character.
    fn eat(&mut self, op: char) -> bool {
        self.skip_ws();
        self.chars.next_if(|&(_, c)| c == op).is_some()
    }

    /// Run a nested sub-parse, bounded by `MAX_DEPTH`.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut acc = self.product()?;
        loop {
            if self.eat('+') {
                acc += self.product()?;
            } else if self.eat('-') {
                acc -= self.product()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn product(&mut self) -> Result<f64, String> {
        let mut acc = self.unary()?;
        loop {
            if self.eat('*') {
                acc *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err("division by zero".into());
                }
                acc /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err("modulo by zero".into());
                }
                acc %= rhs;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, String> {
        let mut negate = false;
        loop {
            if self.eat('-') {
                negate = !negate;
            } else if !self.eat('+') {
                break;
            }
        }
        let value = self.power()?;
        Ok(if negate { -value } else { value })
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.atom()?;
        if self.eat('^') {
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, String> {
        if self.eat('(') {
            let inner = self.nested(Self::sum)?;
            if !self.eat(')') {
                return Err("missing closing parenthesis".into());
            }
            return Ok(inner);
        }

        self.skip_ws();
        let mut literal = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_digit() || *c == '.' || *c == '_')
        {
            if c != '_' {
                literal.push(c);
            }
        }

        if literal.is_empty() {
            return match self.chars.peek() {
                Some((pos, c)) => Err(format!("expected a number at offset {pos}, found '{c}'")),
                None => Err("unexpected end of expression".into()),
            };
        }

        literal
            .parse()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}
