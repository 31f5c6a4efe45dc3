//! Arithmetic leaves: `+ - * /`, grouping, implicit multiplication, index
//! tokens and static operands.
//!
//! Every static operand occurrence expands on its own (`\pm ... \pm` gives
//! four variants). An index referenced several times takes the same value
//! within one combination.

use super::numeric::for_each_combination;
use crate::error::ComputeError;
use crate::grammar::statics::{self, StaticValue};
use crate::store::{tokens, Branches, NodeId};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    Number(f64),
    Ref(NodeId),
    Static(&'static [StaticValue]),
    Op(char),
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

enum Fault {
    Syntax(String),
    DivisionByZero(f64),
}

/// Every value the leaf can take. `lookup` yields the computed tuple of a referenced index.
pub fn evaluate(
    id: NodeId,
    context: &str,
    lookup: impl Fn(NodeId) -> Option<Arc<Branches>>,
) -> Result<Branches, ComputeError> {
    let failed = |reason: String| ComputeError::NotComputableProcessor { index: id, context: context.to_string(), reason };

    let lexemes = lex(context).map_err(failed)?;

    // One axis per static occurrence and per distinct index.
    let mut statics_axes: Vec<&'static [StaticValue]> = Vec::new();
    let mut refs: Vec<(NodeId, Arc<Branches>)> = Vec::new();
    let mut axis_of = Vec::with_capacity(lexemes.len());
    for lexeme in &lexemes {
        axis_of.push(match *lexeme {
            Lexeme::Static(values) => {
                statics_axes.push(values);
                statics_axes.len() - 1
            }
            Lexeme::Ref(dep) => match refs.iter().position(|(r, _)| *r == dep) {
                Some(k) => k,
                None => {
                    let values = lookup(dep).ok_or_else(|| failed(format!("index {} has no value", dep)))?;
                    refs.push((dep, values));
                    refs.len() - 1
                }
            },
            _ => 0,
        });
    }

    let lens: Vec<usize> = statics_axes.iter().map(|v| v.len()).chain(refs.iter().map(|(_, v)| v.len())).collect();
    let offset = statics_axes.len();

    let mut out = Branches::new();
    for_each_combination(&lens, |combo| {
        let resolved: Vec<Token> = lexemes
            .iter()
            .zip(&axis_of)
            .map(|(lexeme, &axis)| match *lexeme {
                Lexeme::Number(v) => Token::Number(v),
                Lexeme::Op(c) => Token::Op(c),
                Lexeme::Open => Token::Open,
                Lexeme::Close => Token::Close,
                Lexeme::Static(values) => match values[combo[axis]] {
                    StaticValue::Operator(c) => Token::Op(c),
                    StaticValue::Number(v) => Token::Number(v),
                },
                Lexeme::Ref(_) => Token::Number(refs[axis].1[combo[offset + axis]]),
            })
            .collect();

        let value = Parser { tokens: &resolved, pos: 0 }.parse().map_err(|fault| match fault {
            Fault::Syntax(reason) => failed(reason),
            Fault::DivisionByZero(numerator) => ComputeError::DivisionByZero { numerator },
        })?;
        if !value.is_finite() {
            let inputs = resolved.iter().filter_map(|t| match t { Token::Number(v) => Some(*v), _ => None }).collect();
            return Err(ComputeError::DomainError { rule: "Arithmetic".to_string(), inputs });
        }
        out.push(value);
        Ok(())
    })?;
    Ok(out)
}

fn lex(context: &str) -> Result<Vec<Lexeme>, String> {
    let bytes = context.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let lexeme = match bytes[i] {
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &context[start..i];
                out.push(Lexeme::Number(text.parse().map_err(|_| format!("malformed number '{}'", text))?));
                continue;
            }
            b'@' => {
                let token = tokens::INDEX_TOKEN
                    .find_at(context, i)
                    .filter(|m| m.start() == i)
                    .ok_or_else(|| "stray '@'".to_string())?;
                let id = tokens::single(token.as_str()).ok_or_else(|| format!("bad index token '{}'", token.as_str()))?;
                out.push(Lexeme::Ref(id));
                i = token.end();
                continue;
            }
            b'\\' => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word = &context[start..i];
                out.push(match word {
                    "\\cdot" | "\\times" => Lexeme::Op('*'),
                    _ => statics::lookup(word).map(Lexeme::Static).ok_or_else(|| format!("unexpected command '{}'", word))?,
                });
                continue;
            }
            b'+' | b'-' | b'*' | b'/' => Lexeme::Op(bytes[i] as char),
            b'(' | b'[' => Lexeme::Open,
            b')' | b']' => Lexeme::Close,
            _ => {
                let c = context[i..].chars().next().unwrap_or('?');
                return Err(format!("unexpected character '{}'", c));
            }
        };
        out.push(lexeme);
        i += 1;
    }
    if out.is_empty() {
        return Err("empty context".to_string());
    }
    Ok(out)
}

/// Recursive descent: `* /` and juxtaposition bind tighter than `+ -`, left to right.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<f64, Fault> {
        let value = self.expr()?;
        match self.peek() {
            None => Ok(value),
            Some(t) => Err(Fault::Syntax(format!("unexpected {:?}", t))),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<f64, Fault> {
        let mut acc = self.term()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if c == '+' { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, Fault> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Op('*')) => {
                    self.pos += 1;
                    acc *= self.unary()?;
                }
                Some(Token::Op('/')) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(Fault::DivisionByZero(acc));
                    }
                    acc /= rhs;
                }
                Some(Token::Number(_) | Token::Open) => acc *= self.unary()?,
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, Fault> {
        match self.peek() {
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, Fault> {
        match self.next() {
            Some(Token::Number(v)) => Ok(v),
            Some(Token::Open) => {
                let v = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(v),
                    _ => Err(Fault::Syntax("missing ')'".to_string())),
                }
            }
            Some(t) => Err(Fault::Syntax(format!("unexpected {:?}", t))),
            None => Err(Fault::Syntax("unexpected end of expression".to_string())),
        }
    }
}
