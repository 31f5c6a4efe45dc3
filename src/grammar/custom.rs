//! Caller-supplied single-argument functions, written `name(x)`, `name{x}` or `\name{x}`.

use super::builtins::TOKEN;
use super::keywords::{inside_command, is_reserved};
use super::{Rule, RuleDoc, Slot, SlotKind};
use crate::error::{ComputeError, CustomFunctionError};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type ScalarFn = Arc<dyn Fn(f64) -> Result<f64, ComputeError> + Send + Sync>;

#[derive(Clone)]
pub struct CustomFunction {
    name: String,
    doc: RuleDoc,
    function: ScalarFn,
}

impl fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunction").field("name", &self.name).field("doc", &self.doc).finish()
    }
}

impl CustomFunction {
    pub fn new<F>(name: &str, doc: RuleDoc, function: F) -> Result<Self, CustomFunctionError>
    where
        F: Fn(f64) -> Result<f64, ComputeError> + Send + Sync + 'static,
    {
        validate_name(name)?;
        Ok(Self { name: name.to_string(), doc, function: Arc::new(function) })
    }

    /// `fib(n)`: the n-th Fibonacci number, 1-indexed (1, 1, 2, 3, 5, ...).
    /// The argument is truncated to an integer first.
    pub fn fibonacci() -> Self {
        Self {
            name: "fib".to_string(),
            doc: RuleDoc::new("Fibonacci", "fib(n)", "n-th Fibonacci number, counting from fib(1) = 1"),
            function: Arc::new(fibonacci),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &RuleDoc {
        &self.doc
    }

    pub(crate) fn into_rule(self) -> Rule {
        let pattern = format!(r"\\?{}(?P<parameter>{})", regex::escape(&self.name), TOKEN);
        let pattern = Regex::new(&pattern).expect("BUG: validated name yields a valid pattern");
        let function = self.function;
        Rule::new(
            &self.name,
            pattern,
            vec![Slot::new("parameter", SlotKind::LiteralOrIndex)],
            self.doc,
            move |args| function(args.value(0)),
        )
        .with_guard(|context, start| !inside_command(context, start))
        .into_custom()
    }
}

fn validate_name(name: &str) -> Result<(), CustomFunctionError> {
    if name.is_empty() {
        return Err(CustomFunctionError::NotFoundName);
    }
    let invalid = |reason: &str| CustomFunctionError::InvalidName { name: name.to_string(), reason: reason.to_string() };
    if !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(invalid("only ASCII letters are allowed"));
    }
    if is_reserved(name) {
        return Err(invalid("it is a reserved word"));
    }
    Ok(())
}

/// Beyond this position the value overflows f64.
const FIBONACCI_LIMIT: f64 = 1476.0;

fn fibonacci(x: f64) -> Result<f64, ComputeError> {
    let n = x.trunc();
    if !(n >= 1.0) {
        return Err(ComputeError::InvalidFibonacciPosition { position: x });
    }
    if n > FIBONACCI_LIMIT {
        return Ok(f64::INFINITY);
    }
    let (mut a, mut b) = (1.0_f64, 1.0_f64);
    for _ in 2..(n as u32) {
        (a, b) = (b, a + b);
    }
    Ok(if n < 3.0 { 1.0 } else { b })
}
