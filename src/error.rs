//! Error taxonomy. Every failure is terminal for the operation that raised it:
//! a failed evaluation yields no partial result tuple.

use crate::store::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TexCalcError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TexCalcError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error(transparent)]
    CustomFunction(#[from] CustomFunctionError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    InvalidContextMap(#[from] InvalidContextMap),
    #[error(transparent)]
    User(#[from] UserError),
}

/// Malformed construction arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error("No variables were declared and the expression is not a constant")]
    NotAConst,
    #[error("Bad variable '{name}': variables must be distinct single lowercase letters that are not reserved")]
    BadVariables { name: String },
    #[error("Unsupported operands: {}", .operands.join(", "))]
    UnsupportedOperands { operands: Vec<String> },
    #[error("Symbol '{symbol}' is neither a declared variable nor a supported operand")]
    UnknownSymbol { symbol: char },
    #[error("Malformed expression: {reason}")]
    MalformedExpression { reason: String },
    #[error("Invalid configuration: {reason}")]
    BadConfig { reason: String },
}

/// A node could not be computed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Cannot compute operand '{field}' of {rule} at node {index}: it is an unreduced context")]
    NotComputableField { field: String, rule: String, index: NodeId },
    #[error("Cannot compute node {index} ('{context}'): {reason}")]
    NotComputableProcessor { index: NodeId, context: String, reason: String },
    #[error("Logarithm '\\{function}' takes a base only as \\log, and \\log requires one")]
    IncorrectLogarithm { function: String },
    #[error("Fibonacci position must be at least 1, got {position}")]
    InvalidFibonacciPosition { position: f64 },
    #[error("Cannot take the root of degree {degree} of {value}")]
    SqrtOfNegativeValue { degree: f64, value: f64 },
    #[error("Division by zero (numerator {numerator})")]
    DivisionByZero { numerator: f64 },
    #[error("{rule} is undefined for inputs {inputs:?}")]
    DomainError { rule: String, inputs: Vec<f64> },
    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },
    #[error("Cycle detected at node {index}")]
    CycleDetected { index: NodeId },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustomFunctionError {
    #[error("A custom function needs a name")]
    NotFoundName,
    #[error("Invalid custom function name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// An operand slot received a value of a category it does not accept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Operand '{field}' cannot take the value '{value}'")]
    BadFieldArgument { field: String, value: String },
    #[error("{rule} matched without capturing required operand '{field}'")]
    MissingField { field: String, rule: String },
    #[error("Operand '{field}' has no choice named '{value}'")]
    BadChoicesMap { field: String, value: String },
}

/// A precompiled context map violates the shape contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidContextMap {
    #[error("No context map was given")]
    NotDefined,
    #[error("A context map must be an object, not {found}")]
    NotDict { found: String },
    #[error("Context map keys must be non-negative integers, not '{key}'")]
    NotIntegerIndex { key: String },
    #[error("Context {index} must be a string, not {found}")]
    NotContextString { index: u32, found: String },
    #[error("Context map has no root (index 0)")]
    MissingRoot,
    #[error("Context {index} references missing index {token}")]
    DanglingIndex { index: u32, token: String },
    #[error("Context {index} depends on itself")]
    Cycle { index: u32 },
    #[error("Malformed context map JSON: {reason}")]
    Json { reason: String },
}

/// Call-time argument problems and malformed documentation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UserError {
    #[error("Only decimals are accepted, not {name}={value}")]
    NotDecimal { name: String, value: String },
    #[error("Variable '{name}' was declared but not passed")]
    NotEnoughVariables { name: String },
    #[error("Rule '{rule}' needs a display name, an example and a description")]
    InvalidDoc { rule: String },
}
