//! Turns a LaTeX math expression into a function of its declared variables
//! that returns every real value the expression can take.
//!
//! Compilation decomposes the expression into a context map: a DAG of
//! numbered subexpressions where `@/n/@` stands for the value of index `n`.
//! Each context is then classified as a variable, a grammar rule match or an
//! arithmetic leaf. Calls evaluate the root on demand, multiplying out
//! multi-valued operands (`\pm`, `\mp`) and caching every node per assignment.
//!
//! ```
//! use texcalc_core::CompiledExpression;
//!
//! let f = CompiledExpression::compile(r"\frac{-b\pm\sqrt{b^{2}-4ac}}{2a}", &["a", "b", "c"], [])?;
//! assert_eq!(f.call([("a", 1), ("b", -8), ("c", 15)], 5)?, vec![3.0, 5.0]);
//! # Ok::<(), texcalc_core::TexCalcError>(())
//! ```

pub mod analysis;
pub mod compute;
pub mod config;
pub mod decompose;
pub mod display;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod store;

pub use config::EvalConfig;
pub use error::{
    ComputeError, CustomFunctionError, FieldError, InitError, InvalidContextMap, Result, TexCalcError, UserError,
};
pub use expression::{Argument, CompiledExpression};
pub use grammar::{CustomFunction, GrammarRegistry, RuleDoc};
pub use store::{ContextMap, NodeId};
