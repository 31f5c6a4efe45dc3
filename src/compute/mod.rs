//! Memoized, multi-valued evaluation.
pub mod arithmetic;
pub mod engine;
pub mod ledger;
pub mod numeric;

pub use engine::{Assignment, Engine};
pub use ledger::{assignment_key, AssignmentKey, Ledger};
