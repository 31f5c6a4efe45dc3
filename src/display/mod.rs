//! Human-readable output: evaluation traces and the supported syntax table.
pub mod doc;
pub mod trace;

pub use doc::supported_operands;
pub use trace::format_trace;
