//! Typed ids, node kinds, the index → context map and the dense node store.
pub mod context_map;
pub mod registry;
pub mod tokens;
pub mod types;

pub use context_map::ContextMap;
pub use registry::NodeStore;
pub use types::*;
