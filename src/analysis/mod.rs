//! Structural checks over the dependency graph.
pub mod topology;
