// coursecart/src/pipeline/mod.rs

//! Defines `Pipeline<TData>`, an ordered list of named async steps run against
//! a shared context. The engine uses it for its multi-step sequences.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::{Pipeline, StepHandler};
