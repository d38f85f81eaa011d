//! Workflow execution engine module
//!
//! This module contains:
//! - `executor` - The sequential step executor
//! - `error` - Step failure types
//! - `result` - Step and execution result types
//! - `local` - Shell command steps

pub mod error;
pub mod executor;
pub mod local;
pub mod result;

pub use error::ExecutorError;
pub use executor::Executor;
pub use result::{ExecutionResult, StepResult};
