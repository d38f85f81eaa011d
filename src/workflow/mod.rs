//! Workflow types and definitions
//!
//! This module contains the types for defining and loading workflows:
//! - `step` - Workflow, Step, and the `glue.yaml` configuration map
//! - `loader` - Load and validate `glue.yaml`

pub mod loader;
pub mod step;

pub use loader::{LoadError, WorkflowLoader};
pub use step::{ActionOptions, AdapterStep, GlueConfig, LocalStep, Step, Workflow};
