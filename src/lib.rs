//! # Glue
//!
//! A declarative workflow runner that glues local shell commands and
//! external services together.
//!
//! ## Features
//!
//! - **Declarative YAML workflows** - Named workflows in `glue.yaml`, each an ordered list of steps
//! - **Sequential execution** - Steps run one at a time; the first failure ends the run
//! - **Service adapters** - Slack, GitHub, Linear, Notion and Google Cloud actions
//! - **Layered credentials** - OS keychain with a transparent fallback to local files
//! - **Execution history** - One JSON record per run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use glue::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = WorkflowLoader::load_str(r##"
//! deploy:
//!   when: deploy
//!   steps:
//!     - name: Run tests
//!       run: cargo test
//!     - name: Notify team
//!       adapter: slack
//!       action: notify
//!       options:
//!         channel: "#deployments"
//!         message: Deployed
//! "##)?;
//!     let workflow = WorkflowLoader::select(&config, "deploy")?;
//!
//!     let settings = Settings::from_env()?;
//!     let registry = builtin_registry(Arc::new(settings.credential_store()));
//!     let executor = Executor::new(Arc::new(registry)).with_history(settings.history());
//!
//!     let result = executor.execute(workflow).await;
//!     println!("Workflow completed: success={}", result.success);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod credentials;
pub mod engine;
pub mod history;
pub mod settings;
pub mod workflow;

// Re-export main types
pub use adapters::{builtin_registry, Action, Adapter, AdapterError, AdapterRegistry, Prompt};
pub use credentials::{
    CredentialBackend, CredentialError, CredentialStore, FailurePolicy, FileStore, KeyringBackend,
    MemoryBackend, SecretBackend, SecretError, SecureStore,
};
pub use engine::{ExecutionResult, Executor, ExecutorError, StepResult};
pub use history::{ExecutionLog, HistoryError, HistoryRecorder};
pub use settings::{Settings, SettingsError};
pub use workflow::{
    ActionOptions, AdapterStep, GlueConfig, LoadError, LocalStep, Step, Workflow, WorkflowLoader,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::{builtin_registry, Adapter, AdapterError, AdapterRegistry, Prompt};
    pub use crate::credentials::CredentialStore;
    pub use crate::engine::{ExecutionResult, Executor, StepResult};
    pub use crate::history::HistoryRecorder;
    pub use crate::settings::Settings;
    pub use crate::workflow::{ActionOptions, LoadError, Step, Workflow, WorkflowLoader};
}
