//! Service adapters
//!
//! An adapter is an independent integration with an external service that
//! exposes a fixed set of named actions. The executor only relies on the
//! [`Adapter`] trait: a name, an action lookup, and `execute`.
//!
//! Built-in adapters:
//! - `slack`: post messages and upload files
//! - `github`: issues, pull requests and comments
//! - `linear`: issues and comments via GraphQL
//! - `notion`: pages and database rows
//! - `gcp`: BigQuery, Cloud Storage and Cloud Functions via the Cloud SDK

use async_trait::async_trait;
use std::io;

use crate::credentials::CredentialError;
use crate::workflow::ActionOptions;

pub mod gcp;
pub mod github;
pub mod http;
pub mod linear;
pub mod notion;
pub mod options;
pub mod registry;
pub mod slack;
#[cfg(test)]
pub(crate) mod testing;

pub use gcp::GcpAdapter;
pub use github::GitHubAdapter;
pub use linear::LinearAdapter;
pub use notion::NotionAdapter;
pub use registry::{builtin_registry, AdapterRegistry};
pub use slack::SlackAdapter;

/// Errors raised by adapters. The display text is what a failed step reports.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Adapter \"{0}\" not found")]
    NotFound(String),

    #[error("Action \"{action}\" not found in adapter \"{adapter}\"")]
    UnknownAction {
        adapter: &'static str,
        action: String,
    },

    #[error("Adapter \"{0}\" does not support authentication")]
    AuthUnsupported(String),

    #[error("{service} not authenticated. Run: glue auth {adapter}")]
    NotAuthenticated {
        service: &'static str,
        adapter: &'static str,
    },

    #[error("{0}")]
    InvalidOptions(String),

    /// Input rejected during interactive authentication
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to store credential: {0}")]
    Credential(#[from] CredentialError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Source of answers for interactive authentication
pub trait Prompt: Send {
    /// Ask a question; `secret` answers should not be echoed
    fn ask(&mut self, question: &str, secret: bool) -> io::Result<String>;

    /// Informational line shown before questions
    fn say(&mut self, line: &str);
}

#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Names of the actions this adapter provides
    fn actions(&self) -> &'static [&'static str];

    /// Run an action. Only called with a name from [`Adapter::actions`].
    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError>;

    async fn initialize(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn supports_authentication(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &mut dyn Prompt) -> Result<(), AdapterError> {
        Err(AdapterError::AuthUnsupported(self.name().to_string()))
    }
}

impl dyn Adapter {
    /// Look up an action by name
    pub fn action(&self, name: &str) -> Option<Action<'_>> {
        self.actions()
            .iter()
            .find(|a| **a == name)
            .map(|a| Action {
                adapter: self,
                name: a,
            })
    }
}

/// A resolved adapter action, ready to execute
pub struct Action<'a> {
    adapter: &'a dyn Adapter,
    name: &'static str,
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn execute(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        self.adapter.execute(self.name, options).await
    }
}

