//! Workflow and Step definitions
//!
//! A `glue.yaml` file maps workflow names to a trigger and an ordered list
//! of steps:
//!
//! ```yaml
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
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Options passed to an adapter action
pub type ActionOptions = Map<String, Value>;

/// Parsed `glue.yaml`: workflow name -> workflow
pub type GlueConfig = BTreeMap<String, Workflow>;

// ============================================================================
// Workflow
// ============================================================================

/// A single workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// Trigger name; also the name runs are recorded under
    #[serde(rename = "when")]
    pub trigger: String,

    /// Steps to execute, in order
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(trigger: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            trigger: trigger.into(),
            steps,
        }
    }

    /// Names of the adapters this workflow's steps refer to
    pub fn adapter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Adapter(s) => Some(s.adapter.as_str()),
                Step::Local(_) => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

// ============================================================================
// Step
// ============================================================================

/// One unit of work. The variant is decided by shape at parse time:
/// `run` makes a local step, `adapter` + `action` an adapter step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Local(LocalStep),
    Adapter(AdapterStep),
}

/// Shell command run on the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalStep {
    pub name: String,

    #[serde(rename = "run")]
    pub command: String,
}

/// Action invoked on a registered adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterStep {
    pub name: String,
    pub adapter: String,
    pub action: String,

    #[serde(default)]
    pub options: ActionOptions,
}

impl Step {
    pub fn local(name: impl Into<String>, command: impl Into<String>) -> Self {
        Step::Local(LocalStep {
            name: name.into(),
            command: command.into(),
        })
    }

    pub fn adapter(
        name: impl Into<String>,
        adapter: impl Into<String>,
        action: impl Into<String>,
        options: ActionOptions,
    ) -> Self {
        Step::Adapter(AdapterStep {
            name: name.into(),
            adapter: adapter.into(),
            action: action.into(),
            options,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Local(s) => &s.name,
            Step::Adapter(s) => &s.name,
        }
    }

    /// Short description of what the step runs: `local` or `adapter:action`
    pub fn kind(&self) -> String {
        match self {
            Step::Local(_) => "local".to_string(),
            Step::Adapter(s) => format!("{}:{}", s.adapter, s.action),
        }
    }
}
