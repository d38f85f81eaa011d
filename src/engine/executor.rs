//! Workflow executor
//!
//! Runs a workflow's steps strictly in order:
//! 1. Local steps go to the platform shell
//! 2. Adapter steps are routed through the [`AdapterRegistry`]
//! 3. The first failing step ends the run; later steps never start
//! 4. The step results are handed to the history recorder, if any

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::adapters::AdapterRegistry;
use crate::engine::error::ExecutorError;
use crate::engine::local;
use crate::engine::result::{ExecutionResult, StepResult};
use crate::history::HistoryRecorder;
use crate::workflow::{AdapterStep, Step, Workflow};

pub struct Executor {
    registry: Arc<AdapterRegistry>,
    history: Option<HistoryRecorder>,
}

impl Executor {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            history: None,
        }
    }

    /// Record every run with `history`
    pub fn with_history(mut self, history: HistoryRecorder) -> Self {
        self.history = Some(history);
        self
    }

    /// Execute a workflow. Always returns a complete result; step failures
    /// are reported in it rather than as an error.
    #[instrument(skip(self, workflow), fields(trigger = %workflow.trigger, steps = workflow.steps.len()))]
    pub async fn execute(&self, workflow: &Workflow) -> ExecutionResult {
        let mut step_results = Vec::with_capacity(workflow.steps.len());
        let mut failure = None;

        println!("\n🚀 Starting workflow: {}\n", workflow.trigger);

        for step in &workflow.steps {
            let started = Instant::now();
            let outcome = self.execute_step(step).await;
            let duration = started.elapsed();

            match outcome {
                Ok(()) => {
                    println!("✓ {}", step.name());
                    step_results.push(StepResult::passed(step.name(), duration));
                }
                Err(e) => {
                    let message = e.to_string();
                    println!("✗ {}", step.name());
                    eprintln!("  Error: {}", message);
                    error!(step = step.name(), "Step failed: {}", message);

                    step_results.push(StepResult::failed(step.name(), message.clone(), duration));
                    failure = Some(message);
                    break;
                }
            }
        }

        self.record(&workflow.trigger, &step_results);

        let success = failure.is_none();
        if success {
            info!("Workflow completed successfully");
            println!("\n✅ Workflow completed successfully!\n");
        }

        ExecutionResult {
            success,
            step_results,
            error: failure,
        }
    }

    #[instrument(skip(self, step), fields(step = step.name(), kind = %step.kind()))]
    async fn execute_step(&self, step: &Step) -> Result<(), ExecutorError> {
        info!("Executing step");
        match step {
            Step::Local(local) => local::run_command(&local.command).await,
            Step::Adapter(adapter_step) => self.execute_adapter_step(adapter_step).await,
        }
    }

    async fn execute_adapter_step(&self, step: &AdapterStep) -> Result<(), ExecutorError> {
        let adapter = self
            .registry
            .get(&step.adapter)
            .ok_or_else(|| ExecutorError::AdapterNotFound(step.adapter.clone()))?;

        let action = adapter
            .action(&step.action)
            .ok_or_else(|| ExecutorError::ActionNotFound {
                adapter: step.adapter.clone(),
                action: step.action.clone(),
            })?;

        action.execute(&step.options).await?;
        Ok(())
    }

    fn record(&self, workflow: &str, steps: &[StepResult]) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(e) = history.record(workflow, steps) {
            warn!("Failed to record execution history: {}", e);
            eprintln!("Warning: failed to record execution history: {}", e);
        }
    }
}
