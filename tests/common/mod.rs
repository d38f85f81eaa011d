#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use glue::prelude::*;
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_workflow(dir: &Path, content: &str) {
    fs::write(dir.join("glue.yaml"), content).expect("Failed to write glue.yaml");
}

/// Workflow with one local step per command
pub fn local_workflow(name: &str, commands: &[&str]) -> String {
    let steps: String = commands
        .iter()
        .enumerate()
        .map(|(i, cmd)| format!("    - name: step-{}\n      run: '{}'\n", i + 1, cmd))
        .collect();
    format!("{}:\n  when: {}\n  steps:\n{}", name, name, steps)
}

/// Adapter that records the actions it runs and fails `fail` on request
#[derive(Default)]
pub struct RecordingAdapter {
    pub calls: Arc<Mutex<Vec<(String, ActionOptions)>>>,
}

impl RecordingAdapter {
    pub fn calls(&self) -> Arc<Mutex<Vec<(String, ActionOptions)>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["record", "fail"]
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), options.clone()));
        match action {
            "fail" => Err(AdapterError::Api("Failed to record: remote refused".to_string())),
            _ => Ok(()),
        }
    }
}
