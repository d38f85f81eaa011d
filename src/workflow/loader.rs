//! Workflow file loader
//!
//! Reads and validates `glue.yaml`.

use std::path::Path;

use super::{GlueConfig, Workflow};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read workflow file {file}: {error}")]
    Io {
        file: String,
        error: std::io::Error,
    },

    #[error("Failed to parse workflow file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Workflow \"{name}\" not found. Available workflows: {}", .available.join(", "))]
    WorkflowNotFound { name: String, available: Vec<String> },
}

pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn load_file(path: &Path) -> Result<GlueConfig, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            file: path.display().to_string(),
            error: e,
        })?;
        Self::load_str(&content)
    }

    pub fn load_str(content: &str) -> Result<GlueConfig, LoadError> {
        // An empty document is an empty configuration, not a parse error
        if content.trim().is_empty() {
            return Ok(GlueConfig::new());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Look up a workflow by name
    pub fn select<'a>(config: &'a GlueConfig, name: &str) -> Result<&'a Workflow, LoadError> {
        config.get(name).ok_or_else(|| LoadError::WorkflowNotFound {
            name: name.to_string(),
            available: config.keys().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glue.yaml");

        fs::write(
            &path,
            r#"
build:
  when: build
  steps:
    - name: Compile
      run: cargo build
"#,
        )
        .unwrap();

        let config = WorkflowLoader::load_file(&path).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config["build"].steps.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = WorkflowLoader::load_file(&dir.path().join("glue.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_step() {
        let err = WorkflowLoader::load_str(
            r#"
broken:
  when: broken
  steps:
    - name: No action
      adapter: slack
"#,
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("Failed to parse workflow file"));
    }

    #[test]
    fn test_load_missing_when() {
        let result = WorkflowLoader::load_str(
            r#"
broken:
  steps: []
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_empty_document() {
        let config = WorkflowLoader::load_str("\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_select_unknown_workflow() {
        let config = WorkflowLoader::load_str(
            r#"
deploy:
  when: deploy
  steps: []
test:
  when: test
  steps: []
"#,
        )
        .unwrap();

        assert!(WorkflowLoader::select(&config, "deploy").is_ok());

        let err = WorkflowLoader::select(&config, "release").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Workflow \"release\" not found. Available workflows: deploy, test"
        );
    }
}
