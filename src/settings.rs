//! Runtime settings
//!
//! | setting          | default           | override                  |
//! |------------------|-------------------|---------------------------|
//! | workflow file    | `./glue.yaml`     | `--config`, `GLUE_CONFIG` |
//! | history dir      | `~/.glue-history` | `GLUE_HISTORY_DIR`        |
//! | credentials dir  | `~/.glue-auth`    | `GLUE_AUTH_DIR`           |
//! | keychain tier    | on                | `GLUE_NO_KEYRING=1`       |

use std::path::PathBuf;
use tracing::debug;

use crate::credentials::{CredentialStore, FileStore};
use crate::history::HistoryRecorder;

pub const DEFAULT_CONFIG_FILE: &str = "glue.yaml";
const HISTORY_DIR_NAME: &str = ".glue-history";
const AUTH_DIR_NAME: &str = ".glue-auth";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Cannot determine home directory; set {0}")]
    NoHomeDir(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub config_file: PathBuf,
    pub history_dir: PathBuf,
    pub auth_dir: PathBuf,
    /// Use the OS keychain ahead of the credential files
    pub use_keyring: bool,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::resolve(|name| std::env::var(name).ok(), dirs::home_dir())
    }

    /// Resolve settings from `var` lookups, with defaults under `home`
    pub fn resolve(
        var: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self, SettingsError> {
        let var = |name: &str| var(name).filter(|v| !v.is_empty());

        let under_home = |override_var: &'static str, dir_name: &str| match var(override_var) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => home
                .as_ref()
                .map(|home| home.join(dir_name))
                .ok_or(SettingsError::NoHomeDir(override_var)),
        };

        let settings = Self {
            config_file: var("GLUE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
            history_dir: under_home("GLUE_HISTORY_DIR", HISTORY_DIR_NAME)?,
            auth_dir: under_home("GLUE_AUTH_DIR", AUTH_DIR_NAME)?,
            use_keyring: !var("GLUE_NO_KEYRING")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    /// Override the workflow file, e.g. from `--config`
    pub fn with_config_file(mut self, config_file: Option<PathBuf>) -> Self {
        if let Some(file) = config_file {
            self.config_file = file;
        }
        self
    }

    /// Credential chain: keychain (unless disabled) then credential files
    pub fn credential_store(&self) -> CredentialStore {
        let files = FileStore::new(&self.auth_dir);
        if self.use_keyring {
            CredentialStore::system(files)
        } else {
            CredentialStore::file_only(files)
        }
    }

    pub fn history(&self) -> HistoryRecorder {
        HistoryRecorder::new(&self.history_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)], home: Option<&str>) -> Result<Settings, SettingsError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(|name| vars.get(name).cloned(), home.map(PathBuf::from))
    }

    #[test]
    fn test_defaults() {
        let settings = resolve(&[], Some("/home/ada")).unwrap();
        assert_eq!(settings.config_file, PathBuf::from("glue.yaml"));
        assert_eq!(settings.history_dir, PathBuf::from("/home/ada/.glue-history"));
        assert_eq!(settings.auth_dir, PathBuf::from("/home/ada/.glue-auth"));
        assert!(settings.use_keyring);
    }

    #[test]
    fn test_env_overrides() {
        let settings = resolve(
            &[
                ("GLUE_CONFIG", "ci/glue.yaml"),
                ("GLUE_HISTORY_DIR", "/tmp/history"),
                ("GLUE_AUTH_DIR", "/tmp/auth"),
                ("GLUE_NO_KEYRING", "1"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(settings.config_file, PathBuf::from("ci/glue.yaml"));
        assert_eq!(settings.history_dir, PathBuf::from("/tmp/history"));
        assert_eq!(settings.auth_dir, PathBuf::from("/tmp/auth"));
        assert!(!settings.use_keyring);

        let cli = settings.with_config_file(Some(PathBuf::from("other.yaml")));
        assert_eq!(cli.config_file, PathBuf::from("other.yaml"));
    }

    #[test]
    fn test_keyring_toggle_values() {
        let on = resolve(&[("GLUE_NO_KEYRING", "0")], Some("/h")).unwrap();
        assert!(on.use_keyring);
        let off = resolve(&[("GLUE_NO_KEYRING", "TRUE")], Some("/h")).unwrap();
        assert!(!off.use_keyring);
    }

    #[test]
    fn test_no_home() {
        let err = resolve(&[("GLUE_HISTORY_DIR", "/tmp/h")], None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot determine home directory; set GLUE_AUTH_DIR"
        );
    }

    #[test]
    fn test_file_only_store_uses_auth_dir() {
        let dir = tempfile::tempdir().unwrap();
        let auth = dir.path().join("auth");
        let settings = Settings {
            config_file: PathBuf::from("glue.yaml"),
            history_dir: dir.path().join("history"),
            auth_dir: auth.clone(),
            use_keyring: false,
        };

        let store = settings.credential_store();
        store.save("slack", "token", "xoxb-1").unwrap();
        assert!(std::fs::read_dir(&auth).unwrap().next().is_some());
        assert_eq!(store.get("slack", "token").as_deref(), Some("xoxb-1"));
    }
}
