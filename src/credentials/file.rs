//! File-based credential backend
//!
//! One file per credential, named `{namespace}_{key}_{hash}` where `hash` is
//! the first 8 hex digits of SHA-256 over `{namespace}_{key}`. Contents are
//! Base64 of the value. That is obfuscation only; the file mode (0600) is
//! what keeps other users out.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CredentialBackend, CredentialError};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(namespace: &str, key: &str) -> String {
        let id = format!("{}_{}", namespace, key);
        let digest = hex::encode(Sha256::digest(id.as_bytes()));
        format!("{}_{}", id, &digest[..8])
    }

    fn path(&self, namespace: &str, key: &str) -> Result<PathBuf, CredentialError> {
        validate_name(namespace)?;
        validate_name(key)?;
        Ok(self.dir.join(Self::file_name(namespace, key)))
    }

    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), CredentialError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(CredentialError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl CredentialBackend for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn save(&self, namespace: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        let path = self.path(namespace, key)?;
        self.ensure_dir()?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        file.write_all(STANDARD.encode(value.as_bytes()).as_bytes())?;

        // The mode above only applies to newly created files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "Stored credential file");
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CredentialError> {
        let path = self.path(namespace, key)?;
        let encoded = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let corrupt = || CredentialError::Corrupt(path.display().to_string());
        let bytes = STANDARD.decode(encoded.trim()).map_err(|_| corrupt())?;
        String::from_utf8(bytes).map(Some).map_err(|_| corrupt())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), CredentialError> {
        let path = self.path(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, CredentialError> {
        validate_name(namespace)?;

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_", namespace);
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            let Some((key, _hash)) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.rsplit_once('_'))
            else {
                continue;
            };

            // Only files whose hash suffix checks out belong to this namespace
            if !key.is_empty() && Self::file_name(namespace, key) == file_name {
                keys.push(key.to_string());
            }
        }

        Ok(keys)
    }
}
