//! Layered credential storage
//!
//! Credentials are addressed by `(namespace, key)`, where the namespace is
//! usually an adapter name. A [`CredentialStore`] is an ordered chain of
//! tiers:
//!
//! - the secure tier ([`SecureStore`] over the OS keychain) is used
//!   opportunistically; its errors never fail an operation and only produce
//!   a warning before moving on to the next tier
//! - the file tier ([`FileStore`]) is authoritative; its write errors are
//!   returned to the caller
//!
//! Reads return the first value found walking the chain, so a value present
//! in both tiers is served from the secure one.

pub mod file;
pub mod keychain;
pub mod secret;

use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

pub use file::FileStore;
pub use keychain::KeyringBackend;
pub use secret::{MemoryBackend, SecretBackend, SecretError, SecureStore};

/// Service name used for entries in the OS secret store
pub const SERVICE_NAME: &str = "glue-cli";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid credential name: {0:?}")]
    InvalidName(String),

    #[error("Corrupt credential file: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("No credential backend configured")]
    NoBackend,
}

/// One storage backend in the chain
pub trait CredentialBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn save(&self, namespace: &str, key: &str, value: &str) -> Result<(), CredentialError>;

    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CredentialError>;

    /// Deleting a missing credential is not an error
    fn delete(&self, namespace: &str, key: &str) -> Result<(), CredentialError>;

    /// Logical key names stored for the namespace
    fn list(&self, namespace: &str) -> Result<Vec<String>, CredentialError>;
}

/// What a tier's errors mean for the overall operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and continue with the next tier
    FallThrough,
    /// Return the error to the caller
    Propagate,
}

struct Tier {
    backend: Box<dyn CredentialBackend>,
    policy: FailurePolicy,
}

pub struct CredentialStore {
    tiers: Vec<Tier>,
}

impl CredentialStore {
    /// Empty chain; add tiers with [`CredentialStore::with_tier`]
    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    pub fn with_tier(
        mut self,
        backend: impl CredentialBackend + 'static,
        policy: FailurePolicy,
    ) -> Self {
        self.tiers.push(Tier {
            backend: Box::new(backend),
            policy,
        });
        self
    }

    /// Secure backend first, falling back to the file store
    pub fn layered(secure: impl SecretBackend + 'static, file: FileStore) -> Self {
        Self::new()
            .with_tier(SecureStore::new(SERVICE_NAME, secure), FailurePolicy::FallThrough)
            .with_tier(file, FailurePolicy::Propagate)
    }

    /// OS keychain with file fallback
    pub fn system(file: FileStore) -> Self {
        Self::layered(KeyringBackend::new(), file)
    }

    pub fn file_only(file: FileStore) -> Self {
        Self::new().with_tier(file, FailurePolicy::Propagate)
    }

    #[instrument(skip(self, value))]
    pub fn save(&self, namespace: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        for tier in &self.tiers {
            match tier.backend.save(namespace, key, value) {
                Ok(()) => {
                    debug!(backend = tier.backend.name(), "Credential saved");
                    return Ok(());
                }
                Err(e) if tier.policy == FailurePolicy::FallThrough => {
                    warn!(
                        backend = tier.backend.name(),
                        error = %e,
                        "Credential backend rejected write, falling back"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(CredentialError::NoBackend)
    }

    /// A missing secret is `None`, never an error
    #[instrument(skip(self))]
    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        for tier in &self.tiers {
            match tier.backend.get(namespace, key) {
                Ok(Some(value)) => {
                    debug!(backend = tier.backend.name(), "Credential found");
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        backend = tier.backend.name(),
                        error = %e,
                        "Credential backend read failed"
                    );
                }
            }
        }
        None
    }

    /// Removes the credential from every tier
    #[instrument(skip(self))]
    pub fn delete(&self, namespace: &str, key: &str) -> Result<(), CredentialError> {
        for tier in &self.tiers {
            if let Err(e) = tier.backend.delete(namespace, key) {
                if tier.policy == FailurePolicy::Propagate {
                    return Err(e);
                }
                warn!(
                    backend = tier.backend.name(),
                    error = %e,
                    "Credential backend delete failed"
                );
            }
        }
        Ok(())
    }

    /// Keys stored for the namespace in any tier
    #[instrument(skip(self))]
    pub fn list(&self, namespace: &str) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for tier in &self.tiers {
            match tier.backend.list(namespace) {
                Ok(found) => keys.extend(found),
                Err(e) => {
                    warn!(
                        backend = tier.backend.name(),
                        error = %e,
                        "Credential backend listing failed"
                    );
                }
            }
        }
        keys
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
