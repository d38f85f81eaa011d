//! Secure secret backends
//!
//! A [`SecretBackend`] is anything with the four-operation shape of an OS
//! secret manager, addressed by `(service, account)`. [`SecureStore`] maps
//! credential `(namespace, key)` pairs onto accounts named
//! `{namespace}_{key}` within a single service.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{CredentialBackend, CredentialError};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

pub trait SecretBackend: Send + Sync {
    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError>;

    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError>;

    /// Deleting a missing account is not an error
    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError>;

    fn find_all(&self, service: &str) -> Result<Vec<(String, String)>, SecretError>;
}

impl<T: SecretBackend + ?Sized> SecretBackend for Arc<T> {
    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError> {
        (**self).set(service, account, value)
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        (**self).get(service, account)
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        (**self).delete(service, account)
    }

    fn find_all(&self, service: &str) -> Result<Vec<(String, String)>, SecretError> {
        (**self).find_all(service)
    }
}

/// Credential tier backed by a [`SecretBackend`]
pub struct SecureStore {
    service: String,
    backend: Box<dyn SecretBackend>,
}

impl SecureStore {
    pub fn new(service: impl Into<String>, backend: impl SecretBackend + 'static) -> Self {
        Self {
            service: service.into(),
            backend: Box::new(backend),
        }
    }

    fn account(namespace: &str, key: &str) -> String {
        format!("{}_{}", namespace, key)
    }
}

impl CredentialBackend for SecureStore {
    fn name(&self) -> &'static str {
        "secure"
    }

    fn save(&self, namespace: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        Ok(self
            .backend
            .set(&self.service, &Self::account(namespace, key), value)?)
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self
            .backend
            .get(&self.service, &Self::account(namespace, key))?)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), CredentialError> {
        Ok(self
            .backend
            .delete(&self.service, &Self::account(namespace, key))?)
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, CredentialError> {
        let prefix = format!("{}_", namespace);
        Ok(self
            .backend
            .find_all(&self.service)?
            .into_iter()
            .filter_map(|(account, _)| account.strip_prefix(&prefix).map(str::to_string))
            .filter(|key| !key.is_empty())
            .collect())
    }
}

/// In-process secret backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    services: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn services(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, BTreeMap<String, String>>> {
        self.services.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SecretBackend for MemoryBackend {
    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError> {
        self.services()
            .entry(service.to_string())
            .or_default()
            .insert(account.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        Ok(self
            .services()
            .get(service)
            .and_then(|accounts| accounts.get(account))
            .cloned())
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        if let Some(accounts) = self.services().get_mut(service) {
            accounts.remove(account);
        }
        Ok(())
    }

    fn find_all(&self, service: &str) -> Result<Vec<(String, String)>, SecretError> {
        Ok(self
            .services()
            .get(service)
            .map(|accounts| {
                accounts
                    .iter()
                    .map(|(a, v)| (a.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
