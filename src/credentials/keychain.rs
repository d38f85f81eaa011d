//! OS keychain backend via the `keyring` crate
//!
//! `keyring` has no way to enumerate the entries of a service, so the
//! backend keeps its own index entry listing every account it has written.

use keyring::Entry;
use tracing::{debug, warn};

use super::secret::{SecretBackend, SecretError};

const INDEX_ACCOUNT: &str = "__glue_index__";

/// Raw single-entry access underneath the index bookkeeping
trait Entries: Send + Sync {
    fn read(&self, service: &str, account: &str) -> keyring::Result<Option<String>>;

    fn write(&self, service: &str, account: &str, value: &str) -> keyring::Result<()>;

    /// Removing a missing entry is not an error
    fn remove(&self, service: &str, account: &str) -> keyring::Result<()>;
}

struct OsEntries;

impl Entries for OsEntries {
    fn read(&self, service: &str, account: &str) -> keyring::Result<Option<String>> {
        match Entry::new(service, account)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, service: &str, account: &str, value: &str) -> keyring::Result<()> {
        Entry::new(service, account)?.set_password(value)
    }

    fn remove(&self, service: &str, account: &str) -> keyring::Result<()> {
        match Entry::new(service, account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

pub struct KeyringBackend {
    entries: Box<dyn Entries>,
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            entries: Box::new(OsEntries),
        }
    }

    fn read_index(&self, service: &str) -> Result<Vec<String>, SecretError> {
        let index = self.entries.read(service, INDEX_ACCOUNT)?.unwrap_or_default();
        Ok(index
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn write_index(&self, service: &str, accounts: &[String]) -> Result<(), SecretError> {
        if accounts.is_empty() {
            self.entries.remove(service, INDEX_ACCOUNT)?;
        } else {
            self.entries
                .write(service, INDEX_ACCOUNT, &accounts.join("\n"))?;
        }
        Ok(())
    }

    fn index_account(&self, service: &str, account: &str) -> Result<(), SecretError> {
        let mut accounts = self.read_index(service)?;
        if !accounts.iter().any(|a| a == account) {
            accounts.push(account.to_string());
            self.write_index(service, &accounts)?;
        }
        Ok(())
    }
}

impl SecretBackend for KeyringBackend {
    /// An entry that cannot be indexed is removed again, so it never
    /// shadows the value a lower tier stores instead
    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError> {
        self.entries.write(service, account, value)?;

        if let Err(e) = self.index_account(service, account) {
            if let Err(cleanup) = self.entries.remove(service, account) {
                warn!(service, account, "Failed to remove unindexed keychain entry: {}", cleanup);
            }
            return Err(e);
        }
        debug!(service, account, "Stored secret in keychain");
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        Ok(self.entries.read(service, account)?)
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        self.entries.remove(service, account)?;

        let mut accounts = self.read_index(service)?;
        let before = accounts.len();
        accounts.retain(|a| a != account);
        if accounts.len() != before {
            self.write_index(service, &accounts)?;
        }
        Ok(())
    }

    fn find_all(&self, service: &str) -> Result<Vec<(String, String)>, SecretError> {
        let mut found = Vec::new();
        for account in self.read_index(service)? {
            if let Some(value) = self.get(service, &account)? {
                found.push((account, value));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// In-memory entries; writes to the index account fail while `broken_index` is set
    #[derive(Default)]
    struct FakeEntries {
        values: Mutex<BTreeMap<(String, String), String>>,
        broken_index: bool,
    }

    impl Entries for Arc<FakeEntries> {
        fn read(&self, service: &str, account: &str) -> keyring::Result<Option<String>> {
            let values = self.values.lock().unwrap();
            Ok(values.get(&(service.to_string(), account.to_string())).cloned())
        }

        fn write(&self, service: &str, account: &str, value: &str) -> keyring::Result<()> {
            if self.broken_index && account == INDEX_ACCOUNT {
                return Err(keyring::Error::NoStorageAccess("index locked".into()));
            }
            self.values
                .lock()
                .unwrap()
                .insert((service.to_string(), account.to_string()), value.to_string());
            Ok(())
        }

        fn remove(&self, service: &str, account: &str) -> keyring::Result<()> {
            self.values
                .lock()
                .unwrap()
                .remove(&(service.to_string(), account.to_string()));
            Ok(())
        }
    }

    fn backend(fake: &Arc<FakeEntries>) -> KeyringBackend {
        KeyringBackend {
            entries: Box::new(fake.clone()),
        }
    }

    #[test]
    fn test_set_indexes_account() {
        let fake = Arc::new(FakeEntries::default());
        let keychain = backend(&fake);

        keychain.set("glue-cli", "slack_token", "xoxb-1").unwrap();
        keychain.set("glue-cli", "github_token", "ghp-1").unwrap();
        keychain.set("glue-cli", "slack_token", "xoxb-2").unwrap();

        assert_eq!(
            fake.read("glue-cli", INDEX_ACCOUNT).unwrap().as_deref(),
            Some("slack_token\ngithub_token")
        );
        assert_eq!(
            keychain.find_all("glue-cli").unwrap(),
            vec![
                ("slack_token".to_string(), "xoxb-2".to_string()),
                ("github_token".to_string(), "ghp-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_removes_entry_when_index_write_fails() {
        let fake = Arc::new(FakeEntries {
            broken_index: true,
            ..Default::default()
        });
        let keychain = backend(&fake);

        let err = keychain.set("glue-cli", "slack_token", "xoxb-1").unwrap_err();
        assert!(matches!(err, SecretError::Keyring(_)));
        assert_eq!(keychain.get("glue-cli", "slack_token").unwrap(), None);
        assert!(fake.values.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_drops_index_when_empty() {
        let fake = Arc::new(FakeEntries::default());
        let keychain = backend(&fake);

        keychain.set("glue-cli", "notion_token", "secret").unwrap();
        keychain.delete("glue-cli", "notion_token").unwrap();
        keychain.delete("glue-cli", "notion_token").unwrap();

        assert!(fake.values.lock().unwrap().is_empty());
        assert!(keychain.find_all("glue-cli").unwrap().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_default_store_survives_reboot() {
        use keyring::credential::CredentialPersistence;

        let persistence = keyring::default::default_credential_builder().persistence();
        assert!(!matches!(
            persistence,
            CredentialPersistence::UntilReboot | CredentialPersistence::ProcessOnly
        ));
    }
}
