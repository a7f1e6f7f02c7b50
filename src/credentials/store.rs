// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Credential store implementations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{CredentialBundle, CredentialStore};
use crate::error::StoreError;

/// JSON file holding one bundle per account.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// store, so a crash mid-write leaves the previous contents in place.
///
/// # Examples
///
/// ```no_run
/// use ecobee_mqtt::credentials::{CredentialBundle, CredentialStore, FileCredentialStore};
///
/// # fn example() -> Result<(), ecobee_mqtt::error::StoreError> {
/// let store = FileCredentialStore::new("ecobee_mqtt.json");
/// store.save("My Thermostat", &CredentialBundle::new("My Thermostat", "app-key"))?;
/// assert!(store.load("My Thermostat")?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_all(&self) -> Result<BTreeMap<String, CredentialBundle>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, accounts: &BTreeMap<String, CredentialBundle>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(accounts)?;
        let temp = self.temp_path();

        let written =
            write_synced(&temp, &contents).and_then(|()| fs::rename(&temp, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp) {
                tracing::debug!(
                    path = %temp.display(),
                    error = %cleanup,
                    "Failed to remove temp file"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, account_key: &str) -> Result<Option<CredentialBundle>, StoreError> {
        let mut accounts = self.read_all()?;
        Ok(accounts.remove(account_key))
    }

    fn save(&self, account_key: &str, bundle: &CredentialBundle) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let mut accounts = self.read_all()?;
        accounts.insert(account_key.to_string(), bundle.clone());
        self.write_all(&accounts)?;

        tracing::debug!(path = %self.path.display(), account = %account_key, "Saved credentials");
        Ok(())
    }
}

/// In-memory store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, CredentialBundle>>,
    saves: Mutex<usize>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `bundle` under its account key.
    #[must_use]
    pub fn with_bundle(bundle: CredentialBundle) -> Self {
        let store = Self::new();
        store
            .accounts
            .lock()
            .insert(bundle.account_key.clone(), bundle);
        store
    }

    /// Returns how many times [`CredentialStore::save`] succeeded.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, account_key: &str) -> Result<Option<CredentialBundle>, StoreError> {
        Ok(self.accounts.lock().get(account_key).cloned())
    }

    fn save(&self, account_key: &str, bundle: &CredentialBundle) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .insert(account_key.to_string(), bundle.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("creds.json"));
        assert!(store.load("home").unwrap().is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("creds.json"));

        let mut bundle = CredentialBundle::new("home", "key");
        bundle.authorization_token = Some("auth".to_string());
        store.save("home", &bundle).unwrap();

        let reopened = FileCredentialStore::new(dir.path().join("creds.json"));
        assert_eq!(reopened.load("home").unwrap(), Some(bundle));
    }

    #[test]
    fn file_store_overwrites_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("creds.json"));

        let mut first = CredentialBundle::new("home", "key");
        first.access_token = Some("old".to_string());
        store.save("home", &first).unwrap();

        let second = CredentialBundle::new("home", "key");
        store.save("home", &second).unwrap();

        let loaded = store.load("home").unwrap().unwrap();
        assert!(loaded.access_token.is_none());
    }

    #[test]
    fn file_store_keeps_other_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("creds.json"));

        store
            .save("upstairs", &CredentialBundle::new("upstairs", "key"))
            .unwrap();
        store
            .save("cabin", &CredentialBundle::new("cabin", "other"))
            .unwrap();

        assert_eq!(
            store.load("upstairs").unwrap().unwrap().application_key,
            "key"
        );
        assert_eq!(store.load("cabin").unwrap().unwrap().application_key, "other");
    }

    #[test]
    fn file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("creds.json"));
        store.save("home", &CredentialBundle::new("home", "key")).unwrap();

        assert!(!dir.path().join("creds.json.tmp").exists());
        assert!(dir.path().join("creds.json").exists());
    }

    #[test]
    fn failed_write_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();
        let store = FileCredentialStore::new(&path);

        let mut accounts = BTreeMap::new();
        accounts.insert("home".to_string(), CredentialBundle::new("home", "key"));
        let result = store.write_all(&accounts);

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!dir.path().join("creds.json.tmp").exists());
    }

    #[test]
    fn file_store_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(store.load("home"), Err(StoreError::Json(_))));
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryCredentialStore::new();
        store.save("home", &CredentialBundle::new("home", "key")).unwrap();
        store.save("home", &CredentialBundle::new("home", "key")).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
