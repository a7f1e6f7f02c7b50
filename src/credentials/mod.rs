// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Credential bundle and its durable storage.
//!
//! A [`CredentialBundle`] holds everything needed to talk to the API on
//! behalf of one account. It is always written as a whole record through a
//! [`CredentialStore`].

mod bundle;
mod store;

pub use bundle::{CredentialBundle, REFRESH_TOKEN_LIFETIME, TokenAction};
pub use store::{FileCredentialStore, MemoryCredentialStore};

use std::sync::Arc;

use crate::error::StoreError;

/// Durable key-value persistence of one credential bundle per account.
pub trait CredentialStore {
    /// Loads the bundle stored for `account_key`.
    ///
    /// Returns `Ok(None)` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store exists but cannot be read.
    fn load(&self, account_key: &str) -> Result<Option<CredentialBundle>, StoreError>;

    /// Replaces the bundle stored for `account_key`.
    ///
    /// A failed save must leave the previously stored record intact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record cannot be written.
    fn save(&self, account_key: &str, bundle: &CredentialBundle) -> Result<(), StoreError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn load(&self, account_key: &str) -> Result<Option<CredentialBundle>, StoreError> {
        (**self).load(account_key)
    }

    fn save(&self, account_key: &str, bundle: &CredentialBundle) -> Result<(), StoreError> {
        (**self).save(account_key, bundle)
    }
}
