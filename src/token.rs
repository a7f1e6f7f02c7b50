// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Token lifecycle for one account.
//!
//! [`TokenLifecycle`] owns the account's [`CredentialBundle`] and performs
//! whatever credential exchange is due before an API call:
//!
//! | State                          | Action                         |
//! |--------------------------------|--------------------------------|
//! | no authorization token         | PIN pairing, then halt         |
//! | no access token                | initial token request          |
//! | refresh token expired          | PIN pairing again, then halt   |
//! | access token expired           | token refresh                  |
//! | otherwise                      | nothing                        |
//!
//! Every new bundle is saved before it replaces the in-memory one, so a
//! failed write never leaves the process using tokens the store lost.

use chrono::{DateTime, Utc};

use crate::api::ThermostatApi;
use crate::credentials::{CredentialBundle, CredentialStore, TokenAction};
use crate::error::{ApiError, Error, ParseError, Result};

/// Credential state machine for one thermostat account.
#[derive(Debug)]
pub struct TokenLifecycle<S> {
    store: S,
    bundle: CredentialBundle,
}

impl<S: CredentialStore> TokenLifecycle<S> {
    /// Loads the account's bundle from `store`, or starts a new one.
    ///
    /// A stored bundle wins over `application_key`, which is only required
    /// on the first run.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingApplicationKey` if nothing is stored and no
    /// key was given, or `Error::Persistence` if the store is unreadable.
    pub fn load(store: S, account_key: &str, application_key: Option<&str>) -> Result<Self> {
        let bundle = match (store.load(account_key)?, application_key) {
            (Some(bundle), key) => {
                if key.is_some_and(|key| key != bundle.application_key) {
                    tracing::warn!(
                        account = %account_key,
                        "Ignoring application key argument, stored credentials exist"
                    );
                }
                tracing::info!(account = %account_key, "Loaded stored credentials");
                bundle
            }
            (None, Some(key)) => {
                tracing::info!(account = %account_key, "No stored credentials, starting fresh");
                CredentialBundle::new(account_key, key)
            }
            (None, None) => return Err(Error::MissingApplicationKey),
        };

        Ok(Self { store, bundle })
    }

    /// Wraps an existing bundle without touching the store.
    #[must_use]
    pub fn with_bundle(store: S, bundle: CredentialBundle) -> Self {
        Self { store, bundle }
    }

    /// Returns the current bundle.
    #[must_use]
    pub fn bundle(&self) -> &CredentialBundle {
        &self.bundle
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a usable access token, renewing credentials first if needed.
    ///
    /// # Errors
    ///
    /// - `Error::PairingRequired` when the operator has to enter a PIN
    /// - `Error::Auth` when a credential exchange is rejected
    /// - `Error::Persistence` when the renewed bundle cannot be saved
    pub async fn ensure_valid<A: ThermostatApi>(
        &mut self,
        api: &A,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match self.bundle.required_action(now) {
            TokenAction::Authorize => self.pair(api, self.bundle.clone(), now).await,
            TokenAction::RequestTokens => self.request_tokens(api, now).await,
            TokenAction::Reauthorize => {
                tracing::warn!(
                    account = %self.bundle.account_key,
                    "Refresh token expired, re-authorization required"
                );
                self.pair(api, self.bundle.unauthorized(), now).await
            }
            TokenAction::Refresh => self.refresh(api, now).await,
            TokenAction::Valid => self.bundle.access_token.clone().ok_or(Error::TokenExpired),
        }
    }

    /// Refreshes the token set regardless of the recorded expiry.
    ///
    /// Used when the API rejects an access token that looked valid. Falls
    /// back to [`ensure_valid`](Self::ensure_valid) when no refresh is
    /// possible.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_valid`](Self::ensure_valid).
    pub async fn force_refresh<A: ThermostatApi>(
        &mut self,
        api: &A,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match self.bundle.required_action(now) {
            TokenAction::Refresh | TokenAction::Valid => self.refresh(api, now).await,
            _ => self.ensure_valid(api, now).await,
        }
    }

    async fn pair<A: ThermostatApi>(
        &mut self,
        api: &A,
        base: CredentialBundle,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let response = api
            .authorize(&base.application_key)
            .await
            .map_err(Error::Auth)?;

        self.commit(base.authorized(&response, now).map_err(rejected)?)?;

        tracing::warn!(
            account = %self.bundle.account_key,
            pin = %response.pin,
            expires_in_minutes = response.expires_in,
            "Add this application on the My Apps page using the PIN, then restart"
        );

        Err(Error::PairingRequired { pin: response.pin })
    }

    async fn request_tokens<A: ThermostatApi>(
        &mut self,
        api: &A,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let code = self.bundle.authorization_token.clone().unwrap_or_default();

        match api.request_tokens(&self.bundle.application_key, &code).await {
            Ok(response) => {
                self.commit(self.bundle.with_tokens(&response, now).map_err(rejected)?)?;
                tracing::info!(account = %self.bundle.account_key, "Obtained initial tokens");
                Ok(response.access_token)
            }
            Err(err) if err.is_authorization_expired() => {
                tracing::warn!(
                    account = %self.bundle.account_key,
                    "Authorization expired before the PIN was entered, pairing will restart"
                );
                self.commit(self.bundle.unauthorized())?;
                Err(Error::Auth(err))
            }
            Err(err) => Err(Error::Auth(err)),
        }
    }

    async fn refresh<A: ThermostatApi>(&mut self, api: &A, now: DateTime<Utc>) -> Result<String> {
        let refresh_token = self.bundle.refresh_token.clone().unwrap_or_default();

        let response = api
            .refresh_tokens(&self.bundle.application_key, &refresh_token)
            .await
            .map_err(Error::Auth)?;

        self.commit(self.bundle.with_tokens(&response, now).map_err(rejected)?)?;
        tracing::debug!(
            account = %self.bundle.account_key,
            expires_at = ?self.bundle.access_token_expires_at,
            "Refreshed tokens"
        );
        Ok(response.access_token)
    }

    /// Persists `next`, then makes it the active bundle.
    fn commit(&mut self, next: CredentialBundle) -> Result<()> {
        self.store.save(&next.account_key, &next)?;
        self.bundle = next;
        Ok(())
    }
}

/// A token response whose lifetime cannot be represented.
fn rejected(err: ParseError) -> Error {
    Error::Auth(ApiError::Decode(err))
}
