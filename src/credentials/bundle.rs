// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-account credential record.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AuthorizeResponse, TokenResponse};
use crate::error::ParseError;

/// How long a refresh token stays valid after it was issued.
pub const REFRESH_TOKEN_LIFETIME: TimeDelta = TimeDelta::days(365);

/// The credential work required before the next API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// No authorization token yet; the operator has to pair the app.
    Authorize,
    /// Authorized, but no token set was requested yet.
    RequestTokens,
    /// The refresh token expired; pairing has to start over.
    Reauthorize,
    /// The access token expired; a refresh suffices.
    Refresh,
    /// The access token is still valid.
    Valid,
}

/// Credentials for one thermostat account.
///
/// If `access_token` is set, `access_token_expires_at` is set too.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use ecobee_mqtt::credentials::{CredentialBundle, TokenAction};
///
/// let bundle = CredentialBundle::new("My Thermostat", "app-key");
/// assert_eq!(bundle.required_action(Utc::now()), TokenAction::Authorize);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Account this bundle belongs to.
    pub account_key: String,
    /// Application (API) key registered with the vendor.
    pub application_key: String,
    /// Authorization token obtained through PIN pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,
    /// When the authorization token lapses if the PIN is never entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_expires_at: Option<DateTime<Utc>>,
    /// Current bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Expiry of `access_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    /// Token used to renew the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry of `refresh_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Scope granted by the vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl CredentialBundle {
    /// Creates an empty bundle for a first run.
    #[must_use]
    pub fn new(account_key: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            account_key: account_key.into(),
            application_key: application_key.into(),
            authorization_token: None,
            authorization_expires_at: None,
            access_token: None,
            access_token_expires_at: None,
            refresh_token: None,
            refresh_token_expires_at: None,
            scope: None,
        }
    }

    /// Decides what has to happen before the access token can be used.
    ///
    /// Checks run in order and the first match wins. A bundle with an
    /// access token but no expiry is treated as expired.
    #[must_use]
    pub fn required_action(&self, now: DateTime<Utc>) -> TokenAction {
        if self.authorization_token.is_none() {
            return TokenAction::Authorize;
        }
        if self.access_token.is_none() {
            return TokenAction::RequestTokens;
        }
        if self.refresh_token_expires_at.is_none_or(|expires| now > expires) {
            return TokenAction::Reauthorize;
        }
        if self.access_token_expires_at.is_none_or(|expires| now > expires) {
            return TokenAction::Refresh;
        }
        TokenAction::Valid
    }

    /// Returns a copy carrying a fresh authorization and no token set.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidLifetime` if `expires_in` does not fit a
    /// timestamp.
    pub fn authorized(
        &self,
        response: &AuthorizeResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        let expires_at = expiry(
            now,
            TimeDelta::try_minutes(response.expires_in),
            response.expires_in,
        )?;

        Ok(Self {
            authorization_token: Some(response.code.clone()),
            authorization_expires_at: Some(expires_at),
            access_token: None,
            access_token_expires_at: None,
            refresh_token: None,
            refresh_token_expires_at: None,
            scope: Some(response.scope.clone()).filter(|s| !s.is_empty()),
            ..self.clone()
        })
    }

    /// Returns a copy carrying the token set from `response`.
    ///
    /// The refresh token is valid for [`REFRESH_TOKEN_LIFETIME`] from `now`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidLifetime` if `expires_in` does not fit a
    /// timestamp.
    pub fn with_tokens(
        &self,
        response: &TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        let access_expires_at =
            expiry(now, TimeDelta::try_seconds(response.expires_in), response.expires_in)?;
        let refresh_expires_at = expiry(
            now,
            Some(REFRESH_TOKEN_LIFETIME),
            REFRESH_TOKEN_LIFETIME.num_seconds(),
        )?;

        Ok(Self {
            access_token: Some(response.access_token.clone()),
            access_token_expires_at: Some(access_expires_at),
            refresh_token: Some(response.refresh_token.clone()),
            refresh_token_expires_at: Some(refresh_expires_at),
            scope: Some(response.scope.clone())
                .filter(|s| !s.is_empty())
                .or_else(|| self.scope.clone()),
            ..self.clone()
        })
    }

    /// Returns a copy with all authorization state dropped.
    #[must_use]
    pub fn unauthorized(&self) -> Self {
        Self::new(self.account_key.clone(), self.application_key.clone())
    }
}

fn expiry(
    now: DateTime<Utc>,
    lifetime: Option<TimeDelta>,
    raw: i64,
) -> Result<DateTime<Utc>, ParseError> {
    lifetime
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(ParseError::InvalidLifetime(raw))
}
