// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote thermostat API.
//!
//! [`ThermostatApi`] is the capability the rest of the crate depends on.
//! [`EcobeeClient`] implements it over HTTPS against the ecobee cloud.

#[cfg(feature = "http")]
mod http;
#[cfg(test)]
pub(crate) mod mock;
mod request;
mod response;

#[cfg(feature = "http")]
pub use http::{EcobeeClient, EcobeeConfig};
pub use request::{Selection, SelectionEnvelope, SelectionType};
pub use response::{
    ApiStatus, AuthorizeResponse, RevisionEntry, StatusEntry, SummaryResponse, TokenErrorResponse,
    TokenResponse,
};

use std::sync::Arc;

use crate::error::ApiError;

/// Operations the bridge needs from the thermostat vendor.
///
/// Implementations must bound every call with a timeout so a stalled
/// request cannot stall the poll loop forever.
#[allow(async_fn_in_trait)]
pub trait ThermostatApi {
    /// Starts PIN authorization for the application.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    async fn authorize(&self, application_key: &str) -> Result<AuthorizeResponse, ApiError>;

    /// Exchanges an authorization token for the first token set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::TokenRejected` while the PIN is still pending or
    /// after the authorization token lapsed.
    async fn request_tokens(
        &self,
        application_key: &str,
        authorization_token: &str,
    ) -> Result<TokenResponse, ApiError>;

    /// Exchanges a refresh token for a new token set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    async fn refresh_tokens(
        &self,
        application_key: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError>;

    /// Fetches the revision and status listings for the selected thermostats.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with code 14 when the access token expired.
    async fn thermostat_summary(
        &self,
        access_token: &str,
        selection: &Selection,
    ) -> Result<SummaryResponse, ApiError>;
}

impl<T: ThermostatApi> ThermostatApi for Arc<T> {
    async fn authorize(&self, application_key: &str) -> Result<AuthorizeResponse, ApiError> {
        (**self).authorize(application_key).await
    }

    async fn request_tokens(
        &self,
        application_key: &str,
        authorization_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        (**self)
            .request_tokens(application_key, authorization_token)
            .await
    }

    async fn refresh_tokens(
        &self,
        application_key: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        (**self).refresh_tokens(application_key, refresh_token).await
    }

    async fn thermostat_summary(
        &self,
        access_token: &str,
        selection: &Selection,
    ) -> Result<SummaryResponse, ApiError> {
        (**self).thermostat_summary(access_token, selection).await
    }
}
