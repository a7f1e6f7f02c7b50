// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTPS client for the ecobee cloud API.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::{
    AuthorizeResponse, Selection, SummaryResponse, ThermostatApi, TokenErrorResponse,
    TokenResponse,
};
use crate::error::{ApiError, ParseError};

// ============================================================================
// EcobeeConfig
// ============================================================================

/// Configuration for the ecobee API client.
///
/// # Examples
///
/// ```
/// use ecobee_mqtt::api::EcobeeConfig;
/// use std::time::Duration;
///
/// let config = EcobeeConfig::new()
///     .with_base_url("http://127.0.0.1:8080")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "http://127.0.0.1:8080");
/// ```
#[derive(Debug, Clone)]
pub struct EcobeeConfig {
    base_url: String,
    scope: String,
    timeout: Duration,
}

impl EcobeeConfig {
    /// Production API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.ecobee.com";
    /// Scope requested during authorization.
    pub const DEFAULT_SCOPE: &'static str = "smartRead";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration pointing at the production API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            scope: Self::DEFAULT_SCOPE.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the authorization scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the authorization scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `EcobeeClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL has no scheme or the HTTP client cannot
    /// be created.
    pub fn into_client(self) -> Result<EcobeeClient, ApiError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::InvalidAddress(self.base_url));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ApiError::Http)?;

        Ok(EcobeeClient {
            config: self,
            client,
        })
    }
}

impl Default for EcobeeConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// EcobeeClient
// ============================================================================

/// HTTP client for the ecobee API.
///
/// Every request carries the configured timeout.
#[derive(Debug, Clone)]
pub struct EcobeeClient {
    config: EcobeeConfig,
    client: Client,
}

impl EcobeeClient {
    /// Creates a client for the production API with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ApiError> {
        EcobeeConfig::new().into_client()
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    fn authorize_url(&self, application_key: &str) -> String {
        format!(
            "{}/authorize?response_type=ecobeePin&client_id={}&scope={}",
            self.config.base_url,
            urlencoding::encode(application_key),
            urlencoding::encode(&self.config.scope),
        )
    }

    fn token_url(&self, grant_type: &str, code: &str, application_key: &str) -> String {
        format!(
            "{}/token?grant_type={grant_type}&code={}&client_id={}",
            self.config.base_url,
            urlencoding::encode(code),
            urlencoding::encode(application_key),
        )
    }

    fn summary_url(&self, selection: &Selection) -> Result<String, ApiError> {
        let json = serde_json::to_string(&selection.wrapped()).map_err(ParseError::Json)?;
        Ok(format!(
            "{}/1/thermostatSummary?json={}",
            self.config.base_url,
            urlencoding::encode(&json),
        ))
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            // Safe: configured timeouts are far below u64::MAX milliseconds
            #[allow(clippy::cast_possible_truncation)]
            let timeout_ms = self.config.timeout.as_millis() as u64;
            ApiError::Timeout(timeout_ms)
        } else {
            ApiError::Http(err)
        }
    }

    /// Posts to the token endpoint and decodes either grant's response.
    async fn token_request(&self, url: &str) -> Result<TokenResponse, ApiError> {
        tracing::debug!(base_url = %self.config.base_url, "Requesting tokens");

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if status.is_success() {
            return decode(&body);
        }

        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(rejected) => Err(ApiError::TokenRejected {
                error: rejected.error,
                description: rejected.error_description,
            }),
            Err(_) => Err(unexpected_status(status)),
        }
    }

    async fn read_body(&self, response: Response) -> Result<String, ApiError> {
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        tracing::trace!(body = %body, "Received HTTP response");
        Ok(body)
    }
}

impl ThermostatApi for EcobeeClient {
    async fn authorize(&self, application_key: &str) -> Result<AuthorizeResponse, ApiError> {
        tracing::debug!(base_url = %self.config.base_url, "Requesting authorization PIN");

        let response = self
            .client
            .get(self.authorize_url(application_key))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if !status.is_success() {
            return match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(rejected) => Err(ApiError::TokenRejected {
                    error: rejected.error,
                    description: rejected.error_description,
                }),
                Err(_) => Err(unexpected_status(status)),
            };
        }

        decode(&body)
    }

    async fn request_tokens(
        &self,
        application_key: &str,
        authorization_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        let url = self.token_url("ecobeePin", authorization_token, application_key);
        self.token_request(&url).await
    }

    async fn refresh_tokens(
        &self,
        application_key: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        let url = self.token_url("refresh_token", refresh_token, application_key);
        self.token_request(&url).await
    }

    async fn thermostat_summary(
        &self,
        access_token: &str,
        selection: &Selection,
    ) -> Result<SummaryResponse, ApiError> {
        let url = self.summary_url(selection)?;
        tracing::debug!(url = %url, "Requesting thermostat summary");

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json;charset=UTF-8")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        // Error responses still carry a status object; prefer its code.
        let summary = match serde_json::from_str::<SummaryResponse>(&body) {
            Ok(summary) => summary,
            Err(_) if !status.is_success() => return Err(unexpected_status(status)),
            Err(e) => return Err(ParseError::Json(e).into()),
        };

        if !summary.status.is_success() {
            return Err(ApiError::Status {
                code: summary.status.code,
                message: summary.status.message,
            });
        }

        if !status.is_success() {
            return Err(unexpected_status(status));
        }

        Ok(summary)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ParseError::Json(e).into())
}

fn unexpected_status(status: StatusCode) -> ApiError {
    ApiError::ConnectionFailed(format!(
        "HTTP {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EcobeeClient {
        EcobeeConfig::new()
            .with_base_url("http://127.0.0.1:9")
            .into_client()
            .unwrap()
    }

    #[test]
    fn config_default_values() {
        let config = EcobeeConfig::new();
        assert_eq!(config.base_url(), "https://api.ecobee.com");
        assert_eq!(config.scope(), "smartRead");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = EcobeeConfig::new().with_base_url("http://localhost:8080/");
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn config_rejects_missing_scheme() {
        let result = EcobeeConfig::new()
            .with_base_url("api.ecobee.com")
            .into_client();
        assert!(matches!(result, Err(ApiError::InvalidAddress(_))));
    }

    #[test]
    fn authorize_url_encodes_key() {
        let url = client().authorize_url("key with space");
        assert_eq!(
            url,
            "http://127.0.0.1:9/authorize?response_type=ecobeePin&client_id=key%20with%20space&scope=smartRead"
        );
    }

    #[test]
    fn token_url_for_refresh() {
        let url = client().token_url("refresh_token", "r3fr/sh", "app");
        assert_eq!(
            url,
            "http://127.0.0.1:9/token?grant_type=refresh_token&code=r3fr%2Fsh&client_id=app"
        );
    }

    #[test]
    fn summary_url_encodes_selection() {
        let url = client()
            .summary_url(&Selection::registered_with_equipment())
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:9/1/thermostatSummary?json=%7B%22selection%22"));
        assert!(url.contains("includeEquipmentStatus%22%3Atrue"));
    }
}
