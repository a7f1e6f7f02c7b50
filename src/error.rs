// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the ecobee MQTT bridge.
//!
//! The top-level [`Error`] separates the one fatal condition
//! ([`Error::PairingRequired`]) from the failures a poll cycle recovers
//! from by skipping to the next period.

use thiserror::Error;

/// Vendor status code reported when an access token expired mid-flight.
pub const STATUS_TOKEN_EXPIRED: i64 = 14;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The application must be (re-)authorized by entering a PIN in the
    /// vendor portal. Fatal for the current process run.
    #[error("pairing required: enter PIN \"{pin}\" on the My Apps page, then restart")]
    PairingRequired {
        /// The PIN the operator has to enter.
        pin: String,
    },

    /// A credential exchange (authorize, request or refresh) was rejected.
    #[error("authentication failed: {0}")]
    Auth(ApiError),

    /// The access token expired between validation and use.
    #[error("access token expired mid-flight")]
    TokenExpired,

    /// The API answered with something internally inconsistent.
    #[error("protocol mismatch: {0}")]
    Protocol(#[from] ParseError),

    /// Timeout, connection failure or unexpected HTTP status.
    #[error("network failure: {0}")]
    Network(ApiError),

    /// Reading or writing the credential store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// First run without an application key.
    #[error("no stored credentials and no application key given")]
    MissingApplicationKey,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if the error must stop the whole process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PairingRequired { .. } | Self::MissingApplicationKey)
    }

    /// Classifies an API error raised while reading thermostat data.
    pub(crate) fn from_fetch(err: ApiError) -> Self {
        match err {
            ApiError::Decode(parse) => Self::Protocol(parse),
            err if err.is_token_expired() => Self::TokenExpired,
            err => Self::Network(err),
        }
    }
}

/// Errors raised by the remote thermostat API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Connection failed or the server answered with an unexpected status.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The API returned a non-zero status object.
    #[error("API status {code}: {message}")]
    Status {
        /// Vendor status code.
        code: i64,
        /// Vendor status message.
        message: String,
    },

    /// The token endpoint rejected the grant.
    #[error("token request rejected: {error} ({description})")]
    TokenRejected {
        /// OAuth error identifier, e.g. `authorization_pending`.
        error: String,
        /// Human readable description.
        description: String,
    },

    /// The response body could not be decoded.
    #[error("{0}")]
    Decode(#[from] ParseError),

    /// Invalid base URL.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ApiError {
    /// Returns `true` if the API reported that the access token expired.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::Status { code, .. } if *code == STATUS_TOKEN_EXPIRED)
    }

    /// Returns `true` if the token endpoint reported that the authorization
    /// code lapsed before the PIN was entered.
    #[must_use]
    pub fn is_authorization_expired(&self) -> bool {
        matches!(self, Self::TokenRejected { error, .. } if error == "authorization_expired")
    }
}

/// Errors related to parsing API responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A revision or status entry lacks its `:` separated fields.
    #[error("malformed listing entry: {0:?}")]
    MalformedEntry(String),

    /// A token lifetime does not fit a timestamp.
    #[error("token lifetime out of range: {0}")]
    InvalidLifetime(i64),

    /// A status entry references an id missing from the revision listing.
    #[error("status listing references unknown thermostat id {0}")]
    UnknownThermostat(String),
}

/// Errors related to the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file could not be (de)serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to publishing change events.
#[derive(Debug, Error)]
pub enum ReportError {
    /// MQTT publish failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The transport task is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// The transport did not accept the event in time.
    #[error("publish timed out after {0} ms")]
    Timeout(u64),

    /// The event could not be serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_required_display() {
        let err = Error::PairingRequired {
            pin: "ab12".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pairing required: enter PIN \"ab12\" on the My Apps page, then restart"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn transient_errors_are_not_fatal() {
        assert!(!Error::TokenExpired.is_fatal());
        assert!(!Error::Network(ApiError::Timeout(10_000)).is_fatal());
        assert!(!Error::Protocol(ParseError::UnknownThermostat("7".into())).is_fatal());
    }

    #[test]
    fn fetch_classifies_expired_token() {
        let err = Error::from_fetch(ApiError::Status {
            code: STATUS_TOKEN_EXPIRED,
            message: "Authentication token has expired.".to_string(),
        });
        assert!(matches!(err, Error::TokenExpired));
    }

    #[test]
    fn fetch_classifies_decode_as_protocol() {
        let err = Error::from_fetch(ApiError::Decode(ParseError::MalformedEntry("x".into())));
        assert!(matches!(err, Error::Protocol(ParseError::MalformedEntry(_))));
    }

    #[test]
    fn fetch_classifies_other_status_as_network() {
        let err = Error::from_fetch(ApiError::Status {
            code: 3,
            message: "Processing error.".to_string(),
        });
        assert!(matches!(err, Error::Network(ApiError::Status { code: 3, .. })));
    }

    #[test]
    fn authorization_expired_detection() {
        let err = ApiError::TokenRejected {
            error: "authorization_expired".to_string(),
            description: "The authorization has expired.".to_string(),
        };
        assert!(err.is_authorization_expired());
        assert!(!err.is_token_expired());
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::UnknownThermostat("101".to_string());
        assert_eq!(
            err.to_string(),
            "status listing references unknown thermostat id 101"
        );
    }
}
