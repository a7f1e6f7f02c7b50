// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response bodies returned by the thermostat API.

use serde::Deserialize;

use crate::error::ParseError;

/// Response from the PIN authorization endpoint.
///
/// # Examples
///
/// ```
/// use ecobee_mqtt::api::AuthorizeResponse;
///
/// let json = r#"{"ecobeePin":"bv29","code":"uiDZYfgm","scope":"smartRead","expires_in":9,"interval":30}"#;
/// let response: AuthorizeResponse = serde_json::from_str(json).unwrap();
/// assert_eq!(response.pin, "bv29");
/// assert_eq!(response.expires_in, 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizeResponse {
    /// PIN the operator enters on the vendor's My Apps page.
    #[serde(rename = "ecobeePin")]
    pub pin: String,
    /// Authorization token exchanged for the first token set.
    pub code: String,
    /// Granted scope.
    #[serde(default)]
    pub scope: String,
    /// Minutes until the authorization token lapses.
    pub expires_in: i64,
    /// Minimum seconds between token requests while the PIN is pending.
    #[serde(default)]
    pub interval: i64,
}

/// Response from the token endpoint, for both grant types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token type, always `Bearer`.
    #[serde(default)]
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// Token used to obtain the next token set.
    pub refresh_token: String,
    /// Granted scope.
    #[serde(default)]
    pub scope: String,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth error identifier.
    pub error: String,
    /// Human readable description.
    #[serde(default)]
    pub error_description: String,
}

/// Status object carried by every data API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiStatus {
    /// Zero on success.
    pub code: i64,
    /// Message accompanying a non-zero code.
    #[serde(default)]
    pub message: String,
}

impl ApiStatus {
    /// Returns `true` if the status reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Response from the thermostat summary endpoint.
///
/// # Examples
///
/// ```
/// use ecobee_mqtt::api::SummaryResponse;
///
/// let json = r#"{
///     "thermostatCount": 1,
///     "revisionList": ["101:LivingRoom:true:1:2:3:4"],
///     "statusList": ["101:auxHeat1,fan"],
///     "status": {"code": 0, "message": ""}
/// }"#;
/// let response: SummaryResponse = serde_json::from_str(json).unwrap();
/// assert_eq!(response.thermostat_count, 1);
/// assert_eq!(response.status_list, vec!["101:auxHeat1,fan"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    /// Number of thermostats matched by the selection.
    #[serde(default)]
    pub thermostat_count: u32,
    /// `id:name:connected:revisions...` entries.
    #[serde(default)]
    pub revision_list: Vec<String>,
    /// `id:code,code,...` entries.
    #[serde(default)]
    pub status_list: Vec<String>,
    /// Request status.
    #[serde(default)]
    pub status: ApiStatus,
}

impl SummaryResponse {
    /// Parses every revision listing entry.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedEntry` for an entry without a name field.
    pub fn revisions(&self) -> Result<Vec<RevisionEntry<'_>>, ParseError> {
        self.revision_list
            .iter()
            .map(|entry| RevisionEntry::parse(entry))
            .collect()
    }

    /// Parses every status listing entry.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedEntry` for an entry without a `:`.
    pub fn statuses(&self) -> Result<Vec<StatusEntry<'_>>, ParseError> {
        self.status_list
            .iter()
            .map(|entry| StatusEntry::parse(entry))
            .collect()
    }
}

/// One parsed revision listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionEntry<'a> {
    /// Thermostat identifier.
    pub id: &'a str,
    /// Display name as configured on the thermostat.
    pub name: &'a str,
}

impl<'a> RevisionEntry<'a> {
    /// Parses `id:name[:rest]`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedEntry` if the name field is missing.
    pub fn parse(entry: &'a str) -> Result<Self, ParseError> {
        let mut fields = entry.splitn(3, ':');
        match (fields.next(), fields.next()) {
            (Some(id), Some(name)) if !id.is_empty() => Ok(Self { id, name }),
            _ => Err(ParseError::MalformedEntry(entry.to_string())),
        }
    }
}

/// One parsed status listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry<'a> {
    /// Thermostat identifier.
    pub id: &'a str,
    /// Active equipment codes, empty when nothing runs.
    pub equipment: Vec<&'a str>,
}

impl<'a> StatusEntry<'a> {
    /// Parses `id:code,code,...`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedEntry` if the `:` separator is missing.
    pub fn parse(entry: &'a str) -> Result<Self, ParseError> {
        let Some((id, codes)) = entry.split_once(':') else {
            return Err(ParseError::MalformedEntry(entry.to_string()));
        };

        let equipment = codes
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .collect();

        Ok(Self { id, equipment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_entry_with_revisions() {
        let entry = RevisionEntry::parse("311019854321:Main Floor:true:171204:171130:171204:171204")
            .unwrap();
        assert_eq!(entry.id, "311019854321");
        assert_eq!(entry.name, "Main Floor");
    }

    #[test]
    fn revision_entry_without_name_is_malformed() {
        assert!(matches!(
            RevisionEntry::parse("101"),
            Err(ParseError::MalformedEntry(_))
        ));
    }

    #[test]
    fn status_entry_with_codes() {
        let entry = StatusEntry::parse("101:auxHeat1,fan").unwrap();
        assert_eq!(entry.id, "101");
        assert_eq!(entry.equipment, vec!["auxHeat1", "fan"]);
    }

    #[test]
    fn status_entry_idle() {
        let entry = StatusEntry::parse("101:").unwrap();
        assert!(entry.equipment.is_empty());

        let entry = StatusEntry::parse("101:  ").unwrap();
        assert!(entry.equipment.is_empty());
    }

    #[test]
    fn status_entry_keeps_unknown_codes() {
        let entry = StatusEntry::parse("7:compCool1,someFutureThing").unwrap();
        assert_eq!(entry.equipment, vec!["compCool1", "someFutureThing"]);
    }

    #[test]
    fn status_entry_without_separator_is_malformed() {
        assert!(StatusEntry::parse("101").is_err());
    }

    #[test]
    fn token_response_parses() {
        let json = r#"{
            "access_token": "Rc7JE8P7XUgSCPogLOx2VLMfITqQQrjg",
            "token_type": "Bearer",
            "expires_in": 3599,
            "refresh_token": "og2Obost3ucRo1ofo0EDoslGltmFMe2g",
            "scope": "smartWrite"
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.expires_in, 3599);
        assert_eq!(response.refresh_token, "og2Obost3ucRo1ofo0EDoslGltmFMe2g");
    }

    #[test]
    fn summary_status_only_error_body() {
        let json = r#"{"status":{"code":14,"message":"Authentication token has expired."}}"#;
        let response: SummaryResponse = serde_json::from_str(json).unwrap();
        assert!(!response.status.is_success());
        assert!(response.revision_list.is_empty());
    }
}
