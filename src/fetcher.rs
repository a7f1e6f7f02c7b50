// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equipment status fetching.
//!
//! The summary endpoint answers with two listings keyed by thermostat id:
//!
//! - `revisionList`: `"311019854321:Main Floor:true:..."` (id → name)
//! - `statusList`: `"311019854321:compCool1,fan"` (id → active codes)
//!
//! [`parse_summary`] joins them into an [`EquipmentSnapshot`].

use std::collections::HashMap;

use crate::api::{Selection, SummaryResponse, ThermostatApi};
use crate::error::{Error, ParseError, Result};
use crate::state::{EquipmentSnapshot, is_known_equipment};

/// Fetches the equipment status of every registered thermostat.
#[derive(Debug, Clone)]
pub struct StatusFetcher {
    selection: Selection,
}

impl StatusFetcher {
    /// Creates a fetcher selecting all registered thermostats.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selection: Selection::registered_with_equipment(),
        }
    }

    /// Returns the selection sent with each request.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Issues one summary request and normalizes the result.
    ///
    /// # Errors
    ///
    /// - `Error::TokenExpired` if the API rejected `access_token` as expired
    /// - `Error::Protocol` if the listings are malformed or inconsistent
    /// - `Error::Network` for any other transport or API failure
    pub async fn fetch<A: ThermostatApi>(
        &self,
        api: &A,
        access_token: &str,
    ) -> Result<EquipmentSnapshot> {
        let summary = api
            .thermostat_summary(access_token, &self.selection)
            .await
            .map_err(Error::from_fetch)?;

        let snapshot = parse_summary(&summary)?;
        tracing::debug!(thermostats = snapshot.len(), "Fetched equipment status");
        Ok(snapshot)
    }
}

impl Default for StatusFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Joins the revision and status listings of a summary by thermostat id.
///
/// Thermostats without a status entry are included with nothing active.
///
/// # Errors
///
/// Returns `ParseError::UnknownThermostat` if a status entry names an id
/// missing from the revision listing, or `ParseError::MalformedEntry` for an
/// entry lacking its separators.
pub fn parse_summary(summary: &SummaryResponse) -> std::result::Result<EquipmentSnapshot, ParseError> {
    let mut snapshot = EquipmentSnapshot::new();
    let mut names = HashMap::new();

    for revision in summary.revisions()? {
        snapshot.insert_thermostat(revision.name);
        names.insert(revision.id, revision.name);
    }

    for status in summary.statuses()? {
        let name = names
            .get(status.id)
            .ok_or_else(|| ParseError::UnknownThermostat(status.id.to_string()))?;

        for code in status.equipment {
            if !is_known_equipment(code) {
                tracing::debug!(thermostat = %name, code = %code, "Unrecognized equipment code");
            }
            snapshot.activate(name, code);
        }
    }

    Ok(snapshot)
}
