// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request bodies sent to the thermostat API.

use serde::Serialize;

/// How a [`Selection`] picks thermostats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionType {
    /// Every thermostat registered to the account.
    #[default]
    Registered,
}

/// Selects which thermostats a request applies to and what to include.
///
/// # Examples
///
/// ```
/// use ecobee_mqtt::api::Selection;
///
/// let selection = Selection::registered_with_equipment();
/// let json = serde_json::to_string(&selection.wrapped()).unwrap();
/// assert_eq!(
///     json,
///     r#"{"selection":{"selectionType":"registered","selectionMatch":"","includeEquipmentStatus":true}}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    selection_type: SelectionType,
    selection_match: String,
    include_equipment_status: bool,
}

impl Selection {
    /// All registered thermostats with the equipment status listing enabled.
    #[must_use]
    pub fn registered_with_equipment() -> Self {
        Self {
            selection_type: SelectionType::Registered,
            selection_match: String::new(),
            include_equipment_status: true,
        }
    }

    /// Returns the selection type.
    #[must_use]
    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    /// Returns the selection match string.
    #[must_use]
    pub fn selection_match(&self) -> &str {
        &self.selection_match
    }

    /// Returns whether the status listing is requested.
    #[must_use]
    pub fn include_equipment_status(&self) -> bool {
        self.include_equipment_status
    }

    /// Wraps the selection in the envelope the summary endpoint expects.
    #[must_use]
    pub fn wrapped(&self) -> SelectionEnvelope<'_> {
        SelectionEnvelope { selection: self }
    }
}

/// `{"selection": {...}}` wrapper for query strings.
#[derive(Debug, Serialize)]
pub struct SelectionEnvelope<'a> {
    selection: &'a Selection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_selection_matches_everything() {
        let selection = Selection::registered_with_equipment();
        assert_eq!(selection.selection_type(), SelectionType::Registered);
        assert_eq!(selection.selection_match(), "");
        assert!(selection.include_equipment_status());
    }

    #[test]
    fn selection_type_serializes_camel_case() {
        let json = serde_json::to_string(&SelectionType::Registered).unwrap();
        assert_eq!(json, r#""registered""#);
    }
}
