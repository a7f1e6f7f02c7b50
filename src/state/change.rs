// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equipment transition events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One equipment stage switching on or off.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use ecobee_mqtt::state::ChangeEvent;
///
/// let event = ChangeEvent::new("livingroom", "auxHeat1", false, Utc.timestamp_opt(0, 0).unwrap());
/// assert_eq!(event.to_string(), "livingroom/auxHeat1 -> OFF");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Lowercased thermostat name.
    pub thermostat: String,
    /// Equipment code, e.g. `compCool1`.
    pub equipment: String,
    /// Whether the equipment is now running.
    pub active: bool,
    /// When the transition was observed.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event.
    #[must_use]
    pub fn new(
        thermostat: impl Into<String>,
        equipment: impl Into<String>,
        active: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            thermostat: thermostat.into(),
            equipment: equipment.into(),
            active,
            timestamp,
        }
    }

    /// Returns `ON` or `OFF`.
    #[must_use]
    pub fn state_str(&self) -> &'static str {
        if self.active { "ON" } else { "OFF" }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}",
            self.thermostat,
            self.equipment,
            self.state_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn serializes_to_json() {
        let event = ChangeEvent::new(
            "livingroom",
            "fan",
            true,
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "thermostat": "livingroom",
                "equipment": "fan",
                "active": true,
                "timestamp": "2024-01-15T08:30:00Z"
            })
        );
    }
}
