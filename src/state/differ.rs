// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot diffing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{ChangeEvent, EquipmentSnapshot};

/// Known on/off state per thermostat per equipment code.
///
/// Codes are never pruned, so a stage that was on is reported off even if
/// its thermostat drops out of a later snapshot.
pub type EquipmentState = BTreeMap<String, BTreeMap<String, bool>>;

/// Folds snapshots into the tracked [`EquipmentState`] and reports transitions.
#[derive(Debug, Clone, Default)]
pub struct StateDiffer {
    state: EquipmentState,
}

impl StateDiffer {
    /// Creates a differ with nothing tracked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tracked state.
    #[must_use]
    pub fn state(&self) -> &EquipmentState {
        &self.state
    }

    /// Returns the tracked value for a thermostat/equipment pair.
    ///
    /// `None` means the pair was never seen active.
    #[must_use]
    pub fn is_active(&self, thermostat: &str, equipment: &str) -> Option<bool> {
        self.state.get(thermostat)?.get(equipment).copied()
    }

    /// Applies `snapshot` and returns one event per pair whose value changed.
    ///
    /// Every tracked pair not active in `snapshot` becomes `false`; every pair
    /// in `snapshot` becomes `true`. Pairs seen for the first time only emit
    /// when active. Events are ordered by thermostat, then equipment code.
    pub fn apply_and_diff(
        &mut self,
        snapshot: &EquipmentSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        for (thermostat, codes) in &mut self.state {
            for (code, value) in codes.iter_mut() {
                let active = snapshot.is_active(thermostat, code);
                if *value != active {
                    *value = active;
                    events.push(ChangeEvent::new(thermostat.as_str(), code.as_str(), active, timestamp));
                }
            }
        }

        for (thermostat, codes) in snapshot.iter() {
            let tracked = self.state.entry(thermostat.to_string()).or_default();
            for code in codes {
                if !tracked.contains_key(code) {
                    tracked.insert(code.clone(), true);
                    events.push(ChangeEvent::new(thermostat, code.as_str(), true, timestamp));
                }
            }
        }

        events.sort_by(|a, b| {
            (a.thermostat.as_str(), a.equipment.as_str())
                .cmp(&(b.thermostat.as_str(), b.equipment.as_str()))
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &[&str])]) -> EquipmentSnapshot {
        let mut snapshot = EquipmentSnapshot::new();
        for (name, codes) in entries {
            snapshot.insert_thermostat(name);
            for code in *codes {
                snapshot.activate(name, *code);
            }
        }
        snapshot
    }

    fn triples(events: &[ChangeEvent]) -> Vec<(&str, &str, bool)> {
        events
            .iter()
            .map(|e| (e.thermostat.as_str(), e.equipment.as_str(), e.active))
            .collect()
    }

    #[test]
    fn first_snapshot_reports_active_codes_only() {
        let mut differ = StateDiffer::new();
        let events = differ.apply_and_diff(
            &snapshot(&[("livingroom", &["auxHeat1"]), ("upstairs", &[])]),
            Utc::now(),
        );
        assert_eq!(triples(&events), vec![("livingroom", "auxHeat1", true)]);
    }

    #[test]
    fn repeated_snapshot_is_silent() {
        let mut differ = StateDiffer::new();
        let s1 = snapshot(&[("livingroom", &["auxHeat1", "fan"])]);
        differ.apply_and_diff(&s1, Utc::now());
        assert!(differ.apply_and_diff(&s1, Utc::now()).is_empty());
    }

    #[test]
    fn reports_exactly_the_differences() {
        let mut differ = StateDiffer::new();
        differ.apply_and_diff(
            &snapshot(&[("livingroom", &["auxHeat1", "fan"]), ("upstairs", &["compCool1"])]),
            Utc::now(),
        );

        let events = differ.apply_and_diff(
            &snapshot(&[("livingroom", &["fan", "heatPump"]), ("upstairs", &["compCool1"])]),
            Utc::now(),
        );

        assert_eq!(
            triples(&events),
            vec![
                ("livingroom", "auxHeat1", false),
                ("livingroom", "heatPump", true),
            ]
        );
    }

    #[test]
    fn missing_thermostat_turns_everything_off() {
        let mut differ = StateDiffer::new();
        differ.apply_and_diff(&snapshot(&[("cabin", &["auxHeat1", "fan"])]), Utc::now());

        let events = differ.apply_and_diff(&snapshot(&[]), Utc::now());

        assert_eq!(
            triples(&events),
            vec![("cabin", "auxHeat1", false), ("cabin", "fan", false)]
        );
        assert_eq!(differ.is_active("cabin", "fan"), Some(false));
    }

    #[test]
    fn returning_code_turns_back_on() {
        let mut differ = StateDiffer::new();
        differ.apply_and_diff(&snapshot(&[("cabin", &["fan"])]), Utc::now());
        differ.apply_and_diff(&snapshot(&[("cabin", &[])]), Utc::now());

        let events = differ.apply_and_diff(&snapshot(&[("cabin", &["fan"])]), Utc::now());

        assert_eq!(triples(&events), vec![("cabin", "fan", true)]);
    }

    #[test]
    fn off_codes_stay_tracked() {
        let mut differ = StateDiffer::new();
        differ.apply_and_diff(&snapshot(&[("cabin", &["fan"])]), Utc::now());
        differ.apply_and_diff(&snapshot(&[]), Utc::now());
        assert!(differ.apply_and_diff(&snapshot(&[]), Utc::now()).is_empty());
        assert_eq!(differ.state()["cabin"].len(), 1);
    }

    #[test]
    fn unknown_codes_pass_through() {
        let mut differ = StateDiffer::new();
        let events =
            differ.apply_and_diff(&snapshot(&[("cabin", &["geothermalLoop"])]), Utc::now());
        assert_eq!(triples(&events), vec![("cabin", "geothermalLoop", true)]);
    }

    #[test]
    fn events_carry_timestamp() {
        let mut differ = StateDiffer::new();
        let at = Utc::now();
        let events = differ.apply_and_diff(&snapshot(&[("cabin", &["fan"])]), at);
        assert_eq!(events[0].timestamp, at);
    }
}
