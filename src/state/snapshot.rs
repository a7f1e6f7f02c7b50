// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One poll's view of active equipment.

use std::collections::{BTreeMap, BTreeSet};

/// Active equipment codes per thermostat, as seen by one poll.
///
/// Thermostat names are lowercased on insertion. A thermostat can be present
/// with an empty set, meaning it reported but nothing is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentSnapshot {
    thermostats: BTreeMap<String, BTreeSet<String>>,
}

impl EquipmentSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a thermostat, with nothing active yet.
    pub fn insert_thermostat(&mut self, name: &str) {
        self.thermostats.entry(name.to_lowercase()).or_default();
    }

    /// Marks `code` active on the thermostat called `name`.
    pub fn activate(&mut self, name: &str, code: impl Into<String>) {
        self.thermostats
            .entry(name.to_lowercase())
            .or_default()
            .insert(code.into());
    }

    /// Returns the active codes of a thermostat, if it reported.
    #[must_use]
    pub fn active(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.thermostats.get(name)
    }

    /// Returns `true` if `code` is active on the thermostat called `name`.
    #[must_use]
    pub fn is_active(&self, name: &str, code: &str) -> bool {
        self.active(name).is_some_and(|codes| codes.contains(code))
    }

    /// Iterates over thermostats in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.thermostats
            .iter()
            .map(|(name, codes)| (name.as_str(), codes))
    }

    /// Returns the number of thermostats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.thermostats.len()
    }

    /// Returns `true` if no thermostat reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thermostats.is_empty()
    }
}
