// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equipment codes reported in the status listing.
//!
//! The vocabulary is open: codes not listed here are tracked like any other.

/// Equipment codes documented by the vendor.
pub const KNOWN_EQUIPMENT: &[&str] = &[
    "heatPump",
    "heatPump2",
    "heatPump3",
    "compCool1",
    "compCool2",
    "auxHeat1",
    "auxHeat2",
    "auxHeat3",
    "fan",
    "humidifier",
    "dehumidifier",
    "ventilator",
    "economizer",
    "compHotWater",
    "auxHotWater",
];

/// Returns `true` if `code` is one of [`KNOWN_EQUIPMENT`].
#[must_use]
pub fn is_known_equipment(code: &str) -> bool {
    KNOWN_EQUIPMENT.contains(&code)
}
