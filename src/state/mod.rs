// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equipment state tracking.
//!
//! Each successful poll produces an [`EquipmentSnapshot`]. The
//! [`StateDiffer`] folds snapshots into its [`EquipmentState`] and yields a
//! [`ChangeEvent`] for every equipment stage that switched on or off.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use ecobee_mqtt::state::{EquipmentSnapshot, StateDiffer};
//!
//! let mut differ = StateDiffer::new();
//!
//! let mut snapshot = EquipmentSnapshot::new();
//! snapshot.activate("LivingRoom", "fan");
//! let events = differ.apply_and_diff(&snapshot, Utc::now());
//! assert_eq!(events.len(), 1);
//! assert!(events[0].active);
//!
//! // Same snapshot again: nothing changed
//! assert!(differ.apply_and_diff(&snapshot, Utc::now()).is_empty());
//! ```

mod change;
mod differ;
mod equipment;
mod snapshot;

pub use change::ChangeEvent;
pub use differ::{EquipmentState, StateDiffer};
pub use equipment::{KNOWN_EQUIPMENT, is_known_equipment};
pub use snapshot::EquipmentSnapshot;
