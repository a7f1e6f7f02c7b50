// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ecobee MQTT - track ecobee thermostat equipment and publish changes.
//!
//! This crate polls the ecobee cloud API for the equipment status of every
//! thermostat registered to an account, keeps the OAuth token set fresh, and
//! reports each equipment stage switching on or off exactly once.
//!
//! # Components
//!
//! - [`credentials`]: the per-account [`CredentialBundle`] and its store
//! - [`TokenLifecycle`]: pairing, token requests and refreshes
//! - [`StatusFetcher`]: turns the thermostat summary into an
//!   [`EquipmentSnapshot`]
//! - [`StateDiffer`]: tracks on/off state and yields [`ChangeEvent`]s
//! - [`PollLoop`]: drives the cycle and hands events to a [`Reporter`]
//!
//! # Quick Start
//!
//! ```no_run
//! use ecobee_mqtt::api::EcobeeClient;
//! use ecobee_mqtt::credentials::FileCredentialStore;
//! use ecobee_mqtt::reporter::{MqttConfig, MqttPublisher};
//! use ecobee_mqtt::{PollLoop, TokenLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> ecobee_mqtt::Result<()> {
//!     let store = FileCredentialStore::new("ecobee_mqtt.json");
//!     let tokens = TokenLifecycle::load(store, "My Thermostat", Some("app-key"))?;
//!     let api = EcobeeClient::new().map_err(ecobee_mqtt::Error::Network)?;
//!
//!     let (publisher, _event_loop) = MqttPublisher::connect(MqttConfig::parse("localhost")?);
//!
//!     PollLoop::new(api, tokens, publisher)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod api;
pub mod credentials;
pub mod error;
mod fetcher;
mod poll;
pub mod reporter;
pub mod state;
mod token;

pub use credentials::{CredentialBundle, CredentialStore};
pub use error::{ApiError, Error, ParseError, ReportError, Result, StoreError};
pub use fetcher::{StatusFetcher, parse_summary};
pub use poll::{CycleReport, PollInterval, PollLoop};
pub use reporter::{ChannelReporter, Reporter};
pub use state::{ChangeEvent, EquipmentSnapshot, EquipmentState, StateDiffer};
pub use token::TokenLifecycle;
