// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ecobee-mqtt` daemon.
//!
//! Exit codes:
//! - `0`: clean shutdown
//! - `1`: pairing required, rerun after entering the PIN
//! - `2`: any other startup or fatal error
//! - `255`: first run without `--apikey`

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ecobee_mqtt::api::EcobeeConfig;
use ecobee_mqtt::credentials::FileCredentialStore;
use ecobee_mqtt::reporter::{MqttConfig, MqttPublisher};
use ecobee_mqtt::{ChannelReporter, Error, PollInterval, PollLoop, TokenLifecycle};

/// Capacity of the queue between the poll loop and the MQTT publisher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Ecobee MQTT - Track your thermostat
#[derive(Parser, Debug)]
#[command(name = "ecobee-mqtt", version, about)]
struct Cli {
    /// The API key for your ecobee application (required on first run only)
    #[arg(long)]
    apikey: Option<String>,

    /// MQTT broker to publish topics to (`host`, `host:port` or `mqtt://host:port`)
    mqtt: String,

    /// Account name the credentials are stored under
    #[arg(long, default_value = "My Thermostat")]
    thermostat: String,

    /// Credential store file
    #[arg(long, default_value = "ecobee_mqtt.json")]
    store: PathBuf,

    /// Prefix of the published topics
    #[arg(long, default_value = MqttConfig::DEFAULT_TOPIC_PREFIX)]
    topic_prefix: String,

    /// MQTT username
    #[arg(long, requires = "mqtt_password")]
    mqtt_username: Option<String>,

    /// MQTT password
    #[arg(long, requires = "mqtt_username")]
    mqtt_password: Option<String>,

    /// Seconds between polls (minimum 180)
    #[arg(long, default_value_t = 180)]
    interval: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 10)]
    http_timeout: u64,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&cli.log_level))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::MissingApplicationKey) => {
            tracing::error!(
                "On first run, you MUST provide the API key, on subsequent runs it's optional"
            );
            ExitCode::from(255)
        }
        Err(Error::PairingRequired { pin }) => {
            tracing::info!(pin = %pin, "Enter the PIN on the My Apps page, then rerun ecobee-mqtt");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = %e, "ecobee-mqtt stopped");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> ecobee_mqtt::Result<()> {
    tracing::info!("ecobee-mqtt starting");

    let store = FileCredentialStore::new(&cli.store);
    tracing::info!(path = %store.path().display(), "Using credential store");
    let tokens = TokenLifecycle::load(store, &cli.thermostat, cli.apikey.as_deref())?;

    let api = EcobeeConfig::new()
        .with_timeout(Duration::from_secs(cli.http_timeout))
        .into_client()
        .map_err(|e| Error::Config(e.to_string()))?;

    let mut mqtt_config = MqttConfig::parse(&cli.mqtt)?.with_topic_prefix(cli.topic_prefix);
    if let (Some(username), Some(password)) = (cli.mqtt_username, cli.mqtt_password) {
        mqtt_config = mqtt_config.with_credentials(username, password);
    }

    let (publisher, event_loop) = MqttPublisher::connect(mqtt_config);
    let (reporter, events) = ChannelReporter::channel(EVENT_CHANNEL_CAPACITY);
    let forwarder = tokio::spawn(publisher.clone().forward(events));

    let result = PollLoop::new(api, tokens, reporter)
        .with_interval(PollInterval::new(Duration::from_secs(cli.interval)))
        .run(shutdown_signal())
        .await;

    // The poll loop owned the only sender; the forwarder drains and exits.
    if tokio::time::timeout(Duration::from_secs(5), forwarder)
        .await
        .is_err()
    {
        tracing::warn!("Timed out flushing change events");
    }
    if let Err(e) = publisher.disconnect().await {
        tracing::debug!(error = %e, "MQTT disconnect failed");
    }
    event_loop.abort();

    tracing::info!("ecobee-mqtt shutdown complete");
    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{level}', defaulting to INFO");
            tracing::Level::INFO
        }
    }
}
