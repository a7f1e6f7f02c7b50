// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport for change events.
//!
//! Events are published as JSON to `<prefix>/<thermostat>/<equipment>`:
//!
//! ```text
//! ecobee/livingroom/auxHeat1
//! {"thermostat":"livingroom","equipment":"auxHeat1","active":false,"timestamp":"..."}
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, ReportError};
use crate::reporter::Reporter;
use crate::state::ChangeEvent;

/// Configuration for the MQTT broker connection.
///
/// # Examples
///
/// ```
/// use ecobee_mqtt::reporter::MqttConfig;
///
/// let config = MqttConfig::parse("mqtt://192.168.1.50:1884")
///     .unwrap()
///     .with_topic_prefix("home/hvac");
/// assert_eq!(config.host(), "192.168.1.50");
/// assert_eq!(config.port(), 1884);
/// assert_eq!(config.topic("livingroom", "fan"), "home/hvac/livingroom/fan");
/// ```
#[derive(Debug, Clone)]
pub struct MqttConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    client_id: String,
    keep_alive: Duration,
    topic_prefix: String,
    retain: bool,
    publish_timeout: Duration,
}

impl MqttConfig {
    /// Default broker port.
    pub const DEFAULT_PORT: u16 = 1883;
    /// Default topic prefix.
    pub const DEFAULT_TOPIC_PREFIX: &'static str = "ecobee";
    /// Default keep-alive interval.
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
    /// Default time to wait for the client to accept a publish.
    pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for `host` on the default port.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            credentials: None,
            client_id: format!("ecobee_mqtt_{}", uuid::Uuid::new_v4().simple()),
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
            topic_prefix: Self::DEFAULT_TOPIC_PREFIX.to_string(),
            retain: true,
            publish_timeout: Self::DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Parses `host`, `host:port`, `mqtt://host:port` or `tcp://host:port`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the host is empty or the port is invalid.
    pub fn parse(address: &str) -> Result<Self, Error> {
        let address = address
            .strip_prefix("mqtt://")
            .or_else(|| address.strip_prefix("tcp://"))
            .unwrap_or(address);

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid MQTT port: {port}")))?;
                (host, port)
            }
            None => (address, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Error::Config("MQTT broker host is empty".to_string()));
        }

        Ok(Self::new(host).with_port(port))
    }

    /// Sets the broker port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets broker credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets a custom client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the topic prefix.
    #[must_use]
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets whether published events are retained by the broker.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the topic for a thermostat/equipment pair.
    ///
    /// Level separators and wildcards inside either segment are replaced
    /// with `_`.
    #[must_use]
    pub fn topic(&self, thermostat: &str, equipment: &str) -> String {
        format!(
            "{}/{}/{}",
            self.topic_prefix,
            topic_segment(thermostat),
            topic_segment(equipment)
        )
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

fn topic_segment(raw: &str) -> String {
    raw.replace(['/', '+', '#'], "_")
}

/// Publishes change events to an MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    config: MqttConfig,
}

impl MqttPublisher {
    /// Creates the client and spawns the task driving its event loop.
    ///
    /// The connection is established (and re-established) by that task;
    /// publishes issued while disconnected are queued by the client.
    #[must_use]
    pub fn connect(config: MqttConfig) -> (Self, JoinHandle<()>) {
        let (client, event_loop) = AsyncClient::new(config.mqtt_options(), 64);

        tracing::info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            "Connecting to MQTT broker"
        );

        let handle = tokio::spawn(handle_mqtt_events(event_loop));
        (Self { client, config }, handle)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Publishes one event to its topic.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if serialization fails, the client rejects the
    /// publish, or the client does not accept it within the publish timeout.
    pub async fn publish_event(&self, event: &ChangeEvent) -> Result<(), ReportError> {
        let topic = self.config.topic(&event.thermostat, &event.equipment);
        let payload = serde_json::to_vec(event)?;

        tracing::debug!(topic = %topic, active = event.active, "Publishing change event");

        // Safe: configured timeouts are far below u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.config.publish_timeout.as_millis() as u64;

        tokio::time::timeout(
            self.config.publish_timeout,
            self.client
                .publish(topic, QoS::AtLeastOnce, self.config.retain, payload),
        )
        .await
        .map_err(|_| ReportError::Timeout(timeout_ms))?
        .map_err(ReportError::Mqtt)
    }

    /// Drains `events` until every sender is dropped, publishing each one.
    ///
    /// Publish failures are logged and the event is dropped.
    pub async fn forward(self, mut events: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.publish_event(&event).await {
                tracing::error!(event = %event, error = %e, "Failed to publish change event");
            }
        }
        tracing::info!("Change event channel closed, publisher stopping");
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Mqtt` if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ReportError> {
        self.client.disconnect().await.map_err(ReportError::Mqtt)
    }
}

impl Reporter for MqttPublisher {
    async fn publish(&self, event: ChangeEvent) -> Result<(), ReportError> {
        self.publish_event(&event).await
    }
}

/// Drives the MQTT event loop, reconnecting after errors.
async fn handle_mqtt_events(mut event_loop: EventLoop) {
    use rumqttc::{ConnectionError, Event, Packet};

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::info!(?connack, "MQTT connected");
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                tracing::debug!("MQTT client dropped, event loop stopping");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "MQTT event loop error, retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_port() {
        let config = MqttConfig::parse("mqtt://192.168.1.50:1883").unwrap();
        assert_eq!(config.host(), "192.168.1.50");
        assert_eq!(config.port(), 1883);
    }

    #[test]
    fn parse_default_port() {
        let config = MqttConfig::parse("broker.local").unwrap();
        assert_eq!(config.host(), "broker.local");
        assert_eq!(config.port(), 1883);
    }

    #[test]
    fn parse_tcp_scheme() {
        let config = MqttConfig::parse("tcp://broker.local:8883").unwrap();
        assert_eq!(config.port(), 8883);
    }

    #[test]
    fn parse_rejects_bad_port() {
        assert!(matches!(
            MqttConfig::parse("broker:notaport"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parse_rejects_empty_host() {
        assert!(MqttConfig::parse("mqtt://:1883").is_err());
    }

    #[test]
    fn topic_segments_are_escaped() {
        let config = MqttConfig::new("localhost");
        assert_eq!(
            config.topic("up/stairs #2", "fan+"),
            "ecobee/up_stairs _2/fan_"
        );
    }

    #[test]
    fn topic_layout() {
        let config = MqttConfig::new("localhost").with_topic_prefix("home/ecobee/");
        assert_eq!(
            config.topic("livingroom", "compCool1"),
            "home/ecobee/livingroom/compCool1"
        );
    }

    #[test]
    fn client_ids_are_unique() {
        let a = MqttConfig::new("localhost");
        let b = MqttConfig::new("localhost");
        assert!(a.client_id().starts_with("ecobee_mqtt_"));
        assert_ne!(a.client_id(), b.client_id());
    }
}
