// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Downstream sinks for change events.
//!
//! The poll loop hands events to a [`Reporter`]. In the daemon that is a
//! [`ChannelReporter`] feeding a separate transport task, so a slow broker
//! never holds up polling for longer than the send timeout.

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttPublisher};

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::error::ReportError;
use crate::state::ChangeEvent;

/// Accepts change events, one at a time.
#[allow(async_fn_in_trait)]
pub trait Reporter {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the event could not be handed off in time.
    async fn publish(&self, event: ChangeEvent) -> Result<(), ReportError>;
}

/// Reporter that forwards events over a bounded channel.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use ecobee_mqtt::reporter::{ChannelReporter, Reporter};
/// use ecobee_mqtt::state::ChangeEvent;
///
/// # async fn example() -> Result<(), ecobee_mqtt::error::ReportError> {
/// let (reporter, mut rx) = ChannelReporter::channel(16);
/// reporter.publish(ChangeEvent::new("livingroom", "fan", true, Utc::now())).await?;
/// assert_eq!(rx.recv().await.unwrap().equipment, "fan");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::Sender<ChangeEvent>,
    timeout: Duration,
}

impl ChannelReporter {
    /// Default time to wait for room in the channel.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a reporter and the receiving end of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                sender,
                timeout: Self::DEFAULT_TIMEOUT,
            },
            receiver,
        )
    }

    /// Sets how long `publish` waits for room in the channel.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Reporter for ChannelReporter {
    async fn publish(&self, event: ChangeEvent) -> Result<(), ReportError> {
        self.sender
            .send_timeout(event, self.timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => {
                    // Safe: configured timeouts are far below u64::MAX milliseconds
                    #[allow(clippy::cast_possible_truncation)]
                    let timeout_ms = self.timeout.as_millis() as u64;
                    ReportError::Timeout(timeout_ms)
                }
                SendTimeoutError::Closed(_) => ReportError::ChannelClosed,
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn channel_reporter_delivers_in_order() {
        let (reporter, mut rx) = ChannelReporter::channel(4);
        reporter
            .publish(ChangeEvent::new("a", "fan", true, Utc::now()))
            .await
            .unwrap();
        reporter
            .publish(ChangeEvent::new("a", "auxHeat1", false, Utc::now()))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().equipment, "fan");
        assert_eq!(rx.recv().await.unwrap().equipment, "auxHeat1");
    }

    #[tokio::test]
    async fn channel_reporter_closed() {
        let (reporter, rx) = ChannelReporter::channel(1);
        drop(rx);
        let result = reporter
            .publish(ChangeEvent::new("a", "fan", true, Utc::now()))
            .await;
        assert!(matches!(result, Err(ReportError::ChannelClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn channel_reporter_full_times_out() {
        let (reporter, _rx) = ChannelReporter::channel(1);
        let reporter = reporter.with_timeout(Duration::from_millis(50));
        reporter
            .publish(ChangeEvent::new("a", "fan", true, Utc::now()))
            .await
            .unwrap();

        let result = reporter
            .publish(ChangeEvent::new("a", "fan", false, Utc::now()))
            .await;
        assert!(matches!(result, Err(ReportError::Timeout(50))));
    }
}
