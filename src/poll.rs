// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The polling driver.
//!
//! Each period [`PollLoop`] validates credentials, fetches equipment status,
//! diffs it against the previous poll and reports the transitions. A failed
//! cycle is logged and skipped; the tracked state survives it untouched, so
//! an outage never shows up as everything switching off.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::api::ThermostatApi;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::fetcher::StatusFetcher;
use crate::reporter::Reporter;
use crate::state::StateDiffer;
use crate::token::TokenLifecycle;

/// Time between polls, never below [`PollInterval::MIN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval(Duration);

impl PollInterval {
    /// The API's data only updates every three minutes.
    pub const MIN: Duration = Duration::from_secs(180);

    /// Creates an interval, raising `requested` to [`Self::MIN`] if needed.
    #[must_use]
    pub fn new(requested: Duration) -> Self {
        if requested < Self::MIN {
            tracing::warn!(
                requested_secs = requested.as_secs(),
                minimum_secs = Self::MIN.as_secs(),
                "Poll interval below minimum, using minimum"
            );
            Self(Self::MIN)
        } else {
            Self(requested)
        }
    }

    /// Returns the interval as a `Duration`.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        self.0
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Thermostats in the snapshot.
    pub thermostats: usize,
    /// Change events produced by the diff.
    pub events: usize,
    /// Events the reporter failed to accept.
    pub failed: usize,
}

/// Single-owner driver of the poll cycle.
///
/// Credentials and equipment state are owned here and only touched by one
/// cycle at a time.
#[derive(Debug)]
pub struct PollLoop<A, S, R> {
    api: A,
    tokens: TokenLifecycle<S>,
    fetcher: StatusFetcher,
    differ: StateDiffer,
    reporter: R,
    interval: PollInterval,
}

impl<A, S, R> PollLoop<A, S, R>
where
    A: ThermostatApi,
    S: CredentialStore,
    R: Reporter,
{
    /// Creates a loop with the default interval and empty state.
    #[must_use]
    pub fn new(api: A, tokens: TokenLifecycle<S>, reporter: R) -> Self {
        Self {
            api,
            tokens,
            fetcher: StatusFetcher::new(),
            differ: StateDiffer::new(),
            reporter,
            interval: PollInterval::default(),
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: PollInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    /// Returns the API client.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Returns the token lifecycle.
    #[must_use]
    pub fn tokens(&self) -> &TokenLifecycle<S> {
        &self.tokens
    }

    /// Returns the state differ.
    #[must_use]
    pub fn differ(&self) -> &StateDiffer {
        &self.differ
    }

    /// Returns the reporter.
    #[must_use]
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs one poll cycle observed at `now`.
    ///
    /// An expired access token reported by the fetch triggers one forced
    /// refresh and one retry. Reporter failures are logged and counted; the
    /// remaining events are still offered.
    ///
    /// # Errors
    ///
    /// Returns the first credential or fetch error. The diff is skipped in
    /// that case and the tracked state is unchanged.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let token = self.tokens.ensure_valid(&self.api, now).await?;

        let snapshot = match self.fetcher.fetch(&self.api, &token).await {
            Err(Error::TokenExpired) => {
                tracing::info!("Access token expired mid-flight, refreshing and retrying");
                let token = self.tokens.force_refresh(&self.api, now).await?;
                self.fetcher.fetch(&self.api, &token).await?
            }
            result => result?,
        };

        let events = self.differ.apply_and_diff(&snapshot, now);
        let mut report = CycleReport {
            thermostats: snapshot.len(),
            events: events.len(),
            failed: 0,
        };

        for event in events {
            tracing::info!(
                thermostat = %event.thermostat,
                equipment = %event.equipment,
                active = event.active,
                "Equipment state changed"
            );
            if let Err(e) = self.reporter.publish(event).await {
                tracing::error!(error = %e, "Failed to report change event");
                report.failed += 1;
            }
        }

        Ok(report)
    }

    /// Polls every interval until `shutdown` resolves.
    ///
    /// The first cycle runs immediately. A shutdown request also cancels a
    /// cycle in flight, so no further network call is issued. Credentials are
    /// only saved between awaits, so cancellation never splits a save.
    ///
    /// # Errors
    ///
    /// Returns only fatal errors, i.e. `Error::PairingRequired`.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval.as_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_secs = self.interval.as_duration().as_secs(),
            "Starting poll loop"
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping poll loop");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested, abandoning poll cycle");
                    return Ok(());
                }
                outcome = self.run_cycle(Utc::now()) => outcome,
            };

            match outcome {
                Ok(report) => {
                    tracing::debug!(
                        thermostats = report.thermostats,
                        events = report.events,
                        failed = report.failed,
                        "Poll cycle complete"
                    );
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Poll cycle failed, skipping until next period");
                }
            }
        }
    }
}
