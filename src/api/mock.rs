// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted API double for unit tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::api::{AuthorizeResponse, Selection, SummaryResponse, ThermostatApi, TokenResponse};
use crate::error::ApiError;

/// Records every call and replays queued results.
///
/// Token calls succeed with `access-N` / `refresh-N` unless an error is
/// queued. Summary calls fail unless a result is queued.
#[derive(Debug, Default)]
pub(crate) struct MockApi {
    token_errors: Mutex<VecDeque<ApiError>>,
    summaries: Mutex<VecDeque<Result<SummaryResponse, ApiError>>>,
    token_lifetime: Mutex<Option<i64>>,
    stall_summaries: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Authorize,
    RequestTokens(String),
    RefreshTokens(String),
    Summary(String),
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_token_error(&self, err: ApiError) {
        self.token_errors.lock().push_back(err);
    }

    pub(crate) fn push_summary(&self, summary: Result<SummaryResponse, ApiError>) {
        self.summaries.lock().push_back(summary);
    }

    pub(crate) fn push_listing(&self, revisions: &[&str], statuses: &[&str]) {
        self.push_summary(Ok(summary(revisions, statuses)));
    }

    /// Overrides `expires_in` of every token response.
    pub(crate) fn set_token_lifetime(&self, expires_in: i64) {
        *self.token_lifetime.lock() = Some(expires_in);
    }

    /// Makes every summary call hang forever after being recorded.
    pub(crate) fn stall_summaries(&self) {
        *self.stall_summaries.lock() = true;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    fn next_tokens(&self) -> Result<TokenResponse, ApiError> {
        if let Some(err) = self.token_errors.lock().pop_front() {
            return Err(err);
        }
        let n = self.count(|c| matches!(c, Call::RequestTokens(_) | Call::RefreshTokens(_)));
        Ok(TokenResponse {
            access_token: format!("access-{n}"),
            token_type: "Bearer".to_string(),
            expires_in: self.token_lifetime.lock().unwrap_or(3599),
            refresh_token: format!("refresh-{n}"),
            scope: "smartRead".to_string(),
        })
    }
}

pub(crate) fn summary(revisions: &[&str], statuses: &[&str]) -> SummaryResponse {
    SummaryResponse {
        thermostat_count: u32::try_from(revisions.len()).unwrap_or(u32::MAX),
        revision_list: revisions.iter().map(ToString::to_string).collect(),
        status_list: statuses.iter().map(ToString::to_string).collect(),
        status: crate::api::ApiStatus::default(),
    }
}

pub(crate) fn expired_status() -> ApiError {
    ApiError::Status {
        code: crate::error::STATUS_TOKEN_EXPIRED,
        message: "Authentication token has expired. Refresh your tokens.".to_string(),
    }
}

impl ThermostatApi for MockApi {
    async fn authorize(&self, _application_key: &str) -> Result<AuthorizeResponse, ApiError> {
        self.calls.lock().push(Call::Authorize);
        if let Some(err) = self.token_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(AuthorizeResponse {
            pin: "ab12".to_string(),
            code: "auth-code".to_string(),
            scope: "smartRead".to_string(),
            expires_in: 9,
            interval: 30,
        })
    }

    async fn request_tokens(
        &self,
        _application_key: &str,
        authorization_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        self.calls
            .lock()
            .push(Call::RequestTokens(authorization_token.to_string()));
        self.next_tokens()
    }

    async fn refresh_tokens(
        &self,
        _application_key: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        self.calls
            .lock()
            .push(Call::RefreshTokens(refresh_token.to_string()));
        self.next_tokens()
    }

    async fn thermostat_summary(
        &self,
        access_token: &str,
        _selection: &Selection,
    ) -> Result<SummaryResponse, ApiError> {
        self.calls
            .lock()
            .push(Call::Summary(access_token.to_string()));
        if *self.stall_summaries.lock() {
            std::future::pending::<()>().await;
        }
        self.summaries
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ConnectionFailed("no scripted response".to_string())))
    }
}
