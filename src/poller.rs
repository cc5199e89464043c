//! Backend status polling.
//!
//! Used where the backend, not the processor SDK, is the source of truth for
//! the eventual status. Requests are strictly sequential: poll `n + 1` is only
//! issued after response `n` was observed, and the attempt counter never
//! exceeds the cap.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::IntentRequestClient;
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::Timer;
use crate::types::{IntentId, IntentStatus};

/// Progress of one polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub interval: Duration,
    pub intent_id: IntentId,
}

impl PollState {
    /// A run that has not issued any request yet.
    pub fn new(intent_id: IntentId, max_attempts: u32, interval: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            interval,
            intent_id,
        }
    }

    /// Claim the next attempt number, or `None` once the cap is reached.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Worst-case wall-clock time spent waiting between requests.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// A status the backend will not move away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded,
    Failed,
    Canceled,
}

impl TerminalStatus {
    fn from_status(status: &IntentStatus) -> Option<Self> {
        match status {
            IntentStatus::Succeeded => Some(Self::Succeeded),
            IntentStatus::Failed => Some(Self::Failed),
            IntentStatus::Canceled => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Polls the backend `payment-status` endpoint on a fixed schedule.
///
/// The interval and attempt cap come from [`CheckoutConfig`] and are read once
/// at construction, so a run is bounded by `interval * (max_attempts - 1)` of
/// waiting.
///
/// [`CheckoutConfig`]: crate::config::CheckoutConfig
pub struct StatusPoller {
    client: IntentRequestClient,
    timer: Rc<dyn Timer>,
    max_attempts: u32,
    interval: Duration,
}

impl StatusPoller {
    /// `timer` drives the waits between requests; dropping a pending
    /// [`poll`](Self::poll) future cancels the current wait.
    pub fn new(client: IntentRequestClient, timer: Rc<dyn Timer>) -> Self {
        let max_attempts = client.config().max_poll_attempts;
        let interval = client.config().poll_interval;
        Self {
            client,
            timer,
            max_attempts,
            interval,
        }
    }

    /// Poll until a terminal status is observed or the cap is reached.
    ///
    /// Inconclusive statuses and failed requests both count as an attempt and
    /// lead to one more request after the interval. Reaching the cap yields
    /// [`CheckoutError::PollingExhausted`].
    pub async fn poll(&self, intent_id: &IntentId) -> CheckoutResult<TerminalStatus> {
        let mut state = PollState::new(intent_id.clone(), self.max_attempts, self.interval);

        while let Some(attempt) = state.next_attempt() {
            if attempt > 1 {
                self.timer.sleep(state.interval).await;
            }
            match self.client.payment_status(&state.intent_id).await {
                Ok(status) => match TerminalStatus::from_status(&status) {
                    Some(terminal) => {
                        info!(intent_id = %intent_id, attempt, status = %status, "payment status settled");
                        return Ok(terminal);
                    }
                    None => debug!(intent_id = %intent_id, attempt, status = %status, "payment not final yet"),
                },
                Err(err) => {
                    warn!(intent_id = %intent_id, attempt, error = %err, "status check failed, retrying")
                }
            }
        }

        warn!(intent_id = %intent_id, attempts = state.attempt, "status polling exhausted");
        Err(CheckoutError::PollingExhausted {
            attempts: state.attempt,
        })
    }
}
