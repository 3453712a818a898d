//! Backoff bookkeeping for progress polling.
//!
//! [`PollState`] is a plain value: each response or failure consumes the
//! current state and yields the next one together with a [`PollStep`] telling
//! the async poller what to do. Nothing here sleeps or touches the network.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub initial_delay_ms: u64,
    /// Upper bound for the delay after a non-terminal response.
    pub success_cap_ms: u64,
    /// Upper bound for the delay after a failed query.
    pub failure_cap_ms: u64,
    pub backoff_factor: f64,
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            success_cap_ms: 5_000,
            failure_cap_ms: 10_000,
            backoff_factor: 1.5,
            max_consecutive_failures: 20,
        }
    }
}

impl PollPolicy {
    fn grow(&self, delay_ms: u64, cap_ms: u64) -> u64 {
        let grown = (delay_ms as f64 * self.backoff_factor) as u64;
        grown.min(cap_ms)
    }
}

/// What the poller does after a query resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Query again after `delay`.
    Continue { delay: Duration },
    /// The service reported a terminal status.
    Finished(JobStatus),
    /// The consecutive failure cap was reached.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    consecutive_failures: u32,
    current_delay_ms: u64,
}

impl PollState {
    pub fn new(policy: &PollPolicy) -> Self {
        Self {
            consecutive_failures: 0,
            current_delay_ms: policy.initial_delay_ms,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn current_delay_ms(&self) -> u64 {
        self.current_delay_ms
    }

    /// Bound for the next status query: the current delay rather than a fixed timeout.
    pub fn request_bound(&self) -> Duration {
        Duration::from_millis(self.current_delay_ms.max(1))
    }

    /// Any successful response clears the failure streak and the failure-inflated delay.
    pub fn on_response(self, policy: &PollPolicy, status: JobStatus) -> (Self, PollStep) {
        let next = Self {
            consecutive_failures: 0,
            current_delay_ms: policy.initial_delay_ms,
        };
        if status.is_terminal() {
            return (next, PollStep::Finished(status));
        }
        let delay = policy.grow(next.current_delay_ms, policy.success_cap_ms);
        (
            next,
            PollStep::Continue {
                delay: Duration::from_millis(delay),
            },
        )
    }

    /// Transport or parse failure. Explicit cancellation never reaches this.
    pub fn on_failure(self, policy: &PollPolicy) -> (Self, PollStep) {
        let consecutive_failures = self.consecutive_failures.saturating_add(1);
        if consecutive_failures >= policy.max_consecutive_failures {
            let next = Self {
                consecutive_failures,
                ..self
            };
            return (
                next,
                PollStep::Exhausted {
                    attempts: consecutive_failures,
                },
            );
        }
        let current_delay_ms = policy.grow(self.current_delay_ms, policy.failure_cap_ms);
        (
            Self {
                consecutive_failures,
                current_delay_ms,
            },
            PollStep::Continue {
                delay: Duration::from_millis(current_delay_ms),
            },
        )
    }
}
