// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded retry of the initial attach call.
//!
//! Only errors of kind [`ErrorKind::Transient`](controller::ErrorKind::Transient) are retried.
//! Any other error ends the loop at once. Waits between attempts are fixed
//! ([`RetryPolicy::interval`]) and are the only suspension points not reaching the controller.

use std::fmt::Display;

use config::RetryPolicy;
use controller::ControllerError;
use tracing::{debug, trace, warn};

/// The states of a retry loop. Attempts are numbered from zero.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Succeeded { attempts: u32 },
    RetryWait { attempt: u32 },
    FailedTransient { attempt: u32, error: ControllerError },
    FailedFatal { attempts: u32, error: ControllerError },
}

impl RetryState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::FailedFatal { .. }
        )
    }

    /// The state following an attempt which returned `result`.
    #[must_use]
    pub fn after_attempt(attempt: u32, result: Result<(), ControllerError>) -> Self {
        match result {
            Ok(()) => RetryState::Succeeded {
                attempts: attempt + 1,
            },
            Err(error) if error.is_transient() => RetryState::FailedTransient { attempt, error },
            Err(error) => RetryState::FailedFatal {
                attempts: attempt + 1,
                error,
            },
        }
    }

    /// The state following a transient failure of the given attempt.
    #[must_use]
    pub fn after_transient(policy: &RetryPolicy, attempt: u32, error: ControllerError) -> Self {
        if policy.should_retry(attempt) {
            RetryState::RetryWait { attempt }
        } else {
            RetryState::FailedFatal {
                attempts: attempt + 1,
                error,
            }
        }
    }
}

impl Display for RetryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryState::Attempting { attempt } => write!(f, "attempting (#{attempt})"),
            RetryState::Succeeded { attempts } => write!(f, "succeeded after {attempts} attempts"),
            RetryState::RetryWait { attempt } => write!(f, "waiting after attempt #{attempt}"),
            RetryState::FailedTransient { attempt, error } => {
                write!(f, "attempt #{attempt} failed: {error}")
            }
            RetryState::FailedFatal { attempts, error } => {
                write!(f, "failed after {attempts} attempts: {error}")
            }
        }
    }
}

/// The last error of a failed retry loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: ControllerError,
}

impl RetryFailure {
    /// Tells if the loop stopped because the retry budget ran out, rather than on a fatal error.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.error.is_transient()
    }
}

/// Run `attempt_fn` until it succeeds, fails with a non-transient error, or the retry budget of
/// `policy` runs out. `attempt_fn` is passed the attempt number.
///
/// On success, returns the number of attempts made.
pub async fn create_with_retry<F, Fut>(policy: RetryPolicy, mut attempt_fn: F) -> Result<u32, RetryFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), ControllerError>>,
{
    let mut state = RetryState::Attempting { attempt: 0 };
    loop {
        trace!("Retry state: {state}");
        state = match state {
            RetryState::Attempting { attempt } => {
                RetryState::after_attempt(attempt, attempt_fn(attempt).await)
            }
            RetryState::FailedTransient { attempt, error } => {
                warn!("Attempt #{attempt} failed with transient error: {error}");
                RetryState::after_transient(&policy, attempt, error)
            }
            RetryState::RetryWait { attempt } => {
                debug!(
                    "Retrying in {}s ({} of {} retries left)",
                    policy.interval.as_secs(),
                    policy.retries - attempt,
                    policy.retries
                );
                tokio::time::sleep(policy.interval).await;
                RetryState::Attempting {
                    attempt: attempt + 1,
                }
            }
            RetryState::Succeeded { attempts } => return Ok(attempts),
            RetryState::FailedFatal { attempts, error } => {
                return Err(RetryFailure { attempts, error });
            }
        }
    }
}
