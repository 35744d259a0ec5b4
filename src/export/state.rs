use std::fmt;

use crate::error::TransportError;

use super::job::{CANCELLED_REASON, ExportOutcome, PollResult, PollStatus};

/// Why the loop is going to check again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The remote queue still reports the job as pending.
    Pending,
    /// The status check itself failed; it still costs an attempt.
    Transport(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Pending => write!(f, "job still pending"),
            RetryReason::Transport(msg) => write!(f, "status check failed: {msg}"),
        }
    }
}

/// The result of classifying one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Sleep for the poll interval, then check again.
    Retry { attempt: u32, reason: RetryReason },
    /// The job reached its terminal outcome; stop polling.
    Complete(ExportOutcome),
}

/// Polling state owned by one poll loop: attempt count and last status.
///
/// Every status check, including one that errors, consumes an attempt, so a
/// loop driven by this state performs at most `max_attempts` checks.
#[derive(Debug, Clone)]
pub struct PollState {
    attempts: u32,
    max_attempts: u32,
    last_status: Option<PollStatus>,
    outcome: Option<ExportOutcome>,
}

impl PollState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            last_status: None,
            outcome: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_status(&self) -> Option<PollStatus> {
        self.last_status
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Classify the result of the next status check.
    ///
    /// - `Complete` → `Success` with the artifact url.
    /// - `Failed` → `Failure` with the remote error detail.
    /// - `Pending` or a transport error → retry, unless the attempt budget is
    ///   spent, in which case the job is `TimedOut`.
    ///
    /// Once terminal, the cached outcome is returned and no attempt is counted.
    pub fn next(&mut self, result: Result<PollResult, TransportError>) -> Transition {
        if let Some(outcome) = &self.outcome {
            return Transition::Complete(outcome.clone());
        }

        self.attempts += 1;

        let reason = match result {
            Ok(PollResult::Complete { artifact_url }) => {
                self.last_status = Some(PollStatus::Complete);
                return self.finish(ExportOutcome::Success { artifact_url });
            }
            Ok(PollResult::Failed { error_detail }) => {
                self.last_status = Some(PollStatus::Failed);
                return self.finish(ExportOutcome::Failure {
                    reason: remote_reason(error_detail),
                });
            }
            Ok(PollResult::Pending) => {
                self.last_status = Some(PollStatus::Pending);
                RetryReason::Pending
            }
            Err(err) => RetryReason::Transport(err.to_string()),
        };

        if self.attempts >= self.max_attempts {
            self.finish(ExportOutcome::TimedOut)
        } else {
            Transition::Retry {
                attempt: self.attempts,
                reason,
            }
        }
    }

    fn finish(&mut self, outcome: ExportOutcome) -> Transition {
        self.outcome = Some(outcome.clone());
        Transition::Complete(outcome)
    }
}

/// `"cancelled"` is reserved for caller cancellation, so a remote job that
/// reports exactly that detail keeps a distinguishable reason.
fn remote_reason(detail: String) -> String {
    if detail.trim() == CANCELLED_REASON {
        format!("remote job {}", detail.trim())
    } else {
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(url: &str) -> Result<PollResult, TransportError> {
        Ok(PollResult::Complete {
            artifact_url: url.into(),
        })
    }

    #[test]
    fn pending_then_complete() {
        let mut state = PollState::new(3);

        let t = state.next(Ok(PollResult::Pending));
        assert_eq!(
            t,
            Transition::Retry {
                attempt: 1,
                reason: RetryReason::Pending
            }
        );
        state.next(Ok(PollResult::Pending));

        let t = state.next(complete("r.csv"));
        assert_eq!(
            t,
            Transition::Complete(ExportOutcome::Success {
                artifact_url: "r.csv".into()
            })
        );
        assert_eq!(state.attempts(), 3);
        assert_eq!(state.last_status(), Some(PollStatus::Complete));
    }

    #[test]
    fn budget_exhausted_times_out() {
        let mut state = PollState::new(3);
        assert!(matches!(state.next(Ok(PollResult::Pending)), Transition::Retry { .. }));
        assert!(matches!(state.next(Ok(PollResult::Pending)), Transition::Retry { .. }));
        assert_eq!(
            state.next(Ok(PollResult::Pending)),
            Transition::Complete(ExportOutcome::TimedOut)
        );
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn failed_stops_immediately() {
        let mut state = PollState::new(5);
        let t = state.next(Ok(PollResult::Failed {
            error_detail: "report too large".into(),
        }));
        assert_eq!(
            t,
            Transition::Complete(ExportOutcome::Failure {
                reason: "report too large".into()
            })
        );
        assert_eq!(state.attempts(), 1);
        assert!(state.is_terminal());
    }

    #[test]
    fn remote_cancelled_detail_is_not_a_caller_cancel() {
        let mut state = PollState::new(5);
        let Transition::Complete(outcome) = state.next(Ok(PollResult::Failed {
            error_detail: "cancelled".into(),
        })) else {
            panic!("expected a terminal transition");
        };
        assert!(!outcome.is_cancelled());
        assert!(matches!(
            outcome.into_result(),
            Err(crate::error::ExportError::RemoteFailure(reason)) if reason == "remote job cancelled"
        ));
    }

    #[test]
    fn transport_error_counts_as_attempt() {
        let mut state = PollState::new(3);
        let t = state.next(Err(TransportError::new("connection reset")));
        assert_eq!(
            t,
            Transition::Retry {
                attempt: 1,
                reason: RetryReason::Transport("transport error: connection reset".into())
            }
        );
        // Last status only tracks answers from the remote queue.
        assert_eq!(state.last_status(), None);

        state.next(Ok(PollResult::Pending));
        let t = state.next(complete("r.csv"));
        assert!(matches!(t, Transition::Complete(ExportOutcome::Success { .. })));
    }

    #[test]
    fn transport_errors_exhaust_into_timeout() {
        let mut state = PollState::new(2);
        state.next(Err(TransportError::new("dns")));
        let t = state.next(Err(TransportError::new("dns")));
        assert_eq!(t, Transition::Complete(ExportOutcome::TimedOut));
    }

    #[test]
    fn single_attempt_budget() {
        let mut state = PollState::new(1);
        assert_eq!(
            state.next(Ok(PollResult::Pending)),
            Transition::Complete(ExportOutcome::TimedOut)
        );
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut state = PollState::new(3);
        state.next(complete("a.csv"));
        let t = state.next(complete("b.csv"));
        assert_eq!(
            t,
            Transition::Complete(ExportOutcome::Success {
                artifact_url: "a.csv".into()
            })
        );
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn retry_reason_display() {
        assert_eq!(RetryReason::Pending.to_string(), "job still pending");
        assert_eq!(
            RetryReason::Transport("timeout".into()).to_string(),
            "status check failed: timeout"
        );
    }
}
