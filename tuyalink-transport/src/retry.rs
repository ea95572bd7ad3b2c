//! Retry bookkeeping for request/response exchanges

use crate::error::Error;

/// Failed attempts of one exchange and the most recent failure
#[derive(Debug, Default)]
pub struct RetryState {
    attempt_count: u32,
    last_error: Option<Error>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed attempts so far
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, error: Error) {
        self.attempt_count += 1;
        self.last_error = Some(error);
    }

    /// The first failure is not a retry; the budget is spent once
    /// `retry_limit` retries have failed as well.
    pub fn is_exhausted(&self, retry_limit: u32) -> bool {
        self.attempt_count > retry_limit
    }

    /// Retries performed after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempt_count.saturating_sub(1)
    }

    /// Convert into the terminal error
    pub fn into_error(self) -> Error {
        let retries = self.retries();
        Error::RetryLimitExceeded {
            retries,
            last_error: Box::new(self.last_error.unwrap_or(Error::NotConnected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_state_new() {
        let state = RetryState::new();
        assert_eq!(state.attempt_count(), 0);
        assert!(state.last_error().is_none());
        assert!(!state.is_exhausted(0));
    }

    #[test]
    fn test_retry_state_budget() {
        let mut state = RetryState::new();

        for _ in 0..3 {
            state.record_failure(Error::ConnectionTimeout);
            assert!(!state.is_exhausted(3));
        }

        state.record_failure(Error::ReadTimeout);
        assert!(state.is_exhausted(3));
        assert_eq!(state.retries(), 3);
        assert!(matches!(state.last_error(), Some(Error::ReadTimeout)));
    }

    #[test]
    fn test_retry_state_zero_limit() {
        let mut state = RetryState::new();
        state.record_failure(Error::ConnectionClosed);
        assert!(state.is_exhausted(0));

        match state.into_error() {
            Error::RetryLimitExceeded { retries, last_error } => {
                assert_eq!(retries, 0);
                assert!(matches!(*last_error, Error::ConnectionClosed));
            }
            other => panic!("Expected RetryLimitExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_error_is_fatal() {
        let mut state = RetryState::new();
        state.record_failure(Error::ReadTimeout);

        let error = state.into_error();
        assert!(error.is_fatal());
        assert!(error.to_string().contains("Read timeout"));
    }
}
