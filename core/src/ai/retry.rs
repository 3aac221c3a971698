/// Backoff for translation-service batches
///
/// Retrying is opt-in through `ServiceOptions::max_retries`. Rate limits,
/// request timeouts and server errors are transient; every other failure
/// surfaces on the first attempt.
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::{Duration, SystemTime};

/// Longest `Retry-After` the client will honour.
pub const RETRY_AFTER_CEILING: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Wait before the first retry; doubled for each one after.
    pub first: Duration,
    pub ceiling: Duration,
    /// Retries allowed after the initial request.
    pub attempts: u32,
}

impl Backoff {
    pub const fn new(first: Duration, ceiling: Duration, attempts: u32) -> Self {
        Self {
            first,
            ceiling,
            attempts,
        }
    }

    /// One second doubling up to thirty.
    pub const fn with_attempts(attempts: u32) -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), attempts)
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.first
            .checked_mul(factor)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }
}

/// A failed batch, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
    },
    /// No response at all.
    Transport,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    GiveUp,
    Wait { delay: Duration, from_server: bool },
}

pub fn next_step(failure: Failure, backoff: &Backoff, retries_done: u32) -> RetryStep {
    if retries_done >= backoff.attempts {
        return RetryStep::GiveUp;
    }

    match failure {
        Failure::Permanent => RetryStep::GiveUp,
        Failure::Status { status, .. } if !is_transient(status) => RetryStep::GiveUp,
        Failure::Status {
            retry_after: Some(delay),
            ..
        } => RetryStep::Wait {
            delay: delay.min(RETRY_AFTER_CEILING).min(backoff.ceiling),
            from_server: true,
        },
        Failure::Status { .. } | Failure::Transport => RetryStep::Wait {
            delay: backoff.delay_for(retries_done),
            from_server: false,
        },
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT
    ) || status.is_server_error()
}

/// `Retry-After` as delta seconds or an HTTP date; a date already passed
/// means no wait.
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(raw, SystemTime::now())
}
