//! Failure classification for the submission pipeline.
//!
//! Every error that escapes a submission's processing is sorted into one of
//! the failure classes below, and the class decides what the polling loop does
//! next. No class ever re-queues the submission: once claimed it stays claimed.

use crate::{CoreError, RedditApiError};
use std::time::Duration;

/// Where a failure came from, as far as the polling loop cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The platform asked us to back off for a specific duration.
    RateLimited,
    /// Any other discussion-platform failure (network, 5xx, rejected reply).
    TransientPlatform,
    /// Rendering, artifact I/O or the image host failed.
    RenderOrUpload,
    /// Configuration or a mandatory resource is unusable; only meaningful at startup.
    StartupFatal,
}

/// What the polling loop does after a submission failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Sleep exactly this long, then move on to the next candidate.
    WaitOut(Duration),
    /// Sleep the configured pacing delay, then move on to the next candidate.
    Pace,
}

pub struct ErrorRecovery;

impl ErrorRecovery {
    pub fn classify(error: &CoreError) -> FailureClass {
        match error {
            _ if error.is_rate_limited() => FailureClass::RateLimited,

            CoreError::RedditApi(_)
            | CoreError::Network(_)
            | CoreError::RequestFailed { .. }
            | CoreError::Serialization(_) => FailureClass::TransientPlatform,

            CoreError::Render(_) | CoreError::ImageHost(_) | CoreError::Io(_) => {
                FailureClass::RenderOrUpload
            }

            CoreError::Config(_) => FailureClass::StartupFatal,

            CoreError::InvalidInput { .. }
            | CoreError::NotFound { .. }
            | CoreError::Internal { .. }
            | CoreError::RateLimited { .. } => FailureClass::TransientPlatform,
        }
    }

    /// Decide how the loop paces itself after `error`.
    pub fn determine_action(error: &CoreError) -> RecoveryAction {
        match error.rate_limit_delay() {
            Some(delay) => RecoveryAction::WaitOut(delay),
            None => RecoveryAction::Pace,
        }
    }

    /// Convenience for the common Reddit rate-limit case.
    pub fn rate_limited(retry_after_secs: u64) -> CoreError {
        CoreError::RedditApi(RedditApiError::RateLimitExceeded {
            retry_after: retry_after_secs,
        })
    }
}
