use crate::error::*;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{error, info};

pub trait ErrorExt {
    /// Stable identifier for log lines, most specific variant first.
    fn error_code(&self) -> &'static str;
    /// Log the code and the full cause chain at `error`.
    fn log_error(&self) -> &Self;
}

impl CoreError {
    /// The wait a platform rate limit asked for, if this error is one.
    pub fn rate_limit_delay(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after }) => {
                Some(Duration::from_secs(*retry_after))
            }
            CoreError::RateLimited { retry_after, .. } => {
                Some(retry_after.unwrap_or_else(|| Duration::from_secs(60)))
            }
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit_delay().is_some()
    }

    /// Renders the error followed by every `source()` below it, one per line.
    pub fn error_chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(e) => match e {
                RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
                RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
                RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
                RedditApiError::SubmissionNotFound { .. } => "REDDIT_SUBMISSION_NOT_FOUND",
                RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
                RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
                RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
                RedditApiError::Rejected { .. } => "REDDIT_REJECTED",
                RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
            },
            CoreError::ImageHost(e) => match e {
                ImageHostError::UploadFailed { .. } => "HOST_UPLOAD_FAILED",
                ImageHostError::InvalidResponse { .. } => "HOST_INVALID_RESPONSE",
                ImageHostError::UnreadableFile { .. } => "HOST_UNREADABLE_FILE",
            },
            CoreError::Render(e) => match e {
                RenderError::TemplateLoad { .. } => "RENDER_TEMPLATE_LOAD",
                RenderError::FontLoad { .. } => "RENDER_FONT_LOAD",
                RenderError::SvgParse { .. } => "RENDER_SVG_PARSE",
                RenderError::CanvasAlloc { .. } => "RENDER_CANVAS_ALLOC",
                RenderError::PngEncode { .. } => "RENDER_PNG_ENCODE",
            },
            CoreError::Config(e) => match e {
                ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
                ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT",
                ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
                ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
                ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
                ConfigError::ResourceUnreadable { .. } => "CONFIG_RESOURCE_UNREADABLE",
                ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
            },
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Internal { .. } => "INTERNAL",
            CoreError::RateLimited { .. } => "RATE_LIMITED",
            CoreError::RequestFailed { .. } => "REQUEST_FAILED",
        }
    }

    fn log_error(&self) -> &Self {
        error!("CoreError [{}]: {}", self.error_code(), self.error_chain());
        if let Some(delay) = self.rate_limit_delay() {
            info!("Platform asked for a {:?} pause", delay);
        }
        self
    }
}
