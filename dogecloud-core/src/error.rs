use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<std::time::Duration>,
    },

    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
        status_code: Option<u16>,
    },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Submission not found: {submission_id}")]
    SubmissionNotFound { submission_id: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Reddit rejected the request: {details}")]
    Rejected { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug, Clone)]
pub enum ImageHostError {
    #[error("Upload failed with status {status_code}: {reason}")]
    UploadFailed { status_code: u16, reason: String },

    #[error("Invalid response from image host: {details}")]
    InvalidResponse { details: String },

    #[error("Image file unreadable: {path}")]
    UnreadableFile { path: String },
}

#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error("Template image could not be loaded from {path}: {reason}")]
    TemplateLoad { path: String, reason: String },

    #[error("Font could not be loaded from {path}: {reason}")]
    FontLoad { path: String, reason: String },

    #[error("Generated SVG could not be parsed: {reason}")]
    SvgParse { reason: String },

    #[error("Failed to allocate a {width}x{height} canvas")]
    CanvasAlloc { width: u32, height: u32 },

    #[error("Failed to encode PNG: {reason}")]
    PngEncode { reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Required resource unreadable: {path}: {reason}")]
    ResourceUnreadable { path: String, reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
