use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use dogecloud_core::{CoreError, RedditApiError, SubmissionSummary};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Used when Reddit rate-limits us without saying for how long.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

static WAIT_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(millisecond|second|minute|hour)s?")
        .expect("wait hint pattern is valid")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubmissionData {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub archived: bool,
}

impl From<RedditSubmissionData> for SubmissionSummary {
    fn from(data: RedditSubmissionData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            num_comments: data.num_comments,
        }
    }
}

/// Seconds from a "try again in 9 minutes" style message.
pub fn parse_wait_hint(message: &str) -> Option<u64> {
    let caps = WAIT_HINT.captures(message)?;
    let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let secs = match unit.as_str() {
        "millisecond" => amount.div_ceil(1000),
        "second" => amount,
        "minute" => amount * 60,
        "hour" => amount * 3600,
        _ => return None,
    };
    Some(secs.max(1))
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers.get(name)?.to_str().ok()?.trim().parse::<f64>().ok()
}

/// Seconds to wait after a 429: `Retry-After`, then `X-Ratelimit-Reset`, then the default.
pub fn retry_after_from_headers(headers: &HeaderMap) -> u64 {
    header_number(headers, "retry-after")
        .or_else(|| header_number(headers, "x-ratelimit-reset"))
        .map(|secs| secs.ceil().max(1.0) as u64)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Interpret the body of an `/api/comment` call made with `api_type=json`.
pub fn parse_comment_response(body: &Value) -> Result<String, RedditApiError> {
    let json = body.get("json").ok_or_else(|| RedditApiError::InvalidResponse {
        details: "comment response has no json envelope".to_string(),
    })?;

    if let Some(first) = json
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        let code = first.get(0).and_then(Value::as_str).unwrap_or("UNKNOWN");
        let message = first.get(1).and_then(Value::as_str).unwrap_or_default();
        if code == "RATELIMIT" {
            let retry_after = parse_wait_hint(message).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(RedditApiError::RateLimitExceeded { retry_after });
        }
        return Err(RedditApiError::Rejected {
            details: format!("{}: {}", code, message),
        });
    }

    json.get("data")
        .and_then(|data| data.get("things"))
        .and_then(|things| things.get(0))
        .and_then(|thing| thing.get("data"))
        .and_then(|data| data.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RedditApiError::InvalidResponse {
            details: "comment response has no created comment".to_string(),
        })
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
    api_base: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, api_base: String) -> Result<Self, CoreError> {
        let base = Url::parse(&api_base).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid Reddit API base {}: {}", api_base, e),
        })?;
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth()));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            user_agent,
            api_base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        if let Some(wait) = self.rate_limiter.quota_exhausted().await {
            warn!("Reddit quota exhausted, not sending {} {}", method, endpoint);
            return Err(RedditApiError::RateLimitExceeded {
                retry_after: wait.as_secs_f64().ceil().max(1.0) as u64,
            }
            .into());
        }

        let url = format!("{}{}", self.api_base, endpoint);
        let waited = self.rate_limiter.acquire_permit().await;
        debug!("Acquired rate limit permit for {} {} after {:?}", method, endpoint, waited);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(RedditApiError::RequestTimeout.into());
                }
                return Err(CoreError::Network(e));
            }
        };

        let headers = response.headers();
        let reset = header_number(headers, "x-ratelimit-reset")
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);
        self.rate_limiter
            .record_quota(header_number(headers, "x-ratelimit-remaining"), reset)
            .await;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let err = match status.as_u16() {
            429 => {
                let retry_after = retry_after_from_headers(response.headers());
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => {
                return Err(CoreError::NotFound {
                    resource: endpoint.to_string(),
                })
            }
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => {
                return Err(CoreError::RequestFailed {
                    message: format!("{} {} returned {}", method, endpoint, status),
                    status_code: Some(code),
                })
            }
        };
        Err(err.into())
    }

    /// Hot listing of a subreddit.
    pub async fn get_hot(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditSubmissionData>, CoreError> {
        let endpoint = format!("/r/{}/hot", subreddit);
        let limit = limit.to_string();
        let params = [("limit", limit.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()), None)
            .await?;

        let listing: RedditListing<RedditSubmissionData> = response.json().await.map_err(|e| {
            error!("Failed to parse hot listing: {}", e);
            RedditApiError::InvalidResponse {
                details: format!("Failed to parse hot listing for r/{}", subreddit),
            }
        })?;

        info!(
            "Retrieved {} submissions from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// Raw `[submission, comments]` response for a submission.
    pub async fn get_comments(
        &self,
        access_token: &str,
        submission_id: &str,
    ) -> Result<Value, CoreError> {
        let endpoint = format!("/comments/{}", submission_id);
        let params = [("limit", "500"), ("depth", "10")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()), None)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    RedditApiError::SubmissionNotFound {
                        submission_id: submission_id.to_string(),
                    }
                    .into()
                }
                other => other,
            })?;

        let body: Value = response.json().await.map_err(|e| {
            error!("Failed to parse comments for {}: {}", submission_id, e);
            RedditApiError::InvalidResponse {
                details: format!("Failed to parse comments for {}", submission_id),
            }
        })?;
        Ok(body)
    }

    /// Comment on `parent_fullname` (e.g. `t3_abc123`). Returns the new comment's id.
    pub async fn post_comment(
        &self,
        access_token: &str,
        parent_fullname: &str,
        text: &str,
    ) -> Result<String, CoreError> {
        let form = [
            ("api_type", "json"),
            ("thing_id", parent_fullname),
            ("text", text),
        ];

        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(form.as_slice()))
            .await?;

        let body: Value = response.json().await.map_err(|e| {
            error!("Failed to parse comment response: {}", e);
            RedditApiError::InvalidResponse {
                details: "Failed to parse comment response".to_string(),
            }
        })?;

        let comment_id = parse_comment_response(&body)?;
        info!("Posted comment {} on {}", comment_id, parent_fullname);
        Ok(comment_id)
    }
}
