pub mod api;
pub mod auth;
pub mod comments;
pub mod rate_limiter;
pub mod retry;


pub use api::RedditApiClient;
pub use auth::{PasswordAuthenticator, RedditToken};
pub use comments::flatten_comment_tree;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, RetryExecutor};

use dogecloud_core::{CoreError, RedditApiError, RedditSettings, SubmissionSummary};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens this close to expiry are replaced before use.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The discussion platform the bot reads from and replies to.
pub trait DiscussionPlatform {
    /// Submissions from the configured listing, in listing order.
    async fn hot_submissions(&self) -> Result<Vec<SubmissionSummary>, CoreError>;

    /// Every comment's escaped `body_html`, breadth-first.
    async fn comment_bodies(&self, submission_id: &str) -> Result<Vec<String>, CoreError>;

    /// Reply to a submission and return the new comment's id.
    async fn reply(&self, submission_id: &str, text: &str) -> Result<String, CoreError>;
}

pub struct RedditClient {
    settings: RedditSettings,
    api: RedditApiClient,
    authenticator: PasswordAuthenticator,
    token: Mutex<Option<RedditToken>>,
    retry: RetryExecutor,
}

impl RedditClient {
    /// Builds the client without touching the network.
    pub fn new(settings: RedditSettings) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(settings.user_agent.clone(), settings.api_base.clone())?;
        let authenticator = PasswordAuthenticator::new(&settings)?;

        Ok(Self {
            settings,
            api,
            authenticator,
            token: Mutex::new(None),
            retry: RetryExecutor::new(RetryConfig::reddit()),
        })
    }

    pub fn settings(&self) -> &RedditSettings {
        &self.settings
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }

    /// Log in with the configured username and password.
    pub async fn login(&self) -> Result<(), CoreError> {
        let token = self.authenticator.request_token().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        let mut guard = self.token.lock().await;
        match guard.as_ref() {
            Some(token) if !token.expires_within(TOKEN_REFRESH_MARGIN) => {
                Ok(token.access_token.clone())
            }
            _ => {
                debug!("Access token missing or about to expire, logging in again");
                let token = self.authenticator.request_token().await?;
                let access = token.access_token.clone();
                *guard = Some(token);
                Ok(access)
            }
        }
    }

    /// Drop the cached token if Reddit rejected it, so the next call logs in again.
    async fn forget_rejected_token(&self, error: &CoreError) {
        if matches!(error, CoreError::RedditApi(RedditApiError::InvalidToken)) {
            warn!("Reddit rejected the access token, it will be renewed");
            *self.token.lock().await = None;
        }
    }

    async fn fetch_hot(&self) -> Result<Vec<SubmissionSummary>, CoreError> {
        let token = self.access_token().await?;
        let listing = self
            .api
            .get_hot(&token, &self.settings.subreddit, self.settings.listing_limit)
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t3")
            .map(|child| child.data.into())
            .collect())
    }

    async fn fetch_comment_bodies(&self, submission_id: &str) -> Result<Vec<String>, CoreError> {
        let token = self.access_token().await?;
        let response = self.api.get_comments(&token, submission_id).await?;
        let bodies = flatten_comment_tree(&response);
        debug!("Collected {} comment bodies for {}", bodies.len(), submission_id);
        Ok(bodies)
    }
}

impl DiscussionPlatform for RedditClient {
    async fn hot_submissions(&self) -> Result<Vec<SubmissionSummary>, CoreError> {
        let result = self.retry.execute("hot listing", || self.fetch_hot()).await;
        if let Err(e) = &result {
            self.forget_rejected_token(e).await;
        }
        result
    }

    async fn comment_bodies(&self, submission_id: &str) -> Result<Vec<String>, CoreError> {
        let result = self
            .retry
            .execute("comment tree", || self.fetch_comment_bodies(submission_id))
            .await;
        if let Err(e) = &result {
            self.forget_rejected_token(e).await;
        }
        result
    }

    async fn reply(&self, submission_id: &str, text: &str) -> Result<String, CoreError> {
        // Posting is not idempotent, so it is never retried.
        let token = self.access_token().await?;
        let fullname = format!("t3_{}", submission_id);
        let result = self.api.post_comment(&token, &fullname, text).await;
        match &result {
            Ok(comment_id) => info!("Replied to {} with comment {}", submission_id, comment_id),
            Err(e) => self.forget_rejected_token(e).await,
        }
        result
    }
}
