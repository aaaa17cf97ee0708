//! Script-app login through the OAuth2 resource-owner password grant.

use dogecloud_core::{CoreError, RedditApiError, RedditSettings};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, ResourceOwnerPassword,
    ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
/// Reddit password-grant tokens last an hour unless the response says otherwise.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn expires_within(&self, margin: Duration) -> bool {
        SystemTime::now() + margin >= self.expires_at
    }
}

pub struct PasswordAuthenticator {
    oauth: BasicClient,
    http: reqwest::Client,
    username: ResourceOwnerUsername,
    password: ResourceOwnerPassword,
}

impl PasswordAuthenticator {
    pub fn new(settings: &RedditSettings) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string()).map_err(|e| {
            RedditApiError::AuthenticationFailed {
                reason: format!("invalid authorize URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(settings.auth_url.clone()).map_err(|e| {
            RedditApiError::AuthenticationFailed {
                reason: format!("invalid token URL {}: {}", settings.auth_url, e),
            }
        })?;

        let oauth = BasicClient::new(
            ClientId::new(settings.client_id.clone()),
            Some(ClientSecret::new(settings.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        // Reddit throttles requests without a descriptive user agent, token requests included.
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            oauth,
            http,
            username: ResourceOwnerUsername::new(settings.username.clone()),
            password: ResourceOwnerPassword::new(settings.password.clone()),
        })
    }

    pub fn required_scopes() -> Vec<&'static str> {
        vec!["read", "submit"]
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        debug!("Requesting password-grant token for {}", self.username.as_str());

        let mut request = self.oauth.exchange_password(&self.username, &self.password);
        for scope in Self::required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let http = self.http.clone();
        let response = request
            .request_async(|req| send_token_request(http, req))
            .await
            .map_err(|e| RedditApiError::AuthenticationFailed {
                reason: e.to_string(),
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at: SystemTime::now() + lifetime,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_else(|| {
                    Self::required_scopes()
                        .into_iter()
                        .map(String::from)
                        .collect()
                }),
        };

        info!(
            "Logged in to Reddit as {}, token valid for {:?}",
            self.username.as_str(),
            lifetime
        );
        Ok(token)
    }
}

/// Sends an oauth2 token request through our own client so it carries the user agent.
async fn send_token_request(
    http: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_margin() {
        let valid = RedditToken {
            access_token: "valid".to_string(),
            refresh_token: None,
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            scope: vec!["read".to_string()],
        };
        assert!(!valid.expires_within(Duration::from_secs(60)));
        assert!(valid.expires_within(Duration::from_secs(7200)));

        let expired = RedditToken {
            expires_at: SystemTime::now() - Duration::from_secs(1),
            ..valid
        };
        assert!(expired.expires_within(Duration::ZERO));
    }

    #[test]
    fn test_invalid_token_url_is_rejected() {
        let settings = RedditSettings {
            username: "doge".to_string(),
            password: "hunter2".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "dogecloud/test".to_string(),
            subreddit: "all".to_string(),
            listing_limit: 100,
            api_base: "https://oauth.reddit.com".to_string(),
            auth_url: "not a url".to_string(),
        };
        let err = PasswordAuthenticator::new(&settings).err().unwrap();
        assert!(matches!(
            err,
            CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. })
        ));
    }
}
