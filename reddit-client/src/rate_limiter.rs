use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            max_requests: 60, // Reddit asks OAuth clients to stay at or below 60 requests per minute
            time_window: Duration::from_secs(60),
            burst_allowance: 5,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_allowance.max(1) as f64;
        let refill_rate = config.max_requests as f64 / config.time_window.as_secs_f64();

        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate,
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Take `tokens_needed` tokens, or report how long until they are available.
    pub async fn acquire(&self, tokens_needed: f64) -> Result<(), Duration> {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens >= tokens_needed {
            state.tokens -= tokens_needed;
            Ok(())
        } else {
            let missing = tokens_needed - state.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }
}

/// What the server last told us through `X-Ratelimit-*` headers.
#[derive(Debug, Default)]
struct ServerQuota {
    remaining: Option<f64>,
    reset_at: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    token_bucket: TokenBucket,
    server_quota: Mutex<ServerQuota>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            token_bucket: TokenBucket::new(&config),
            server_quota: Mutex::new(ServerQuota::default()),
        }
    }

    /// Wait for a client-side token. Returns the time spent waiting.
    pub async fn acquire_permit(&self) -> Duration {
        let start_time = Instant::now();
        loop {
            match self.token_bucket.acquire(1.0).await {
                Ok(()) => break,
                Err(wait_time) => {
                    debug!("Rate limit reached, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                }
            }
        }
        start_time.elapsed()
    }

    /// Remember the server-reported quota from a response.
    pub async fn record_quota(&self, remaining: Option<f64>, reset: Option<Duration>) {
        let mut quota = self.server_quota.lock().await;
        if remaining.is_some() {
            quota.remaining = remaining;
        }
        if let Some(reset) = reset {
            quota.reset_at = Some(Instant::now() + reset);
        }
        if quota.remaining.is_some_and(|r| r < 1.0) {
            warn!("Reddit request quota exhausted, resets in {:?}", reset);
        }
    }

    /// Time left until the server quota resets, if the quota is used up.
    pub async fn quota_exhausted(&self) -> Option<Duration> {
        let quota = self.server_quota.lock().await;
        match (quota.remaining, quota.reset_at) {
            (Some(remaining), Some(reset_at)) if remaining < 1.0 => {
                let now = Instant::now();
                (reset_at > now).then(|| reset_at - now)
            }
            _ => None,
        }
    }
}
