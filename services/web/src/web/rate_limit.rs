//! services/web/src/web/rate_limit.rs
//!
//! Fixed-window request counting per client address, scoped to one URL prefix.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::web::{error::AppError, middleware::client_address, state::AppState};

pub const RATE_LIMIT_PREFIX: &str = "/api";
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const RATE_LIMIT_MAX: u32 = 100;
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again in an hour.";

/// Expired windows are swept once the table reaches this many clients. After
/// a sweep the next one waits until the table has doubled.
const SWEEP_THRESHOLD: usize = 10_000;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Source of the current instant, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
}

#[derive(Debug)]
struct Windows {
    entries: HashMap<String, Window>,
    sweep_at: usize,
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    window: Duration,
    max: u32,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, window: Duration, max: u32) -> Self {
        Self {
            clock,
            window,
            max,
            windows: Mutex::new(Windows {
                entries: HashMap::new(),
                sweep_at: SWEEP_THRESHOLD,
            }),
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Counts one request for `key` and decides whether it may proceed.
    /// Rejected requests still count toward the current window.
    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();
        let mut windows = self.windows.lock();

        if windows.entries.len() >= windows.sweep_at {
            let window = self.window;
            windows
                .entries
                .retain(|_, w| now.duration_since(w.started) < window);
            windows.sweep_at = (windows.entries.len() * 2).max(SWEEP_THRESHOLD);
        }

        let entry = windows.entries.entry(key.to_string()).or_insert(Window { started: now, hits: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, hits: 0 };
        }
        entry.hits = entry.hits.saturating_add(1);

        Decision {
            allowed: entry.hits <= self.max,
            remaining: self.max.saturating_sub(entry.hits),
        }
    }
}

/// True for `prefix` itself and anything below it, but not for siblings that
/// merely share the leading characters.
pub fn is_under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Pipeline stage: rejects clients that exceeded the window budget.
pub async fn limit_requests(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if !is_under_prefix(req.uri().path(), RATE_LIMIT_PREFIX) {
        return next.run(req).await;
    }

    let limiter = &state.rate_limiter;
    let decision = limiter.check(&client_address(&req));

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        AppError::TooManyRequests(RATE_LIMIT_MESSAGE.to_string()).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max()));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}
