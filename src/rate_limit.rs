//! Request rate limiting
//!
//! Fixed-window counters keyed by client IP. One limiter guards every
//! route; a stricter one guards writes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use crate::AppState;
use crate::error::AppError;

const DEFAULT_MAX_TRACKED_CLIENTS: usize = 10_000;

/// Key used when the peer address is unknown (e.g. in-process requests)
const UNKNOWN_CLIENT_KEY: &str = "unknown";

/// Requests seen from one client in the current window
#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    hits: u32,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self {
            opened: now,
            hits: 0,
        }
    }

    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.opened) >= length
    }
}

/// Per-client request limiter
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
    /// Upper bound on clients held in memory
    max_tracked_clients: usize,
}

impl RateLimiter {
    /// Create new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Requests allowed per client per window
    /// * `window` - Window length
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_capacity(max_requests, window, DEFAULT_MAX_TRACKED_CLIENTS)
    }

    /// Create a limiter that remembers at most `max_tracked_clients` clients
    pub fn with_capacity(max_requests: u32, window: Duration, max_tracked_clients: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
            max_tracked_clients: max_tracked_clients.max(1),
        }
    }

    /// Count a request for `key`
    ///
    /// # Errors
    /// `RateLimited` once the client's budget for the window is spent.
    /// Rejected requests are not counted.
    pub async fn check_and_increment(&self, key: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if !windows.contains_key(key) && windows.len() >= self.max_tracked_clients {
            self.make_room(&mut windows, now);
        }

        let window = windows
            .entry(key.to_owned())
            .or_insert_with(|| Window::open(now));
        if window.expired(now, self.window) {
            *window = Window::open(now);
        }

        if window.hits >= self.max_requests {
            tracing::debug!(key, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }
        window.hits += 1;
        Ok(())
    }

    /// Drop expired windows; if none expired, forget the stalest client
    fn make_room(&self, windows: &mut HashMap<String, Window>, now: Instant) {
        windows.retain(|_, window| !window.expired(now, self.window));
        if windows.len() < self.max_tracked_clients {
            return;
        }

        let stalest = windows
            .iter()
            .min_by_key(|(_, window)| window.opened)
            .map(|(key, _)| key.clone());
        if let Some(key) = stalest {
            windows.remove(&key);
        }
    }
}

/// Rate-limit key for a request: the peer IP
pub fn client_key(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT_KEY.to_string())
}

/// Middleware applying the global limiter to every request
pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(request.extensions().get::<ConnectInfo<SocketAddr>>());
    state.rate_limiter.check_and_increment(&key).await?;
    Ok(next.run(request).await)
}
