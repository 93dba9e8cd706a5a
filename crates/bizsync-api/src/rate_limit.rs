use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bizsync_core::util::device_fingerprint;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Windows kept before expired ones are swept
const SWEEP_THRESHOLD: usize = 1_024;

/// Fixed-window limiter on sync batches per device.
///
/// Registration and discovery are cheap poll calls and are never limited.
#[derive(Clone)]
pub struct SyncRateLimiter {
    windows: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    limit: u32,
    allowed: Arc<AtomicU64>,
    limited: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub sync_allowed: u64,
    pub sync_limited: u64,
    pub tracked_devices: usize,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl RateWindow {
    const fn open(now: Instant) -> Self {
        Self {
            started_at: now,
            count: 0,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.started_at) >= window
    }

    /// Count one request, or return how long until the window reopens
    fn admit(&mut self, now: Instant, window: Duration, limit: u32) -> Result<(), Duration> {
        if self.expired(now, window) {
            *self = Self::open(now);
        }
        if self.count >= limit {
            return Err(window.saturating_sub(now.duration_since(self.started_at)));
        }
        self.count += 1;
        Ok(())
    }
}

impl SyncRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_window, config.sync_rate_limit_per_window)
    }

    fn new(window: Duration, limit: u32) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            window,
            limit,
            allowed: Arc::new(AtomicU64::new(0)),
            limited: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn check(&self, device_id: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let admitted = {
            let mut windows = self.windows.lock().await;
            if windows.len() > SWEEP_THRESHOLD {
                windows.retain(|_, entry| !entry.expired(now, self.window));
            }
            windows
                .entry(device_id.to_string())
                .or_insert_with(|| RateWindow::open(now))
                .admit(now, self.window, self.limit)
        };

        match admitted {
            Ok(()) => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(retry_after) => {
                self.limited.fetch_add(1, Ordering::Relaxed);
                let retry_after_secs = retry_after.as_secs().max(1);
                tracing::warn!(
                    device = device_fingerprint(device_id),
                    retry_after_secs,
                    "Sync rate limit exceeded"
                );
                Err(AppError::too_many_requests(
                    "Sync rate limit exceeded for device",
                    retry_after_secs,
                ))
            }
        }
    }

    pub async fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            sync_allowed: self.allowed.load(Ordering::Relaxed),
            sync_limited: self.limited.load(Ordering::Relaxed),
            tracked_devices: self.windows.lock().await.len(),
        }
    }
}
