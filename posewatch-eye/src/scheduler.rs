//! Display refresh scheduling

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Yields until the host is ready to draw the next frame.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    async fn next_refresh(&self);
}

/// Refresh ticks at a fixed rate. Ticks missed while a frame was being processed are
/// skipped rather than delivered in a burst.
pub struct IntervalScheduler {
    ticker: Mutex<Interval>,
    period: Duration,
}

impl IntervalScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(refresh_rate_hz: u32) -> Self {
        let period = Duration::from_nanos(1_000_000_000 / refresh_rate_hz.max(1) as u64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticker: Mutex::new(ticker),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl FrameScheduler for IntervalScheduler {
    async fn next_refresh(&self) {
        self.ticker.lock().await.tick().await;
    }
}
