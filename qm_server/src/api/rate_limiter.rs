//! Per-connection limits on inbound WebSocket events.
//!
//! Each connection gets a [`MessageLimiter`] holding two sliding windows:
//! a short burst window and a longer sustained window. An event is admitted
//! only if both windows have room, and only admitted events are counted.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::ConnectionConfig;

/// Which window rejected an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    Burst,
    Sustained,
}

impl LimitExceeded {
    /// Label used for the `reason` metric dimension
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitExceeded::Burst => "burst_limit",
            LimitExceeded::Sustained => "sustained_limit",
        }
    }
}

/// Sliding window counter
#[derive(Debug)]
struct SlidingWindow {
    admitted: VecDeque<Instant>,
    max_events: usize,
    window: Duration,
}

impl SlidingWindow {
    fn new(max_events: usize, window: Duration) -> Self {
        Self {
            admitted: VecDeque::with_capacity(max_events),
            max_events,
            window,
        }
    }

    /// Forget admissions older than the window, then report if there is room
    fn has_room(&mut self, now: Instant) -> bool {
        while let Some(at) = self.admitted.front() {
            if now.duration_since(*at) >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
        self.admitted.len() < self.max_events
    }

    fn record(&mut self, now: Instant) {
        self.admitted.push_back(now);
    }
}

/// Burst plus sustained limiter for one connection
#[derive(Debug)]
pub struct MessageLimiter {
    burst: SlidingWindow,
    sustained: SlidingWindow,
}

impl MessageLimiter {
    /// Create a limiter
    ///
    /// # Arguments
    ///
    /// * `burst_limit` - Events allowed per second
    /// * `sustained_limit` - Events allowed per minute
    ///
    /// # Example
    ///
    /// ```
    /// use qm_server::api::rate_limiter::{LimitExceeded, MessageLimiter};
    ///
    /// let mut limiter = MessageLimiter::new(2, 100);
    /// assert!(limiter.check().is_ok());
    /// assert!(limiter.check().is_ok());
    /// assert_eq!(limiter.check(), Err(LimitExceeded::Burst));
    /// ```
    pub fn new(burst_limit: usize, sustained_limit: usize) -> Self {
        Self {
            burst: SlidingWindow::new(burst_limit, Duration::from_secs(1)),
            sustained: SlidingWindow::new(sustained_limit, Duration::from_secs(60)),
        }
    }

    /// Create a limiter from connection settings
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.burst_limit, config.sustained_limit)
    }

    /// Admit or reject an event arriving now
    pub fn check(&mut self) -> Result<(), LimitExceeded> {
        self.check_at(Instant::now())
    }

    /// Admit or reject an event arriving at `now`
    pub fn check_at(&mut self, now: Instant) -> Result<(), LimitExceeded> {
        if !self.burst.has_room(now) {
            return Err(LimitExceeded::Burst);
        }
        if !self.sustained.has_room(now) {
            return Err(LimitExceeded::Sustained);
        }

        self.burst.record(now);
        self.sustained.record(now);
        Ok(())
    }
}
