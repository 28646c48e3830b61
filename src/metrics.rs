use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

/// Process-lifetime request counters. Zero at start, never reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub total_requests: u64,
    /// Seconds.
    pub total_time: f64,
    /// Seconds.
    pub max_time: f64,
    pub large_generations: u64,
}

impl PerformanceSnapshot {
    pub fn average_time(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_time / self.total_requests as f64
        }
    }
}

#[derive(Default)]
pub struct PerformanceMetrics {
    inner: Mutex<PerformanceSnapshot>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request as it arrives, before any work is done.
    pub fn begin_request(&self, large: bool) {
        let mut m = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        m.total_requests += 1;
        if large {
            m.large_generations += 1;
        }
    }

    /// Record the latency of a completed request. Returns the updated totals.
    pub fn record_latency(&self, elapsed: Duration) -> PerformanceSnapshot {
        let secs = elapsed.as_secs_f64();
        let mut m = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        m.total_time += secs;
        m.max_time = m.max_time.max(secs);
        *m
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = PerformanceMetrics::new();
        assert_eq!(m.snapshot(), PerformanceSnapshot::default());
        assert_eq!(m.snapshot().average_time(), 0.0);
    }

    #[test]
    fn accumulates() {
        let m = PerformanceMetrics::new();
        m.begin_request(false);
        m.record_latency(Duration::from_millis(500));
        m.begin_request(true);
        let s = m.record_latency(Duration::from_millis(250));
        assert_eq!(s.total_requests, 2);
        assert_eq!(s.large_generations, 1);
        assert!((s.total_time - 0.75).abs() < 1e-9);
        assert!((s.max_time - 0.5).abs() < 1e-9);
        assert!((s.average_time() - 0.375).abs() < 1e-9);
    }
}
