//! Running health counters for remote calls.

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Counters since process start. Never reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionMetrics {
    /// Attempts issued (one per operation invocation).
    pub total_requests: u64,
    /// Logical calls that returned a value.
    pub successful_requests: u64,
    /// Logical calls that returned an error after their last attempt.
    pub failed_requests: u64,
    /// Calls refused by the circuit breaker without any attempt.
    pub rejected_requests: u64,
    /// Online mean of successful-call latency, in milliseconds.
    pub average_latency_ms: f64,
    pub last_request_time: Option<SystemTime>,
}

impl ConnectionMetrics {
    /// `successful / total`, 0 when nothing has been attempted.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: Mutex<ConnectionMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut ConnectionMetrics)) {
        let mut m = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut m);
    }

    pub fn record_attempt(&self) {
        self.update(|m| {
            m.total_requests += 1;
            m.last_request_time = Some(SystemTime::now());
        });
    }

    pub fn record_success(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        self.update(|m| {
            m.successful_requests += 1;
            let n = m.successful_requests as f64;
            m.average_latency_ms = (m.average_latency_ms * (n - 1.0) + latency_ms) / n;
        });
    }

    pub fn record_failure(&self) {
        self.update(|m| m.failed_requests += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|m| m.rejected_requests += 1);
    }

    pub fn snapshot(&self) -> ConnectionMetrics {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_success_rate_is_zero() {
        let m = MetricsRecorder::new().snapshot();
        assert_eq!(m.success_rate(), 0.0);
        assert!(m.last_request_time.is_none());
    }

    #[test]
    fn average_latency_is_arithmetic_mean() {
        let rec = MetricsRecorder::new();
        let latencies = [12u64, 40, 7, 101, 3];
        for ms in latencies {
            rec.record_attempt();
            rec.record_success(Duration::from_millis(ms));
        }
        let snap = rec.snapshot();
        let mean = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
        assert!((snap.average_latency_ms - mean).abs() < 1e-9);
        assert_eq!(snap.success_rate(), 1.0);
    }

    #[test]
    fn failures_do_not_touch_latency() {
        let rec = MetricsRecorder::new();
        rec.record_attempt();
        rec.record_success(Duration::from_millis(10));
        rec.record_attempt();
        rec.record_failure();
        let snap = rec.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.failed_requests, 1);
        assert!((snap.average_latency_ms - 10.0).abs() < 1e-9);
        assert!((snap.success_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejections_counted_separately() {
        let rec = MetricsRecorder::new();
        rec.record_rejected();
        let snap = rec.snapshot();
        assert_eq!(snap.rejected_requests, 1);
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.failed_requests, 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let rec = std::sync::Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rec = std::sync::Arc::clone(&rec);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        rec.record_attempt();
                        rec.record_success(Duration::from_millis(4));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = rec.snapshot();
        assert_eq!(snap.total_requests, 1000);
        assert_eq!(snap.successful_requests, 1000);
        assert!((snap.average_latency_ms - 4.0).abs() < 1e-9);
    }
}
