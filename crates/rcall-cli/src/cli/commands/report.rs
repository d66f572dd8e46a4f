//! Health report rendering shared by commands.

use std::time::Instant;

use rcall_core::{HealthReport, RemoteError};
use serde_json::json;

pub(super) fn print_health(report: &HealthReport) {
    let m = &report.metrics;
    let b = &report.breaker;
    println!(
        "  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>10}",
        "Attempts", "OK", "Failed", "Rejected", "Success", "Avg(ms)"
    );
    println!(
        "  {:>8}  {:>8}  {:>8}  {:>8}  {:>7.1}%  {:>10.1}",
        m.total_requests,
        m.successful_requests,
        m.failed_requests,
        m.rejected_requests,
        report.success_rate * 100.0,
        m.average_latency_ms
    );
    match retry_in_secs(report) {
        Some(secs) => println!(
            "  breaker: {:?} (failures={}, retry in {}s)",
            b.state, b.failure_count, secs
        ),
        None => println!("  breaker: {:?} (failures={})", b.state, b.failure_count),
    }
}

pub(super) fn health_json(report: &HealthReport) -> serde_json::Value {
    json!({
        "metrics": report.metrics,
        "success_rate": report.success_rate,
        "breaker": {
            "state": report.breaker.state,
            "is_open": report.breaker.is_open,
            "failure_count": report.breaker.failure_count,
            "retry_in_secs": retry_in_secs(report),
        },
    })
}

pub(super) fn error_json(err: &RemoteError) -> serde_json::Value {
    json!({
        "code": err.code(),
        "message": err.message(),
        "retryable": err.retryable(),
        "status": err.status(),
        "details": err.details(),
    })
}

fn retry_in_secs(report: &HealthReport) -> Option<u64> {
    if !report.breaker.is_open {
        return None;
    }
    report
        .breaker
        .next_attempt_time
        .map(|t| t.saturating_duration_since(Instant::now()).as_secs())
}
