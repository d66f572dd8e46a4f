use std::time::Duration;

use rand::Rng;

/// Exponential backoff with additive jitter and an optional ceiling.
///
/// `delay(n) = min(base * 2^(n-1) + uniform(0, jitter), max)`.
///
/// Two parameterizations are used in this crate: the executor's capped,
/// jittered policy ([`BackoffPolicy::executor_default`]) and the fetch
/// decorator's uncapped one ([`BackoffPolicy::fetch_default`]). Each owner
/// holds its own instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the second try.
    pub base_delay: Duration,
    /// Upper bound of the random component added to each delay.
    pub jitter: Duration,
    /// Ceiling on the final delay; `None` means uncapped.
    pub max_delay: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::executor_default()
    }
}

impl BackoffPolicy {
    /// 1s base, up to 1s jitter, 30s ceiling.
    pub fn executor_default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            jitter: Duration::from_millis(1000),
            max_delay: Some(Duration::from_secs(30)),
        }
    }

    /// 1s base, no jitter, no ceiling.
    pub fn fetch_default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            jitter: Duration::ZERO,
            max_delay: None,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    pub fn delay(&self, attempt: u32) -> Duration {
        // 2^31 saturates Duration long before it matters; keep the shift sane.
        let exp = attempt.saturating_sub(1).min(31);
        let raw = self.base_delay.saturating_mul(1u32 << exp);
        let jittered = raw.saturating_add(self.sample_jitter());
        match self.max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }

    /// Clamp an externally suggested wait (e.g. `Retry-After`) to the ceiling.
    pub fn clamp(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    fn sample_jitter(&self) -> Duration {
        let ceiling = self.jitter.as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(max: Option<u64>) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(1000),
            jitter: Duration::ZERO,
            max_delay: max.map(Duration::from_millis),
        }
    }

    #[test]
    fn doubles_each_attempt() {
        let p = no_jitter(None);
        assert_eq!(p.delay(1), Duration::from_millis(1000));
        assert_eq!(p.delay(2), Duration::from_millis(2000));
        assert_eq!(p.delay(3), Duration::from_millis(4000));
        assert_eq!(p.delay(4), Duration::from_millis(8000));
    }

    #[test]
    fn capped_variant_never_exceeds_max() {
        let p = BackoffPolicy::executor_default();
        for attempt in 1..64 {
            assert!(p.delay(attempt) <= Duration::from_secs(30), "attempt {}", attempt);
        }
        assert_eq!(no_jitter(Some(5000)).delay(10), Duration::from_millis(5000));
    }

    #[test]
    fn uncapped_variant_keeps_growing() {
        let p = BackoffPolicy::fetch_default();
        assert_eq!(p.delay(6), Duration::from_secs(32));
        assert!(p.delay(20) > Duration::from_secs(30));
        // Huge attempt numbers saturate instead of overflowing.
        let _ = p.delay(u32::MAX);
    }

    #[test]
    fn jitter_stays_within_ceiling() {
        let p = BackoffPolicy {
            base_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
            max_delay: None,
        };
        for _ in 0..200 {
            let d = p.delay(2);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(250));
        }
    }

    #[test]
    fn grows_in_expectation_with_jitter() {
        let p = BackoffPolicy::executor_default();
        let mean = |attempt| {
            (0..200).map(|_| p.delay(attempt).as_millis()).sum::<u128>() / 200
        };
        assert!(mean(3) >= mean(2));
        assert!(mean(2) >= mean(1));
    }

    #[test]
    fn clamp_respects_ceiling() {
        let capped = no_jitter(Some(2000));
        assert_eq!(capped.clamp(Duration::from_secs(60)), Duration::from_millis(2000));
        let uncapped = no_jitter(None);
        assert_eq!(uncapped.clamp(Duration::from_secs(60)), Duration::from_secs(60));
    }
}
