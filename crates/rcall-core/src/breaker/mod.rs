//! Circuit breaker shielding a failing backend from repeated load.
//!
//! Three phases: `Closed` (normal), `Open` (reject everything until the
//! cooldown elapses) and `HalfOpen` (one probe allowed). The Open -> HalfOpen
//! move is evaluated lazily on each gate check; there is no background timer.
//!
//! All four state fields live behind a single mutex so a failure count is
//! never visible without its matching timestamps.

mod clock;
mod state;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub use clock::{Clock, ManualClock, SystemClock};
pub use state::CircuitState;

use state::Gate;

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures (without an intervening success) that open the breaker.
    pub max_failures: u32,
    /// How long the breaker stays open before allowing a probe.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Point-in-time copy of the breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    /// True only while `now < next_attempt_time`.
    pub is_open: bool,
    pub failure_count: u32,
    pub last_failure_time: Option<Instant>,
    pub next_attempt_time: Option<Instant>,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    gate: Mutex<Gate>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("gate", &*self.lock())
            .finish()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            gate: Mutex::new(Gate::new()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        // Every critical section leaves the gate consistent, so a poisoned
        // lock still holds usable state.
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate check before issuing a call. May move Open -> HalfOpen.
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let mut gate = self.lock();
        let before = gate.state;
        let allowed = gate.allow(now, self.config.cooldown);
        if before == CircuitState::Open && gate.state == CircuitState::HalfOpen {
            tracing::info!(failures = gate.failure_count, "circuit breaker half-open, allowing probe");
        }
        allowed
    }

    pub fn record_success(&self) {
        match self.lock().record_success() {
            CircuitState::HalfOpen => tracing::info!("circuit breaker closed after successful probe"),
            CircuitState::Open => tracing::debug!("ignoring success reported while circuit breaker open"),
            CircuitState::Closed => {}
        }
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut gate = self.lock();
        if gate.record_failure(now, self.config.max_failures, self.config.cooldown) {
            tracing::warn!(
                failures = gate.failure_count,
                cooldown_secs = self.config.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    /// Current phase, applying the lazy cooldown check without consuming the probe.
    pub fn state(&self) -> CircuitState {
        self.snapshot().state
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        let now = self.clock.now();
        let mut gate = self.lock().clone();
        let state = gate.evaluate(now);
        CircuitBreakerState {
            state,
            is_open: state == CircuitState::Open,
            failure_count: gate.failure_count,
            last_failure_time: gate.last_failure,
            next_attempt_time: gate.next_attempt,
        }
    }
}
