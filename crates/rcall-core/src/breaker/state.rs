//! Breaker state machine. Pure transitions over a caller-supplied `now`.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Externally visible breaker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; every call is allowed.
    Closed,
    /// Rejecting calls until the cooldown elapses.
    Open,
    /// Cooldown elapsed; a single probe call is allowed through.
    HalfOpen,
}

/// Mutable breaker fields. Always updated together under one lock.
#[derive(Debug, Clone)]
pub(super) struct Gate {
    pub(super) state: CircuitState,
    pub(super) failure_count: u32,
    pub(super) last_failure: Option<Instant>,
    pub(super) next_attempt: Option<Instant>,
    probe_in_flight: bool,
}

impl Gate {
    pub(super) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            next_attempt: None,
            probe_in_flight: false,
        }
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.next_attempt.is_some_and(|t| now >= t)
    }

    /// Apply the lazy Open -> HalfOpen transition and return the phase in force at `now`.
    pub(super) fn evaluate(&mut self, now: Instant) -> CircuitState {
        if self.state == CircuitState::Open && self.cooldown_elapsed(now) {
            self.state = CircuitState::HalfOpen;
            self.probe_in_flight = false;
        }
        self.state
    }

    /// Gate check. In HalfOpen exactly one probe is granted; if its outcome is
    /// never reported, another probe is granted after a further cooldown.
    pub(super) fn allow(&mut self, now: Instant, cooldown: Duration) -> bool {
        match self.evaluate(now) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.probe_in_flight && !self.cooldown_elapsed(now) {
                    return false;
                }
                self.probe_in_flight = true;
                self.next_attempt = Some(now + cooldown);
                true
            }
        }
    }

    /// Resets to Closed from Closed or HalfOpen. While Open the success belongs
    /// to a call admitted before the trip and is ignored. Returns the phase in
    /// force when the success was reported.
    pub(super) fn record_success(&mut self) -> CircuitState {
        let previous = self.state;
        if previous != CircuitState::Open {
            *self = Self::new();
        }
        previous
    }

    /// Returns true when this failure opened the breaker.
    pub(super) fn record_failure(
        &mut self,
        now: Instant,
        max_failures: u32,
        cooldown: Duration,
    ) -> bool {
        let was_open = self.state == CircuitState::Open;
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(now);
        self.probe_in_flight = false;
        if self.failure_count >= max_failures {
            self.state = CircuitState::Open;
            self.next_attempt = Some(now + cooldown);
            !was_open
        } else {
            self.state = CircuitState::Closed;
            self.next_attempt = None;
            false
        }
    }
}
