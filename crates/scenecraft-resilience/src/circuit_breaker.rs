//! Per-dependency circuit breaker.
//!
//! One breaker guards one named external dependency (`llm_planner`,
//! `llm_scene`, `object_store`, `renderer`, ...). Unlike a breaker that
//! opens on any single failure, this one opens only after
//! `failure_threshold` *consecutive* failures, and reopens with a doubled,
//! capped timeout when a half-open probe fails.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout: Duration,
    pub call_timeout: Duration,
    pub max_open_timeout: Duration,
    pub exponential_backoff: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(30),
            max_open_timeout: Duration::from_secs(300),
            exponential_backoff: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant, current_timeout: Duration },
    HalfOpen { consecutive_successes: u32, reopen_timeout: Duration },
}

/// Point-in-time snapshot for metrics export.
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub kind: CircuitStateKind,
    pub failure_count: u32,
    pub success_rate: f64,
    pub last_transition: Instant,
}

/// Error returned when a call is rejected or fails.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    #[error("circuit open for {dependency}, retry after {retry_after:?}")]
    Open { dependency: String, retry_after: Duration },
    #[error("call to {dependency} timed out after {0:?}", .timeout)]
    Timeout { dependency: String, timeout: Duration },
    #[error(transparent)]
    Inner(E),
}

struct Counters {
    total_calls: u64,
    total_successes: u64,
}

/// A circuit breaker guarding one named dependency.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Arc<RwLock<Inner>>,
    counters: Arc<RwLock<Counters>>,
    last_transition: Arc<RwLock<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Arc::new(RwLock::new(Inner::Closed { consecutive_failures: 0 })),
            counters: Arc::new(RwLock::new(Counters { total_calls: 0, total_successes: 0 })),
            last_transition: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes `op` if the breaker allows it, bounding the call by
    /// `call_timeout` independent of any outer context deadline.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(retry_after) = self.retry_after_if_open() {
            return Err(CircuitError::Open { dependency: self.name.clone(), retry_after });
        }

        self.counters.write().unwrap().total_calls += 1;

        match tokio::time::timeout(self.config.call_timeout, op()).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.on_failure();
                Err(CircuitError::Inner(e))
            }
            Err(_) => {
                self.on_failure();
                Err(CircuitError::Timeout { dependency: self.name.clone(), timeout: self.config.call_timeout })
            }
        }
    }

    /// Returns `Some(retry_after)` if the breaker is currently open (or
    /// would reject on this call), transitioning open -> half_open as a
    /// side effect once `open_timeout` has elapsed.
    fn retry_after_if_open(&self) -> Option<Duration> {
        let mut state = self.state.write().unwrap();
        match *state {
            Inner::Closed { .. } => None,
            Inner::HalfOpen { .. } => None,
            Inner::Open { opened_at, current_timeout } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= current_timeout {
                    *state = Inner::HalfOpen { consecutive_successes: 0, reopen_timeout: next_timeout(current_timeout, &self.config) };
                    *self.last_transition.write().unwrap() = Instant::now();
                    info!(dependency = %self.name, "circuit half-open, probing");
                    None
                } else {
                    Some(current_timeout - elapsed)
                }
            }
        }
    }

    fn on_success(&self) {
        self.counters.write().unwrap().total_successes += 1;
        let mut state = self.state.write().unwrap();
        match *state {
            Inner::Closed { .. } => {
                *state = Inner::Closed { consecutive_failures: 0 };
            }
            Inner::HalfOpen { consecutive_successes, reopen_timeout } => {
                let successes = consecutive_successes + 1;
                if successes >= self.config.success_threshold {
                    info!(dependency = %self.name, "circuit closed after recovery");
                    *state = Inner::Closed { consecutive_failures: 0 };
                    *self.last_transition.write().unwrap() = Instant::now();
                } else {
                    *state = Inner::HalfOpen { consecutive_successes: successes, reopen_timeout };
                }
            }
            Inner::Open { .. } => {}
        }
    }

    fn on_failure(&self) {
        let mut state = self.state.write().unwrap();
        match *state {
            Inner::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(dependency = %self.name, failures, "circuit opened");
                    *state = Inner::Open { opened_at: Instant::now(), current_timeout: self.config.open_timeout };
                    *self.last_transition.write().unwrap() = Instant::now();
                } else {
                    *state = Inner::Closed { consecutive_failures: failures };
                }
            }
            Inner::HalfOpen { reopen_timeout, .. } => {
                warn!(dependency = %self.name, timeout = ?reopen_timeout, "half-open probe failed, reopening");
                *state = Inner::Open { opened_at: Instant::now(), current_timeout: reopen_timeout };
                *self.last_transition.write().unwrap() = Instant::now();
            }
            Inner::Open { opened_at, current_timeout } => {
                // Already open; a failure here (e.g. a racing call) just
                // keeps the clock where it is.
                *state = Inner::Open { opened_at, current_timeout };
            }
        }
    }

    pub fn state_kind(&self) -> CircuitStateKind {
        match *self.state.read().unwrap() {
            Inner::Closed { .. } => CircuitStateKind::Closed,
            Inner::Open { .. } => CircuitStateKind::Open,
            Inner::HalfOpen { .. } => CircuitStateKind::HalfOpen,
        }
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let state = self.state.read().unwrap();
        let counters = self.counters.read().unwrap();
        let failure_count = match *state {
            Inner::Closed { consecutive_failures } => consecutive_failures,
            _ => 0,
        };
        let success_rate = if counters.total_calls == 0 {
            1.0
        } else {
            counters.total_successes as f64 / counters.total_calls as f64
        };
        CircuitSnapshot {
            kind: self.state_kind(),
            failure_count,
            success_rate,
            last_transition: *self.last_transition.read().unwrap(),
        }
    }
}

fn next_timeout(current: Duration, config: &CircuitBreakerConfig) -> Duration {
    if !config.exponential_backoff {
        return config.open_timeout;
    }
    (current * 2).min(config.max_open_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_timeout: Duration::from_millis(20),
            call_timeout: Duration::from_millis(50),
            max_open_timeout: Duration::from_millis(200),
            exponential_backoff: true,
        }
    }

    #[tokio::test]
    async fn stays_closed_below_failure_threshold() {
        let breaker = CircuitBreaker::new("dep", cfg());
        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state_kind(), CircuitStateKind::Closed);
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures_and_fails_fast() {
        let breaker = CircuitBreaker::new("dep", cfg());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state_kind(), CircuitStateKind::Open);

        let result = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitError::Open { .. })));
    }

    #[tokio::test]
    async fn half_opens_after_timeout_and_closes_on_success_threshold() {
        let breaker = CircuitBreaker::new("dep", cfg());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;

        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert_eq!(breaker.state_kind(), CircuitStateKind::HalfOpen);

        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert_eq!(breaker.state_kind(), CircuitStateKind::Closed);
    }

    #[tokio::test]
    async fn failed_probe_reopens_with_doubled_timeout() {
        let breaker = CircuitBreaker::new("dep", cfg());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.state_kind(), CircuitStateKind::Open);
    }

    #[tokio::test]
    async fn call_timeout_is_recorded_as_a_failure() {
        let breaker = CircuitBreaker::new("dep", cfg());
        let result = breaker
            .call(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), &str>(())
            })
            .await;
        assert!(matches!(result, Err(CircuitError::Timeout { .. })));
    }
}
