//! Named-dependency lookup for circuit breakers, used by the admin queue
//! status endpoint and by stage executors that share a breaker per
//! dependency across concurrent jobs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot};

#[derive(Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> CircuitBreaker {
        if let Some(existing) = self.breakers.read().unwrap().get(name) {
            return existing.clone();
        }
        let mut guard = self.breakers.write().unwrap();
        guard.entry(name.to_string()).or_insert_with(|| CircuitBreaker::new(name, config)).clone()
    }

    pub fn snapshots(&self) -> Vec<(String, CircuitSnapshot)> {
        self.breakers
            .read()
            .unwrap()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_breaker_by_name() {
        let registry = CircuitBreakerRegistry::new();
        let a = registry.get_or_create("llm_planner", CircuitBreakerConfig::default());
        let b = registry.get_or_create("llm_planner", CircuitBreakerConfig::default());
        assert_eq!(a.name(), b.name());
        assert_eq!(registry.snapshots().len(), 1);
    }
}
