//! # Circuit Breaker Statistics
//!
//! Read-only snapshots of breaker state for health endpoints and operational
//! tooling, plus a registry-wide aggregate.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CircuitState,
    pub to: CircuitState,
    pub at: DateTime<Utc>,
}

/// Snapshot of a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    pub name: String,

    /// State after the lazy recovery check
    pub state: CircuitState,

    /// Consecutive failures in the current CLOSED period
    pub failure_count: u32,

    /// Probe successes in the current HALF_OPEN period
    pub success_count: u32,

    /// Probes currently executing
    pub half_open_inflight: u32,

    /// Calls refused without invoking the wrapped function
    pub rejected_calls: u64,

    /// Lifetime totals of admitted calls and their outcomes
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,

    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_state_change: DateTime<Utc>,

    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,

    /// Most recent transitions, oldest first
    pub history: Vec<StateTransition>,
}

impl CircuitBreakerStats {
    /// Failure share of admitted calls (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_failures as f64 / self.total_calls as f64
    }

    /// OPEN is unhealthy; HALF_OPEN is attempting recovery and counts as healthy
    pub fn is_healthy(&self) -> bool {
        self.state != CircuitState::Open
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing dependency health",
        }
    }

    /// Format stats for logging
    pub fn format_summary(&self) -> String {
        format!(
            "{}: {} | Calls: {} | Failures: {} ({:.1}%) | Rejected: {}",
            self.name,
            self.state_description(),
            self.total_calls,
            self.total_failures,
            self.failure_rate() * 100.0,
            self.rejected_calls
        )
    }
}

/// Registry-wide aggregate of breaker snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerStats {
    /// Stats for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, CircuitBreakerStats>,

    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerStats {
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: Utc::now(),
        }
    }

    pub fn add_circuit_breaker(&mut self, stats: CircuitBreakerStats) {
        self.circuit_breakers.insert(stats.name.clone(), stats);
        self.collected_at = Utc::now();
    }

    /// Get count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for stats in self.circuit_breakers.values() {
            *counts.entry(stats.state).or_insert(0) += 1;
        }
        counts
    }

    /// Names of breakers currently OPEN, sorted
    pub fn unhealthy_circuits(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .circuit_breakers
            .values()
            .filter(|stats| !stats.is_healthy())
            .map(|stats| stats.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Share of healthy breakers (0.0 to 1.0); 1.0 with no breakers
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy = self
            .circuit_breakers
            .values()
            .filter(|stats| stats.is_healthy())
            .count();

        healthy as f64 / self.circuit_breakers.len() as f64
    }

    pub fn total_rejected(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|stats| stats.rejected_calls)
            .sum()
    }

    /// Format summary for logging
    pub fn format_summary(&self) -> String {
        let counts = self.count_by_state();
        let count = |state| counts.get(&state).copied().unwrap_or(0);

        format!(
            "Circuit Breakers: {} total | {} closed | {} open | {} half-open | Health: {:.1}% | Rejected: {}",
            self.circuit_breakers.len(),
            count(CircuitState::Closed),
            count(CircuitState::Open),
            count(CircuitState::HalfOpen),
            self.health_score() * 100.0,
            self.total_rejected()
        )
    }
}

impl Default for SystemCircuitBreakerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(name: &str, state: CircuitState) -> CircuitBreakerStats {
        CircuitBreakerStats {
            name: name.to_string(),
            state,
            failure_count: 0,
            success_count: 0,
            half_open_inflight: 0,
            rejected_calls: 2,
            total_calls: 10,
            total_successes: 7,
            total_failures: 3,
            last_failure_time: None,
            last_state_change: Utc::now(),
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_empty_system_is_fully_healthy() {
        let system = SystemCircuitBreakerStats::new();
        assert_eq!(system.health_score(), 1.0);
        assert!(system.unhealthy_circuits().is_empty());
    }

    #[test]
    fn test_health_score_and_state_counts() {
        let mut system = SystemCircuitBreakerStats::new();
        system.add_circuit_breaker(stats("market_data", CircuitState::Closed));
        system.add_circuit_breaker(stats("news", CircuitState::Open));
        system.add_circuit_breaker(stats("calendar", CircuitState::HalfOpen));
        system.add_circuit_breaker(stats("forex", CircuitState::Open));

        assert!((system.health_score() - 0.5).abs() < f64::EPSILON);
        assert_eq!(system.count_by_state()[&CircuitState::Open], 2);
        assert_eq!(system.unhealthy_circuits(), vec!["forex", "news"]);
        assert_eq!(system.total_rejected(), 8);
        assert!(system.format_summary().contains("2 open"));
    }

    #[test]
    fn test_failure_rate() {
        let s = stats("forex", CircuitState::Closed);
        assert!((s.failure_rate() - 0.3).abs() < 1e-9);
        assert!(s.format_summary().starts_with("forex: Healthy"));
    }
}
