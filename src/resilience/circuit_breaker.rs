//! # Circuit Breaker Implementation
//!
//! Fault isolation for calls to unreliable upstream data sources. Three states:
//! Closed (normal operation), Open (failing fast), and Half-Open (admitting a
//! limited number of probe calls to test recovery).
//!
//! Recovery is lazy: there is no timer thread. Any state read
//! ([`CircuitBreaker::current_state`], admission, [`CircuitBreaker::stats`])
//! moves an Open breaker to Half-Open once `recovery_timeout` has elapsed
//! since the last recorded failure.
//!
//! ## Locking
//!
//! All bookkeeping sits behind one `parking_lot::Mutex`. The lock is taken
//! for admission and again to record the outcome; it is never held while the
//! wrapped call runs.
//!
//! ## Probe slots
//!
//! A Half-Open admission hands out a [`CallPermit`] that owns one probe slot.
//! The slot is released when the permit records an outcome or is dropped (the
//! wrapped call panicked or its future was cancelled). A probe still running
//! after `probe_timeout` loses its slot at the next admission check, so a
//! call that never returns cannot starve recovery.

use crate::config::ConfigResult;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStats, StateTransition};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Number of transitions kept for diagnostics
pub const HISTORY_CAPACITY: usize = 20;

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - limited probe calls allowed through
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`CircuitBreaker::call`]
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker refused to admit the call; the wrapped function never ran
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// The wrapped call ran and failed; the failure was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The wrapped call's own error, if it ran
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::OperationFailed(e) => Some(e),
            Self::CircuitOpen { .. } => None,
        }
    }
}

/// Identifies one admitted probe within one Half-Open period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProbeTicket {
    epoch: u64,
    id: u64,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    last_state_change: DateTime<Utc>,
    /// Bumped on every transition so late outcomes of earlier probes are ignored
    epoch: u64,
    next_probe_id: u64,
    probes: HashMap<u64, Instant>,
    rejected_calls: u64,
    total_calls: u64,
    total_successes: u64,
    total_failures: u64,
    history: VecDeque<StateTransition>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            last_failure_time: None,
            last_state_change: Utc::now(),
            epoch: 0,
            next_probe_id: 0,
            probes: HashMap::new(),
            rejected_calls: 0,
            total_calls: 0,
            total_successes: 0,
            total_failures: 0,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    fn mark_failure(&mut self, now: Instant) {
        self.last_failure = Some(now);
        self.last_failure_time = Some(Utc::now());
    }
}

/// Per-dependency circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and stats
    name: String,

    /// Immutable after construction
    config: CircuitBreakerConfig,

    inner: Mutex<BreakerState>,
}

/// Admission to run one wrapped call
///
/// Probe permits hold a Half-Open slot until an outcome is recorded or the
/// permit is dropped.
#[must_use = "dropping a permit without recording an outcome discards the call"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: Option<ProbeTicket>,
}

impl CallPermit<'_> {
    /// Whether this call is a Half-Open probe
    pub fn is_probe(&self) -> bool {
        self.probe.is_some()
    }

    pub fn record_success(mut self) {
        let probe = self.probe.take();
        self.breaker.on_success(probe);
    }

    pub fn record_failure(mut self) {
        let probe = self.probe.take();
        self.breaker.on_failure(probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.probe.take() {
            self.breaker.release_probe(ticket);
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    ///
    /// # Errors
    /// Returns a `ConfigurationError` when any threshold is 0 or a timeout is zero.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let name = name.into();

        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            half_open_max_calls = config.half_open_max_calls,
            "Circuit breaker initialized"
        );

        Ok(Self {
            name,
            config,
            inner: Mutex::new(BreakerState::new()),
        })
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, moving Open to Half-Open if the recovery timeout elapsed
    pub fn current_state(&self) -> CircuitState {
        let mut st = self.inner.lock();
        self.refresh(&mut st, Instant::now());
        st.state
    }

    /// Closed means healthy; Open and Half-Open are still recovering
    pub fn is_healthy(&self) -> bool {
        self.current_state() == CircuitState::Closed
    }

    /// Execute a call with circuit breaker protection
    ///
    /// Returns `CircuitOpen` without running `operation` when the breaker
    /// cannot admit the call.
    pub fn call<T, E, F>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let permit = self.try_acquire().ok_or_else(|| self.open_error())?;

        match operation() {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure();
                Err(CircuitBreakerError::OperationFailed(e))
            }
        }
    }

    /// Execute a call, using `fallback` when the call is rejected or fails
    ///
    /// The fallback takes precedence over both the rejection and the wrapped
    /// call's error; its own result is returned as-is.
    pub fn call_with_fallback<T, E, F, FB>(&self, operation: F, fallback: FB) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        FB: FnOnce() -> Result<T, E>,
    {
        match self.call(operation) {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen { .. }) => {
                debug!(component = %self.name, "Circuit open, using fallback");
                fallback()
            }
            Err(CircuitBreakerError::OperationFailed(_)) => {
                debug!(component = %self.name, "Call failed, using fallback");
                fallback()
            }
        }
    }

    /// Async form of [`CircuitBreaker::call`]
    ///
    /// Dropping the returned future mid-call releases any probe slot it held.
    ///
    /// ```rust
    /// use tradeguard_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
    ///
    /// # tokio_test::block_on(async {
    /// let breaker = CircuitBreaker::new("forex", CircuitBreakerConfig::default()).unwrap();
    /// let rate = breaker
    ///     .call_async(|| async { Ok::<_, String>(1.0842) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(rate, 1.0842);
    /// # });
    /// ```
    pub async fn call_async<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().ok_or_else(|| self.open_error())?;

        match operation().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure();
                Err(CircuitBreakerError::OperationFailed(e))
            }
        }
    }

    /// Async form of [`CircuitBreaker::call_with_fallback`]
    pub async fn call_async_with_fallback<T, E, F, Fut, FB, FutB>(
        &self,
        operation: F,
        fallback: FB,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FutB,
        FutB: Future<Output = Result<T, E>>,
    {
        match self.call_async(operation).await {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(
                    component = %self.name,
                    rejected = err.is_circuit_open(),
                    "Using async fallback"
                );
                fallback().await
            }
        }
    }

    /// Wrap a one-argument function; the wrapper keeps its argument and success type
    pub fn wrap<A, T, E, F>(self: &Arc<Self>, operation: F) -> impl Fn(A) -> Result<T, CircuitBreakerError<E>>
    where
        F: Fn(A) -> Result<T, E>,
    {
        let breaker = Arc::clone(self);
        move |arg| breaker.call(|| operation(arg))
    }

    /// Wrap a function together with a fallback taking the same argument
    pub fn wrap_with_fallback<A, T, E, F, FB>(
        self: &Arc<Self>,
        operation: F,
        fallback: FB,
    ) -> impl Fn(A) -> Result<T, E>
    where
        A: Clone,
        F: Fn(A) -> Result<T, E>,
        FB: Fn(A) -> Result<T, E>,
    {
        let breaker = Arc::clone(self);
        move |arg: A| {
            let fallback_arg = arg.clone();
            breaker.call_with_fallback(|| operation(arg), || fallback(fallback_arg))
        }
    }

    /// Admit a call for manual outcome recording
    ///
    /// Returns `None` (and counts a rejection) when Open or when all Half-Open
    /// probe slots are taken. Used where the protected work does not fit a
    /// closure, e.g. the cache service's backing store calls.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let now = Instant::now();
        let mut st = self.inner.lock();
        self.refresh(&mut st, now);

        match st.state {
            CircuitState::Closed => {
                st.total_calls += 1;
                Some(CallPermit {
                    breaker: self,
                    probe: None,
                })
            }
            CircuitState::Open => {
                st.rejected_calls += 1;
                None
            }
            CircuitState::HalfOpen => {
                self.reclaim_stale_probes(&mut st, now);

                if st.probes.len() >= self.config.half_open_max_calls as usize {
                    st.rejected_calls += 1;
                    return None;
                }

                let id = st.next_probe_id;
                st.next_probe_id += 1;
                st.probes.insert(id, now);
                st.total_calls += 1;

                Some(CallPermit {
                    breaker: self,
                    probe: Some(ProbeTicket {
                        epoch: st.epoch,
                        id,
                    }),
                })
            }
        }
    }

    /// Get current stats snapshot
    pub fn stats(&self) -> CircuitBreakerStats {
        let mut st = self.inner.lock();
        self.refresh(&mut st, Instant::now());

        CircuitBreakerStats {
            name: self.name.clone(),
            state: st.state,
            failure_count: st.failure_count,
            success_count: st.success_count,
            half_open_inflight: st.probes.len() as u32,
            rejected_calls: st.rejected_calls,
            total_calls: st.total_calls,
            total_successes: st.total_successes,
            total_failures: st.total_failures,
            last_failure_time: st.last_failure_time,
            last_state_change: st.last_state_change,
            failure_threshold: self.config.failure_threshold,
            success_threshold: self.config.success_threshold,
            recovery_timeout: self.config.recovery_timeout,
            half_open_max_calls: self.config.half_open_max_calls,
            history: st.history.iter().copied().collect(),
        }
    }

    /// Force CLOSED and zero the current-period counters and rejection count
    ///
    /// Lifetime call totals and history are kept.
    pub fn reset(&self) {
        let mut st = self.inner.lock();
        warn!(component = %self.name, from = %st.state, "Circuit breaker reset");

        if st.state != CircuitState::Closed {
            self.transition(&mut st, CircuitState::Closed);
        } else {
            st.epoch += 1;
            st.probes.clear();
        }
        st.failure_count = 0;
        st.success_count = 0;
        st.rejected_calls = 0;
    }

    /// Force circuit to open state (for emergency isolation)
    ///
    /// The recovery timer starts now.
    pub fn force_open(&self) {
        let mut st = self.inner.lock();
        warn!(component = %self.name, "Circuit breaker forced open");

        st.mark_failure(Instant::now());
        if st.state != CircuitState::Open {
            self.transition(&mut st, CircuitState::Open);
        }
    }

    fn open_error<E>(&self) -> CircuitBreakerError<E> {
        debug!(component = %self.name, "Call rejected, circuit open");
        CircuitBreakerError::CircuitOpen {
            component: self.name.clone(),
        }
    }

    /// Lazy Open -> Half-Open check
    fn refresh(&self, st: &mut BreakerState, now: Instant) {
        if st.state != CircuitState::Open {
            return;
        }

        let elapsed = st
            .last_failure
            .map_or(self.config.recovery_timeout, |at| now.saturating_duration_since(at));

        if elapsed >= self.config.recovery_timeout {
            self.transition(st, CircuitState::HalfOpen);
        }
    }

    fn reclaim_stale_probes(&self, st: &mut BreakerState, now: Instant) {
        let probe_timeout = self.config.probe_timeout;
        let before = st.probes.len();
        st.probes
            .retain(|_, started| now.saturating_duration_since(*started) < probe_timeout);

        let reclaimed = before - st.probes.len();
        if reclaimed > 0 {
            warn!(
                component = %self.name,
                reclaimed = reclaimed,
                probe_timeout_ms = probe_timeout.as_millis() as u64,
                "Reclaimed half-open probe slots held past probe timeout"
            );
        }
    }

    fn release_probe(&self, ticket: ProbeTicket) {
        let mut st = self.inner.lock();
        if st.epoch == ticket.epoch && st.probes.remove(&ticket.id).is_some() {
            debug!(component = %self.name, "Probe slot released without outcome");
        }
    }

    fn on_success(&self, probe: Option<ProbeTicket>) {
        let mut st = self.inner.lock();
        st.total_successes += 1;

        match st.state {
            CircuitState::Closed => {
                st.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                let Some(ticket) = probe.filter(|t| t.epoch == st.epoch) else {
                    return;
                };
                st.probes.remove(&ticket.id);
                st.success_count += 1;

                debug!(
                    component = %self.name,
                    success_count = st.success_count,
                    success_threshold = self.config.success_threshold,
                    "Probe succeeded"
                );

                if st.success_count >= self.config.success_threshold {
                    self.transition(&mut st, CircuitState::Closed);
                }
            }
            CircuitState::Open => {
                debug!(component = %self.name, "Late success ignored while circuit is open");
            }
        }
    }

    fn on_failure(&self, probe: Option<ProbeTicket>) {
        let now = Instant::now();
        let mut st = self.inner.lock();
        st.total_failures += 1;

        match st.state {
            CircuitState::Closed => {
                st.failure_count += 1;
                st.mark_failure(now);

                if st.failure_count >= self.config.failure_threshold {
                    self.transition(&mut st, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                if probe.is_some_and(|t| t.epoch == st.epoch) {
                    st.mark_failure(now);
                    self.transition(&mut st, CircuitState::Open);
                }
            }
            CircuitState::Open => {
                debug!(component = %self.name, "Late failure ignored while circuit is open");
            }
        }
    }

    fn transition(&self, st: &mut BreakerState, to: CircuitState) {
        let from = st.state;
        let at = Utc::now();

        if st.history.len() == HISTORY_CAPACITY {
            st.history.pop_front();
        }
        st.history.push_back(StateTransition { from, to, at });

        st.state = to;
        st.last_state_change = at;
        st.epoch += 1;
        st.probes.clear();
        st.success_count = 0;

        match to {
            CircuitState::Closed => {
                st.failure_count = 0;
                info!(
                    component = %self.name,
                    from = %from,
                    total_calls = st.total_calls,
                    "Circuit breaker closed (recovered)"
                );
            }
            CircuitState::Open => {
                error!(
                    component = %self.name,
                    from = %from,
                    failure_count = st.failure_count,
                    failure_threshold = self.config.failure_threshold,
                    recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
                    "Circuit breaker opened (failing fast)"
                );
            }
            CircuitState::HalfOpen => {
                info!(
                    component = %self.name,
                    half_open_max_calls = self.config.half_open_max_calls,
                    success_threshold = self.config.success_threshold,
                    "Circuit breaker half-open (testing recovery)"
                );
            }
        }
    }
}
