// crates/release-gate-registry/src/breaker.rs
// ============================================================================
// Module: Registry Circuit Breaker
// Description: Consecutive-failure circuit breaker around registry transports.
// Purpose: Fail fast while a registry is down and test it with single trial calls.
// Dependencies: release-gate-core
// ============================================================================

//! ## Overview
//! State machine:
//! - `closed`: calls pass through; consecutive availability failures are
//!   counted and the breaker opens at the configured threshold.
//! - `open`: calls fail with [`RegistryError::CircuitOpen`] without reaching
//!   the transport until the reset timeout elapses.
//! - `half_open`: exactly one trial call is admitted; success closes the
//!   breaker, failure reopens it. Other callers are rejected meanwhile.
//!
//! Only [`RegistryError::Unavailable`] counts as a failure. Not-found and
//! other 4xx answers are valid registry responses and reset the count.
//! Every transition is reported to the configured [`ControllerLogSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use release_gate_core::Artifact;
use release_gate_core::ControllerLogEvent;
use release_gate_core::ControllerLogSink;
use release_gate_core::Digest;
use release_gate_core::ManifestRecord;
use release_gate_core::NoopLogSink;
use release_gate_core::RegistryError;
use release_gate_core::RegistryTransport;
use release_gate_core::TagName;
use release_gate_core::TagReservation;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default consecutive failures before the breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default time the breaker stays open before admitting a trial call.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive availability failures that open the breaker (at least 1).
    pub failure_threshold: u32,
    /// Time spent open before a half-open trial.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic time source for the breaker.
pub trait BreakerClock: Send + Sync {
    /// Returns elapsed time since an arbitrary fixed origin.
    fn elapsed(&self) -> Duration;
}

/// Wall-clock breaker time backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemBreakerClock {
    /// Origin instant.
    origin: Instant,
}

impl Default for SystemBreakerClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl BreakerClock for SystemBreakerClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced breaker time. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualBreakerClock {
    /// Current reading.
    now: Arc<Mutex<Duration>>,
}

impl ManualBreakerClock {
    /// Creates a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = now.saturating_add(by);
        }
    }
}

impl BreakerClock for ManualBreakerClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected.
    Open,
    /// A single trial call is admitted.
    HalfOpen,
}

impl CircuitState {
    /// Returns the log label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable breaker state guarded by one mutex.
#[derive(Debug)]
struct BreakerState {
    /// Current state.
    state: CircuitState,
    /// Consecutive availability failures while closed.
    consecutive_failures: u32,
    /// Clock reading when the breaker last opened.
    opened_at: Duration,
    /// Whether the half-open trial call is in flight.
    trial_in_flight: bool,
}

/// How a call was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Normal closed-state call.
    Normal,
    /// Half-open trial call.
    Trial,
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Circuit breaker shared by every caller of one registry endpoint.
pub struct CircuitBreaker {
    /// Endpoint label used in log events.
    endpoint: String,
    /// Thresholds.
    config: CircuitBreakerConfig,
    /// Time source.
    clock: Arc<dyn BreakerClock>,
    /// Transition log sink.
    log: Arc<dyn ControllerLogSink>,
    /// Breaker state.
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a closed breaker using wall-clock time and no logging.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                reset_timeout: config.reset_timeout,
            },
            clock: Arc::new(SystemBreakerClock::default()),
            log: Arc::new(NoopLogSink),
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: Duration::ZERO,
                trial_in_flight: false,
            }),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl BreakerClock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Reports transitions to `log`.
    #[must_use]
    pub fn with_log_sink(mut self, log: Arc<dyn ControllerLogSink>) -> Self {
        self.log = log;
        self
    }

    /// Returns the configuration in effect.
    #[must_use]
    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Returns the current state, moving `open` to `half_open` when due.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let Ok(mut state) = self.lock() else {
            return CircuitState::Open;
        };
        let event = self.refresh(&mut state);
        let current = state.state;
        drop(state);
        self.emit(event);
        current
    }

    /// Returns consecutive availability failures counted while closed.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().map_or(0, |state| state.consecutive_failures)
    }

    /// Runs `call` through the breaker.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CircuitOpen`] without running `call` while the
    /// breaker rejects traffic; otherwise returns the result of `call`.
    pub fn call<T>(
        &self,
        call: impl FnOnce() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let admission = self.admit()?;
        let result = call();
        let failed = matches!(&result, Err(err) if err.is_availability_failure());
        self.settle(admission, failed);
        result
    }

    /// Locks the breaker state.
    fn lock(&self) -> Result<MutexGuard<'_, BreakerState>, RegistryError> {
        self.state
            .lock()
            .map_err(|_| RegistryError::Protocol("circuit breaker mutex poisoned".to_string()))
    }

    /// Moves an expired open breaker to half-open.
    fn refresh(&self, state: &mut BreakerState) -> Option<ControllerLogEvent> {
        if state.state == CircuitState::Open
            && self.clock.elapsed().saturating_sub(state.opened_at) >= self.config.reset_timeout
        {
            return self.transition(state, CircuitState::HalfOpen);
        }
        None
    }

    /// Decides whether a call may proceed.
    fn admit(&self) -> Result<Admission, RegistryError> {
        let mut state = self.lock()?;
        let event = self.refresh(&mut state);
        let admission = match state.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::HalfOpen if !state.trial_in_flight => {
                state.trial_in_flight = true;
                Ok(Admission::Trial)
            }
            CircuitState::HalfOpen | CircuitState::Open => Err(RegistryError::CircuitOpen),
        };
        drop(state);
        self.emit(event);
        admission
    }

    /// Records the outcome of an admitted call.
    fn settle(&self, admission: Admission, failed: bool) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let event = match (admission, failed) {
            (Admission::Trial, false) => {
                state.trial_in_flight = false;
                state.consecutive_failures = 0;
                self.transition(&mut state, CircuitState::Closed)
            }
            (Admission::Trial, true) => {
                state.trial_in_flight = false;
                self.open(&mut state)
            }
            (Admission::Normal, false) => {
                state.consecutive_failures = 0;
                None
            }
            (Admission::Normal, true) if state.state == CircuitState::Closed => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                if state.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut state)
                } else {
                    None
                }
            }
            (Admission::Normal, true) => None,
        };
        drop(state);
        self.emit(event);
    }

    /// Opens the breaker and stamps the open time.
    fn open(&self, state: &mut BreakerState) -> Option<ControllerLogEvent> {
        state.opened_at = self.clock.elapsed();
        self.transition(state, CircuitState::Open)
    }

    /// Applies a state change and returns its log event.
    ///
    /// The event is recorded by the caller once the state lock is released.
    fn transition(
        &self,
        state: &mut BreakerState,
        next: CircuitState,
    ) -> Option<ControllerLogEvent> {
        let previous = state.state;
        state.state = next;
        if next == CircuitState::Closed {
            state.consecutive_failures = 0;
        }
        if previous == next {
            return None;
        }
        Some(ControllerLogEvent::new("circuit_breaker", next.as_str()).detail(format!(
            "{}: {previous} -> {next} (consecutive failures: {})",
            self.endpoint, state.consecutive_failures
        )))
    }

    /// Records a transition event.
    fn emit(&self, event: Option<ControllerLogEvent>) {
        if let Some(event) = event {
            self.log.record(&event);
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Transport Wrapper
// ============================================================================

/// Registry transport that routes every call through a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct BreakerTransport<T> {
    /// Wrapped transport.
    inner: T,
    /// Shared breaker.
    breaker: Arc<CircuitBreaker>,
}

impl<T: RegistryTransport> BreakerTransport<T> {
    /// Wraps `inner` with `breaker`.
    #[must_use]
    pub const fn new(inner: T, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            inner,
            breaker,
        }
    }

    /// Returns the shared breaker.
    #[must_use]
    pub const fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub const fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: RegistryTransport> RegistryTransport for BreakerTransport<T> {
    fn push(&self, artifact: &Artifact, tag: &TagName) -> Result<Digest, RegistryError> {
        self.breaker.call(|| self.inner.push(artifact, tag))
    }

    fn pull(&self, tag: &TagName) -> Result<Artifact, RegistryError> {
        self.breaker.call(|| self.inner.pull(tag))
    }

    fn get_manifest(&self, tag: &TagName) -> Result<ManifestRecord, RegistryError> {
        self.breaker.call(|| self.inner.get_manifest(tag))
    }

    fn tag_artifact(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError> {
        self.breaker.call(|| self.inner.tag_artifact(digest, tag))
    }

    fn read_annotations(&self, tag: &TagName) -> Result<BTreeMap<String, String>, RegistryError> {
        self.breaker.call(|| self.inner.read_annotations(tag))
    }

    fn write_annotations(
        &self,
        tag: &TagName,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        self.breaker.call(|| self.inner.write_annotations(tag, annotations))
    }

    fn reserve_tag(&self, digest: &Digest, tag: &TagName) -> Result<TagReservation, RegistryError> {
        self.breaker.call(|| self.inner.reserve_tag(digest, tag))
    }
}
