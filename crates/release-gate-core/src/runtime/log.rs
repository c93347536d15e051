// crates/release-gate-core/src/runtime/log.rs
// ============================================================================
// Module: Release Gate Controller Logging
// Description: Structured log events and JSON-lines sinks.
// Purpose: Emit controller, breaker, and delivery events without a global logger.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Components report notable events as [`ControllerLogEvent`] values to a
//! [`ControllerLogSink`]. Sinks serialize events as JSON lines so deployments
//! can route them to their own pipeline. Event payloads never include
//! artifact content, bundles, or credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structured controller log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerLogEvent {
    /// Event identifier (e.g. `promotion`, `circuit_breaker`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Outcome label.
    pub outcome: &'static str,
    /// Environment, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Artifact tag, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Operator identity, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Sanitized detail message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Trace correlation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ControllerLogEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str, outcome: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            outcome,
            environment: None,
            tag: None,
            operator: None,
            detail: None,
            trace_id: None,
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl ToString) -> Self {
        self.environment = Some(environment.to_string());
        self
    }

    /// Sets the artifact tag.
    #[must_use]
    pub fn tag(mut self, tag: impl ToString) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Sets the operator.
    #[must_use]
    pub fn operator(mut self, operator: impl ToString) -> Self {
        self.operator = Some(operator.to_string());
        self
    }

    /// Sets the detail message.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the trace identifier.
    #[must_use]
    pub fn trace_id(mut self, trace_id: impl ToString) -> Self {
        self.trace_id = Some(trace_id.to_string());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for controller log events.
pub trait ControllerLogSink: Send + Sync {
    /// Records a log event.
    fn record(&self, event: &ControllerLogEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Log sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl ControllerLogSink for StderrLogSink {
    fn record(&self, event: &ControllerLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Log sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ControllerLogSink for FileLogSink {
    fn record(&self, event: &ControllerLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op log sink.
pub struct NoopLogSink;

impl ControllerLogSink for NoopLogSink {
    fn record(&self, _event: &ControllerLogEvent) {}
}

/// Log sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    /// Recorded events.
    events: Mutex<Vec<ControllerLogEvent>>,
}

impl MemoryLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ControllerLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns recorded events with the given identifier.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<ControllerLogEvent> {
        self.events().into_iter().filter(|event| event.event == name).collect()
    }
}

impl ControllerLogSink for MemoryLogSink {
    fn record(&self, event: &ControllerLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
