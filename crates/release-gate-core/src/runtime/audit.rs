// crates/release-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Release Gate Audit Trails
// Description: In-memory and JSON-lines implementations of the audit trail.
// Purpose: Persist promotion and rollback records append-only.
// Dependencies: crate::core, crate::interfaces, serde, serde_json
// ============================================================================

//! ## Overview
//! Records are appended once and never rewritten. [`JsonlAuditTrail`] writes
//! one tagged JSON object per line and replays the file when reopened, so
//! rollback history and impact analysis survive restarts. A corrupt line is
//! rejected on open rather than skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use crate::core::records::PromotionRecord;
use crate::core::records::RollbackRecord;
use crate::interfaces::AuditError;
use crate::interfaces::AuditTrail;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Records held in memory by both trail implementations.
#[derive(Debug, Default, Clone)]
struct AuditRecords {
    /// Promotion records in append order.
    promotions: Vec<PromotionRecord>,
    /// Rollback records in append order.
    rollbacks: Vec<RollbackRecord>,
}

/// Single JSON-lines audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AuditEntry {
    /// Promotion attempt.
    Promotion(PromotionRecord),
    /// Rollback.
    Rollback(RollbackRecord),
}

// ============================================================================
// SECTION: In-Memory Trail
// ============================================================================

/// In-memory audit trail for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditTrail {
    /// Records shared between clones.
    records: Arc<Mutex<AuditRecords>>,
}

impl InMemoryAuditTrail {
    /// Creates an empty audit trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the records.
    fn lock(&self) -> Result<MutexGuard<'_, AuditRecords>, AuditError> {
        self.records.lock().map_err(|_| AuditError::Store("audit trail mutex poisoned".to_string()))
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn append_promotion(&self, record: &PromotionRecord) -> Result<(), AuditError> {
        self.lock()?.promotions.push(record.clone());
        Ok(())
    }

    fn append_rollback(&self, record: &RollbackRecord) -> Result<(), AuditError> {
        self.lock()?.rollbacks.push(record.clone());
        Ok(())
    }

    fn promotions(&self) -> Result<Vec<PromotionRecord>, AuditError> {
        Ok(self.lock()?.promotions.clone())
    }

    fn rollbacks(&self) -> Result<Vec<RollbackRecord>, AuditError> {
        Ok(self.lock()?.rollbacks.clone())
    }
}

// ============================================================================
// SECTION: JSON-Lines Trail
// ============================================================================

/// Append handle and replayed records.
#[derive(Debug)]
struct JsonlState {
    /// File opened in append mode.
    file: File,
    /// Records replayed on open plus records appended since.
    records: AuditRecords,
}

/// Append-only audit trail backed by a JSON-lines file.
#[derive(Debug)]
pub struct JsonlAuditTrail {
    /// Path of the audit file.
    path: PathBuf,
    /// File handle and record cache.
    state: Mutex<JsonlState>,
}

impl JsonlAuditTrail {
    /// Opens (or creates) the audit file and replays existing entries.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] when the file cannot be opened and
    /// [`AuditError::Corrupt`] when an existing line does not parse.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let records = if path.exists() { replay(path)? } else { AuditRecords::default() };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AuditError::Io(err.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(JsonlState {
                file,
                records,
            }),
        })
    }

    /// Returns the audit file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes and appends one entry, then caches it.
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(&entry).map_err(|err| AuditError::Store(err.to_string()))?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| AuditError::Store("audit trail mutex poisoned".to_string()))?;
        writeln!(state.file, "{line}").map_err(|err| AuditError::Io(err.to_string()))?;
        state.file.flush().map_err(|err| AuditError::Io(err.to_string()))?;
        match entry {
            AuditEntry::Promotion(record) => state.records.promotions.push(record),
            AuditEntry::Rollback(record) => state.records.rollbacks.push(record),
        }
        Ok(())
    }

    /// Returns a snapshot of the cached records.
    fn snapshot(&self) -> Result<AuditRecords, AuditError> {
        self.state
            .lock()
            .map(|state| state.records.clone())
            .map_err(|_| AuditError::Store("audit trail mutex poisoned".to_string()))
    }
}

/// Replays every entry in an existing audit file.
fn replay(path: &Path) -> Result<AuditRecords, AuditError> {
    let file = File::open(path).map_err(|err| AuditError::Io(err.to_string()))?;
    let mut records = AuditRecords::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| AuditError::Io(err.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line)
            .map_err(|err| AuditError::Corrupt(format!("line {}: {err}", index + 1)))?;
        match entry {
            AuditEntry::Promotion(record) => records.promotions.push(record),
            AuditEntry::Rollback(record) => records.rollbacks.push(record),
        }
    }
    Ok(records)
}

impl AuditTrail for JsonlAuditTrail {
    fn append_promotion(&self, record: &PromotionRecord) -> Result<(), AuditError> {
        self.append(AuditEntry::Promotion(record.clone()))
    }

    fn append_rollback(&self, record: &RollbackRecord) -> Result<(), AuditError> {
        self.append(AuditEntry::Rollback(record.clone()))
    }

    fn promotions(&self) -> Result<Vec<PromotionRecord>, AuditError> {
        Ok(self.snapshot()?.promotions)
    }

    fn rollbacks(&self) -> Result<Vec<RollbackRecord>, AuditError> {
        Ok(self.snapshot()?.rollbacks)
    }
}
