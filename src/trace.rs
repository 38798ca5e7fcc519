//! Optional per-decay diagnostic trace.
//!
//! The trace is append-only and best effort: a failed write is logged and
//! dropped, never surfaced to the process that produced the record.

use crate::decay::DecayBranch;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

/// One decay as recorded in the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayRecord {
    pub first_theta: f64,
    pub second_theta: f64,
    /// Daughter energies [eV]
    pub first_energy: f64,
    pub second_energy: f64,
    pub branch: DecayBranch,
    /// Daughter weights, zero when the pair was dropped
    pub first_weight: f64,
    pub second_weight: f64,
    pub parent_weight: f64,
    pub secondaries: usize,
    pub parent_energy: f64,
}

/// Receiver of diagnostic records
pub trait DiagnosticSink: Debug + Send + Sync {
    fn record_decay(&self, record: &DecayRecord);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record_decay(&self, _record: &DecayRecord) {}
}

/// Writes one JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonLinesSink {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(err) = writer.flush() {
                warn!(%err, "failed to flush diagnostic trace");
            }
        }
    }
}

impl DiagnosticSink for JsonLinesSink {
    fn record_decay(&self, record: &DecayRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "failed to encode decay record");
                return;
            }
        };
        match self.writer.lock() {
            Ok(mut writer) => {
                if let Err(err) = writeln!(writer, "{}", line) {
                    warn!(%err, "failed to write decay record");
                }
            }
            Err(_) => warn!("diagnostic trace writer poisoned, record dropped"),
        }
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        self.flush();
    }
}
