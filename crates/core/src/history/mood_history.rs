//! Rolling record of detections, exportable as CSV.

use std::collections::VecDeque;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::emotion::domain::detection_result::DetectionResult;

pub const CSV_HEADER: &str = "time,emotion,confidence";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to write history to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub result: DetectionResult,
}

impl HistoryEntry {
    pub fn time_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{},{}",
            self.time_string(),
            self.result.label(),
            format_confidence(self.result.confidence())
        )
    }
}

/// Whole numbers keep one decimal so the column always reads as a float.
fn format_confidence(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Detections in arrival order, optionally capped to the most recent
/// `max_entries`.
#[derive(Clone, Debug, Default)]
pub struct MoodHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: Option<usize>,
}

impl MoodHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that drops its oldest entry once `max_entries` is reached.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: Some(max_entries.max(1)),
        }
    }

    pub fn record(&mut self, result: DetectionResult) {
        self.push(HistoryEntry {
            timestamp: Local::now(),
            result,
        });
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if let Some(max) = self.max_entries {
            while self.entries.len() >= max {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// Write every entry to `path` as CSV, replacing any existing file.
    ///
    /// Returns the number of rows written. An empty history writes nothing
    /// and leaves an existing file untouched.
    pub fn save_csv(&self, path: &Path) -> Result<usize, HistoryError> {
        if self.entries.is_empty() {
            return Ok(0);
        }
        let write_err = |source| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = fs::File::create(path).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{CSV_HEADER}").map_err(write_err)?;
        for entry in &self.entries {
            writeln!(out, "{}", entry.csv_row()).map_err(write_err)?;
        }
        out.flush().map_err(write_err)?;

        log::info!("Saved {} history rows to {}", self.entries.len(), path.display());
        Ok(self.entries.len())
    }
}
