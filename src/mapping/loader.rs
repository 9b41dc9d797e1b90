//! Mapping file loading.
//!
//! # Responsibilities
//! - Read the mapping source in full
//! - Parse one `<path-key> <destination>` pair per line
//! - Report malformed lines, undecodable lines and duplicate keys without aborting
//!
//! # Line Rules
//! - Surrounding whitespace is trimmed
//! - Blank lines and lines starting with `#` are skipped, whatever their encoding
//! - Any other line must be UTF-8
//! - The rest must split on a single space into exactly two fields
//! - Keys are lower-cased; destinations keep their case
//! - A repeated key overwrites the earlier value and is reported

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use thiserror::Error;

use crate::mapping::snapshot::MappingSnapshot;
use crate::observability::metrics;

/// The mapping source could not be read at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read mapping file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background load task did not run to completion.
    #[error("loading {} did not complete: {reason}", path.display())]
    Interrupted { path: PathBuf, reason: String },
}

/// A recoverable data-quality problem found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Line did not split into exactly two fields.
    Malformed { line: usize, content: String },
    /// Key seen before; this line's destination wins.
    DuplicateKey { line: usize, key: String },
    /// Destination contains bytes that cannot appear in a `Location` header.
    InvalidDestination { line: usize, key: String },
    /// Line is not valid UTF-8.
    InvalidEncoding { line: usize },
}

impl Anomaly {
    /// 1-based line number in the source.
    pub fn line(&self) -> usize {
        match self {
            Anomaly::Malformed { line, .. }
            | Anomaly::DuplicateKey { line, .. }
            | Anomaly::InvalidDestination { line, .. }
            | Anomaly::InvalidEncoding { line } => *line,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::Malformed { .. } => "malformed",
            Anomaly::DuplicateKey { .. } => "duplicate_key",
            Anomaly::InvalidDestination { .. } => "invalid_destination",
            Anomaly::InvalidEncoding { .. } => "invalid_encoding",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Malformed { line, content } => {
                write!(f, "line {line}: skipping malformed line {content:?}")
            }
            Anomaly::DuplicateKey { line, key } => write!(f, "line {line}: duplicate key {key}"),
            Anomaly::InvalidDestination { line, key } => {
                write!(f, "line {line}: destination for {key} is not a valid header value")
            }
            Anomaly::InvalidEncoding { line } => write!(f, "line {line}: not valid UTF-8"),
        }
    }
}

/// Result of a successful load: a best-effort snapshot and what was wrong with
/// the source.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub snapshot: MappingSnapshot,
    pub anomalies: Vec<Anomaly>,
}

impl LoadOutcome {
    /// Number of mappings in the snapshot.
    pub fn entries(&self) -> usize {
        self.snapshot.len()
    }
}

/// Reads a mapping file into fresh snapshots.
#[derive(Debug, Clone)]
pub struct MappingLoader {
    path: PathBuf,
}

impl MappingLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the source, logging every anomaly and the final count.
    pub fn load(&self) -> Result<LoadOutcome, LoadError> {
        let content = fs::read(&self.path).map_err(|source| LoadError::Read {
            path: self.path.clone(),
            source,
        })?;

        let outcome = Self::parse_bytes(content.split(|&b| b == b'\n'));

        for anomaly in &outcome.anomalies {
            match anomaly {
                Anomaly::Malformed { line, content } => {
                    tracing::warn!(path = %self.path.display(), line, content = %content, "Skipping malformed line");
                }
                Anomaly::DuplicateKey { line, key } => {
                    tracing::warn!(path = %self.path.display(), line, key = %key, "Duplicate key; later entry wins");
                }
                Anomaly::InvalidDestination { line, key } => {
                    tracing::warn!(path = %self.path.display(), line, key = %key, "Skipping destination that is not a valid header value");
                }
                Anomaly::InvalidEncoding { line } => {
                    tracing::warn!(path = %self.path.display(), line, "Skipping line that is not valid UTF-8");
                }
            }
            metrics::record_anomaly(anomaly.kind());
        }

        tracing::info!(
            path = %self.path.display(),
            entries = outcome.entries(),
            anomalies = outcome.anomalies.len(),
            "Loaded mappings"
        );

        Ok(outcome)
    }

    /// Build a snapshot from a sequence of lines. Never fails.
    pub fn parse<'a, I>(lines: I) -> LoadOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::parse_bytes(lines.into_iter().map(str::as_bytes))
    }

    /// Build a snapshot from raw lines, as read from disk. Never fails.
    pub fn parse_bytes<'a, I>(lines: I) -> LoadOutcome
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut snapshot = MappingSnapshot::empty();
        let mut anomalies = Vec::new();

        for (index, raw) in lines.into_iter().enumerate() {
            let line = index + 1;
            if is_blank_or_comment(raw) {
                continue;
            }
            let Ok(decoded) = std::str::from_utf8(raw) else {
                anomalies.push(Anomaly::InvalidEncoding { line });
                continue;
            };

            let trimmed = decoded.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(' ').collect();
            let [key, destination] = fields.as_slice() else {
                anomalies.push(Anomaly::Malformed {
                    line,
                    content: trimmed.to_string(),
                });
                continue;
            };

            let key = key.trim().to_lowercase();
            let destination = destination.trim();

            if HeaderValue::from_bytes(destination.as_bytes()).is_err() {
                anomalies.push(Anomaly::InvalidDestination { line, key });
                continue;
            }

            if snapshot.insert(key.clone(), destination.to_string()).is_some() {
                anomalies.push(Anomaly::DuplicateKey { line, key });
            }
        }

        LoadOutcome { snapshot, anomalies }
    }
}

fn is_blank_or_comment(raw: &[u8]) -> bool {
    match raw.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&first) => first == b'#',
        None => true,
    }
}
