//! Fixtures and helpers for writing pipeline tests.
//!
//! The fixture records cover the capability tiers the stages care about:
//! [`WordCount`] sums, [`DoubledCount`] sums and finalizes, [`Label`]
//! carries no capabilities at all, and [`PositiveCount`] exercises the
//! filter path. Helpers drain stages into strings and build throwaway
//! line files.

use crate::format::delimited::Delimited;
use crate::format::RecordFormat;
use crate::record::{Caps, Record};
use crate::stage::Stage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// The canonical keyed-count fixture: sums values per key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WordCount {
    pub key: String,
    pub value: u64,
}

impl Record for WordCount {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        self.value.to_string()
    }

    fn caps() -> Caps<Self> {
        Caps::new().with_sum(|acc, other| acc.value += other.value)
    }
}

/// Sums values per key, then doubles the summed value on finalize.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoubledCount {
    pub key: String,
    pub value: u64,
}

impl Record for DoubledCount {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        self.value.to_string()
    }

    fn caps() -> Caps<Self> {
        Caps::<Self>::new()
            .with_sum(|acc, other| acc.value += other.value)
            .with_finalize(|r| (r.value * 2).to_string())
    }
}

/// A record with no optional capabilities: not aggregable, not finalizable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Record for Label {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        self.value.clone()
    }
}

/// Sums like [`WordCount`] but filters out non-positive values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositiveCount {
    pub key: String,
    pub value: i64,
}

impl Record for PositiveCount {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        self.value.to_string()
    }

    fn filter(&self) -> bool {
        self.value > 0
    }

    fn caps() -> Caps<Self> {
        Caps::new().with_sum(|acc, other| acc.value += other.value)
    }
}

/// A `key\tvalue` line format over [`WordCount`] records - the shape a
/// downstream stage sees after an upstream stage has emitted Hadoop
/// Streaming lines.
pub fn tab_counts() -> impl RecordFormat<Record = WordCount> {
    Delimited::new(|frame: &[u8]| {
        let text = std::str::from_utf8(frame)?;
        let (key, value) = text.split_once('\t').context("missing tab separator")?;
        Ok(WordCount {
            key: key.to_string(),
            value: value.parse().context("value is not an integer")?,
        })
    })
}

/// An in-memory byte source over owned text.
pub fn byte_source(text: &str) -> Cursor<Vec<u8>> {
    Cursor::new(text.as_bytes().to_vec())
}

/// Drain a fully wired stage into a string.
pub fn drain_to_string(stage: impl Stage) -> Result<String> {
    let mut out = Vec::new();
    stage.drain(&mut out)?;
    Ok(String::from_utf8(out)?)
}

/// Assert two outputs contain the same lines, ignoring order.
///
/// # Panics
///
/// Panics if the line sets differ.
pub fn assert_lines_set_equal(actual: &str, expected: &[&str]) {
    let mut got: Vec<&str> = actual.lines().collect();
    let mut want: Vec<&str> = expected.to_vec();
    got.sort_unstable();
    want.sort_unstable();
    assert_eq!(got, want, "line sets differ");
}

/// A temporary newline-terminated text file, deleted on drop.
pub struct TempLinesFile {
    file: NamedTempFile,
}

impl TempLinesFile {
    /// Create a temporary file holding `lines`, each newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn new(lines: &[&str]) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open the file as a fresh read handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(&self) -> io::Result<File> {
        File::open(self.path())
    }
}
