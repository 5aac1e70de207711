//! Hadoop Streaming line emission.
//!
//! Output is UTF-8 text, one `key + separator + value + "\n"` line per
//! record, tab-separated unless a stage was configured otherwise. An empty
//! key still emits the separator - the framing must be reproduced
//! bit-for-bit for the consuming shuffle.

use crate::record::{Caps, Record};
use std::io::{self, BufWriter, Write};

/// Line writer shared by the stages.
///
/// Lines are assembled in full before they reach the underlying writer, so a
/// stage abort can never leave a partially written line in the buffer; the
/// buffer itself only ever holds complete lines.
pub struct Emitter<'a> {
    out: BufWriter<&'a mut dyn Write>,
    sep: &'a [u8],
    line: Vec<u8>,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a mut dyn Write, sep: &'a [u8]) -> Self {
        Self {
            out: BufWriter::new(sink),
            sep,
            line: Vec::new(),
        }
    }

    /// Write one `key`/`value` line.
    pub fn kv(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.line.clear();
        self.line.extend_from_slice(key.as_bytes());
        self.line.extend_from_slice(self.sep);
        self.line.extend_from_slice(value.as_bytes());
        self.line.push(b'\n');
        self.out.write_all(&self.line)
    }

    /// Write one record: record-owned serialization when the type carries the
    /// `emit` capability, the `key`/`value` line format otherwise.
    pub fn record<R: Record>(&mut self, record: &R, caps: &Caps<R>) -> io::Result<()> {
        match caps.emit {
            Some(emit) => {
                self.line.clear();
                emit(record, &mut self.line)?;
                self.out.write_all(&self.line)
            }
            None => self.kv(record.key(), &record.value()),
        }
    }

    /// Flush everything buffered. Must be called before the emitter is
    /// dropped; dropping without finishing would swallow flush errors.
    pub fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}
