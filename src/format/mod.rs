//! The deserialization boundary between raw bytes and [`Record`]s.
//!
//! A [`RecordFormat`] is the factory a stage is constructed with; when the
//! stage starts running it hands the factory its own read end and gets back a
//! [`Deserializer`], a pull iterator over decoded records. Format adapters
//! are interchangeable behind these two traits and the stage engine never
//! special-cases one.

use crate::record::Record;
use anyhow::Result;
use std::io::{self, BufRead, Read};

pub mod columnar;
pub mod delimited;
pub mod structured;

/// A boxed byte source handed to a format when a stage starts running.
pub type ByteSource = Box<dyn Read + Send>;

/// Pull iterator turning a byte stream into records.
///
/// `Ok(Some(record))` yields the next record, `Ok(None)` is clean
/// end-of-stream, and `Err` is the terminal framing or decode error. After
/// either terminal outcome the reader is exhausted; further calls return
/// `Ok(None)`.
pub trait Deserializer {
    type Record: Record;

    fn next_record(&mut self) -> Result<Option<Self::Record>>;
}

/// Factory producing a [`Deserializer`] over a byte source.
///
/// Stages store the format and apply it to their own read end when they run,
/// so one configured format can be handed to any stage in a pipeline.
pub trait RecordFormat: Send + 'static {
    type Record: Record;
    type Reader: Deserializer<Record = Self::Record>;

    fn open(&self, src: ByteSource) -> Self::Reader;
}

/// Read one delimiter-terminated frame into `buf`, stripping the delimiter
/// and a trailing carriage return. Returns `false` at end-of-stream.
///
/// A final frame without a terminating delimiter is still delivered.
pub(crate) fn read_frame(src: &mut dyn BufRead, delim: u8, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let n = src.read_until(delim, buf)?;
    if n == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&delim) {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(true)
}
