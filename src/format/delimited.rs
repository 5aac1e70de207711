//! Delimiter-framed format: split the stream on a byte delimiter and hand
//! each frame to a caller-supplied constructor.

use crate::format::{read_frame, ByteSource, Deserializer, RecordFormat};
use crate::record::Record;
use anyhow::{Context, Result};
use std::io::BufReader;
use std::marker::PhantomData;

/// A format that frames records on an arbitrary byte delimiter.
///
/// The default delimiter is `\n`, matching the Hadoop Streaming line
/// protocol; a trailing `\r` is stripped from each frame and a final frame
/// without a terminating delimiter is still delivered. Each frame's bytes are
/// passed to the constructor closure, whose error aborts the stage run.
///
/// ```ignore
/// let format = Delimited::new(|frame: &[u8]| {
///     let text = std::str::from_utf8(frame)?;
///     let (key, value) = text.split_once(':').context("missing ':'")?;
///     Ok(Count { key: key.into(), value: value.parse()? })
/// });
/// ```
pub struct Delimited<R, F> {
    delimiter: u8,
    parse: F,
    _record: PhantomData<fn() -> R>,
}

impl<R, F> Delimited<R, F>
where
    R: Record,
    F: Fn(&[u8]) -> Result<R> + Send + Clone + 'static,
{
    pub fn new(parse: F) -> Self {
        Self {
            delimiter: b'\n',
            parse,
            _record: PhantomData,
        }
    }

    /// Frame on `delimiter` instead of `\n`.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl<R, F> RecordFormat for Delimited<R, F>
where
    R: Record,
    F: Fn(&[u8]) -> Result<R> + Send + Clone + 'static,
{
    type Record = R;
    type Reader = DelimitedReader<R, F>;

    fn open(&self, src: ByteSource) -> Self::Reader {
        DelimitedReader {
            src: BufReader::new(src),
            delimiter: self.delimiter,
            parse: self.parse.clone(),
            frame_no: 0,
            done: false,
            _record: PhantomData,
        }
    }
}

pub struct DelimitedReader<R, F> {
    src: BufReader<ByteSource>,
    delimiter: u8,
    parse: F,
    frame_no: u64,
    done: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R, F> DelimitedReader<R, F>
where
    R: Record,
    F: Fn(&[u8]) -> Result<R>,
{
    fn pull(&mut self) -> Result<Option<R>> {
        let mut frame = Vec::new();
        if !read_frame(&mut self.src, self.delimiter, &mut frame)
            .with_context(|| format!("read frame {}", self.frame_no + 1))?
        {
            return Ok(None);
        }
        self.frame_no += 1;
        let record =
            (self.parse)(&frame).with_context(|| format!("parse frame {}", self.frame_no))?;
        Ok(Some(record))
    }
}

impl<R, F> Deserializer for DelimitedReader<R, F>
where
    R: Record,
    F: Fn(&[u8]) -> Result<R>,
{
    type Record = R;

    fn next_record(&mut self) -> Result<Option<R>> {
        if self.done {
            return Ok(None);
        }
        match self.pull() {
            Ok(Some(record)) => Ok(Some(record)),
            terminal => {
                self.done = true;
                terminal
            }
        }
    }
}
