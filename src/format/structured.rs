//! Structured formats: one adapter parameterized by a frame codec.
//!
//! A [`Codec`] knows how to cut the next frame out of the stream and how to
//! decode a frame into a record; [`Structured`] drives it and owns the
//! shared policy (terminal errors vs [`lenient`](Structured::lenient)
//! skipping). Shipped codecs are [`JsonLines`] and, behind the
//! `format-binary` feature, the length-prefixed [`Binary`] codec.

use crate::format::{read_frame, ByteSource, Deserializer, RecordFormat};
use crate::record::Record;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;

#[cfg(feature = "format-binary")]
use anyhow::anyhow;

/// Frame extraction and decoding for one wire format.
pub trait Codec<R>: Send + Clone + 'static {
    /// Cut the next frame out of the stream; `Ok(None)` is clean
    /// end-of-stream, `Err` a framing error. Framing errors are always
    /// terminal, even in lenient mode.
    fn next_frame(&self, src: &mut dyn BufRead) -> Result<Option<Vec<u8>>>;

    /// Decode one frame into a record.
    fn decode(&self, frame: &[u8]) -> Result<R>;
}

/// The structured format adapter: a [`Codec`] plus decode-error policy.
pub struct Structured<R, C> {
    codec: C,
    lenient: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R, C> Structured<R, C>
where
    R: Record,
    C: Codec<R>,
{
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            lenient: false,
            _record: PhantomData,
        }
    }

    /// Skip frames that fail to decode instead of aborting the stage.
    ///
    /// Each skipped frame is reported through `log::warn!`. Framing errors
    /// (a broken stream, not a broken frame) remain terminal.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }
}

impl<R, C> RecordFormat for Structured<R, C>
where
    R: Record,
    C: Codec<R>,
{
    type Record = R;
    type Reader = StructuredReader<R, C>;

    fn open(&self, src: ByteSource) -> Self::Reader {
        StructuredReader {
            src: BufReader::new(src),
            codec: self.codec.clone(),
            lenient: self.lenient,
            frame_no: 0,
            done: false,
            _record: PhantomData,
        }
    }
}

pub struct StructuredReader<R, C> {
    src: BufReader<ByteSource>,
    codec: C,
    lenient: bool,
    frame_no: u64,
    done: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R, C> StructuredReader<R, C>
where
    R: Record,
    C: Codec<R>,
{
    fn pull(&mut self) -> Result<Option<R>> {
        loop {
            let Some(frame) = self.codec.next_frame(&mut self.src)? else {
                return Ok(None);
            };
            self.frame_no += 1;
            match self.codec.decode(&frame) {
                Ok(record) => return Ok(Some(record)),
                Err(err) if self.lenient => {
                    log::warn!("skipping undecodable frame {}: {err:#}", self.frame_no);
                }
                Err(err) => {
                    return Err(err.context(format!("decode frame {}", self.frame_no)));
                }
            }
        }
    }
}

impl<R, C> Deserializer for StructuredReader<R, C>
where
    R: Record,
    C: Codec<R>,
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

/// JSON Lines codec: one JSON document per line.
///
/// Blank and whitespace-only lines are skipped. By default a leading
/// tab-delimited prefix - the Hadoop key-field convention for reduce-side
/// input - is stripped before the remainder is decoded; a literal tab cannot
/// occur inside a JSON document, so the strip never eats payload.
#[derive(Clone, Debug)]
pub struct JsonLines {
    strip_key_prefix: bool,
}

impl JsonLines {
    /// Decode whole lines without looking for a key prefix.
    pub fn keep_key_prefix(mut self) -> Self {
        self.strip_key_prefix = false;
        self
    }
}

impl Default for JsonLines {
    fn default() -> Self {
        Self {
            strip_key_prefix: true,
        }
    }
}

impl<R: DeserializeOwned + 'static> Codec<R> for JsonLines {
    fn next_frame(&self, src: &mut dyn BufRead) -> Result<Option<Vec<u8>>> {
        let mut frame = Vec::new();
        loop {
            if !read_frame(src, b'\n', &mut frame).context("read line")? {
                return Ok(None);
            }
            if !frame.iter().all(|b| b.is_ascii_whitespace()) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode(&self, frame: &[u8]) -> Result<R> {
        let payload = match self.strip_key_prefix {
            true => match frame.iter().position(|b| *b == b'\t') {
                Some(tab) => &frame[tab + 1..],
                None => frame,
            },
            false => frame,
        };
        serde_json::from_slice(payload).map_err(Into::into)
    }
}

/// A JSON Lines format over records of type `R`.
pub fn json_lines<R>() -> Structured<R, JsonLines>
where
    R: Record + DeserializeOwned,
{
    Structured::new(JsonLines::default())
}

/// Length-prefixed binary codec: each frame is a `u32` little-endian byte
/// length followed by a postcard-encoded payload.
#[cfg(feature = "format-binary")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Binary;

#[cfg(feature = "format-binary")]
impl<R: DeserializeOwned + 'static> Codec<R> for Binary {
    fn next_frame(&self, src: &mut dyn BufRead) -> Result<Option<Vec<u8>>> {
        // End-of-stream is only clean on a frame boundary.
        if src.fill_buf().context("read frame header")?.is_empty() {
            return Ok(None);
        }
        let mut header = [0u8; 4];
        src.read_exact(&mut header).context("frame header truncated")?;
        let len = u32::from_le_bytes(header) as usize;
        let mut frame = vec![0u8; len];
        src.read_exact(&mut frame).context("frame body truncated")?;
        Ok(Some(frame))
    }

    fn decode(&self, frame: &[u8]) -> Result<R> {
        postcard::from_bytes(frame).map_err(|e| anyhow!(e))
    }
}

/// A length-prefixed binary format over records of type `R`.
#[cfg(feature = "format-binary")]
pub fn binary<R>() -> Structured<R, Binary>
where
    R: Record + DeserializeOwned,
{
    Structured::new(Binary)
}

/// Encode one value as a length-prefixed binary frame, the write side of the
/// [`Binary`] codec.
#[cfg(feature = "format-binary")]
pub fn encode_frame<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(value).map_err(|e| anyhow!(e))?;
    let len = u32::try_from(payload.len()).context("frame larger than u32::MAX")?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
