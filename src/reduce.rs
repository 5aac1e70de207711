//! Reduce stage: streaming grouped aggregation over key-sorted input.
//!
//! Grouping is purely adjacency-based: the stage holds exactly one group
//! accumulator and closes the group whenever the incoming key differs.
//! Records with equal keys that arrive non-adjacently therefore form separate
//! groups - establishing adjacency is the job of the upstream sort or
//! shuffle, and the stage makes no attempt to verify it.

use crate::emit::Emitter;
use crate::format::{Deserializer, RecordFormat};
use crate::record::{Caps, Record};
use crate::stage::{Stage, StageIo};
use anyhow::{Context, Result};
use std::io::{self, Write};

/// Folds each maximal run of adjacent equal-key records into one output line.
pub struct ReduceStage<F: RecordFormat> {
    format: F,
    sep: Vec<u8>,
    io: StageIo,
}

impl<F: RecordFormat> ReduceStage<F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            sep: b"\t".to_vec(),
            io: StageIo::new(),
        }
    }

    /// Use `sep` between key and value instead of the default tab.
    pub fn separator(mut self, sep: &str) -> Self {
        self.sep = sep.as_bytes().to_vec();
        self
    }
}

impl<F: RecordFormat> Stage for ReduceStage<F> {
    fn run(&mut self, sink: &mut dyn Write) -> Result<()> {
        let reader = self.io.take_reader();
        let mut de = self.format.open(Box::new(reader));
        let caps = F::Record::caps();
        let mut emitter = Emitter::new(sink, &self.sep);
        let transformed = (|| -> Result<()> {
            let mut prev: Option<F::Record> = None;
            while let Some(curr) = de.next_record()? {
                // Filtered records are skipped without touching the open group.
                if !curr.filter() {
                    continue;
                }
                let Some(acc) = prev.as_mut() else {
                    prev = Some(curr);
                    continue;
                };
                if acc.key() == curr.key() {
                    match caps.sum {
                        Some(sum) => sum(acc, curr),
                        // Not aggregable: the first record of the run wins.
                        None => log::debug!(
                            "record type cannot sum; dropping duplicate of key {:?}",
                            curr.key()
                        ),
                    }
                } else if let Some(done) = prev.replace(curr) {
                    emit_group(&mut emitter, &done, &caps)?;
                }
            }
            if let Some(last) = prev.take() {
                emit_group(&mut emitter, &last, &caps)?;
            }
            Ok(())
        })();
        let flushed = emitter.finish();
        transformed?;
        flushed.context("flush reduce output")?;
        Ok(())
    }

    fn io(&mut self) -> &mut StageIo {
        &mut self.io
    }
}

/// Emit one completed group: the finalized value when the type supports
/// finalization, its plain emission otherwise.
fn emit_group<R: Record>(emitter: &mut Emitter, record: &R, caps: &Caps<R>) -> io::Result<()> {
    match caps.finalize {
        Some(finalize) => emitter.kv(record.key(), &finalize(record)),
        None => emitter.record(record, caps),
    }
}
