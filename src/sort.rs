//! Sort stage: total in-memory reordering by key.

use crate::emit::Emitter;
use crate::format::{Deserializer, RecordFormat};
use crate::record::Record;
use crate::stage::{Stage, StageIo};
use anyhow::{Context, Result};
use std::io::Write;

/// Buffers every record passing its filter, sorts by key, and emits in
/// order. The sort is stable, so equal keys keep their input order - they
/// stay semantically meaningful to a downstream [`ReduceStage`].
///
/// The whole input is held in memory; there is no spill path. For inputs
/// beyond memory, sorting belongs to the external shuffle.
///
/// [`ReduceStage`]: crate::reduce::ReduceStage
pub struct SortStage<F: RecordFormat> {
    format: F,
    sep: Vec<u8>,
    io: StageIo,
}

impl<F: RecordFormat> SortStage<F> {
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

impl<F: RecordFormat> Stage for SortStage<F> {
    fn run(&mut self, sink: &mut dyn Write) -> Result<()> {
        let reader = self.io.take_reader();
        let mut de = self.format.open(Box::new(reader));
        let caps = F::Record::caps();
        let mut records: Vec<F::Record> = Vec::new();
        while let Some(record) = de.next_record()? {
            if record.filter() {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.key().cmp(b.key()));
        let mut emitter = Emitter::new(sink, &self.sep);
        let transformed = (|| -> Result<()> {
            for record in &records {
                emitter.record(record, &caps)?;
            }
            Ok(())
        })();
        let flushed = emitter.finish();
        transformed?;
        flushed.context("flush sort output")?;
        Ok(())
    }

    fn io(&mut self) -> &mut StageIo {
        &mut self.io
    }
}
