//! Map stage: filter and serialize records one-to-one.

use crate::emit::Emitter;
use crate::format::{Deserializer, RecordFormat};
use crate::record::Record;
use crate::stage::{Stage, StageIo};
use anyhow::{Context, Result};
use std::io::Write;

/// Emits one output line per record passing its filter, in input order,
/// buffering nothing beyond the record in flight.
pub struct MapStage<F: RecordFormat> {
    format: F,
    sep: Vec<u8>,
    io: StageIo,
}

impl<F: RecordFormat> MapStage<F> {
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

impl<F: RecordFormat> Stage for MapStage<F> {
    fn run(&mut self, sink: &mut dyn Write) -> Result<()> {
        let reader = self.io.take_reader();
        let mut de = self.format.open(Box::new(reader));
        let caps = F::Record::caps();
        let mut emitter = Emitter::new(sink, &self.sep);
        let transformed = (|| -> Result<()> {
            while let Some(record) = de.next_record()? {
                if !record.filter() {
                    continue;
                }
                emitter.record(&record, &caps)?;
            }
            Ok(())
        })();
        let flushed = emitter.finish();
        transformed?;
        flushed.context("flush map output")?;
        Ok(())
    }

    fn io(&mut self) -> &mut StageIo {
        &mut self.io
    }
}
