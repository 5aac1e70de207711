//! Merge stage: N-way fan-in of line-framed byte sources.
//!
//! One reader thread per source pushes lines onto a shared unbounded
//! channel; the drain loop appends each line plus a newline to the sink.
//! Interleaving across sources is deliberately unordered - the only
//! guarantees are that every line from every source is emitted exactly once
//! and that the stage does not return before every reader has finished and
//! everything is flushed.

use crate::format::read_frame;
use crate::stage::{Stage, StageIo};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::unbounded;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::thread;

/// Best-effort fan-in of multiple line streams into one.
///
/// Sources are added with [`source`](MergeStage::source); a merge that has
/// additionally been [`feed`](Stage::feed)-attached (or chained after
/// another stage) drains its own pipe as one more source, so it can sit in
/// the middle of a pipeline.
pub struct MergeStage {
    sources: Vec<Box<dyn Read + Send>>,
    io: StageIo,
}

impl MergeStage {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            io: StageIo::new(),
        }
    }

    /// Add one line-framed input source.
    pub fn source(mut self, src: impl Read + Send + 'static) -> Self {
        self.sources.push(Box::new(src));
        self
    }
}

impl Default for MergeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for MergeStage {
    fn run(&mut self, sink: &mut dyn Write) -> Result<()> {
        let mut sources = std::mem::take(&mut self.sources);
        if self.io.is_fed() {
            sources.push(Box::new(self.io.take_reader()));
        }

        let (tx, rx) = unbounded::<Vec<u8>>();
        let mut readers = Vec::with_capacity(sources.len());
        for src in sources {
            let tx = tx.clone();
            readers.push(thread::spawn(move || -> io::Result<()> {
                let mut src = BufReader::new(src);
                let mut line = Vec::new();
                loop {
                    if !read_frame(&mut src, b'\n', &mut line)? {
                        return Ok(());
                    }
                    // Receiver gone: the drain loop stopped on a write error.
                    if tx.send(std::mem::take(&mut line)).is_err() {
                        return Ok(());
                    }
                }
            }));
        }
        // The drain loop ends once every reader has dropped its sender.
        drop(tx);

        let mut out = BufWriter::new(sink);
        let mut wrote: io::Result<()> = Ok(());
        for mut line in rx {
            line.push(b'\n');
            if let Err(err) = out.write_all(&line) {
                wrote = Err(err);
                break;
            }
        }
        let flushed = out.flush();

        let mut first: Option<anyhow::Error> = None;
        for (index, handle) in readers.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    first.get_or_insert(
                        anyhow::Error::new(err)
                            .context(format!("merge source {index} read failed")),
                    );
                }
                Err(_) => {
                    first.get_or_insert(anyhow!("merge source {index} thread panicked"));
                }
            }
        }
        wrote.context("write merge output")?;
        flushed.context("flush merge output")?;
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn io(&mut self) -> &mut StageIo {
        &mut self.io
    }
}
