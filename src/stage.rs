//! The stage contract and the plumbing every stage shares.
//!
//! A stage is simultaneously the end of the previous stage and the start of
//! the next: it owns a [`pipe`](crate::pipe::pipe) whose write end receives
//! its input bytes and whose read end feeds its own deserializer. Chaining
//! stages with [`then`](Stage::then) spawns one thread per stage; the
//! rendezvous pipes between them provide backpressure, and
//! [`drain`](Stage::drain) joins every spawned thread before returning so no
//! background failure is lost and no thread outlives the call.

use crate::pipe::{pipe, PipeReader, PipeWriter};
use anyhow::{anyhow, Result};
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

/// Pipe ends and background threads owned by a stage.
pub struct StageIo {
    writer: Option<PipeWriter>,
    reader: Option<PipeReader>,
    feeder: Option<JoinHandle<io::Result<u64>>>,
    upstream: Vec<JoinHandle<Result<()>>>,
    fed: bool,
}

impl StageIo {
    pub(crate) fn new() -> Self {
        let (reader, writer) = pipe();
        Self {
            writer: Some(writer),
            reader: Some(reader),
            feeder: None,
            upstream: Vec::new(),
            fed: false,
        }
    }

    /// Start the background copy from `src` into this stage's write end.
    /// The write end is closed when the copy finishes, signalling
    /// end-of-input downstream.
    fn attach(&mut self, mut src: impl Read + Send + 'static) {
        let mut writer = self.take_writer();
        self.feeder = Some(thread::spawn(move || {
            let copied = io::copy(&mut src, &mut writer);
            writer.close();
            copied
        }));
    }

    /// Hand out the write end so an upstream stage can produce into it.
    pub(crate) fn take_writer(&mut self) -> PipeWriter {
        self.fed = true;
        self.writer.take().expect("stage input already attached")
    }

    pub(crate) fn take_reader(&mut self) -> PipeReader {
        self.reader.take().expect("stage already running")
    }

    pub(crate) fn add_upstream(&mut self, handle: JoinHandle<Result<()>>) {
        self.upstream.push(handle);
    }

    /// Whether any input has been attached to this stage.
    pub(crate) fn is_fed(&self) -> bool {
        self.fed
    }

    /// Join the feeder and every upstream stage thread, surfacing the first
    /// failure. Broken-pipe failures are discounted: they mean the consumer
    /// side stopped first, and the consumer's own error is the one reported.
    fn finish(&mut self) -> Result<()> {
        let mut first: Option<anyhow::Error> = None;
        if let Some(handle) = self.feeder.take() {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => {
                    first.get_or_insert(anyhow::Error::new(err).context("stage input copy failed"));
                }
                Err(_) => {
                    first.get_or_insert(anyhow!("stage input thread panicked"));
                }
            }
        }
        for handle in self.upstream.drain(..) {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) if is_broken_pipe(&err) => {}
                Ok(Err(err)) => {
                    first.get_or_insert(err);
                }
                Err(_) => {
                    first.get_or_insert(anyhow!("upstream stage thread panicked"));
                }
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.root_cause()
        .downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
}

/// One pipeline unit: a byte sink for its upstream, a transform over its own
/// decoded records, and a byte source for its downstream.
pub trait Stage: Sized + Send + 'static {
    /// Run the transform against `sink`, consuming the stage's read end.
    /// Blocks until input is exhausted or a terminal error occurs.
    ///
    /// Prefer [`drain`](Stage::drain), which also reaps the background
    /// threads; `run` alone leaves them to the caller.
    fn run(&mut self, sink: &mut dyn Write) -> Result<()>;

    fn io(&mut self) -> &mut StageIo;

    /// Attach the input byte source and return the stage for chaining.
    fn feed(mut self, src: impl Read + Send + 'static) -> Self {
        self.io().attach(src);
        self
    }

    /// Run this stage into `next`'s input on a background thread and return
    /// `next`, so pipelines read left to right:
    /// `a.feed(src).then(b).then(c).drain(&mut out)`.
    fn then<S: Stage>(mut self, mut next: S) -> S {
        let mut writer = next.io().take_writer();
        let handle = thread::spawn(move || {
            let ran = self.run(&mut writer);
            writer.close();
            let joined = self.io().finish();
            ran.and(joined)
        });
        next.io().add_upstream(handle);
        next
    }

    /// Run the stage to exhaustion against `sink`, then join the feeder and
    /// every upstream stage thread. Any failure anywhere in the chain - a
    /// decode error deep in an upstream stage included - comes back as the
    /// `Err` here.
    fn drain(mut self, sink: &mut dyn Write) -> Result<()> {
        let ran = self.run(sink);
        let joined = self.io().finish();
        match ran {
            // The local error wins; upstream broken pipes it caused were
            // already discounted by finish().
            Err(err) => Err(err),
            Ok(()) => joined,
        }
    }
}
