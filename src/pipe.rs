//! A synchronous in-memory byte pipe.
//!
//! [`pipe`] returns a paired read end and write end connected by a rendezvous
//! channel: every write blocks until the reader takes the chunk, which is the
//! backpressure edge between pipeline stages - a producer can never run ahead
//! of its consumer by more than the chunk in flight.
//!
//! Dropping (or [`close`](PipeWriter::close)-ing) the write end signals
//! end-of-stream to the reader; writing after the read end is gone fails with
//! [`io::ErrorKind::BrokenPipe`], which is how an aborted downstream stage
//! unblocks its upstream.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, Read, Write};

/// Create a connected reader/writer pair.
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (tx, rx) = bounded::<Vec<u8>>(0);
    (
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
        PipeWriter { tx: Some(tx) },
    )
}

/// The write end of a [`pipe`].
pub struct PipeWriter {
    tx: Option<Sender<Vec<u8>>>,
}

impl PipeWriter {
    /// Close the write end, signalling end-of-stream to the reader.
    ///
    /// Dropping the writer has the same effect; `close` makes the hand-off
    /// explicit when the writer must outlive its last write.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(tx) = &self.tx else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write on closed pipe",
            ));
        };
        tx.send(buf.to_vec()).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader disconnected")
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Writes hand off synchronously; there is nothing buffered to flush.
        Ok(())
    }
}

/// The read end of a [`pipe`].
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                // Every writer is gone: end-of-stream.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::thread;

    #[test]
    fn round_trips_bytes_across_threads() {
        let (mut r, mut w) = pipe();
        let writer = thread::spawn(move || {
            w.write_all(b"hello ").unwrap();
            w.write_all(b"world").unwrap();
        });
        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        writer.join().unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn dropping_writer_is_eof() {
        let (mut r, w) = pipe();
        drop(w);
        let mut buf = [0u8; 8];
        assert_eq!(r.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_after_reader_drop_is_broken_pipe() {
        let (r, mut w) = pipe();
        drop(r);
        let err = w.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn write_after_close_is_broken_pipe() {
        let (_r, mut w) = pipe();
        w.close();
        let err = w.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn short_reads_consume_a_chunk_incrementally() {
        let (mut r, mut w) = pipe();
        let writer = thread::spawn(move || {
            w.write_all(b"abcdef").unwrap();
        });
        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        loop {
            let n = r.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        writer.join().unwrap();
        assert_eq!(out, b"abcdef");
    }
}
