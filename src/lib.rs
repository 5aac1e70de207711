//! # Rowflow
//!
//! A **streaming map/shuffle/reduce library** for Rust that speaks the Hadoop
//! Streaming contract: a process reads newline-delimited records from one byte
//! stream, transforms them, and writes newline-delimited `key\tvalue` records
//! to another, so it can be dropped into a distributed job as a map task or a
//! reduce task without carrying the scheduler along.
//!
//! ## Key Features
//!
//! - **Composable stages** - Map, Reduce, Sort, and Merge wired with a fluent
//!   `feed(..).then(..).drain(..)` chain
//! - **Backpressured execution** - one thread per stage connected by
//!   rendezvous byte pipes; a fast producer blocks until its consumer drains
//! - **Capability-based records** - a record type opts into summation,
//!   finalization, and record-owned serialization through a descriptor
//!   resolved once per stage run
//! - **Pluggable formats** - delimiter framing, JSON Lines, length-prefixed
//!   binary (optional via feature flag), and schema-declared TSV behind one
//!   deserializer contract
//! - **Streaming group-by** - Reduce folds adjacent equal-key runs with a
//!   single accumulator, never a hash table
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowflow::*;
//! use serde::Deserialize;
//! # use anyhow::Result;
//!
//! #[derive(Default, Deserialize)]
//! struct Hit { key: String, value: u64 }
//!
//! impl Record for Hit {
//!     fn key(&self) -> &str { &self.key }
//!     fn value(&self) -> String { self.value.to_string() }
//!     fn caps() -> Caps<Self> {
//!         Caps::new().with_sum(|acc, other| acc.value += other.value)
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! // One reduce task: pre-sorted JSON lines on stdin, `key\tvalue` on stdout.
//! let stdin = std::io::stdin();
//! let mut stdout = std::io::stdout();
//! ReduceStage::new(json_lines::<Hit>())
//!     .feed(stdin)
//!     .drain(&mut stdout)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is one decoded logical row. The mandatory surface is tiny:
//! a grouping [`key`](Record::key), an emitted [`value`](Record::value), and a
//! [`filter`](Record::filter) consulted exactly once per record before any
//! stage logic runs. Optional behaviors live in the [`Caps`] descriptor the
//! type returns from [`Record::caps`]: a `sum` makes the type aggregable in
//! Reduce, a `finalize` computes the per-group output after the last sum, and
//! an `emit` lets the record serialize itself instead of the default
//! `key\tvalue` line. Stages read the descriptor once when they start, so a
//! missing capability is a visible branch, not a per-record type probe.
//!
//! ### Formats
//!
//! A [`RecordFormat`] is a factory that, handed a stage's input byte stream,
//! produces a [`Deserializer`]: a pull iterator yielding records until clean
//! end-of-stream (`Ok(None)`) or a terminal decode error. The shipped family:
//!
//! - [`Delimited`] - split on an arbitrary byte delimiter and hand each frame
//!   to a caller-supplied constructor
//! - [`json_lines`] - one JSON document per line via Serde, with the Hadoop
//!   `key\t` prefix stripped when present
//! - [`binary`] - `u32` little-endian length prefix + postcard payload
//!   (feature `format-binary`)
//! - [`Columnar`] - tab-separated columns applied to a [`Schema`] of
//!   caller-declared setters
//!
//! The stage engine treats every format identically.
//!
//! ### Stages
//!
//! Every stage implements [`Stage`]:
//!
//! - [`feed`](Stage::feed) attaches an input byte source and starts the
//!   background copy into the stage's own write end
//! - [`then`](Stage::then) runs this stage into the next one's input on its
//!   own thread and returns the next stage for further chaining
//! - [`drain`](Stage::drain) runs the transform to exhaustion against a sink,
//!   then joins every background thread so their failures surface as `Err`
//!
//! The four implementations are [`MapStage`] (filter + one-to-one emit),
//! [`ReduceStage`] (adjacency-based streaming group-by over pre-sorted
//! input), [`SortStage`] (in-memory stable sort by key), and [`MergeStage`]
//! (unordered N-way fan-in of line streams).
//!
//! ### The sort-order invariant
//!
//! Reduce groups **adjacent** equal keys only. Feeding it unsorted input
//! yields one group per maximal run of equal keys - that is the contract, not
//! a bug, and the engine makes no attempt to detect it. Put a [`SortStage`]
//! (or the job scheduler's shuffle) in front to establish adjacency.
//!
//! ## Feature Flags
//!
//! - `format-binary` - the length-prefixed postcard format (on by default)
//!
//! ## Module Overview
//!
//! - [`record`] - the record contract and capability descriptor
//! - [`format`] - deserializer boundary and the format adapter family
//! - [`stage`] - the `feed`/`then`/`drain` stage contract and plumbing
//! - [`map`], [`reduce`], [`sort`], [`merge`] - the stage implementations
//! - [`pipe`] - the synchronous byte pipe connecting stages
//! - [`emit`] - Hadoop Streaming line emission
//! - [`testing`] - fixtures and helpers for writing pipeline tests

pub mod emit;
pub mod format;
pub mod map;
pub mod merge;
pub mod pipe;
pub mod record;
pub mod reduce;
pub mod sort;
pub mod stage;
pub mod testing;

// General re-exports
pub use emit::Emitter;
pub use format::columnar::{Columnar, Schema};
pub use format::delimited::Delimited;
pub use format::structured::{json_lines, JsonLines, Structured};
pub use format::{Deserializer, RecordFormat};
pub use map::MapStage;
pub use merge::MergeStage;
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use record::{compound_key, Caps, Record};
pub use reduce::ReduceStage;
pub use sort::SortStage;
pub use stage::Stage;

// Gated re-exports
#[cfg(feature = "format-binary")]
pub use format::structured::{binary, encode_frame, Binary};
