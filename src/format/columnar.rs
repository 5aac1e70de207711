//! Columnar TSV format: tab-separated columns applied positionally to a
//! caller-declared schema of field setters.
//!
//! Nothing here inspects the record type's shape; the caller states which
//! column feeds which field, one closure per column. Nested or repeated
//! fields are not supported as such - a column setter may JSON-decode its
//! cell if a structured cell is genuinely needed.

use crate::format::{read_frame, ByteSource, Deserializer, RecordFormat};
use crate::record::Record;
use anyhow::{bail, Context, Result};
use std::io::BufReader;
use std::sync::Arc;

type Setter<R> = Box<dyn Fn(&mut R, &str) -> Result<()> + Send + Sync>;

/// Ordered column-to-field mapping for a record type.
///
/// ```ignore
/// let schema = Schema::<Visit>::new()
///     .column(|r, cell| { r.host = cell.to_string(); Ok(()) })
///     .column(|r, cell| { r.hits = cell.parse()?; Ok(()) });
/// ```
pub struct Schema<R> {
    setters: Vec<Setter<R>>,
}

impl<R> Schema<R> {
    pub fn new() -> Self {
        Self {
            setters: Vec::new(),
        }
    }

    /// Append the setter for the next column position.
    pub fn column<F>(mut self, set: F) -> Self
    where
        F: Fn(&mut R, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.setters.push(Box::new(set));
        self
    }

    /// Number of columns a row must provide.
    pub fn width(&self) -> usize {
        self.setters.len()
    }

    fn apply(&self, row: &mut R, line: &str) -> Result<()> {
        let mut cells = line.split('\t');
        for (index, setter) in self.setters.iter().enumerate() {
            let Some(cell) = cells.next() else {
                bail!(
                    "row has {index} columns, schema expects {}",
                    self.setters.len()
                );
            };
            setter(row, cell).with_context(|| format!("column {}", index + 1))?;
        }
        // Extra cells beyond the schema are ignored.
        Ok(())
    }
}

impl<R> Default for Schema<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// TSV format populating a fresh `R::default()` per row through a [`Schema`].
pub struct Columnar<R> {
    schema: Arc<Schema<R>>,
}

impl<R> Columnar<R>
where
    R: Record + Default,
{
    pub fn new(schema: Schema<R>) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }
}

impl<R> RecordFormat for Columnar<R>
where
    R: Record + Default,
{
    type Record = R;
    type Reader = ColumnarReader<R>;

    fn open(&self, src: ByteSource) -> Self::Reader {
        ColumnarReader {
            src: BufReader::new(src),
            schema: Arc::clone(&self.schema),
            row_no: 0,
            done: false,
        }
    }
}

pub struct ColumnarReader<R> {
    src: BufReader<ByteSource>,
    schema: Arc<Schema<R>>,
    row_no: u64,
    done: bool,
}

impl<R> ColumnarReader<R>
where
    R: Record + Default,
{
    fn pull(&mut self) -> Result<Option<R>> {
        let mut frame = Vec::new();
        if !read_frame(&mut self.src, b'\n', &mut frame)
            .with_context(|| format!("read row {}", self.row_no + 1))?
        {
            return Ok(None);
        }
        self.row_no += 1;
        let line = std::str::from_utf8(&frame)
            .with_context(|| format!("row {} is not valid UTF-8", self.row_no))?;
        let mut row = R::default();
        self.schema
            .apply(&mut row, line)
            .with_context(|| format!("row {}", self.row_no))?;
        Ok(Some(row))
    }
}

impl<R> Deserializer for ColumnarReader<R>
where
    R: Record + Default,
{
    type Record = R;

    fn next_record(&mut self) -> Result<Option<R>> {
        if self.done {
            return Ok(None);
        }
        match self.pull() {
            Ok(Some(row)) => Ok(Some(row)),
            terminal => {
                self.done = true;
                terminal
            }
        }
    }
}
