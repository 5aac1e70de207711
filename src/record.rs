//! The record contract: what a decoded value must provide to flow through a
//! stage, and the capability descriptor for the behaviors it may opt into.

use std::io::{self, Write};

/// One decoded logical row of input data.
///
/// The pipeline never mutates a record's fields directly; everything it does
/// with a record goes through this surface or through the optional
/// capabilities in [`Caps`].
pub trait Record: 'static {
    /// The grouping key. Must be stable for the lifetime of the record.
    fn key(&self) -> &str;

    /// The value emitted for this record in the `key\tvalue` line format.
    fn value(&self) -> String;

    /// Records for which this returns `false` are dropped before any stage
    /// logic runs - before grouping, ordering, or emission.
    fn filter(&self) -> bool {
        true
    }

    /// The optional capabilities of this record type.
    ///
    /// Stages resolve the descriptor once when they start running, so a
    /// missing capability is an ordinary branch rather than a per-record
    /// dynamic check. The default descriptor carries no capabilities.
    fn caps() -> Caps<Self>
    where
        Self: Sized,
    {
        Caps::new()
    }
}

/// Capability descriptor for a record type: a small set of optional function
/// pointers consulted by the stages.
///
/// - `sum` makes the type *aggregable*: Reduce folds equal-key followers into
///   the group accumulator with it. The right-hand record is consumed.
/// - `finalize` makes the type *finalizable*: Reduce calls it exactly once
///   per completed group, after every `sum` for that group, to compute the
///   emitted value. Only meaningful together with `sum`.
/// - `emit` replaces the default `key\tvalue` serialization in Map and Sort
///   with record-owned output. The record must write exactly one complete
///   line, including the trailing newline.
pub struct Caps<R> {
    pub sum: Option<fn(&mut R, R)>,
    pub finalize: Option<fn(&R) -> String>,
    pub emit: Option<fn(&R, &mut dyn Write) -> io::Result<()>>,
}

impl<R> Caps<R> {
    /// A descriptor with no optional capabilities.
    pub fn new() -> Self {
        Self {
            sum: None,
            finalize: None,
            emit: None,
        }
    }

    /// Attach an in-place fold of a follower record into the accumulator.
    pub fn with_sum(mut self, sum: fn(&mut R, R)) -> Self {
        self.sum = Some(sum);
        self
    }

    /// Attach the per-group output computation.
    pub fn with_finalize(mut self, finalize: fn(&R) -> String) -> Self {
        self.finalize = Some(finalize);
        self
    }

    /// Attach record-owned line serialization.
    pub fn with_emit(mut self, emit: fn(&R, &mut dyn Write) -> io::Result<()>) -> Self {
        self.emit = Some(emit);
        self
    }
}

impl<R> Default for Caps<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Caps<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Caps<R> {}

/// Hash the given parts into a single compound key.
///
/// Useful when grouping by several fields at once: hash them into one key in
/// the map task and the shuffle will route equal tuples to the same group.
/// The hash is 64-bit FNV-1 rendered as decimal, so it is stable across
/// processes and machines - a requirement for distributed grouping, and the
/// reason no randomly-keyed hasher can be used here.
pub fn compound_key(parts: &[&str]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut h = OFFSET;
    for part in parts {
        for b in part.as_bytes() {
            h = h.wrapping_mul(PRIME);
            h ^= u64::from(*b);
        }
    }
    h.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_key_is_deterministic() {
        assert_eq!(compound_key(&["a", "b"]), compound_key(&["a", "b"]));
    }

    #[test]
    fn compound_key_distinguishes_parts() {
        assert_ne!(compound_key(&["a"]), compound_key(&["b"]));
        assert_ne!(compound_key(&["region", "2024"]), compound_key(&["region", "2025"]));
    }

    #[test]
    fn compound_key_is_decimal() {
        let k = compound_key(&["x"]);
        assert!(k.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn default_caps_are_empty() {
        struct Row;
        impl Record for Row {
            fn key(&self) -> &str {
                ""
            }
            fn value(&self) -> String {
                String::new()
            }
        }
        let caps = Row::caps();
        assert!(caps.sum.is_none());
        assert!(caps.finalize.is_none());
        assert!(caps.emit.is_none());
    }
}
