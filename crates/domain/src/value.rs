//! The dynamic row type every source produces and every adapter consumes.

use indexmap::IndexMap;
use serde_json::Value;

/// One row emitted by a source: an order-preserving mapping from column
/// name to a dynamic value.
///
/// `serde_json::Value` already spans the full dynamic-value space a row
/// needs (null, bool, number, string, array, nested object); `IndexMap`
/// preserves the author's original key order and spelling so that
/// template rendering downstream can still recover it, independent of
/// whatever case-insensitive lookup that layer chooses to do.
pub type Row = IndexMap<String, Value>;

/// Builds a [`Row`] from an iterator of `(key, value)` pairs, preserving
/// insertion order.
pub fn row_from_pairs<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// The JSON-serialized byte size of a row, used by the cache's
/// `max_bytes` truncation.
pub fn row_byte_size(row: &Row) -> usize {
    serde_json::to_vec(row).map(|bytes| bytes.len()).unwrap_or(0)
}

/// The JSON-serialized byte size of a full row sequence, as the wire
/// format would encode it (a top-level array, not the sum of each row's
/// own serialization).
pub fn row_byte_size_all(rows: &[Row]) -> usize {
    serde_json::to_vec(rows).map(|bytes| bytes.len()).unwrap_or(0)
}
