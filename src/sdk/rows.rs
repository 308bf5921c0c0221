//! Row-by-row loading for API exports. One malformed row is logged and
//! dropped instead of failing the whole collection.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserializes each element of `rows` on its own, skipping the ones that don't fit `T`.
pub fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>, kind: &str) -> Vec<T> {
    let total = rows.len();
    let parsed: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping {} row {}: {}", kind, index, e);
                None
            }
        })
        .collect();

    if parsed.len() < total {
        log::warn!("Kept {} of {} {} rows", parsed.len(), total, kind);
    }
    parsed
}
