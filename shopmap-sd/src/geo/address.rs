//! Canonical address strings for geocoding
//!
//! The normalized address doubles as the geocode cache key: two records with
//! identical non-empty address fields must produce the same string.

use shopmap_common::db::models::StoreRecord;

/// Build the canonical comma-joined address for a record.
///
/// Concatenates the non-blank address fields in fixed order (line1, city,
/// region, country), each trimmed, joined by `", "`. Returns `None` when
/// every field is blank. Pure; no I/O.
pub fn normalize(record: &StoreRecord) -> Option<String> {
    let fields = [
        record.address_line1.as_deref(),
        record.city.as_deref(),
        record.region.as_deref(),
        record.country.as_deref(),
    ];

    let parts: Vec<&str> = fields
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
