//! In-memory filtering and sorting of the store listing
//!
//! Thin glue around the record set loaded from the store: a free-text
//! search, exact region/country filters, and a stable sort. Pagination is
//! applied by the handler after filtering.

use serde::Deserialize;

use shopmap_common::db::models::StoreRecord;

/// Sort order for the store listing
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Alphabetical by display label (default)
    #[default]
    Name,
    /// By city, then label
    City,
    /// Most recently added first
    Newest,
}

/// Filter criteria applied to the in-memory record set
#[derive(Debug, Default)]
pub struct StoreFilter {
    pub search: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub sort: SortKey,
}

/// Apply filter and sort, preserving relative order only where the sort
/// leaves ties (`sort_by` is stable)
pub fn apply(mut stores: Vec<StoreRecord>, filter: &StoreFilter) -> Vec<StoreRecord> {
    if let Some(term) = non_blank(filter.search.as_deref()) {
        let needle = term.to_lowercase();
        stores.retain(|store| matches_search(store, &needle));
    }

    if let Some(region) = non_blank(filter.region.as_deref()) {
        stores.retain(|store| field_matches(store.region.as_deref(), region));
    }

    if let Some(country) = non_blank(filter.country.as_deref()) {
        stores.retain(|store| field_matches(store.country.as_deref(), country));
    }

    match filter.sort {
        SortKey::Name => {
            stores.sort_by_key(|store| store.label().to_lowercase());
        }
        SortKey::City => {
            stores.sort_by_key(|store| {
                (
                    store.city.as_deref().unwrap_or_default().to_lowercase(),
                    store.label().to_lowercase(),
                )
            });
        }
        SortKey::Newest => {
            // created_at is lexicographically ordered (SQLite timestamps);
            // records without one sort last
            stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
    }

    stores
}

/// Case-insensitive substring match over the searchable text fields
fn matches_search(store: &StoreRecord, needle: &str) -> bool {
    let haystacks = [
        Some(store.name.as_str()),
        store.display_name.as_deref(),
        store.description.as_deref(),
        store.city.as_deref(),
    ];

    haystacks
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
}

fn field_matches(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(expected.trim()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
