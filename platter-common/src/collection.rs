use std::collections::HashSet;

use crate::release::Release;

/// Sort criterion for the collection view. Matches the sort keys the Discogs
/// collection endpoint accepts, so server-side page order and local re-sorts
/// agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Artist,
    Title,
    Year,
    Added,
}

impl SortField {
    /// The query-parameter value the Discogs API expects.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SortField::Artist => "artist",
            SortField::Title => "title",
            SortField::Year => "year",
            SortField::Added => "added",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Merge one page of releases into an existing collection snapshot.
///
/// Deduplicates by `instance_id` with first-seen-wins semantics: an incoming
/// release whose instance is already present is dropped, everything else is
/// appended in incoming order. Neither input is mutated. Merging the same
/// page twice is a no-op the second time, so pages may arrive (and be
/// re-delivered) in any order.
pub fn merge_collection_page(existing: &[Release], incoming: &[Release]) -> Vec<Release> {
    let mut seen: HashSet<u64> = existing.iter().map(|r| r.instance_id).collect();
    let mut merged = existing.to_vec();
    for release in incoming {
        if seen.insert(release.instance_id) {
            merged.push(release.clone());
        }
    }
    merged
}

/// Return the collection re-sorted by the active criterion.
///
/// Display order is only meaningful once all pages are merged; callers
/// re-sort after every merge so the snapshot is always consistent with the
/// criterion. The sort is stable, so equal keys keep their merge order.
pub fn sorted_collection(
    releases: &[Release],
    field: SortField,
    order: SortOrder,
) -> Vec<Release> {
    let mut sorted = releases.to_vec();
    sorted.sort_by(|a, b| {
        let cmp = match field {
            SortField::Artist => a
                .basic
                .artist
                .to_lowercase()
                .cmp(&b.basic.artist.to_lowercase())
                .then_with(|| a.basic.title.to_lowercase().cmp(&b.basic.title.to_lowercase())),
            SortField::Title => a.basic.title.to_lowercase().cmp(&b.basic.title.to_lowercase()),
            SortField::Year => a.basic.year.unwrap_or(0).cmp(&b.basic.year.unwrap_or(0)),
            SortField::Added => a.date_added.cmp(&b.date_added),
        };
        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
    sorted
}
