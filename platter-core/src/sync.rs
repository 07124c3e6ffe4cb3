//! Collection sync: page through the user's Discogs collection, fold every
//! page into the local snapshot, and keep the snapshot sorted.
//!
//! The merge is deduplicated by collection instance, so pages may arrive in
//! any order and re-syncing is safe. Display order is re-established after
//! every merge; it is only final once all pages are in.

use platter_common::{
    merge_collection_page, sorted_collection, Release, SortField, SortOrder,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::discogs::{DiscogsClient, DiscogsError};
use crate::oauth1::TokenPair;

struct CollectionState {
    releases: Vec<Release>,
    sort_field: SortField,
    sort_order: SortOrder,
}

/// Holds the merged collection snapshot and drives paginated fetches.
pub struct CollectionSync {
    discogs: DiscogsClient,
    state: Mutex<CollectionState>,
    cancel: CancellationToken,
}

impl CollectionSync {
    pub fn new(discogs: DiscogsClient) -> Self {
        Self {
            discogs,
            state: Mutex::new(CollectionState {
                releases: Vec::new(),
                sort_field: SortField::Artist,
                sort_order: SortOrder::Ascending,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Fetch every page of the collection folder and merge it in.
    ///
    /// Returns the number of releases in the snapshot afterwards. Stops
    /// early, without touching state further, once the sync is abandoned.
    pub async fn sync_all(
        &self,
        username: &str,
        access: &TokenPair,
        per_page: u32,
    ) -> Result<usize, DiscogsError> {
        let (sort_field, sort_order) = {
            let state = self.state.lock().await;
            (state.sort_field, state.sort_order)
        };

        let first = self
            .discogs
            .fetch_collection_page(username, access, 1, sort_field, sort_order, per_page)
            .await?;
        let pages = first.pagination.pages;
        if self.cancel.is_cancelled() {
            return Ok(self.len().await);
        }
        self.apply_page(first.releases).await;

        for page in 2..=pages {
            let fetched = self
                .discogs
                .fetch_collection_page(username, access, page, sort_field, sort_order, per_page)
                .await?;
            if self.cancel.is_cancelled() {
                return Ok(self.len().await);
            }
            self.apply_page(fetched.releases).await;
        }

        let total = self.len().await;
        info!("collection sync complete: {} release(s)", total);
        Ok(total)
    }

    /// Merge one page into the snapshot and re-sort.
    pub async fn apply_page(&self, releases: Vec<Release>) {
        let mut state = self.state.lock().await;
        let merged = merge_collection_page(&state.releases, &releases);
        state.releases = sorted_collection(&merged, state.sort_field, state.sort_order);
    }

    /// Change the active sort criterion and re-sort the snapshot.
    pub async fn set_sort(&self, field: SortField, order: SortOrder) {
        let mut state = self.state.lock().await;
        state.sort_field = field;
        state.sort_order = order;
        state.releases = sorted_collection(&state.releases, field, order);
    }

    pub async fn snapshot(&self) -> Vec<Release> {
        self.state.lock().await.releases.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.releases.len()
    }

    /// Abandon the running sync. In-flight page results are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
