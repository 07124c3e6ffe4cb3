//! The scrobble queue: releases the user has lined up to submit, their
//! lazily-loaded tracklists, and the projection of the whole queue into one
//! timestamped batch.
//!
//! `ScrobbleQueue` is the pure state container; `QueueService` wraps it with
//! the API clients and guards every async continuation with a cancellation
//! check so abandoned loads never touch shared state.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use platter_common::{
    project_scrobbles, projected_span_secs, selected_entries, Release, ScrobbleSource,
    ScrobbleTrack, SelectionSettings, SelectionState, Tracklist,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discogs::DiscogsClient;
use crate::lastfm::{LastfmClient, LastfmError, MAX_SCROBBLES_PER_REQUEST};
use crate::oauth1::TokenPair;

/// One queued occurrence of a release.
///
/// `instance_key` is generated at queue-add time and is distinct from both
/// the catalog `id` and the collection `instance_id`, so the same release can
/// be queued more than once.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub instance_key: String,
    pub release: Release,
    /// None until the detail fetch completes.
    pub tracklist: Option<Tracklist>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Release-level attribution mode; per-track overrides live in the
    /// selection state.
    pub use_track_artist: bool,
    pub scrobbled_track_count: usize,
    pub scrobbled_track_keys: Vec<String>,
}

/// A projected batch plus the bookkeeping needed to mark items scrobbled
/// after the submission succeeds.
#[derive(Debug, Clone)]
pub struct ScrobbleBatch {
    pub tracks: Vec<ScrobbleTrack>,
    items: Vec<(String, Vec<String>)>,
}

impl ScrobbleBatch {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Outcome of submitting the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrobbleOutcome {
    pub submitted: usize,
    pub accepted: u32,
    pub ignored: u32,
}

/// Queue state: pending items, scrobble history, and per-instance selection.
pub struct ScrobbleQueue {
    items: Vec<QueueItem>,
    history: Vec<QueueItem>,
    selection: SelectionState,
    settings: SelectionSettings,
}

impl ScrobbleQueue {
    pub fn new(settings: SelectionSettings) -> Self {
        Self {
            items: Vec::new(),
            history: Vec::new(),
            selection: SelectionState::new(),
            settings,
        }
    }

    /// Add a release to the queue in the loading state. Returns the new
    /// instance key.
    pub fn add(&mut self, release: Release) -> String {
        let instance_key = Uuid::new_v4().to_string();
        self.items.push(QueueItem {
            instance_key: instance_key.clone(),
            release,
            tracklist: None,
            is_loading: true,
            error: None,
            use_track_artist: false,
            scrobbled_track_count: 0,
            scrobbled_track_keys: Vec::new(),
        });
        instance_key
    }

    /// Apply the result of a tracklist load. A no-op when the item was
    /// dequeued while the load was in flight.
    pub fn attach_tracklist(&mut self, instance_key: &str, result: Result<Tracklist, String>) {
        let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.instance_key == instance_key)
        else {
            return;
        };
        item.is_loading = false;
        match result {
            Ok(tracklist) => {
                self.selection
                    .initialize(instance_key, &tracklist, &self.settings);
                item.tracklist = Some(tracklist);
                item.error = None;
            }
            Err(message) => {
                item.error = Some(message);
            }
        }
    }

    /// Remove an item and its selection state together.
    pub fn remove(&mut self, instance_key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.instance_key != instance_key);
        self.selection.clear_instance(instance_key);
        self.items.len() != before
    }

    pub fn set_use_track_artist(&mut self, instance_key: &str, value: bool) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.instance_key == instance_key)
        {
            item.use_track_artist = value;
        }
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn history(&self) -> &[QueueItem] {
        &self.history
    }

    pub fn item(&self, instance_key: &str) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.instance_key == instance_key)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub fn settings(&self) -> &SelectionSettings {
        &self.settings
    }

    pub fn total_selected_tracks(&self) -> usize {
        self.selection.total_selected_tracks()
    }

    /// Project every loaded item into one batch ending at `end_timestamp`.
    ///
    /// Items are stamped in queue order stepping backward from the end, so
    /// earlier-queued tracks get earlier timestamps and the whole batch reads
    /// as one continuous listening session.
    pub fn build_batch(&self, end_timestamp: i64) -> ScrobbleBatch {
        let empty_set = HashSet::new();
        let empty_attribution = HashMap::new();

        let mut sources: Vec<(&QueueItem, ScrobbleSource)> = Vec::new();
        for item in &self.items {
            let Some(tracklist) = &item.tracklist else {
                continue;
            };
            let selected_features = if self.settings.show_features {
                self.selection
                    .selected_features(&item.instance_key)
                    .unwrap_or(&empty_set)
            } else {
                &empty_set
            };
            sources.push((
                item,
                ScrobbleSource {
                    tracklist,
                    album_artist: &item.release.basic.artist,
                    album_title: Some(&item.release.basic.title),
                    selected_tracks: self
                        .selection
                        .selected_tracks(&item.instance_key)
                        .unwrap_or(&empty_set),
                    selected_features,
                    attribution: self
                        .selection
                        .attribution(&item.instance_key)
                        .unwrap_or(&empty_attribution),
                    use_track_artist: item.use_track_artist,
                },
            ));
        }

        let total_span: i64 = sources.iter().map(|(_, s)| projected_span_secs(s)).sum();
        let mut timestamp = end_timestamp - total_span;
        let mut tracks = Vec::new();
        let mut items = Vec::new();
        for (item, source) in sources {
            let keys: Vec<String> = selected_entries(&source).into_iter().map(|(k, _)| k).collect();
            if keys.is_empty() {
                continue;
            }
            let span = projected_span_secs(&source);
            tracks.extend(project_scrobbles(&source, timestamp));
            items.push((item.instance_key.clone(), keys));
            timestamp += span;
        }
        ScrobbleBatch { tracks, items }
    }

    /// Record a successful submission: items move to history with their
    /// scrobbled keys, and their selection state is dropped.
    pub fn mark_scrobbled(&mut self, batch: &ScrobbleBatch) {
        for (instance_key, keys) in &batch.items {
            if let Some(pos) = self
                .items
                .iter()
                .position(|i| &i.instance_key == instance_key)
            {
                let mut item = self.items.remove(pos);
                item.scrobbled_track_count = keys.len();
                item.scrobbled_track_keys = keys.clone();
                self.selection.clear_instance(instance_key);
                self.history.push(item);
            }
        }
    }
}

/// Async orchestration around [`ScrobbleQueue`]: tracklist loading via the
/// Discogs client and batch submission via the Last.fm client.
pub struct QueueService {
    discogs: DiscogsClient,
    lastfm: LastfmClient,
    queue: Mutex<ScrobbleQueue>,
    cancel: CancellationToken,
}

impl QueueService {
    pub fn new(discogs: DiscogsClient, lastfm: LastfmClient, settings: SelectionSettings) -> Self {
        Self {
            discogs,
            lastfm,
            queue: Mutex::new(ScrobbleQueue::new(settings)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn queue(&self) -> &Mutex<ScrobbleQueue> {
        &self.queue
    }

    /// Abandon all in-flight work. Results arriving afterwards are discarded
    /// before they reach the queue.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Queue a release and load its tracklist from the release detail
    /// endpoint. The returned key identifies the queued instance.
    pub async fn add_release(&self, release: Release, access: &TokenPair) -> String {
        let release_id = release.id;
        let instance_key = { self.queue.lock().await.add(release) };

        let result = self.discogs.fetch_release(release_id, access).await;
        if self.cancel.is_cancelled() {
            return instance_key;
        }

        let mut queue = self.queue.lock().await;
        match result {
            Ok(detail) => queue.attach_tracklist(&instance_key, Ok(detail.tracklist)),
            Err(e) => {
                warn!("tracklist load failed for release {}: {}", release_id, e);
                queue.attach_tracklist(&instance_key, Err(e.to_string()));
            }
        }
        instance_key
    }

    /// Submit everything selected in the queue, chunked to the provider's
    /// batch limit. `offset_secs` shifts the batch's end time relative to
    /// now (e.g. "I finished listening ten minutes ago").
    pub async fn scrobble_queued(
        &self,
        session_key: &str,
        offset_secs: i64,
    ) -> Result<ScrobbleOutcome, LastfmError> {
        let batch = {
            self.queue
                .lock()
                .await
                .build_batch(Utc::now().timestamp() + offset_secs)
        };
        if batch.is_empty() {
            return Ok(ScrobbleOutcome::default());
        }

        // Best-effort now-playing for the most recent track; a failure here
        // never blocks the batch.
        if let Some(last) = batch.tracks.last() {
            if let Err(e) = self.lastfm.update_now_playing(last, session_key).await {
                debug!("now-playing update failed: {}", e);
            }
        }

        let mut accepted = 0;
        let mut ignored = 0;
        for chunk in batch.tracks.chunks(MAX_SCROBBLES_PER_REQUEST) {
            let summary = self.lastfm.scrobble_tracks(chunk, session_key).await?;
            accepted += summary.accepted;
            ignored += summary.ignored;
        }

        if !self.cancel.is_cancelled() {
            self.queue.lock().await.mark_scrobbled(&batch);
        }
        info!(
            "scrobbled {} track(s): {} accepted, {} ignored",
            batch.tracks.len(),
            accepted,
            ignored
        );
        Ok(ScrobbleOutcome {
            submitted: batch.tracks.len(),
            accepted,
            ignored,
        })
    }
}
