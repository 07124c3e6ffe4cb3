use std::collections::{HashMap, HashSet};

use crate::release::Tracklist;

/// Defaults applied when a queued release's tracklist finishes loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSettings {
    /// Start with every top-level track selected.
    pub select_all_tracks_per_release: bool,
    /// Also select subtracks of index/medley entries.
    pub select_subtracks_by_default: bool,
    /// Whether bonus entries are shown (and therefore selectable) at all.
    pub show_features: bool,
    /// Start with bonus entries selected. Only meaningful with `show_features`.
    pub select_features_by_default: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            select_all_tracks_per_release: true,
            select_subtracks_by_default: false,
            show_features: true,
            select_features_by_default: false,
        }
    }
}

/// Per-instance track selection state for the scrobble queue.
///
/// Three maps keyed by queue instance key: selected track keys, selected
/// feature keys, and per-track artist attribution overrides. An instance
/// moves through uninitialized -> initialized -> mutated -> cleared; toggles
/// on an uninitialized instance auto-create an empty entry instead of
/// failing, and clearing removes the instance from all three maps in one
/// step.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    tracks: HashMap<String, HashSet<String>>,
    features: HashMap<String, HashSet<String>>,
    attribution: HashMap<String, HashMap<String, bool>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the selection entries for a freshly loaded queue instance.
    ///
    /// Re-initializing an existing instance resets it to the defaults.
    pub fn initialize(
        &mut self,
        instance_key: &str,
        tracklist: &Tracklist,
        settings: &SelectionSettings,
    ) {
        let track_set: HashSet<String> = if settings.select_all_tracks_per_release {
            tracklist
                .track_keys(settings.select_subtracks_by_default)
                .into_iter()
                .collect()
        } else {
            HashSet::new()
        };
        let feature_set: HashSet<String> =
            if settings.show_features && settings.select_features_by_default {
                tracklist.feature_keys().into_iter().collect()
            } else {
                HashSet::new()
            };

        self.tracks.insert(instance_key.to_string(), track_set);
        self.features.insert(instance_key.to_string(), feature_set);
        self.attribution
            .insert(instance_key.to_string(), HashMap::new());
    }

    /// Flip membership of `track_key` in the instance's selected set.
    pub fn toggle_track(&mut self, instance_key: &str, track_key: &str) {
        let set = self.tracks.entry(instance_key.to_string()).or_default();
        if !set.remove(track_key) {
            set.insert(track_key.to_string());
        }
    }

    /// Flip membership of `feature_key` in the instance's selected features.
    pub fn toggle_feature(&mut self, instance_key: &str, feature_key: &str) {
        let set = self.features.entry(instance_key.to_string()).or_default();
        if !set.remove(feature_key) {
            set.insert(feature_key.to_string());
        }
    }

    /// Select every track key, subtracks included.
    pub fn select_all(&mut self, instance_key: &str, tracklist: &Tracklist) {
        self.tracks.insert(
            instance_key.to_string(),
            tracklist.track_keys(true).into_iter().collect(),
        );
    }

    pub fn deselect_all(&mut self, instance_key: &str) {
        self.tracks
            .insert(instance_key.to_string(), HashSet::new());
    }

    /// Record whether a track scrobbles under its own credited artist instead
    /// of the release artist.
    pub fn set_use_track_artist(
        &mut self,
        instance_key: &str,
        track_key: &str,
        use_track_artist: bool,
    ) {
        self.attribution
            .entry(instance_key.to_string())
            .or_default()
            .insert(track_key.to_string(), use_track_artist);
    }

    pub fn selected_tracks(&self, instance_key: &str) -> Option<&HashSet<String>> {
        self.tracks.get(instance_key)
    }

    pub fn selected_features(&self, instance_key: &str) -> Option<&HashSet<String>> {
        self.features.get(instance_key)
    }

    pub fn attribution(&self, instance_key: &str) -> Option<&HashMap<String, bool>> {
        self.attribution.get(instance_key)
    }

    pub fn is_track_selected(&self, instance_key: &str, track_key: &str) -> bool {
        self.tracks
            .get(instance_key)
            .is_some_and(|set| set.contains(track_key))
    }

    pub fn is_feature_selected(&self, instance_key: &str, feature_key: &str) -> bool {
        self.features
            .get(instance_key)
            .is_some_and(|set| set.contains(feature_key))
    }

    /// Selected tracks + features for one instance.
    pub fn selected_count(&self, instance_key: &str) -> usize {
        self.tracks.get(instance_key).map_or(0, HashSet::len)
            + self.features.get(instance_key).map_or(0, HashSet::len)
    }

    /// Selected tracks + features across all instances. Always recomputed,
    /// never cached.
    pub fn total_selected_tracks(&self) -> usize {
        self.tracks.values().map(HashSet::len).sum::<usize>()
            + self.features.values().map(HashSet::len).sum::<usize>()
    }

    /// Remove the instance from all three maps. A partial removal would leave
    /// the maps inconsistent, so this is the only removal path.
    pub fn clear_instance(&mut self, instance_key: &str) {
        self.tracks.remove(instance_key);
        self.features.remove(instance_key);
        self.attribution.remove(instance_key);
    }

    /// Drop every instance's selection state.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.features.clear();
        self.attribution.clear();
    }

    pub fn is_initialized(&self, instance_key: &str) -> bool {
        self.tracks.contains_key(instance_key)
    }
}
