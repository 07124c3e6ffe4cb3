use std::collections::{HashMap, HashSet};

use crate::release::{display_artist, feature_key, subtrack_key, track_key, Track, Tracklist};

/// Assumed length for tracks with no listed duration, so timestamp spacing
/// stays plausible for a real listening session.
const DEFAULT_TRACK_DURATION_SECS: i64 = 180;

/// One listening event ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrobbleTrack {
    pub artist: String,
    pub track: String,
    /// None is omitted from the submission entirely, never sent as an empty
    /// value.
    pub album: Option<String>,
    /// Unix seconds at which playback of this track started.
    pub timestamp: i64,
}

/// Everything needed to project one queued release into scrobble records.
#[derive(Debug, Clone, Copy)]
pub struct ScrobbleSource<'a> {
    pub tracklist: &'a Tracklist,
    pub album_artist: &'a str,
    pub album_title: Option<&'a str>,
    pub selected_tracks: &'a HashSet<String>,
    pub selected_features: &'a HashSet<String>,
    /// Per-track overrides of `use_track_artist`.
    pub attribution: &'a HashMap<String, bool>,
    /// Release-level attribution mode: scrobble under each track's own
    /// credited artist where one exists.
    pub use_track_artist: bool,
}

/// The selected entries of a tracklist in playback order: top-level tracks
/// with their selected subtracks interleaved, then bonus entries.
///
/// Selection keys that don't correspond to an existing entry are simply never
/// produced here, which is what makes stray toggles harmless.
pub fn selected_entries<'a>(source: &ScrobbleSource<'a>) -> Vec<(String, &'a Track)> {
    let mut entries = Vec::new();
    for (i, track) in source.tracklist.tracks.iter().enumerate() {
        let key = track_key(i);
        if source.selected_tracks.contains(&key) {
            entries.push((key, track));
        }
        for (j, sub) in track.sub_tracks.iter().enumerate() {
            let key = subtrack_key(i, j);
            if source.selected_tracks.contains(&key) {
                entries.push((key, sub));
            }
        }
    }
    for (k, feature) in source.tracklist.features.iter().enumerate() {
        let key = feature_key(k);
        if source.selected_features.contains(&key) {
            entries.push((key, feature));
        }
    }
    entries
}

/// Total listening time the selected entries represent, in seconds. Every
/// entry contributes at least one second so batch timestamps never collide.
pub fn projected_span_secs(source: &ScrobbleSource) -> i64 {
    selected_entries(source)
        .iter()
        .map(|(_, track)| step_secs(track))
        .sum()
}

/// Project the selected entries into scrobble records.
///
/// Playback order is preserved and timestamps increase strictly: each track
/// is stamped at `start_timestamp` plus the durations of everything before
/// it, with a minimum step of one second.
pub fn project_scrobbles(source: &ScrobbleSource, start_timestamp: i64) -> Vec<ScrobbleTrack> {
    let mut scrobbles = Vec::new();
    let mut timestamp = start_timestamp;
    for (key, track) in selected_entries(source) {
        let use_track_artist = source
            .attribution
            .get(&key)
            .copied()
            .unwrap_or(source.use_track_artist);
        let artist = if use_track_artist && !track.artists.is_empty() {
            display_artist(&track.artists)
        } else {
            source.album_artist.to_string()
        };
        scrobbles.push(ScrobbleTrack {
            artist,
            track: track.title.clone(),
            album: source.album_title.map(|s| s.to_string()),
            timestamp,
        });
        timestamp += step_secs(track);
    }
    scrobbles
}

fn step_secs(track: &Track) -> i64 {
    track
        .duration_secs()
        .unwrap_or(DEFAULT_TRACK_DURATION_SECS)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ArtistCredit;

    fn track(title: &str, duration: Option<&str>) -> Track {
        Track {
            title: title.to_string(),
            duration: duration.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    fn keys(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn projection_preserves_playback_order() {
        let tracklist = Tracklist {
            tracks: vec![
                track("One", Some("2:00")),
                track("Two", Some("3:00")),
                track("Three", None),
            ],
            features: vec![],
        };
        let selected = keys(&["t2", "t0", "t1"]);
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "Stereolab",
            album_title: Some("Dots And Loops"),
            selected_tracks: &selected,
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };

        let scrobbles = project_scrobbles(&source, 1_700_000_000);
        let titles: Vec<&str> = scrobbles.iter().map(|s| s.track.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn timestamps_strictly_increase_by_duration() {
        let tracklist = Tracklist {
            tracks: vec![track("One", Some("2:00")), track("Two", Some("0:30"))],
            features: vec![track("Bonus", None)],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &keys(&["t0", "t1"]),
            selected_features: &keys(&["f0"]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };

        let scrobbles = project_scrobbles(&source, 1000);
        assert_eq!(scrobbles[0].timestamp, 1000);
        assert_eq!(scrobbles[1].timestamp, 1120);
        assert_eq!(scrobbles[2].timestamp, 1150);

        let mut seen = HashSet::new();
        assert!(scrobbles.iter().all(|s| seen.insert(s.timestamp)));
    }

    #[test]
    fn zero_duration_still_steps_at_least_one_second() {
        let tracklist = Tracklist {
            tracks: vec![track("A", Some("0:00")), track("B", Some("0:00"))],
            features: vec![],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &keys(&["t0", "t1"]),
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };
        let scrobbles = project_scrobbles(&source, 0);
        assert_eq!(scrobbles[0].timestamp, 0);
        assert_eq!(scrobbles[1].timestamp, 1);
    }

    #[test]
    fn album_is_passed_through_as_option() {
        let tracklist = Tracklist {
            tracks: vec![track("One", None)],
            features: vec![],
        };
        let selected = keys(&["t0"]);
        let mut source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &selected,
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };
        assert_eq!(project_scrobbles(&source, 0)[0].album, None);

        source.album_title = Some("LP1");
        assert_eq!(
            project_scrobbles(&source, 0)[0].album,
            Some("LP1".to_string())
        );
    }

    #[test]
    fn track_artist_attribution_per_track() {
        let mut credited = track("Guest Spot", Some("3:00"));
        credited.artists = vec![ArtistCredit {
            name: "Guest".to_string(),
            anv: String::new(),
            join: String::new(),
        }];
        let tracklist = Tracklist {
            tracks: vec![track("Own", Some("3:00")), credited],
            features: vec![],
        };
        let mut attribution = HashMap::new();
        attribution.insert("t1".to_string(), true);
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "Main Artist",
            album_title: None,
            selected_tracks: &keys(&["t0", "t1"]),
            selected_features: &keys(&[]),
            attribution: &attribution,
            use_track_artist: false,
        };

        let scrobbles = project_scrobbles(&source, 0);
        assert_eq!(scrobbles[0].artist, "Main Artist");
        assert_eq!(scrobbles[1].artist, "Guest");
    }

    #[test]
    fn release_level_attribution_falls_back_without_credits() {
        let tracklist = Tracklist {
            tracks: vec![track("Uncredited", None)],
            features: vec![],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "Main Artist",
            album_title: None,
            selected_tracks: &keys(&["t0"]),
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: true,
        };
        assert_eq!(project_scrobbles(&source, 0)[0].artist, "Main Artist");
    }

    #[test]
    fn unknown_selection_keys_are_ignored() {
        let tracklist = Tracklist {
            tracks: vec![track("One", None)],
            features: vec![],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &keys(&["t0", "t9", "bogus"]),
            selected_features: &keys(&["f4"]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };
        assert_eq!(project_scrobbles(&source, 0).len(), 1);
    }

    #[test]
    fn span_matches_sum_of_steps() {
        let tracklist = Tracklist {
            tracks: vec![track("One", Some("2:00")), track("Two", None)],
            features: vec![],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &keys(&["t0", "t1"]),
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };
        assert_eq!(projected_span_secs(&source), 120 + 180);
    }

    #[test]
    fn selected_subtracks_emit_in_place() {
        let medley = Track {
            title: "Medley".to_string(),
            sub_tracks: vec![track("Part 1", Some("1:00")), track("Part 2", Some("1:00"))],
            ..Default::default()
        };
        let tracklist = Tracklist {
            tracks: vec![medley, track("Closer", None)],
            features: vec![],
        };
        let source = ScrobbleSource {
            tracklist: &tracklist,
            album_artist: "X",
            album_title: None,
            selected_tracks: &keys(&["t0.0", "t0.1", "t1"]),
            selected_features: &keys(&[]),
            attribution: &HashMap::new(),
            use_track_artist: false,
        };
        let titles: Vec<String> = project_scrobbles(&source, 0)
            .into_iter()
            .map(|s| s.track)
            .collect();
        assert_eq!(titles, vec!["Part 1", "Part 2", "Closer"]);
    }
}
