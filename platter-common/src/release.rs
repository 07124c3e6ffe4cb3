/// One artist credit on a release or a track.
///
/// `anv` (artist name variation) and `join` follow the Discogs convention of
/// empty strings when absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArtistCredit {
    pub name: String,
    /// Name variation used on this particular release, preferred over `name`
    /// for display when present.
    pub anv: String,
    /// Join phrase connecting this credit to the next one ("&", "feat.", ",").
    pub join: String,
}

/// A catalog identifier attached to a release (barcode, matrix number, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub kind: String,
    pub value: String,
}

/// The summary data Discogs returns for every release in a collection page.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInformation {
    pub title: String,
    /// None when the source reports year 0 (unknown).
    pub year: Option<u32>,
    pub formats: Vec<String>,
    pub artists: Vec<ArtistCredit>,
    /// Display name computed from `artists` at parse time.
    pub artist: String,
    pub thumb: Option<String>,
}

/// One release in the user's collection.
///
/// `id` is the catalog identity and repeats when the user owns multiple
/// copies; `instance_id` is unique per physical collection item and is the
/// identity the merge engine deduplicates on.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub id: u64,
    pub instance_id: u64,
    pub date_added: Option<String>,
    pub basic: BasicInformation,
    /// None until the release detail has been fetched.
    pub tracklist: Option<Tracklist>,
    pub identifiers: Vec<Identifier>,
}

/// One entry in a release's tracklist. Index tracks (medleys) carry their
/// parts in `sub_tracks`; plain tracks have an empty `sub_tracks`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub position: String,
    pub title: String,
    pub duration: Option<String>,
    /// Track-level credits. Empty means the track inherits the release artist.
    pub artists: Vec<ArtistCredit>,
    pub sub_tracks: Vec<Track>,
}

impl Track {
    /// Parse the Discogs duration string ("3:45", "1:02:03") into seconds.
    pub fn duration_secs(&self) -> Option<i64> {
        let raw = self.duration.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let mut total: i64 = 0;
        for part in raw.split(':') {
            let n: i64 = part.trim().parse().ok()?;
            total = total * 60 + n;
        }
        Some(total)
    }
}

/// A release's playable entries, split into the main tracklist and the
/// unnumbered bonus entries ("features") that are selectable independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tracklist {
    pub tracks: Vec<Track>,
    pub features: Vec<Track>,
}

impl Tracklist {
    /// Selection keys for the main tracklist, in playback order.
    /// Subtrack keys are interleaved after their parent when requested.
    pub fn track_keys(&self, include_subtracks: bool) -> Vec<String> {
        let mut keys = Vec::new();
        for (i, track) in self.tracks.iter().enumerate() {
            keys.push(track_key(i));
            if include_subtracks {
                for j in 0..track.sub_tracks.len() {
                    keys.push(subtrack_key(i, j));
                }
            }
        }
        keys
    }

    /// Selection keys for the bonus entries, in listing order.
    pub fn feature_keys(&self) -> Vec<String> {
        (0..self.features.len()).map(feature_key).collect()
    }
}

/// Selection key for the top-level track at index `i`.
pub fn track_key(i: usize) -> String {
    format!("t{i}")
}

/// Selection key for subtrack `j` of the track at index `i`.
pub fn subtrack_key(i: usize, j: usize) -> String {
    format!("t{i}.{j}")
}

/// Selection key for the bonus entry at index `k`.
pub fn feature_key(k: usize) -> String {
    format!("f{k}")
}

/// Join artist credits into a single display name using each credit's join
/// phrase. An empty credit list yields "Unknown Artist".
pub fn display_artist(artists: &[ArtistCredit]) -> String {
    if artists.is_empty() {
        return "Unknown Artist".to_string();
    }
    let mut out = String::new();
    for (i, credit) in artists.iter().enumerate() {
        let name = if credit.anv.is_empty() {
            &credit.name
        } else {
            &credit.anv
        };
        out.push_str(strip_name_suffix(name));
        if i + 1 < artists.len() {
            let join = credit.join.trim();
            if join.is_empty() || join == "," {
                out.push_str(", ");
            } else {
                out.push(' ');
                out.push_str(join);
                out.push(' ');
            }
        }
    }
    out
}

/// Strip the trailing "(n)" disambiguation Discogs appends to artist names
/// that collide ("Nirvana (2)" -> "Nirvana").
fn strip_name_suffix(name: &str) -> &str {
    if let Some(open) = name.rfind(" (") {
        let inner = &name[open + 2..];
        if let Some(stripped) = inner.strip_suffix(')') {
            if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
                return &name[..open];
            }
        }
    }
    name
}
