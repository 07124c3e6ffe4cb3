//! Pure domain logic shared by the platter clients: the release/track data
//! model, collection merging, track selection state, and scrobble projection.
//!
//! Nothing in this crate performs I/O. Every function here takes its inputs
//! by value or reference and returns a new value, so the async service layer
//! in `platter-core` can call into it from any point in a request lifecycle.

mod collection;
mod release;
mod scrobble;
mod selection;

pub use collection::{merge_collection_page, sorted_collection, SortField, SortOrder};
pub use release::{
    display_artist, feature_key, subtrack_key, track_key, ArtistCredit, BasicInformation,
    Identifier, Release, Track, Tracklist,
};
pub use scrobble::{
    project_scrobbles, projected_span_secs, selected_entries, ScrobbleSource, ScrobbleTrack,
};
pub use selection::{SelectionSettings, SelectionState};
