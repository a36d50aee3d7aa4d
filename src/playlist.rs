//! Playlist derivation from assembled eras.

use crate::models::{Era, Playlist, PlaylistTrack};

/// Pure projection of each era's top tracks. URIs are dropped at aggregation,
/// so every entry carries `uri: None`.
pub fn build_playlists(eras: &[Era]) -> Vec<Playlist> {
    eras.iter().map(playlist_for_era).collect()
}

fn playlist_for_era(era: &Era) -> Playlist {
    Playlist {
        era_id: era.id,
        tracks: era
            .top_tracks
            .iter()
            .map(|entry| PlaylistTrack {
                track_name: entry.track.clone(),
                artist_name: entry.artist.clone(),
                play_count: entry.plays,
                uri: None,
            })
            .collect(),
    }
}
