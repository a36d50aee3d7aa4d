//! Core domain types shared across the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One validated listening occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub artist: String,
    pub track: String,
    pub ms_played: u64,
    /// Carried through parsing only; dropped at aggregation.
    pub uri: Option<String>,
}

/// Aggregation of one ISO week of listening.
///
/// Keyed by `(iso_year, iso_week)` so days of early January or late December
/// that belong to the adjacent ISO year land in the right bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekBucket {
    pub week_key: (i32, u32),
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    pub artist_counts: HashMap<String, u64>,
    pub track_counts: HashMap<(String, String), u64>,
    pub total_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistPlays {
    pub name: String,
    pub plays: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPlays {
    pub track: String,
    pub artist: String,
    pub plays: u64,
}

/// A maximal run of consecutive weeks forming one musical period.
#[derive(Debug, Clone, PartialEq)]
pub struct Era {
    /// 1-based position in chronological order after filtering.
    pub id: u32,
    pub start_date: NaiveDate,
    /// Sunday of the last constituent week.
    pub end_date: NaiveDate,
    /// At most 10, descending by plays, ties on artist name.
    pub top_artists: Vec<ArtistPlays>,
    /// At most 20, descending by plays, ties on (track, artist).
    pub top_tracks: Vec<TrackPlays>,
    pub total_ms_played: u64,
    /// Empty until naming completes.
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistTrack {
    pub track_name: String,
    pub artist_name: String,
    pub play_count: u64,
    /// Track URIs are not preserved past aggregation.
    pub uri: Option<String>,
}

/// Derived playlist mirroring an era's top tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    pub era_id: u32,
    pub tracks: Vec<PlaylistTrack>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Whole-history statistics computed before the event list is discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_tracks: usize,
    pub total_artists: usize,
    pub total_ms: u64,
    pub date_range: Option<DateRange>,
}
