//! Whole-history statistics, computed in one pass before the event list is
//! handed to the segmenter and discarded.

use crate::models::{AggregateStats, DateRange, Event};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub fn compute_stats(events: &[Event]) -> AggregateStats {
    let mut tracks: HashSet<(&str, &str)> = HashSet::new();
    let mut artists: HashSet<&str> = HashSet::new();
    let mut total_ms: u64 = 0;
    let mut range: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for event in events {
        tracks.insert((event.track.as_str(), event.artist.as_str()));
        artists.insert(event.artist.as_str());
        total_ms += event.ms_played;
        range = Some(match range {
            None => (event.timestamp, event.timestamp),
            Some((min, max)) => (min.min(event.timestamp), max.max(event.timestamp)),
        });
    }

    AggregateStats {
        total_tracks: tracks.len(),
        total_artists: artists.len(),
        total_ms,
        date_range: range.map(|(min, max)| DateRange {
            start: min.date_naive(),
            end: max.date_naive(),
        }),
    }
}
