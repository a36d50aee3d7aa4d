//! Era segmentation over validated listening events.
//!
//! Events are bucketed by ISO week, consecutive weeks are compared with a
//! Jaccard similarity over their top artists, and boundaries are drawn at
//! listening hiatuses or taste shifts. Assembled eras below the significance
//! thresholds are dropped and the survivors renumbered.

use crate::models::{ArtistPlays, Era, Event, TrackPlays, WeekBucket};
use chrono::{Datelike, Duration};
use std::collections::{HashMap, HashSet};

/// How many top artists of each week participate in the similarity measure.
const SIMILARITY_TOP_N: usize = 20;

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Similarity below this opens a new era.
    pub similarity_threshold: f64,
    /// A gap between consecutive weeks larger than this always splits.
    pub max_gap_days: i64,
    /// Eras spanning fewer weeks than this are dropped.
    pub min_weeks: i64,
    /// Eras with less total listening time than this are dropped.
    pub min_era_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            max_gap_days: 28,
            min_weeks: 2,
            min_era_ms: 3_600_000,
        }
    }
}

/// Full segmentation pipeline: bucket, detect boundaries, assemble, filter.
pub fn segment_events(events: &[Event], config: &SegmenterConfig) -> Vec<Era> {
    let buckets = aggregate_by_week(events);
    let boundaries = detect_boundaries(&buckets, config);
    let eras = assemble_eras(&buckets, &boundaries);
    filter_significant(eras, config)
}

/// Group events into per-ISO-week buckets, sorted ascending by week start.
pub fn aggregate_by_week(events: &[Event]) -> Vec<WeekBucket> {
    let mut weeks: HashMap<(i32, u32), WeekBucket> = HashMap::new();

    for event in events {
        let iso = event.timestamp.iso_week();
        let week_key = (iso.year(), iso.week());
        let date = event.timestamp.date_naive();
        // Monday of the event's ISO week.
        let week_start = date - Duration::days(date.weekday().num_days_from_monday() as i64);

        let bucket = weeks.entry(week_key).or_insert_with(|| WeekBucket {
            week_key,
            week_start,
            artist_counts: HashMap::new(),
            track_counts: HashMap::new(),
            total_ms: 0,
        });

        *bucket.artist_counts.entry(event.artist.clone()).or_insert(0) += 1;
        *bucket
            .track_counts
            .entry((event.track.clone(), event.artist.clone()))
            .or_insert(0) += 1;
        bucket.total_ms += event.ms_played;
    }

    let mut buckets: Vec<WeekBucket> = weeks.into_values().collect();
    buckets.sort_by_key(|bucket| bucket.week_start);
    buckets
}

/// Jaccard similarity between the top-artist sets of two weeks, in [0, 1].
pub fn similarity(a: &WeekBucket, b: &WeekBucket) -> f64 {
    if a.artist_counts.is_empty() || b.artist_counts.is_empty() {
        return 0.0;
    }
    let n = SIMILARITY_TOP_N
        .min(a.artist_counts.len())
        .min(b.artist_counts.len());

    let top_a = top_n_artists(a, n);
    let top_b = top_n_artists(b, n);

    let intersection = top_a.intersection(&top_b).count();
    let union = top_a.union(&top_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Ties on play count break on artist name to keep the measure deterministic.
fn top_n_artists(bucket: &WeekBucket, n: usize) -> HashSet<&str> {
    let mut artists: Vec<(&str, u64)> = bucket
        .artist_counts
        .iter()
        .map(|(name, plays)| (name.as_str(), *plays))
        .collect();
    artists.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    artists.into_iter().take(n).map(|(name, _)| name).collect()
}

/// Indices into the sorted week list where a new era begins. The first week
/// is always a boundary; later weeks open one after a listening hiatus or
/// when their taste diverges from the previous week.
pub fn detect_boundaries(buckets: &[WeekBucket], config: &SegmenterConfig) -> Vec<usize> {
    if buckets.is_empty() {
        return Vec::new();
    }

    let mut boundaries = vec![0];
    for i in 1..buckets.len() {
        let gap_days = (buckets[i].week_start - buckets[i - 1].week_start).num_days();
        if gap_days > config.max_gap_days {
            boundaries.push(i);
        } else if similarity(&buckets[i - 1], &buckets[i]) < config.similarity_threshold {
            boundaries.push(i);
        }
    }
    boundaries
}

/// Merge each boundary-delimited run of weeks into an era with preliminary
/// ids; titles stay empty until naming.
pub fn assemble_eras(buckets: &[WeekBucket], boundaries: &[usize]) -> Vec<Era> {
    let mut eras = Vec::with_capacity(boundaries.len());

    for (index, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(index + 1).copied().unwrap_or(buckets.len());
        let span = &buckets[start..end];

        let mut artist_counts: HashMap<String, u64> = HashMap::new();
        let mut track_counts: HashMap<(String, String), u64> = HashMap::new();
        let mut total_ms: u64 = 0;

        for bucket in span {
            for (artist, plays) in &bucket.artist_counts {
                *artist_counts.entry(artist.clone()).or_insert(0) += plays;
            }
            for (key, plays) in &bucket.track_counts {
                *track_counts.entry(key.clone()).or_insert(0) += plays;
            }
            total_ms += bucket.total_ms;
        }

        eras.push(Era {
            id: (index + 1) as u32,
            start_date: span[0].week_start,
            end_date: span[span.len() - 1].week_start + Duration::days(6),
            top_artists: top_artists(&artist_counts, 10),
            top_tracks: top_tracks(&track_counts, 20),
            total_ms_played: total_ms,
            title: String::new(),
            summary: String::new(),
        });
    }

    eras
}

fn top_artists(counts: &HashMap<String, u64>, limit: usize) -> Vec<ArtistPlays> {
    let mut entries: Vec<(&String, &u64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(limit)
        .map(|(name, plays)| ArtistPlays {
            name: name.clone(),
            plays: *plays,
        })
        .collect()
}

fn top_tracks(counts: &HashMap<(String, String), u64>, limit: usize) -> Vec<TrackPlays> {
    let mut entries: Vec<(&(String, String), &u64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(limit)
        .map(|(key, plays)| TrackPlays {
            track: key.0.clone(),
            artist: key.1.clone(),
            plays: *plays,
        })
        .collect()
}

/// Drop eras below the significance thresholds and renumber the survivors
/// 1..N in chronological order. Dropping everything is not an error.
pub fn filter_significant(eras: Vec<Era>, config: &SegmenterConfig) -> Vec<Era> {
    let mut kept: Vec<Era> = eras
        .into_iter()
        .filter(|era| {
            let weeks = (era.end_date - era.start_date).num_days() / 7 + 1;
            weeks >= config.min_weeks && era.total_ms_played >= config.min_era_ms
        })
        .collect();

    for (index, era) in kept.iter_mut().enumerate() {
        era.id = (index + 1) as u32;
    }
    kept
}
