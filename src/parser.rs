//! Upload decoding for extended streaming history files.
//!
//! Accepts either a single JSON document or a ZIP archive of JSON documents,
//! entirely in memory. Archive handling is defensive: member paths are
//! validated before any data is read and the total declared uncompressed
//! size is capped.

use crate::models::Event;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::debug;

/// Plays shorter than this are dropped (skips, previews, accidental plays).
const MIN_MS_PLAYED: i64 = 30_000;

/// Cap on the total declared uncompressed size of an archive.
const MAX_TOTAL_UNCOMPRESSED: u64 = 1024 * 1024 * 1024;

/// Magic bytes of a ZIP local file header.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("Archive member has an unsafe path: {0}")]
    UnsafeMemberPath(String),

    #[error("Archive contents exceed the 1 GiB size limit")]
    ArchiveTooLarge,
}

/// The two upload formats the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Json,
    Zip,
}

impl UploadKind {
    /// Identify the upload format, magic bytes first, extension as fallback.
    pub fn detect(data: &[u8], filename: Option<&str>) -> Option<UploadKind> {
        if data.starts_with(ZIP_MAGIC) {
            return Some(UploadKind::Zip);
        }
        let ext = filename
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("zip") => Some(UploadKind::Zip),
            Some("json") => Some(UploadKind::Json),
            _ => None,
        }
    }
}

/// One entry of the extended streaming history format. Unknown keys are
/// ignored; entries missing required fields are skipped during filtering.
#[derive(Debug, Deserialize)]
struct RawEntry {
    ts: Option<String>,
    master_metadata_track_name: Option<String>,
    master_metadata_album_artist_name: Option<String>,
    #[serde(default)]
    ms_played: i64,
    spotify_track_uri: Option<String>,
}

/// Parse an upload into validated events: filtered, deduplicated by
/// (timestamp, track, artist) keeping the first, then sorted ascending by
/// timestamp.
pub fn parse_upload(data: &[u8], kind: UploadKind) -> Result<Vec<Event>, ParseError> {
    let mut events = match kind {
        UploadKind::Json => parse_history_json(data)?,
        UploadKind::Zip => parse_history_zip(data)?,
    };
    dedup_events(&mut events);
    events.sort_by_key(|event| event.timestamp);
    Ok(events)
}

fn parse_history_json(data: &[u8]) -> Result<Vec<Event>, ParseError> {
    let entries: Vec<RawEntry> =
        serde_json::from_slice(data).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let events = entries
        .into_iter()
        .filter_map(|entry| {
            let track = entry.master_metadata_track_name.filter(|t| !t.is_empty())?;
            let artist = entry
                .master_metadata_album_artist_name
                .filter(|a| !a.is_empty())?;
            if entry.ms_played < MIN_MS_PLAYED {
                return None;
            }
            let timestamp = DateTime::parse_from_rfc3339(entry.ts.as_deref()?).ok()?;
            Some(Event {
                timestamp: timestamp.with_timezone(&Utc),
                artist,
                track,
                ms_played: entry.ms_played as u64,
                uri: entry.spotify_track_uri,
            })
        })
        .collect();

    Ok(events)
}

fn parse_history_zip(data: &[u8]) -> Result<Vec<Event>, ParseError> {
    parse_history_zip_with_limit(data, MAX_TOTAL_UNCOMPRESSED)
}

/// The archive is never extracted to disk; every member is validated before
/// any of its data is read.
fn parse_history_zip_with_limit(data: &[u8], max_total: u64) -> Result<Vec<Event>, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| ParseError::InvalidArchive(e.to_string()))?;

    let mut events = Vec::new();
    let mut total_declared: u64 = 0;

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| ParseError::InvalidArchive(e.to_string()))?;
        let name = member.name().to_string();

        validate_member_name(&name)?;

        total_declared = total_declared.saturating_add(member.size());
        if total_declared > max_total {
            return Err(ParseError::ArchiveTooLarge);
        }

        if member.is_dir() || !is_history_member(&name) {
            continue;
        }

        let mut content = Vec::new();
        member
            .read_to_end(&mut content)
            .map_err(|e| ParseError::InvalidArchive(e.to_string()))?;

        debug!(member = %name, bytes = content.len(), "Decoding archive member");
        events.extend(parse_history_json(&content)?);
    }

    Ok(events)
}

/// Reject traversal segments and absolute paths.
fn validate_member_name(name: &str) -> Result<(), ParseError> {
    let has_traversal = name.split(['/', '\\']).any(|segment| segment == "..");
    if has_traversal || name.starts_with('/') || name.starts_with('\\') {
        return Err(ParseError::UnsafeMemberPath(name.to_string()));
    }
    Ok(())
}

/// Streaming history exports name their parts `Streaming_History_Audio_*.json`,
/// possibly nested in a folder.
fn is_history_member(name: &str) -> bool {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    basename.starts_with("Streaming_History_Audio_") && basename.ends_with(".json")
}

fn dedup_events(events: &mut Vec<Event>) {
    let mut seen = HashSet::new();
    events.retain(|event| seen.insert((event.timestamp, event.track.clone(), event.artist.clone())));
}
