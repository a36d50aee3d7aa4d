//! Shared helpers for the end-to-end suite.
#![allow(dead_code)]

pub mod server;

pub use server::{TestServer, CANNED_SUMMARY, CANNED_TITLE};

use futures::StreamExt;
use serde_json::json;
use std::io::{Cursor, Write};
use std::time::Duration;

/// Build a streaming history JSON document from (ts, artist, track, ms) rows.
pub fn history_json(rows: &[(&str, &str, &str, i64)]) -> Vec<u8> {
    let entries: Vec<serde_json::Value> = rows
        .iter()
        .map(|(ts, artist, track, ms)| {
            json!({
                "ts": ts,
                "master_metadata_track_name": track,
                "master_metadata_album_artist_name": artist,
                "ms_played": ms,
                "spotify_track_uri": "spotify:track:0abc",
            })
        })
        .collect();
    serde_json::to_vec(&entries).unwrap()
}

/// Build an in-memory ZIP archive from (member name, data) pairs.
pub fn zip_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut cursor);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in members {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    cursor.into_inner()
}

pub async fn upload_file(
    client: &reqwest::Client,
    base_url: &str,
    filename: &str,
    data: Vec<u8>,
) -> reqwest::Response {
    let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    client
        .post(format!("{}/upload", base_url))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

/// Upload and return the new session id, asserting success.
pub async fn upload_session(
    client: &reqwest::Client,
    base_url: &str,
    filename: &str,
    data: Vec<u8>,
) -> String {
    let response = upload_file(client, base_url, filename, data).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    body["session_id"].as_str().unwrap().to_string()
}

pub async fn trigger_processing(client: &reqwest::Client, base_url: &str, session_id: &str) {
    let response = client
        .post(format!("{}/process/{}", base_url, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

/// Poll the summary endpoint until the pipeline completes.
pub async fn wait_until_complete(
    client: &reqwest::Client,
    base_url: &str,
    session_id: &str,
) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let response = client
            .get(format!("{}/session/{}/summary", base_url, session_id))
            .send()
            .await
            .unwrap();
        match response.status().as_u16() {
            200 => return response.json().await.unwrap(),
            425 => {}
            400 => panic!("processing failed: {}", response.text().await.unwrap()),
            other => panic!("unexpected status {}", other),
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session did not complete in time"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Poll the summary endpoint until the pipeline fails, returning the error
/// message.
pub async fn wait_until_failed(
    client: &reqwest::Client,
    base_url: &str,
    session_id: &str,
) -> String {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let response = client
            .get(format!("{}/session/{}/summary", base_url, session_id))
            .send()
            .await
            .unwrap();
        match response.status().as_u16() {
            425 => {}
            400 => {
                let body: serde_json::Value = response.json().await.unwrap();
                return body["error"].as_str().unwrap().to_string();
            }
            other => panic!("unexpected status {}", other),
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session did not fail in time"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Collect SSE data frames until a terminal stage arrives or the deadline
/// passes.
pub async fn read_sse_until_terminal(response: reqwest::Response) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    let mut buffer = String::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);

    while let Ok(Some(Ok(chunk))) = tokio::time::timeout_at(deadline, stream.next()).await {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(pos) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..pos + 2).collect();
            let frame = frame.trim();
            if let Some(data) = frame.strip_prefix("data: ") {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(data) {
                    let terminal =
                        matches!(value["stage"].as_str(), Some("complete") | Some("error"));
                    frames.push(value);
                    if terminal {
                        return frames;
                    }
                }
            }
        }
    }
    frames
}
