//! End-to-end tests for the session lifecycle: upload, process, reads.

mod common;

use common::server::loose_segmenter;
use common::{
    history_json, trigger_processing, upload_session, wait_until_complete, wait_until_failed,
    TestServer, CANNED_TITLE,
};
use erascope::segmenter::SegmenterConfig;

#[tokio::test]
async fn health_probe_responds_ok() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tiny_happy_path_produces_one_named_era() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Three plays of one artist in the same ISO week.
    let data = history_json(&[
        ("2023-06-05T10:00:00Z", "A", "T", 200_000),
        ("2023-06-06T11:00:00Z", "A", "T", 200_000),
        ("2023-06-07T12:00:00Z", "A", "T", 200_000),
    ]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;

    // Reads before processing are too early and carry the current stage.
    let response = client
        .get(format!("{}/session/{}/summary", server.base_url, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 425);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Processing not complete");
    assert_eq!(body["stage"], "parsed");

    trigger_processing(&client, &server.base_url, &session_id).await;
    let summary = wait_until_complete(&client, &server.base_url, &session_id).await;

    assert_eq!(summary["total_eras"], 1);
    assert_eq!(summary["total_tracks"], 1);
    assert_eq!(summary["total_artists"], 1);
    assert_eq!(summary["total_listening_time_ms"], 600_000);
    assert_eq!(summary["date_range"]["start"], "2023-06-05");
    assert_eq!(summary["date_range"]["end"], "2023-06-07");

    let eras: serde_json::Value = client
        .get(format!("{}/session/{}/eras", server.base_url, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let eras = eras.as_array().unwrap();
    assert_eq!(eras.len(), 1);
    assert_eq!(eras[0]["id"], 1);
    assert_eq!(eras[0]["title"], CANNED_TITLE);
    assert_eq!(eras[0]["top_artists"][0]["name"], "A");
    assert_eq!(eras[0]["top_artists"][0]["plays"], 3);
    assert_eq!(eras[0]["playlist_track_count"], 1);

    let detail: serde_json::Value = client
        .get(format!(
            "{}/session/{}/eras/1",
            server.base_url, session_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["id"], 1);
    assert_eq!(detail["title"], CANNED_TITLE);
    assert_eq!(detail["start_date"], "2023-06-05");
    assert_eq!(detail["end_date"], "2023-06-11");
    assert_eq!(detail["total_ms_played"], 600_000);
    assert_eq!(detail["top_tracks"][0]["track"], "T");
    assert_eq!(detail["top_tracks"][0]["plays"], 3);
    let playlist = &detail["playlist"];
    assert_eq!(playlist["era_id"], 1);
    assert_eq!(playlist["tracks"][0]["track_name"], "T");
    assert_eq!(playlist["tracks"][0]["play_count"], 3);
    assert!(playlist["tracks"][0]["uri"].is_null());
}

#[tokio::test]
async fn fallback_titles_apply_when_naming_is_disabled() {
    let server = TestServer::spawn_with(None, loose_segmenter()).await;
    let client = reqwest::Client::new();

    let data = history_json(&[
        ("2023-06-05T10:00:00Z", "A", "T", 200_000),
        ("2023-06-06T11:00:00Z", "A", "T", 200_000),
    ]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;
    trigger_processing(&client, &server.base_url, &session_id).await;
    wait_until_complete(&client, &server.base_url, &session_id).await;

    let detail: serde_json::Value = client
        .get(format!(
            "{}/session/{}/eras/1",
            server.base_url, session_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["title"], "Era 1: June 2023");
    assert!(detail["summary"]
        .as_str()
        .unwrap()
        .contains("featuring A and more"));
}

#[tokio::test]
async fn insignificant_uploads_fail_with_no_eras() {
    // Default thresholds: a single quiet week never survives the filter.
    let server = TestServer::spawn_with(None, SegmenterConfig::default()).await;
    let client = reqwest::Client::new();

    let data = history_json(&[("2023-06-05T10:00:00Z", "A", "T", 200_000)]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;
    trigger_processing(&client, &server.base_url, &session_id).await;

    let message = wait_until_failed(&client, &server.base_url, &session_id).await;
    assert_eq!(message, "No distinct eras found");
}

#[tokio::test]
async fn gap_split_yields_two_eras() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // ISO weeks 2 and 9: a 49 day gap between week starts.
    let data = history_json(&[
        ("2023-01-10T10:00:00Z", "A", "T", 200_000),
        ("2023-01-11T10:00:00Z", "A", "T", 200_000),
        ("2023-02-27T10:00:00Z", "A", "T", 200_000),
        ("2023-02-28T10:00:00Z", "A", "T", 200_000),
    ]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;
    trigger_processing(&client, &server.base_url, &session_id).await;
    let summary = wait_until_complete(&client, &server.base_url, &session_id).await;
    assert_eq!(summary["total_eras"], 2);

    let eras: serde_json::Value = client
        .get(format!("{}/session/{}/eras", server.base_url, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let eras = eras.as_array().unwrap();
    assert_eq!(eras[0]["id"], 1);
    assert_eq!(eras[1]["id"], 2);
    assert!(eras[0]["start_date"].as_str() < eras[1]["start_date"].as_str());
}

#[tokio::test]
async fn process_rejects_unknown_and_repeated_sessions() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/process/not-a-session", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let data = history_json(&[("2023-06-05T10:00:00Z", "A", "T", 200_000)]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;
    trigger_processing(&client, &server.base_url, &session_id).await;

    let response = client
        .post(format!("{}/process/{}", server.base_url, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn era_reads_validate_ids() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let data = history_json(&[("2023-06-05T10:00:00Z", "A", "T", 200_000)]);
    let session_id = upload_session(&client, &server.base_url, "history.json", data).await;
    trigger_processing(&client, &server.base_url, &session_id).await;
    wait_until_complete(&client, &server.base_url, &session_id).await;

    let response = client
        .get(format!(
            "{}/session/{}/eras/first",
            server.base_url, session_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .get(format!(
            "{}/session/{}/eras/999",
            server.base_url, session_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
