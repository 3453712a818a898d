use std::time::Duration;

use convert_core::{
    ConversionRequest, ConvertError, JobHandle, JobStatus, MediaInfo, RequestStage, VideoQuality,
};
use convert_engine::{RemoteJobService, ReqwestJobService, ServiceSettings};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> ReqwestJobService {
    ReqwestJobService::new(&ServiceSettings {
        base_url: server.uri(),
        ..ServiceSettings::default()
    })
    .expect("service")
}

#[tokio::test]
async fn info_returns_media_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/info"))
        .and(body_json(json!({ "url": "https://video.example.com/watch?v=abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "title": "Example Song - Artist Name",
                "thumbnail": "https://img.example.com/abc.jpg",
                "duration": 212,
                "uploader": "Artist Name",
                "view_count": 1234
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = service_for(&server)
        .fetch_info("https://video.example.com/watch?v=abc")
        .await
        .expect("info");

    assert_eq!(
        info,
        MediaInfo {
            title: "Example Song - Artist Name".to_string(),
            thumbnail_url: "https://img.example.com/abc.jpg".to_string(),
            duration_seconds: 212,
            uploader: "Artist Name".to_string(),
            view_count: 1234,
        }
    );
}

#[tokio::test]
async fn info_failure_carries_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "video unavailable" })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .fetch_info("https://video.example.com/watch?v=gone")
        .await
        .unwrap_err();
    assert_eq!(err, ConvertError::Remote("video unavailable".to_string()));
}

#[tokio::test]
async fn info_success_without_data_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .fetch_info("https://video.example.com/watch?v=abc")
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Remote(_)));
}

#[tokio::test]
async fn start_job_sends_format_and_quality() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/download"))
        .and(body_json(json!({
            "url": "https://video.example.com/watch?v=abc",
            "format": "video",
            "quality": "1440p"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "download_id": "d-42" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = ConversionRequest::video(" https://video.example.com/watch?v=abc ", VideoQuality::P1440);
    let job = service_for(&server).start_job(&request).await.expect("job");
    assert_eq!(job, JobHandle::new("d-42"));
}

#[tokio::test]
async fn start_job_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/download"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "success": false, "error": "quota exceeded" })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .start_job(&ConversionRequest::audio("https://video.example.com/watch?v=abc"))
        .await
        .unwrap_err();
    assert_eq!(err, ConvertError::Remote("quota exceeded".to_string()));
}

#[tokio::test]
async fn progress_is_parsed_and_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/d-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "downloading",
            "progress": 140,
            "message": "converting"
        })))
        .mount(&server)
        .await;

    let snapshot = service_for(&server)
        .query_progress(&JobHandle::new("d-42"), Duration::from_secs(1))
        .await
        .expect("snapshot");
    assert_eq!(snapshot.status, JobStatus::Downloading);
    assert_eq!(snapshot.progress(), 100);
    assert_eq!(snapshot.message, "converting");
    assert_eq!(snapshot.filename, None);
}

#[tokio::test]
async fn failed_progress_uses_error_field_as_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/d-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "progress": 0,
            "message": "",
            "error": "ffmpeg crashed"
        })))
        .mount(&server)
        .await;

    let snapshot = service_for(&server)
        .query_progress(&JobHandle::new("d-42"), Duration::from_secs(1))
        .await
        .expect("snapshot");
    assert_eq!(snapshot.status, JobStatus::Error);
    assert_eq!(snapshot.message, "ffmpeg crashed");
}

#[tokio::test]
async fn unknown_progress_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/d-42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "queued", "progress": 0 })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .query_progress(&JobHandle::new("d-42"), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Remote(_)));
}

#[tokio::test]
async fn progress_query_is_bounded_by_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/d-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({ "status": "downloading", "progress": 1 })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .query_progress(&JobHandle::new("d-42"), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConvertError::Timeout {
            stage: RequestStage::Progress
        }
    );
}

#[tokio::test]
async fn non_json_error_status_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .fetch_info("https://video.example.com/watch?v=abc")
        .await
        .unwrap_err();
    assert_eq!(err, ConvertError::Network("http status 502".to_string()));
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let service = ReqwestJobService::new(&ServiceSettings {
        base_url: "http://127.0.0.1:1".to_string(),
        connect_timeout: Duration::from_millis(500),
        ..ServiceSettings::default()
    })
    .expect("service");

    let err = service
        .fetch_info("https://video.example.com/watch?v=abc")
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Network(_)), "got {err:?}");
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = ReqwestJobService::new(&ServiceSettings {
        base_url: "not a url".to_string(),
        ..ServiceSettings::default()
    });
    assert!(matches!(result, Err(ConvertError::Validation(_))));
}
