#![allow(clippy::unwrap_used)]
// Integration tests for `DetectionClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lookout_api::{DetectionClient, Error, ModelType, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DetectionClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = DetectionClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Camera listing ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_cameras() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "source_name": "Loading Dock", "stream_type": "live", "stream": "0", "location": "north"},
            {"id": 2, "source_name": "Archive", "stream_type": "video", "stream": "/data/a.mp4"},
            {"id": 3, "source_name": "Lobby", "stream_type": null}
        ])))
        .mount(&server)
        .await;

    let cameras = client.list_cameras().await.unwrap();

    assert_eq!(cameras.len(), 3);
    assert_eq!(cameras[0].id.to_string(), "1");
    assert_eq!(cameras[0].source_name.as_deref(), Some("Loading Dock"));
    assert_eq!(cameras[0].location.as_deref(), Some("north"));
    assert_eq!(cameras[1].stream_type_or_default(), "video");
    assert_eq!(cameras[2].stream_type_or_default(), "live");
}

#[tokio::test]
async fn test_list_cameras_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let result = client.list_cameras().await;

    assert!(
        matches!(result, Err(Error::Status { status: 500, ref body }) if body == "database unavailable"),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_cameras_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let result = client.list_cameras().await;

    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("proxy error")),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Stream commands ─────────────────────────────────────────────────

#[tokio::test]
async fn test_start_stream_sends_model_type() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/start_camera_stream/4"))
        .and(body_json(json!({"model_type": "segmentation"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Camera 4 started", "model_key": "yolo-seg"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ack = client
        .start_stream("4", ModelType::Segmentation)
        .await
        .unwrap();

    assert_eq!(ack["model_key"], "yolo-seg");
}

#[tokio::test]
async fn test_start_stream_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/start_camera_stream/9"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Camera not found"})),
        )
        .mount(&server)
        .await;

    let err = client
        .start_stream("9", ModelType::ObjectDetection)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_stop_stream_tolerates_non_json_ack() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/stop_camera_stream/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client.stop_stream("4").await.unwrap();
    assert!(ack.is_null());
}

// ── Frames ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_frame_returns_bytes() {
    let (server, client) = setup().await;
    let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    Mock::given(method("GET"))
        .and(path("/process_frame/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(jpeg.clone()),
        )
        .mount(&server)
        .await;

    let frame = client.fetch_frame("2").await.unwrap();
    assert_eq!(frame.as_ref(), jpeg.as_slice());
}

#[tokio::test]
async fn test_fetch_frame_not_ready() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/process_frame/2"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "No frame available"})),
        )
        .mount(&server)
        .await;

    let err = client.fetch_frame("2").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_fetch_frame_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/process_frame/2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client.fetch_frame("2").await.unwrap_err();
    assert!(matches!(err, Error::EmptyFrame));
}

#[tokio::test]
async fn test_fetch_frame_times_out() {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
    let client = DetectionClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/process_frame/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1, 2, 3])
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.fetch_frame("1").await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
    assert!(err.is_transient());
}

// ── Statistics ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_realtime_stats() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/detection-stats/real-time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalDetections": 1200,
            "activeCameras": 2,
            "detectionRate": [
                {"time": "2024-06-15T10:31:00", "count": 14},
                {"time": "2024-06-15T10:30:00", "count": 9}
            ],
            "latestDetections": [{
                "id": 88,
                "model_type": "objectDetection",
                "class_name": "person",
                "camera_name": "Loading Dock",
                "timestamp": "2024-06-15T10:31:12"
            }]
        })))
        .mount(&server)
        .await;

    let stats = client.realtime_stats().await.unwrap();

    assert_eq!(stats.total_detections, 1200);
    assert_eq!(stats.active_cameras, 2);
    assert_eq!(stats.detection_rate.len(), 2);
    assert_eq!(stats.detection_rate[0].count, 14);
    assert_eq!(
        stats.latest_detections[0].class_name.as_deref(),
        Some("person")
    );
}
