#![allow(clippy::unwrap_used)]
// End-to-end tests for `LiveSession` against a mocked detection service.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lookout_core::{CameraId, CoreError, LiveSession, PollerState, SessionConfig, StreamAction};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(camera_ids: &[u64]) -> (MockServer, LiveSession) {
    let server = MockServer::start().await;
    let cameras: Vec<_> = camera_ids
        .iter()
        .map(|id| json!({"id": id, "source_name": format!("Cam {id}"), "stream_type": "live"}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cameras))
        .mount(&server)
        .await;

    let config = SessionConfig {
        probe_on_start: false,
        timeout: Duration::from_secs(2),
        ..SessionConfig::new(Url::parse(&server.uri()).unwrap())
    };
    let session = LiveSession::connect(config).unwrap();
    (server, session)
}

async fn mount_start(server: &MockServer, id: u64, status: u16) {
    Mock::given(method("POST"))
        .and(path(format!("/start_camera_stream/{id}")))
        .and(body_json(json!({"model_type": "objectDetection"})))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"message": "ok"})))
        .mount(server)
        .await;
}

async fn mount_frame(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/process_frame/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xD9]))
        .mount(server)
        .await;
}

async fn wait_for_frame(session: &LiveSession, id: &CameraId) {
    for _ in 0..50 {
        if session.camera(id).is_some_and(|c| c.frame.is_some()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no frame arrived for camera {id}");
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_all_with_one_failing_camera() {
    let (server, session) = setup(&[1, 2, 3]).await;
    mount_start(&server, 1, 200).await;
    mount_start(&server, 2, 500).await;
    mount_start(&server, 3, 200).await;
    for id in [1, 3] {
        mount_frame(&server, id).await;
    }

    let report = session.start().await.unwrap();
    assert_eq!(report.live, 3);

    let batch = session.start_all().await;

    assert_eq!(batch.succeeded, vec![CameraId::from(1), CameraId::from(3)]);
    assert_eq!(batch.failed.len(), 1);
    let (failed, err) = &batch.failed[0];
    assert_eq!(failed, &CameraId::from(2));
    assert!(matches!(
        err,
        CoreError::Command {
            action: StreamAction::Start,
            transient: true,
            ..
        }
    ));

    wait_for_frame(&session, &CameraId::from(1)).await;
    wait_for_frame(&session, &CameraId::from(3)).await;
    let failed_camera = session.camera(&CameraId::from(2)).unwrap();
    assert!(!failed_camera.is_streaming);
    assert!(failed_camera.last_error.is_some());
    assert_eq!(session.poller_state(&CameraId::from(2)), PollerState::Idle);

    session.shutdown().await;
    assert_eq!(session.frame_ledger().live(), 0);
}

#[tokio::test]
async fn test_stop_one_releases_frame() {
    let (server, session) = setup(&[7]).await;
    mount_start(&server, 7, 200).await;
    mount_frame(&server, 7).await;
    Mock::given(method("POST"))
        .and(path("/stop_camera_stream/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stopped"))
        .expect(1)
        .mount(&server)
        .await;

    session.start().await.unwrap();
    let id = CameraId::from(7);
    session.start_one(&id).await.unwrap();
    wait_for_frame(&session, &id).await;

    session.stop_one(&id).await.unwrap();
    // A second stop on an idle camera must not reach the service.
    session.stop_one(&id).await.unwrap();

    let camera = session.camera(&id).unwrap();
    assert!(!camera.is_streaming);
    assert!(camera.frame.is_none());
    assert!(!session.is_any_streaming());
    session.store().check_invariants().unwrap();
    session.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_directory_gives_empty_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = LiveSession::connect(SessionConfig::new(Url::parse(&server.uri()).unwrap())).unwrap();

    assert!(session.start().await.is_none());
    assert!(session.cameras().is_empty());
    assert!(!session.warnings().await.is_empty());
    session.shutdown().await;
}

#[tokio::test]
async fn test_probe_marks_running_cameras() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "source_name": "Yard", "stream_type": "live"},
            {"id": 2, "source_name": "Gate", "stream_type": "live"}
        ])))
        .mount(&server)
        .await;
    mount_frame(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/process_frame/2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "no frame"})))
        .mount(&server)
        .await;

    let session = LiveSession::connect(SessionConfig::new(Url::parse(&server.uri()).unwrap())).unwrap();
    let report = session.start().await.unwrap();

    assert_eq!(report.probed_streaming, 1);
    assert!(session.camera(&CameraId::from(1)).unwrap().is_streaming);
    assert!(!session.camera(&CameraId::from(2)).unwrap().is_streaming);
    session.shutdown().await;
}
