//! REST repository tests against a mock service.
//!
//! Covers the request shape (path, filters, headers, bodies) and how
//! responses map onto repository results and store errors.

use board_core::{BoardError, BoardId, ElementDraft, ElementId, ElementKind, ElementPatch};
use board_store::{ElementStore, Repository, RepositoryError, RestRepository, StoreConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE_PATH: &str = "/rest/v1/vision_board_elements";
const ELEMENT_ID: &str = "6f1c2a1e-8d4b-4c5e-9f0a-2b3c4d5e6f70";

fn repo_for(server: &MockServer) -> RestRepository {
    RestRepository::new(&StoreConfig::new(server.uri(), "anon-key")).expect("repository")
}

/// A row as the service returns it: every column present, unused ones null.
fn text_row(id: &str, rotation: f64, created_at: &str) -> Value {
    json!({
        "id": id,
        "board_id": "board-1",
        "type": "text",
        "position_x": 10.0,
        "position_y": 20.0,
        "width": 200.0,
        "height": 80.0,
        "rotation": rotation,
        "z_index": 0,
        "created_at": created_at,
        "content": "Run a marathon",
        "font_size": 24.0,
        "color": "#ff6600",
        "uri": null,
        "char": null
    })
}

// ============================================================================
// Request shape
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_list_filters_by_board_and_orders_by_creation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("board_id", "eq.board-1"))
        .and(query_param("order", "created_at.asc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            text_row(ELEMENT_ID, 0.0, "2024-05-01T10:00:00Z"),
            text_row("0b7a9d52-1111-4222-8333-944455556666", 0.5, "2024-05-01T10:05:00Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let elements = repo_for(&server)
        .list_elements(&BoardId::new("board-1"))
        .await
        .expect("list");

    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].id.to_string(), ELEMENT_ID);
    assert!(matches!(
        elements[0].kind,
        ElementKind::Text { ref content, .. } if content == "Run a marathon"
    ));
    assert!((elements[1].rotation - 0.5).abs() < f32::EPSILON);
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_create_posts_payload_and_returns_representation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({
            "board_id": "board-1",
            "type": "emoji",
            "char": "🏔",
            "font_size": 64.0,
            "position_x": 0.0,
            "position_y": 0.0,
            "width": 100.0,
            "height": 100.0,
            "rotation": 0.0,
            "z_index": 0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": ELEMENT_ID,
            "board_id": "board-1",
            "type": "emoji",
            "char": "🏔",
            "font_size": 64.0,
            "position_x": 0.0,
            "position_y": 0.0,
            "width": 100.0,
            "height": 100.0,
            "rotation": 0.0,
            "z_index": 0,
            "created_at": "2024-05-01T10:00:00Z",
            "uri": null,
            "content": null,
            "color": null
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let new = ElementDraft::new(ElementKind::Emoji {
        glyph: "🏔".to_string(),
        font_size: 64.0,
    })
    .with_size(100.0, 100.0)
    .into_new(BoardId::new("board-1"), 0);
    let created = repo_for(&server).create_element(&new).await.expect("create");

    assert_eq!(created.id.to_string(), ELEMENT_ID);
    assert_eq!(created.kind, new.kind);
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_update_sends_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", format!("eq.{ELEMENT_ID}")))
        .and(body_json(json!({ "rotation": 1.25 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([text_row(ELEMENT_ID, 1.25, "2024-05-01T10:00:00Z")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id: ElementId = ELEMENT_ID.parse().expect("id");
    let updated = repo_for(&server)
        .update_element(id, &ElementPatch::rotation(1.25))
        .await
        .expect("update");
    assert!((updated.rotation - 1.25).abs() < f32::EPSILON);
    assert!((updated.position_x - 10.0).abs() < f32::EPSILON);
}

// ============================================================================
// Response mapping
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_update_with_no_matching_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let id: ElementId = ELEMENT_ID.parse().expect("id");
    let err = repo_for(&server)
        .update_element(id, &ElementPatch::position(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(missing) if missing == id));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_error_status_carries_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "42501",
            "message": "new row violates row-level security policy"
        })))
        .mount(&server)
        .await;

    let id: ElementId = ELEMENT_ID.parse().expect("id");
    let err = repo_for(&server).delete_element(id).await.unwrap_err();
    match err {
        RepositoryError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "new row violates row-level security policy");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = repo_for(&server)
        .list_elements(&BoardId::new("board-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Decode(_)));
}

// ============================================================================
// Store over REST
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_store_load_failure_surfaces_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "database unavailable"
        })))
        .mount(&server)
        .await;

    let store = ElementStore::new(repo_for(&server));
    let err = store.load(BoardId::new("board-1")).await.unwrap_err();

    assert!(matches!(err, BoardError::Fetch(_)));
    assert_eq!(
        err.user_message(),
        "backend returned 500: database unavailable"
    );
    assert_eq!(store.load_error().as_deref(), Some(err.user_message().as_str()));
    assert!(!store.is_loading());
    assert!(store.board().is_none());
}

#[tokio::test]
async fn test_store_load_with_blank_board_makes_no_request() {
    let server = MockServer::start().await;
    let store = ElementStore::new(repo_for(&server));

    let err = store.load(BoardId::new("")).await.unwrap_err();
    assert!(matches!(err, BoardError::NotConfigured(_)));

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}
