//! Board editor integration tests.
//!
//! Drives touch sequences through the editor and checks what reaches the
//! store: persisted drags, reverted failures, pinch never persisting and
//! selection-driven removal.

use std::sync::Arc;
use std::time::Duration;

use board_core::{
    BoardError, BoardId, ElementDraft, ElementKind, EngineConfig, TouchDisposition, TouchEvent,
    TouchPhase, TouchPoint, TransformEngine,
};
use board_store::{BoardEditor, ElementStore, MemoryRepository, RepoOp};

fn touch(phase: TouchPhase, points: &[(u32, f32, f32)], t: u64) -> TouchEvent {
    TouchEvent::new(
        phase,
        points
            .iter()
            .map(|&(id, x, y)| TouchPoint::new(id, x, y))
            .collect(),
        t,
    )
}

fn photo() -> ElementDraft {
    ElementDraft::new(ElementKind::Image {
        uri: "https://cdn.example/lake.jpg".to_string(),
    })
    .with_size(200.0, 200.0)
}

async fn open_editor() -> BoardEditor<Arc<MemoryRepository>> {
    let store = ElementStore::new(Arc::new(MemoryRepository::new()));
    let mut editor = BoardEditor::new(store, EngineConfig::default());
    editor.open(BoardId::new("board-1")).await.expect("open");
    editor
}

fn settle<R: board_store::Repository>(editor: &mut BoardEditor<R>) {
    let mut frames = 0;
    while editor.tick(Duration::from_millis(16)) {
        frames += 1;
        assert!(frames < 10_000, "settle never finished");
    }
}

/// Drag one finger from `from` to `to` through the editor.
async fn drag<R: board_store::Repository>(
    editor: &mut BoardEditor<R>,
    from: (f32, f32),
    to: (f32, f32),
) -> Result<(), BoardError> {
    editor
        .dispatch(&touch(TouchPhase::Start, &[(0, from.0, from.1)], 0))
        .await?;
    editor
        .dispatch(&touch(TouchPhase::Move, &[(0, to.0, to.1)], 16))
        .await?;
    editor.dispatch(&touch(TouchPhase::End, &[], 32)).await?;
    Ok(())
}

// ============================================================================
// Transforms
// ============================================================================

#[tokio::test]
async fn test_drag_on_selected_element_persists_position() {
    let mut editor = open_editor().await;
    let el = editor.add_element(photo()).await.expect("add");
    assert!(editor.select(el.id));

    drag(&mut editor, (100.0, 100.0), (130.0, 80.0))
        .await
        .expect("drag");
    settle(&mut editor);

    let stored = editor.store().get(el.id).expect("stored");
    assert!((stored.position_x - 30.0).abs() < 1e-4);
    assert!((stored.position_y + 20.0).abs() < 1e-4);
    assert!((stored.width - el.width).abs() < f32::EPSILON);
    assert_eq!(editor.store().repository().calls(RepoOp::Update), 1);

    let engine = editor.canvas().engine(el.id).expect("engine");
    assert_eq!(engine.geometry(), stored.geometry());
    assert!(!engine.is_awaiting_persistence());
}

#[tokio::test]
async fn test_failed_update_reverts_and_reports() {
    let mut editor = open_editor().await;
    let el = editor.add_element(photo()).await.expect("add");
    editor.select(el.id);
    editor
        .store()
        .repository()
        .fail_next(RepoOp::Update, "permission denied");

    let err = drag(&mut editor, (100.0, 100.0), (180.0, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::Update(_)));
    assert_eq!(
        editor.last_error(),
        Some("request rejected: permission denied")
    );
    settle(&mut editor);

    let engine = editor.canvas().engine(el.id).expect("engine");
    assert_eq!(engine.geometry(), el.geometry());
    assert_eq!(editor.store().get(el.id), Some(el.clone()));
    let item = editor
        .render()
        .into_iter()
        .find(|i| i.id == el.id)
        .expect("rendered");
    assert!((item.geometry.x - el.position_x).abs() < 0.01);

    assert!(editor.take_error().is_some());
    assert!(editor.last_error().is_none());

    drag(&mut editor, (100.0, 100.0), (110.0, 100.0))
        .await
        .expect("next gesture is accepted");
}

#[tokio::test]
async fn test_pinch_never_reaches_the_store() {
    let mut editor = open_editor().await;
    let el = editor.add_element(photo().at(0.0, 0.0)).await.expect("add");
    editor.select(el.id);

    let pair = |r: f32| [(0, 100.0 - r, 100.0), (1, 100.0 + r, 100.0)];
    editor
        .dispatch(&touch(TouchPhase::Start, &pair(40.0), 0))
        .await
        .expect("start");
    for (i, r) in [55.0, 70.0, 90.0].into_iter().enumerate() {
        let response = editor
            .dispatch(&touch(TouchPhase::Move, &pair(r), 16 * (i as u64 + 1)))
            .await
            .expect("move");
        assert!(response.disposition.stops_propagation());
    }
    let end = editor
        .dispatch(&touch(TouchPhase::End, &[], 80))
        .await
        .expect("end");
    assert!(end.emission.is_none());
    settle(&mut editor);

    assert_eq!(editor.store().repository().calls(RepoOp::Update), 0);
    editor.open(BoardId::new("board-1")).await.expect("refetch");
    assert_eq!(
        editor.store().get(el.id).map(|e| e.geometry()),
        Some(el.geometry())
    );
    let engine = editor.canvas().engine(el.id).expect("engine");
    assert!((engine.rendered().scale - 1.0).abs() < 1e-3);
}

// ============================================================================
// Selection and board actions
// ============================================================================

#[tokio::test]
async fn test_first_touch_selects_and_background_clears() {
    let mut editor = open_editor().await;
    let el = editor.add_element(photo()).await.expect("add");

    let response = editor
        .dispatch(&touch(TouchPhase::Start, &[(0, 50.0, 50.0)], 0))
        .await
        .expect("start");
    assert_eq!(
        response.disposition,
        TouchDisposition::Consumed {
            element: el.id,
            newly_selected: true
        }
    );
    editor
        .dispatch(&touch(TouchPhase::End, &[], 10))
        .await
        .expect("end");
    assert_eq!(editor.selected(), Some(el.id));
    assert!(editor
        .canvas()
        .engine(el.id)
        .is_some_and(TransformEngine::is_selected));

    let response = editor
        .dispatch(&touch(TouchPhase::Start, &[(0, 900.0, 900.0)], 20))
        .await
        .expect("background");
    assert_eq!(response.disposition, TouchDisposition::PassThrough);
    assert_eq!(editor.selected(), None);
}

#[tokio::test]
async fn test_new_elements_render_on_top_and_remove_selected() {
    let mut editor = open_editor().await;
    let below = editor.add_element(photo()).await.expect("below");
    let above = editor
        .add_element(ElementDraft::new(ElementKind::Text {
            content: "Learn Portuguese".to_string(),
            font_size: 20.0,
            color: "#222222".to_string(),
        }))
        .await
        .expect("above");

    let order: Vec<_> = editor.render().iter().map(|i| i.id).collect();
    assert_eq!(order, vec![below.id, above.id]);
    assert!(above.z_index > below.z_index);

    editor.select(below.id);
    let removed = editor.remove_selected().await.expect("remove");
    assert_eq!(removed, Some(below.id));
    assert_eq!(editor.selected(), None);
    assert!(editor.canvas().engine(below.id).is_none());
    assert_eq!(editor.remove_selected().await.expect("nothing selected"), None);
}

#[tokio::test]
async fn test_bring_to_front_restacks() {
    let mut editor = open_editor().await;
    let a = editor.add_element(photo()).await.expect("a");
    let b = editor.add_element(photo().at(300.0, 0.0)).await.expect("b");

    editor.bring_to_front(a.id).await.expect("raise");
    assert_eq!(editor.canvas().paint_order(), &[b.id, a.id]);
}

#[tokio::test]
async fn test_closed_editor_reports_error() {
    let mut editor = open_editor().await;
    editor.close();
    let err = editor.add_element(photo()).await.unwrap_err();
    assert!(matches!(err, BoardError::NotConfigured(_)));
    assert!(editor.last_error().is_some());
}
