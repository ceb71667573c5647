//! Board editor: wires canvas emissions to the element store.
//!
//! ```text
//! touch ─▶ BoardCanvas ─▶ Emission ─▶ ElementStore::update ─▶ Repository
//!              ▲                                │
//!              └──── complete + sync ◀──────────┘
//! ```

use std::time::Duration;

use board_core::{
    BoardCanvas, BoardElement, BoardError, BoardId, BoardResult, CanvasResponse, ElementDraft,
    ElementId, Emission, EmissionOutcome, EngineConfig, RenderItem, TouchEvent,
};
use tracing::{debug, warn};

use crate::repository::Repository;
use crate::store::ElementStore;

/// One board being edited.
#[derive(Debug)]
pub struct BoardEditor<R> {
    store: ElementStore<R>,
    canvas: BoardCanvas,
    last_error: Option<String>,
}

impl<R: Repository> BoardEditor<R> {
    /// Create an editor over a store.
    pub fn new(store: ElementStore<R>, config: EngineConfig) -> Self {
        let mut editor = Self {
            store,
            canvas: BoardCanvas::new(config),
            last_error: None,
        };
        editor.sync();
        editor
    }

    /// The element store.
    pub fn store(&self) -> &ElementStore<R> {
        &self.store
    }

    /// The canvas.
    pub fn canvas(&self) -> &BoardCanvas {
        &self.canvas
    }

    fn sync(&mut self) {
        let canvas = &mut self.canvas;
        self.store.with_elements(|elements| canvas.sync(elements));
    }

    fn record_failure(&mut self, err: &BoardError) {
        warn!(error = %err, "Board mutation failed");
        self.last_error = Some(err.user_message());
    }

    /// Load a board and mount its elements.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::load`] errors. The store keeps a fetch
    /// failure as its load error for a full-screen error state.
    pub async fn open(&mut self, board: BoardId) -> BoardResult<()> {
        self.store.load(board).await?;
        self.canvas.clear_selection();
        self.sync();
        Ok(())
    }

    /// Route a touch without persisting anything.
    ///
    /// A returned emission must be passed to [`BoardEditor::commit`]; the
    /// element refuses new gestures until it is.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> CanvasResponse {
        self.canvas.handle_touch(event)
    }

    /// Persist a completed transform.
    ///
    /// On failure the element springs back to its persisted geometry and the
    /// message is kept as the last error.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::update`] errors.
    pub async fn commit(&mut self, emission: Emission) -> BoardResult<BoardElement> {
        debug!(element = %emission.element, delta = ?emission.delta, "Committing transform");
        match self
            .store
            .update(emission.element, emission.delta.into())
            .await
        {
            Ok(record) => {
                self.canvas
                    .complete(emission.element, EmissionOutcome::Persisted(&record));
                self.sync();
                Ok(record)
            }
            Err(err) => {
                self.canvas.complete(emission.element, EmissionOutcome::Failed);
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Route a touch and persist whatever it completes.
    ///
    /// # Errors
    ///
    /// Propagates [`BoardEditor::commit`] errors.
    pub async fn dispatch(&mut self, event: &TouchEvent) -> BoardResult<CanvasResponse> {
        let response = self.canvas.handle_touch(event);
        if let Some(emission) = response.emission {
            self.commit(emission).await?;
        }
        Ok(response)
    }

    /// Add an element to the board.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::add`] errors.
    pub async fn add_element(&mut self, draft: ElementDraft) -> BoardResult<BoardElement> {
        match self.store.add(draft).await {
            Ok(record) => {
                self.sync();
                Ok(record)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Remove an element from the board.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::remove`] errors.
    pub async fn remove_element(&mut self, id: ElementId) -> BoardResult<()> {
        match self.store.remove(id).await {
            Ok(()) => {
                self.sync();
                Ok(())
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Remove the selected element, if any, returning its id.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::remove`] errors.
    pub async fn remove_selected(&mut self) -> BoardResult<Option<ElementId>> {
        let Some(id) = self.canvas.selected() else {
            return Ok(None);
        };
        self.remove_element(id).await?;
        Ok(Some(id))
    }

    /// Stack an element above every other element.
    ///
    /// # Errors
    ///
    /// Propagates [`ElementStore::bring_to_front`] errors.
    pub async fn bring_to_front(&mut self, id: ElementId) -> BoardResult<BoardElement> {
        match self.store.bring_to_front(id).await {
            Ok(record) => {
                self.sync();
                Ok(record)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Select an element. Returns false if it is not on the board.
    pub fn select(&mut self, id: ElementId) -> bool {
        self.canvas.select(id)
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.canvas.clear_selection();
    }

    /// The selected element.
    pub fn selected(&self) -> Option<ElementId> {
        self.canvas.selected()
    }

    /// Advance settle animations. Returns true while anything moves.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.canvas.tick(dt)
    }

    /// Draw instructions for the current frame.
    pub fn render(&self) -> Vec<RenderItem> {
        self.store
            .with_elements(|elements| self.canvas.render(elements))
    }

    /// Message of the last failed mutation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Take the last error, e.g. once a modal has shown it.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Detach from the store; pending calls no longer touch state.
    pub fn close(&self) {
        self.store.close();
    }
}
