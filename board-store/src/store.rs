//! The element store: the only owner of a board's canonical element list.
//!
//! Every mutation goes to the repository first and touches local state only
//! after the repository confirms it. A failed call leaves the list exactly as
//! it was.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use board_core::validation::{validate_board_id, validate_draft, validate_patch};
use board_core::{
    BoardElement, BoardError, BoardId, BoardResult, ElementDraft, ElementId, ElementPatch,
};
use tracing::{debug, info, warn};

use crate::repository::Repository;

#[derive(Debug, Default)]
struct StoreState {
    board: Option<BoardId>,
    elements: Vec<BoardElement>,
    loading: bool,
    load_error: Option<String>,
    in_flight: HashSet<ElementId>,
}

/// Marks an element as having a mutation outstanding until dropped.
struct InFlight {
    state: Arc<RwLock<StoreState>>,
    id: ElementId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(&self.id);
    }
}

/// Loads, caches and mutates the elements of one board.
///
/// Clones share the same state, so a clone can be handed to a spawned task.
#[derive(Debug)]
pub struct ElementStore<R> {
    repo: R,
    state: Arc<RwLock<StoreState>>,
    alive: Arc<AtomicBool>,
}

impl<R: Clone> Clone for ElementStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            state: Arc::clone(&self.state),
            alive: Arc::clone(&self.alive),
        }
    }
}

impl<R: Repository> ElementStore<R> {
    /// Create a store with no active board.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            state: Arc::new(RwLock::new(StoreState::default())),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The backing repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> BoardResult<()> {
        if self.is_closed() {
            return Err(BoardError::NotConfigured("element store is closed".to_string()));
        }
        Ok(())
    }

    /// Returns false and logs if the store was closed while `op` was pending.
    fn still_alive(&self, op: &'static str) -> bool {
        let alive = !self.is_closed();
        if !alive {
            warn!(op, "Dropping late resolution after store closed");
        }
        alive
    }

    fn claim(&self, id: ElementId) -> BoardResult<InFlight> {
        let mut state = self.write();
        if !state.elements.iter().any(|e| e.id == id) {
            return Err(BoardError::ElementNotFound(id));
        }
        if !state.in_flight.insert(id) {
            return Err(BoardError::Busy(id));
        }
        Ok(InFlight {
            state: Arc::clone(&self.state),
            id,
        })
    }

    /// Load every element of `board`, oldest first.
    ///
    /// A blank id fails before any repository call. On failure the previous
    /// board and elements stay in place and the message is kept as the load
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] for a blank id,
    /// [`BoardError::Validation`] for a malformed one and
    /// [`BoardError::Fetch`] if the repository call fails.
    pub async fn load(&self, board: BoardId) -> BoardResult<()> {
        self.ensure_open()?;
        if board.is_blank() {
            return Err(BoardError::NotConfigured("board id is empty".to_string()));
        }
        validate_board_id(&board)?;

        {
            let mut state = self.write();
            state.loading = true;
            state.load_error = None;
        }
        debug!(board = %board, "Loading elements");
        let result = self.repo.list_elements(&board).await;
        self.write().loading = false;

        if !self.still_alive("load") {
            return result
                .map(|_| ())
                .map_err(|e| BoardError::Fetch(e.to_string()));
        }
        let mut state = self.write();
        match result {
            Ok(elements) => {
                info!(board = %board, count = elements.len(), "Loaded elements");
                state.board = Some(board);
                state.elements = elements;
                Ok(())
            }
            Err(e) => {
                warn!(board = %board, error = %e, "Failed to load elements");
                let message = e.to_string();
                state.load_error = Some(message.clone());
                Err(BoardError::Fetch(message))
            }
        }
    }

    /// Create an element on the active board.
    ///
    /// A draft without an explicit z-index is stacked above every existing
    /// element. The element appears locally only once the repository returns
    /// the canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] with no active board,
    /// [`BoardError::Validation`] for a bad draft and [`BoardError::Create`]
    /// if the repository call fails.
    pub async fn add(&self, draft: ElementDraft) -> BoardResult<BoardElement> {
        self.ensure_open()?;
        let (board, z_index) = {
            let state = self.read();
            let board = state
                .board
                .clone()
                .ok_or_else(|| BoardError::NotConfigured("no active board".to_string()))?;
            (board, next_z_index(&state.elements))
        };
        validate_draft(&draft)?;
        let new = draft.into_new(board, z_index);

        let record = self.repo.create_element(&new).await.map_err(|e| {
            warn!(board = %new.board_id, error = %e, "Failed to create element");
            BoardError::Create(e.to_string())
        })?;

        if self.still_alive("add") {
            let mut state = self.write();
            if state.board.as_ref() == Some(&record.board_id) {
                info!(element = %record.id, kind = record.kind.type_name(), z = record.z_index, "Created element");
                state.elements.push(record.clone());
            }
        }
        Ok(record)
    }

    /// Apply a partial update to an element.
    ///
    /// An empty patch returns the current record without a repository call.
    /// A second update for the same element while the first is pending is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::ElementNotFound`] for an unknown id,
    /// [`BoardError::Busy`] while a previous mutation is pending,
    /// [`BoardError::Validation`] for a bad patch and
    /// [`BoardError::Update`] if the repository call fails.
    pub async fn update(&self, id: ElementId, patch: ElementPatch) -> BoardResult<BoardElement> {
        self.ensure_open()?;
        if patch.is_empty() {
            return self.get(id).ok_or(BoardError::ElementNotFound(id));
        }
        validate_patch(&patch)?;
        let _guard = self.claim(id)?;

        let record = self.repo.update_element(id, &patch).await.map_err(|e| {
            warn!(element = %id, error = %e, "Failed to update element");
            BoardError::Update(e.to_string())
        })?;

        if self.still_alive("update") {
            let mut state = self.write();
            if let Some(slot) = state.elements.iter_mut().find(|e| e.id == id) {
                info!(element = %id, "Updated element");
                *slot = record.clone();
            }
        }
        Ok(record)
    }

    /// Delete an element. It leaves the local list only after the
    /// repository confirms.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::ElementNotFound`] for an unknown id,
    /// [`BoardError::Busy`] while a previous mutation is pending and
    /// [`BoardError::Delete`] if the repository call fails.
    pub async fn remove(&self, id: ElementId) -> BoardResult<()> {
        self.ensure_open()?;
        let _guard = self.claim(id)?;

        self.repo.delete_element(id).await.map_err(|e| {
            warn!(element = %id, error = %e, "Failed to delete element");
            BoardError::Delete(e.to_string())
        })?;

        if self.still_alive("remove") {
            info!(element = %id, "Deleted element");
            self.write().elements.retain(|e| e.id != id);
        }
        Ok(())
    }

    /// Restack an element above every other element.
    ///
    /// Does nothing if it is already alone on top.
    ///
    /// # Errors
    ///
    /// Same as [`ElementStore::update`].
    pub async fn bring_to_front(&self, id: ElementId) -> BoardResult<BoardElement> {
        let (current, top) = {
            let state = self.read();
            let current = state
                .elements
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or(BoardError::ElementNotFound(id))?;
            let top = state
                .elements
                .iter()
                .filter(|e| e.id != id)
                .map(|e| e.z_index)
                .max();
            (current, top)
        };
        match top {
            Some(top) if top >= current.z_index => {
                self.update(id, ElementPatch::z_index(top.saturating_add(1)))
                    .await
            }
            _ => Ok(current),
        }
    }
}

impl<R> ElementStore<R> {
    /// Snapshot of the canonical list in fetch order.
    pub fn elements(&self) -> Vec<BoardElement> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .elements
            .clone()
    }

    /// Borrow the canonical list without cloning it.
    pub fn with_elements<T>(&self, f: impl FnOnce(&[BoardElement]) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner).elements)
    }

    /// One element by id.
    pub fn get(&self, id: ElementId) -> Option<BoardElement> {
        self.with_elements(|elements| elements.iter().find(|e| e.id == id).cloned())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.with_elements(<[BoardElement]>::len)
    }

    /// True if the board has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The board last loaded successfully.
    pub fn board(&self) -> Option<BoardId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .board
            .clone()
    }

    /// True while a load is outstanding.
    pub fn is_loading(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .loading
    }

    /// Message from the most recent failed load, cleared by the next load.
    pub fn load_error(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .load_error
            .clone()
    }

    /// True while a mutation for `id` is pending.
    pub fn is_in_flight(&self, id: ElementId) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .contains(&id)
    }

    /// Highest z-index on the board.
    pub fn max_z_index(&self) -> Option<i32> {
        self.with_elements(|elements| elements.iter().map(|e| e.z_index).max())
    }

    /// Detach the store. Pending calls still resolve for their callers but
    /// no longer touch state, and new calls are refused.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Element store closed");
        }
    }

    /// True once [`ElementStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }
}

fn next_z_index(elements: &[BoardElement]) -> i32 {
    elements
        .iter()
        .map(|e| e.z_index)
        .max()
        .map_or(0, |z| z.saturating_add(1))
}
