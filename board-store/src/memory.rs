//! In-memory repository for tests, demos and offline use.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use board_core::{BoardElement, BoardId, ElementId, ElementPatch, NewElement};
use chrono::{DateTime, Duration, Utc};

use crate::repository::{Repository, RepositoryError};

/// Repository operations, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    /// `list_elements`
    List,
    /// `create_element`
    Create,
    /// `update_element`
    Update,
    /// `delete_element`
    Delete,
}

/// Repository that keeps rows in memory.
///
/// Failures can be queued per operation with [`MemoryRepository::fail_next`];
/// each queued failure is consumed by the next call of that kind.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    rows: RwLock<Vec<BoardElement>>,
    failures: Mutex<HashMap<RepoOp, VecDeque<String>>>,
    calls: Mutex<HashMap<RepoOp, usize>>,
    last_created: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with rows.
    #[must_use]
    pub fn with_elements(elements: Vec<BoardElement>) -> Self {
        let repo = Self::new();
        *repo.rows.write().unwrap_or_else(PoisonError::into_inner) = elements;
        repo
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: RepoOp, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    /// Number of calls made for `op`, including failed ones.
    #[must_use]
    pub fn calls(&self, op: RepoOp) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Total calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Read a row directly, bypassing call accounting.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<BoardElement> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enter(&self, op: RepoOp) -> Result<(), RepositoryError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_default() += 1;
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(message) => Err(RepositoryError::Rejected(message)),
            None => Ok(()),
        }
    }

    /// Creation timestamps are strictly increasing so list order is total.
    fn next_created_at(&self) -> DateTime<Utc> {
        let mut last = self
            .last_created
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let stamp = match *last {
            Some(prev) if prev >= now => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_elements(&self, board: &BoardId) -> Result<Vec<BoardElement>, RepositoryError> {
        self.enter(RepoOp::List)?;
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut elements: Vec<BoardElement> =
            rows.iter().filter(|e| &e.board_id == board).cloned().collect();
        elements.sort_by_key(|e| e.created_at);
        Ok(elements)
    }

    async fn create_element(&self, element: &NewElement) -> Result<BoardElement, RepositoryError> {
        self.enter(RepoOp::Create)?;
        let record = element
            .clone()
            .into_element(ElementId::new(), self.next_created_at());
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    async fn update_element(
        &self,
        id: ElementId,
        patch: &ElementPatch,
    ) -> Result<BoardElement, RepositoryError> {
        self.enter(RepoOp::Update)?;
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let row = rows
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        row.apply_patch(patch);
        Ok(row.clone())
    }

    async fn delete_element(&self, id: ElementId) -> Result<(), RepositoryError> {
        self.enter(RepoOp::Delete)?;
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let before = rows.len();
        rows.retain(|e| e.id != id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use board_core::{ElementDraft, ElementKind};

    use super::*;

    fn draft(board: &str) -> NewElement {
        ElementDraft::new(ElementKind::Image {
            uri: "https://cdn.example/mountain.jpg".to_string(),
        })
        .into_new(BoardId::new(board), 0)
    }

    #[tokio::test]
    async fn test_create_assigns_identity_and_lists_in_creation_order() {
        let repo = MemoryRepository::new();
        let a = repo.create_element(&draft("b1")).await.expect("create a");
        let b = repo.create_element(&draft("b1")).await.expect("create b");
        repo.create_element(&draft("other")).await.expect("create other");

        assert_ne!(a.id, b.id);
        assert!(a.created_at < b.created_at);

        let listed = repo.list_elements(&BoardId::new("b1")).await.expect("list");
        let ids: Vec<_> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let repo = MemoryRepository::new();
        repo.fail_next(RepoOp::Create, "quota exceeded");

        let err = repo.create_element(&draft("b1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Rejected(ref m) if m == "quota exceeded"));
        assert!(repo.is_empty());

        repo.create_element(&draft("b1")).await.expect("second create");
        assert_eq!(repo.calls(RepoOp::Create), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_rows() {
        let repo = MemoryRepository::new();
        let missing = ElementId::new();
        assert!(matches!(
            repo.update_element(missing, &ElementPatch::rotation(1.0)).await,
            Err(RepositoryError::NotFound(id)) if id == missing
        ));
        assert!(matches!(
            repo.delete_element(missing).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
