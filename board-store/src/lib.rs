//! # Vision Board Store
//!
//! Persistence for vision boards. The [`ElementStore`] owns the canonical
//! element list of one board and talks to a [`Repository`]; the
//! [`BoardEditor`] feeds completed canvas gestures into it.
//!
//! Two repositories ship with the crate:
//! - [`RestRepository`] for the hosted relational service
//! - [`MemoryRepository`] for tests and offline use

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod editor;
pub mod memory;
pub mod repository;
pub mod rest;
pub mod store;

pub use config::StoreConfig;
pub use editor::BoardEditor;
pub use memory::{MemoryRepository, RepoOp};
pub use repository::{Repository, RepositoryError};
pub use rest::RestRepository;
pub use store::ElementStore;
