//! # Vision Board CLI
//!
//! Command-line arguments and the touch-session replay used by the
//! `vision-board` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use board_core::{
    BoardElement, BoardError, ElementDraft, ElementId, ElementKind, TouchEvent, TransformDelta,
};
use board_store::{BoardEditor, Repository, StoreConfig};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

/// Upper bound on frames spent settling after a replay.
const MAX_SETTLE_FRAMES: u32 = 2_000;

/// Command-line arguments for vision-board.
#[derive(Debug, Clone, Parser)]
#[command(name = "vision-board")]
#[command(about = "Inspect and edit vision boards")]
#[command(version)]
pub struct CliArgs {
    /// Service base URL
    #[arg(long, env = "BOARD_API_URL")]
    pub api_url: Option<String>,

    /// Service API key
    #[arg(long, env = "BOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Elements table name
    #[arg(
        long,
        env = "BOARD_ELEMENTS_TABLE",
        default_value = board_store::config::DEFAULT_ELEMENTS_TABLE
    )]
    pub table: String,

    /// Request timeout in seconds
    #[arg(
        long,
        env = "BOARD_REQUEST_TIMEOUT_SECS",
        default_value_t = board_store::config::DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    pub timeout_secs: u64,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Store configuration from the connection flags.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] if the URL or key is missing.
    pub fn store_config(&self) -> Result<StoreConfig, BoardError> {
        let api_url = self
            .api_url
            .clone()
            .ok_or_else(|| BoardError::NotConfigured("--api-url / BOARD_API_URL".to_string()))?;
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| BoardError::NotConfigured("--api-key / BOARD_API_KEY".to_string()))?;
        Ok(StoreConfig::new(api_url, api_key)
            .with_table(self.table.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

/// Board to operate on.
#[derive(Debug, Clone, Args)]
pub struct BoardArg {
    /// Board (cocreation) id
    #[arg(long, env = "BOARD_ID")]
    pub board: String,
}

/// Where a new element goes.
#[derive(Debug, Clone, Args)]
pub struct Placement {
    /// Left edge
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x: f32,
    /// Top edge
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub y: f32,
    /// Width (defaults per element type)
    #[arg(long)]
    pub width: Option<f32>,
    /// Height (defaults per element type)
    #[arg(long)]
    pub height: Option<f32>,
    /// Rotation in radians
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotation: f32,
}

impl Placement {
    /// Build a draft for `kind` at this placement.
    #[must_use]
    pub fn draft(&self, kind: ElementKind) -> ElementDraft {
        let draft = ElementDraft::new(kind);
        let width = self.width.unwrap_or(draft.width);
        let height = self.height.unwrap_or(draft.height);
        draft
            .at(self.x, self.y)
            .with_size(width, height)
            .with_rotation(self.rotation)
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every element of a board as JSON
    List {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
    },
    /// Add a text label
    AddText {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Position and size
        #[command(flatten)]
        placement: Placement,
        /// Text content
        #[arg(long)]
        content: String,
        /// Font size in pixels
        #[arg(long, default_value_t = 24.0)]
        font_size: f32,
        /// Text color
        #[arg(long, default_value = "#000000")]
        color: String,
    },
    /// Add an emoji
    AddEmoji {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Position and size
        #[command(flatten)]
        placement: Placement,
        /// The glyph
        #[arg(long)]
        glyph: String,
        /// Font size in pixels
        #[arg(long, default_value_t = 64.0)]
        font_size: f32,
    },
    /// Add a photo
    AddImage {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Position and size
        #[command(flatten)]
        placement: Placement,
        /// Image reference
        #[arg(long)]
        uri: String,
    },
    /// Add a sticker
    AddSticker {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Position and size
        #[command(flatten)]
        placement: Placement,
        /// Sticker reference
        #[arg(long)]
        uri: String,
    },
    /// Move an element
    Move {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element id
        #[arg(long)]
        element: ElementId,
        /// New left edge
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        /// New top edge
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
    /// Resize an element
    Resize {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element id
        #[arg(long)]
        element: ElementId,
        /// New width
        #[arg(long)]
        width: f32,
        /// New height
        #[arg(long)]
        height: f32,
    },
    /// Rotate an element
    Rotate {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element id
        #[arg(long)]
        element: ElementId,
        /// Absolute rotation in radians
        #[arg(long, allow_negative_numbers = true)]
        radians: f32,
    },
    /// Stack an element above all others
    Front {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element id
        #[arg(long)]
        element: ElementId,
    },
    /// Delete an element
    Remove {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element id
        #[arg(long)]
        element: ElementId,
    },
    /// Replay a recorded touch session against an element
    Replay {
        /// Target board
        #[command(flatten)]
        board: BoardArg,
        /// Element the session manipulates; selected before the first event
        #[arg(long)]
        element: ElementId,
        /// Frame interval between events, in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
        /// JSON file holding an array of touch events
        session: PathBuf,
    },
}

impl Command {
    /// The board this command targets.
    #[must_use]
    pub fn board(&self) -> &str {
        match self {
            Self::List { board }
            | Self::AddText { board, .. }
            | Self::AddEmoji { board, .. }
            | Self::AddImage { board, .. }
            | Self::AddSticker { board, .. }
            | Self::Move { board, .. }
            | Self::Resize { board, .. }
            | Self::Rotate { board, .. }
            | Self::Front { board, .. }
            | Self::Remove { board, .. }
            | Self::Replay { board, .. } => &board.board,
        }
    }
}

/// Read a recorded touch session.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// touch events.
pub fn load_session(path: &Path) -> anyhow::Result<Vec<TouchEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse session {}", path.display()))
}

/// One emission produced during a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    /// Timestamp of the event that completed the gesture.
    pub timestamp_ms: u64,
    /// Fields the gesture changed.
    pub delta: TransformDelta,
    /// The record the store returned, if the update succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<BoardElement>,
    /// The failure message, if it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Events fed to the canvas.
    pub events: usize,
    /// Emissions in order.
    pub steps: Vec<ReplayStep>,
    /// The element as stored after the session.
    pub element: Option<BoardElement>,
}

/// Drive `events` through the editor as if they arrived one frame apart.
///
/// Failed updates are recorded in the report rather than aborting, since
/// the editor reverts the element and accepts the next gesture.
///
/// # Errors
///
/// Returns [`BoardError::ElementNotFound`] if the element is not on the
/// open board.
pub async fn replay<R: Repository>(
    editor: &mut BoardEditor<R>,
    element: ElementId,
    events: &[TouchEvent],
    frame: Duration,
) -> Result<ReplayReport, BoardError> {
    if !editor.select(element) {
        return Err(BoardError::ElementNotFound(element));
    }

    let mut steps = Vec::new();
    for event in events {
        editor.tick(frame);
        let Some(emission) = editor.handle_touch(event).emission else {
            continue;
        };
        let (persisted, error) = match editor.commit(emission).await {
            Ok(record) => (Some(record), None),
            Err(err) => (None, Some(err.user_message())),
        };
        steps.push(ReplayStep {
            timestamp_ms: event.timestamp_ms,
            delta: emission.delta,
            persisted,
            error,
        });
    }

    let mut frames = 0;
    while editor.tick(frame) && frames < MAX_SETTLE_FRAMES {
        frames += 1;
    }
    tracing::debug!(frames, "Replay settled");

    Ok(ReplayReport {
        events: events.len(),
        steps,
        element: editor.store().get(element),
    })
}
