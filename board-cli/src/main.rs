//! # Vision Board CLI
//!
//! Operator tool for the hosted element table.

use std::time::Duration;

use board_cli::{load_session, replay, CliArgs, Command};
use board_core::{BoardId, ElementKind, ElementPatch, EngineConfig};
use board_store::{BoardEditor, ElementStore, RestRepository};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,board_store=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,board_store=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let repo = RestRepository::new(&args.store_config()?)?;
    tracing::debug!(endpoint = %repo.endpoint(), "Using element table");

    let store = ElementStore::new(repo);
    let mut editor = BoardEditor::new(store, EngineConfig::default());
    editor.open(BoardId::new(args.command.board())).await?;

    match args.command {
        Command::List { .. } => print_json(&editor.store().elements())?,
        Command::AddText {
            placement,
            content,
            font_size,
            color,
            ..
        } => {
            let draft = placement.draft(ElementKind::Text {
                content,
                font_size,
                color,
            });
            print_json(&editor.add_element(draft).await?)?;
        }
        Command::AddEmoji {
            placement,
            glyph,
            font_size,
            ..
        } => {
            let draft = placement.draft(ElementKind::Emoji { glyph, font_size });
            print_json(&editor.add_element(draft).await?)?;
        }
        Command::AddImage { placement, uri, .. } => {
            let draft = placement.draft(ElementKind::Image { uri });
            print_json(&editor.add_element(draft).await?)?;
        }
        Command::AddSticker { placement, uri, .. } => {
            let draft = placement.draft(ElementKind::Sticker { uri });
            print_json(&editor.add_element(draft).await?)?;
        }
        Command::Move { element, x, y, .. } => {
            let record = editor
                .store()
                .update(element, ElementPatch::position(x, y))
                .await?;
            print_json(&record)?;
        }
        Command::Resize {
            element,
            width,
            height,
            ..
        } => {
            let record = editor
                .store()
                .update(element, ElementPatch::size(width, height))
                .await?;
            print_json(&record)?;
        }
        Command::Rotate {
            element, radians, ..
        } => {
            let record = editor
                .store()
                .update(element, ElementPatch::rotation(radians))
                .await?;
            print_json(&record)?;
        }
        Command::Front { element, .. } => print_json(&editor.bring_to_front(element).await?)?,
        Command::Remove { element, .. } => {
            editor.remove_element(element).await?;
            tracing::info!(%element, "Removed");
        }
        Command::Replay {
            element,
            frame_ms,
            session,
            ..
        } => {
            let events = load_session(&session)?;
            tracing::info!(events = events.len(), "Replaying {}", session.display());
            let report =
                replay(&mut editor, element, &events, Duration::from_millis(frame_ms)).await?;
            print_json(&report)?;
        }
    }

    editor.close();
    Ok(())
}
