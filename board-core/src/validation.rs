//! Input validation for drafts, patches and board identifiers.
//!
//! Everything that reaches the repository passes through here first.

use thiserror::Error;

use crate::element::{BoardId, ElementDraft, ElementKind, ElementPatch, MIN_ELEMENT_SIZE};

/// Maximum length for board IDs.
pub const MAX_BOARD_ID_LEN: usize = 64;
/// Maximum text content length in elements.
pub const MAX_TEXT_CONTENT_LEN: usize = 1_048_576; // 1MB

/// Validation error types.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Board ID exceeds maximum length.
    #[error("board_id too long (max {MAX_BOARD_ID_LEN} chars)")]
    BoardIdTooLong,
    /// Board ID contains invalid characters.
    #[error("board_id contains invalid characters")]
    BoardIdInvalidChars,
    /// A geometry field is NaN or infinite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// Width or height below the element floor.
    #[error("{field} must be at least {MIN_ELEMENT_SIZE} (got {value})")]
    TooSmall {
        /// Offending field.
        field: &'static str,
        /// Supplied value.
        value: f32,
    },
    /// Font size is zero or negative.
    #[error("font_size must be positive (got {0})")]
    InvalidFontSize(f32),
    /// Text content exceeds maximum length.
    #[error("text content too long (max {MAX_TEXT_CONTENT_LEN} bytes)")]
    TextContentTooLong,
    /// An image or sticker has no URI.
    #[error("uri must not be empty")]
    EmptyUri,
    /// An emoji has no glyph.
    #[error("emoji glyph must not be empty")]
    EmptyGlyph,
}

fn is_valid_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Validate a board ID.
///
/// Blank IDs are the caller's concern (they mean "not configured") and
/// are rejected here as invalid characters.
///
/// # Errors
///
/// Returns [`ValidationError::BoardIdTooLong`] if the ID exceeds 64 characters.
/// Returns [`ValidationError::BoardIdInvalidChars`] if the ID is empty or contains invalid characters.
pub fn validate_board_id(id: &BoardId) -> Result<(), ValidationError> {
    let raw = id.as_str();
    if raw.len() > MAX_BOARD_ID_LEN {
        return Err(ValidationError::BoardIdTooLong);
    }
    if raw.is_empty() || !raw.chars().all(is_valid_id_char) {
        return Err(ValidationError::BoardIdInvalidChars);
    }
    Ok(())
}

fn finite(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(field))
    }
}

fn at_least_min(field: &'static str, value: f32) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value < MIN_ELEMENT_SIZE {
        return Err(ValidationError::TooSmall { field, value });
    }
    Ok(())
}

/// Validate element content.
///
/// # Errors
///
/// Returns the first content rule the kind violates.
pub fn validate_kind(kind: &ElementKind) -> Result<(), ValidationError> {
    match kind {
        ElementKind::Image { uri } | ElementKind::Sticker { uri } => {
            if uri.trim().is_empty() {
                return Err(ValidationError::EmptyUri);
            }
        }
        ElementKind::Text {
            content, font_size, ..
        } => {
            if content.len() > MAX_TEXT_CONTENT_LEN {
                return Err(ValidationError::TextContentTooLong);
            }
            validate_font_size(*font_size)?;
        }
        ElementKind::Emoji { glyph, font_size } => {
            if glyph.is_empty() {
                return Err(ValidationError::EmptyGlyph);
            }
            validate_font_size(*font_size)?;
        }
    }
    Ok(())
}

fn validate_font_size(font_size: f32) -> Result<(), ValidationError> {
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(ValidationError::InvalidFontSize(font_size));
    }
    Ok(())
}

/// Validate a draft before it is sent for creation.
///
/// # Errors
///
/// Returns the first geometry or content rule the draft violates.
pub fn validate_draft(draft: &ElementDraft) -> Result<(), ValidationError> {
    finite("position_x", draft.position_x)?;
    finite("position_y", draft.position_y)?;
    finite("rotation", draft.rotation)?;
    at_least_min("width", draft.width)?;
    at_least_min("height", draft.height)?;
    validate_kind(&draft.kind)
}

/// Validate a partial update.
///
/// # Errors
///
/// Returns an error if any supplied field is non-finite or a supplied size is
/// below the floor.
pub fn validate_patch(patch: &ElementPatch) -> Result<(), ValidationError> {
    if let Some(x) = patch.position_x {
        finite("position_x", x)?;
    }
    if let Some(y) = patch.position_y {
        finite("position_y", y)?;
    }
    if let Some(rotation) = patch.rotation {
        finite("rotation", rotation)?;
    }
    if let Some(width) = patch.width {
        at_least_min("width", width)?;
    }
    if let Some(height) = patch.height {
        at_least_min("height", height)?;
    }
    Ok(())
}
