use thiserror::Error;

use crate::layout::LayoutError;

/// Everything that can fail while labeling an image.
#[derive(Error, Debug)]
pub enum LabelError {
    /// The request itself is unusable (missing fields, unknown font name).
    #[error("{0}")]
    Validation(String),

    #[error("failed to load font: {0}")]
    FontLoad(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to render label: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LabelError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LabelError::Validation(_))
    }
}
