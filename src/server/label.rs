use axum::http::StatusCode;
use tracing::error;

use crate::error::LabelError;
use crate::font::FontChoice;

use super::models::{AddLabelRequest, AddLabelResponse};
use super::state::ServerState;

pub(crate) const REQUIRED_MESSAGE: &str = "Image and label are required.";
pub(crate) const FAILURE_MESSAGE: &str = "Failed to process the image.";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<LabelError> for ServerError {
    fn from(err: LabelError) -> Self {
        if err.is_validation() {
            return ServerError::bad_request(err.to_string());
        }
        error!("failed to process image: {}", err);
        ServerError::internal()
    }
}

pub(crate) fn label_request(
    state: &ServerState,
    request: AddLabelRequest,
    base_url: &str,
) -> Result<AddLabelResponse, ServerError> {
    let image = request.image.as_deref().filter(|value| !value.is_empty());
    let label = request.label.as_deref().filter(|value| !value.is_empty());
    let (Some(image), Some(label)) = (image, label) else {
        return Err(ServerError::bad_request(REQUIRED_MESSAGE));
    };

    let font = FontChoice::parse(request.font.as_deref())?;
    let layout_box = match &request.layout {
        Some(overrides) => overrides.apply(&state.settings.layout),
        None => state.settings.layout.clone(),
    };

    let labeled = state
        .labeler
        .label_base64(image, label, font, &layout_box)?;
    Ok(AddLabelResponse {
        image_url: format!("{}/images/{}", base_url, labeled.file_name),
        truncated: (labeled.dropped > 0).then_some(labeled.dropped),
    })
}
