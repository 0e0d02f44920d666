use serde::{Deserialize, Serialize};

use crate::layout::{Alignment, LayoutBox, Orientation, OverflowPolicy};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct AddLabelRequest {
    pub(crate) image: Option<String>,
    pub(crate) label: Option<String>,
    pub(crate) font: Option<String>,
    pub(crate) layout: Option<LayoutOverrides>,
}

/// Per-request overrides of the configured layout box.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct LayoutOverrides {
    pub(crate) orientation: Option<Orientation>,
    pub(crate) alignment: Option<Alignment>,
    pub(crate) overflow: Option<OverflowPolicy>,
    pub(crate) x: Option<f32>,
    pub(crate) y: Option<f32>,
    pub(crate) max_width: Option<f32>,
    pub(crate) max_height: Option<f32>,
    pub(crate) vertical_center: Option<bool>,
}

impl LayoutOverrides {
    pub(crate) fn apply(&self, base: &LayoutBox) -> LayoutBox {
        LayoutBox {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            max_width: self.max_width.unwrap_or(base.max_width),
            max_height: self.max_height.unwrap_or(base.max_height),
            orientation: self.orientation.unwrap_or(base.orientation),
            alignment: self.alignment.unwrap_or(base.alignment),
            overflow: self.overflow.unwrap_or(base.overflow),
            vertical_center: self.vertical_center.unwrap_or(base.vertical_center),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddLabelResponse {
    pub(crate) image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) truncated: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
