pub mod error;
pub mod font;
mod labeler;
pub mod layout;
pub mod logging;
pub mod render;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use error::LabelError;
pub use labeler::{LabeledImage, Labeler, Stamped, decode_base64_image, write_output};
pub use layout::{
    Alignment, DrawCommand, FontMetrics, Layout, LayoutBox, LayoutError, Orientation,
    OverflowPolicy, layout_text,
};
