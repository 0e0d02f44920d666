use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::LabelError;
use crate::font::{FontChoice, FontRegistry};
use crate::layout::{LayoutBox, layout_text};
use crate::render;
use crate::settings::Settings;

/// A labeled image encoded as PNG.
pub struct Stamped {
    pub png: Vec<u8>,
    /// Glyphs left out by the truncate policy.
    pub dropped: usize,
}

/// A labeled image persisted to the output directory.
#[derive(Debug)]
pub struct LabeledImage {
    pub path: PathBuf,
    pub file_name: String,
    pub dropped: usize,
}

pub struct Labeler {
    fonts: FontRegistry,
    output_dir: PathBuf,
}

impl Labeler {
    pub fn new(settings: &Settings) -> Self {
        Self {
            fonts: FontRegistry::new(settings),
            output_dir: PathBuf::from(&settings.server_output_dir),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Decodes `image`, lays out `label` and stamps it on.
    pub fn stamp(
        &self,
        image: &[u8],
        label: &str,
        font: FontChoice,
        layout_box: &LayoutBox,
    ) -> Result<Stamped, LabelError> {
        let decoded =
            image::load_from_memory(image).map_err(|err| LabelError::Decode(err.to_string()))?;
        let face = self.fonts.get(font)?;
        let layout = layout_text(label, face.as_ref(), layout_box)?;
        debug!(
            "layout: {} lines, {} glyphs ({:?}, {:?})",
            layout.lines.len(),
            layout.commands.len(),
            layout_box.orientation,
            layout_box.alignment
        );
        if layout.dropped > 0 {
            warn!("label truncated: {} glyphs did not fit", layout.dropped);
        }
        let color = self
            .fonts
            .source(font)
            .map(|source| source.color.as_str())
            .unwrap_or("#000000");
        let png = render::stamp(&decoded, &layout.commands, &face, color)?;
        Ok(Stamped {
            png,
            dropped: layout.dropped,
        })
    }

    /// Full request pipeline: base64 image in, stored PNG out.
    pub fn label_base64(
        &self,
        image_base64: &str,
        label: &str,
        font: FontChoice,
        layout_box: &LayoutBox,
    ) -> Result<LabeledImage, LabelError> {
        let bytes = decode_base64_image(image_base64)?;
        let stamped = self.stamp(&bytes, label, font, layout_box)?;
        let path = write_output(&stamped.png, &self.output_dir)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| LabelError::Render("output file has no name".to_string()))?;
        info!("labeled image written: {}", path.display());
        Ok(LabeledImage {
            path,
            file_name,
            dropped: stamped.dropped,
        })
    }
}

/// Accepts raw base64 or a `data:<mime>;base64,` URI.
pub fn decode_base64_image(value: &str) -> Result<Vec<u8>, LabelError> {
    let trimmed = value.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => trimmed,
    };
    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|err| LabelError::Decode(format!("invalid base64: {}", err)))
}

/// Writes `bytes` under a fresh random `image-*.png` name in `dir`.
pub fn write_output(bytes: &[u8], dir: &Path) -> Result<PathBuf, LabelError> {
    std::fs::create_dir_all(dir)?;
    let file = tempfile::Builder::new()
        .prefix("image-")
        .suffix(".png")
        .tempfile_in(dir)?;
    std::fs::write(file.path(), bytes)?;
    let path = file.into_temp_path().keep().map_err(|err| err.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(8, 8));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode");
        bytes
    }

    fn labeler_with_font(path: &Path, output: &Path) -> Labeler {
        let mut settings = Settings::default();
        settings.font_default.path = Some(path.to_string_lossy().to_string());
        settings.server_output_dir = output.to_string_lossy().to_string();
        Labeler::new(&settings)
    }

    #[test]
    fn decodes_plain_and_data_uri_base64() {
        assert_eq!(decode_base64_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_image("data:image/png;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let err = decode_base64_image("***not base64***").unwrap_err();
        assert!(matches!(err, LabelError::Decode(_)));
    }

    #[test]
    fn non_image_bytes_are_a_decode_error() {
        let dir = tempdir().expect("tempdir");
        let labeler = labeler_with_font(&dir.path().join("font.ttf"), dir.path());
        let result = labeler.stamp(
            b"plain text",
            "HELLO",
            FontChoice::Default,
            &LayoutBox::new(0.0, 0.0, 100.0, 100.0),
        );
        assert!(matches!(result, Err(LabelError::Decode(_))));
    }

    #[test]
    fn font_failure_stops_before_layout() {
        let dir = tempdir().expect("tempdir");
        let labeler = labeler_with_font(&dir.path().join("missing.ttf"), dir.path());
        let result = labeler.stamp(
            &png_bytes(),
            "",
            FontChoice::Default,
            &LayoutBox::new(0.0, 0.0, 100.0, 100.0),
        );
        assert!(matches!(result, Err(LabelError::FontLoad(_))));
    }

    #[test]
    fn failed_request_writes_nothing() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("output");
        let labeler = labeler_with_font(&dir.path().join("missing.ttf"), &output);
        let encoded = BASE64.encode(png_bytes());
        let result = labeler.label_base64(
            &encoded,
            "HELLO",
            FontChoice::Default,
            &LayoutBox::new(0.0, 0.0, 100.0, 100.0),
        );
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn output_names_never_collide() {
        let dir = tempdir().expect("tempdir");
        let first = write_output(b"one", dir.path()).expect("first");
        let second = write_output(b"two", dir.path()).expect("second");
        assert_ne!(first, second);
        for path in [&first, &second] {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("image-") && name.ends_with(".png"));
        }
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
    }

    #[test]
    fn stamps_label_with_a_real_font() {
        let dir = tempdir().expect("tempdir");
        let labeler = labeler_with_font(&crate::test_util::fixture_font_path(), dir.path());
        let encoded = BASE64.encode(png_bytes());
        let labeled = labeler
            .label_base64(
                &encoded,
                "HI",
                FontChoice::Default,
                &LayoutBox::new(0.0, 0.0, 8.0, 8.0),
            )
            .expect("label image");
        assert_eq!(labeled.dropped, 0);
        let stamped = image::open(&labeled.path).expect("open output").to_rgba8();
        assert_eq!(stamped.dimensions(), (8, 8));
    }
}
