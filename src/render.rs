//! Stamps draw commands onto an image by composing an SVG (source image plus
//! one `<text>` per glyph) and rasterizing it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView, ImageFormat};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::error::LabelError;
use crate::font::FontFace;
use crate::layout::DrawCommand;

pub struct GlyphStyle<'a> {
    pub family: Option<&'a str>,
    pub font_size: f32,
    /// Offset from the top of a glyph box to its baseline.
    pub ascent: f32,
    pub color: &'a str,
}

/// Draws `commands` onto `image` with `face` and returns PNG bytes.
pub fn stamp(
    image: &DynamicImage,
    commands: &[DrawCommand],
    face: &FontFace,
    color: &str,
) -> Result<Vec<u8>, LabelError> {
    let (width, height) = image.dimensions();
    let source_png = encode_png(image)?;
    let style = GlyphStyle {
        family: face.family(),
        font_size: face.size(),
        ascent: face.ascent(),
        color,
    };
    let svg = render_svg(&source_png, width, height, commands, &style);
    render_svg_bytes(&svg, Some(face.data()), style.family)
}

pub fn render_svg(
    image_png: &[u8],
    width: u32,
    height: u32,
    commands: &[DrawCommand],
    style: &GlyphStyle<'_>,
) -> String {
    let data_uri = format!("data:image/png;base64,{}", BASE64.encode(image_png));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    let family = style
        .family
        .map(|family| format!(r#" font-family="{}""#, escape_xml(family)))
        .unwrap_or_default();
    for command in commands {
        if command.ch.is_whitespace() {
            continue;
        }
        let mut buf = [0u8; 4];
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}"{family}>{text}</text>"#,
            x = command.x,
            y = command.y + style.ascent,
            size = style.font_size,
            color = escape_xml(style.color),
            family = family,
            text = escape_xml(command.ch.encode_utf8(&mut buf))
        ));
    }

    svg.push_str("</svg>");
    svg
}

pub fn render_svg_bytes(
    svg: &str,
    font_data: Option<&[u8]>,
    family: Option<&str>,
) -> Result<Vec<u8>, LabelError> {
    let mut db = fontdb::Database::new();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let mut options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    if let Some(family) = family {
        options.font_family = family.to_string();
    }
    let tree = Tree::from_str(svg, &options)
        .map_err(|err| LabelError::Render(format!("failed to parse SVG: {}", err)))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| LabelError::Render("empty SVG size".to_string()))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    let image = image::RgbaImage::from_raw(size.width(), size.height(), rgba)
        .ok_or_else(|| LabelError::Render("failed to build image buffer from SVG".to_string()))?;
    encode_png(&DynamicImage::ImageRgba8(image))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, LabelError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| LabelError::Render(format!("failed to encode PNG: {}", err)))?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> GlyphStyle<'static> {
        GlyphStyle {
            family: Some("Test Sans"),
            font_size: 32.0,
            ascent: 25.0,
            color: "#000000",
        }
    }

    fn blank_png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([255, 255, 255, 255]),
        ));
        encode_png(&image).expect("encode")
    }

    #[test]
    fn one_text_element_per_visible_glyph() {
        let commands = [
            DrawCommand { ch: 'A', x: 10.0, y: 0.0 },
            DrawCommand { ch: ' ', x: 20.0, y: 0.0 },
            DrawCommand { ch: '<', x: 30.0, y: 0.0 },
        ];
        let svg = render_svg(&blank_png(2, 2), 2, 2, &commands, &style());
        assert_eq!(svg.matches("<text ").count(), 2);
        assert!(svg.contains(r#"<text x="10" y="25""#));
        assert!(svg.contains(">&lt;</text>"));
        assert!(svg.contains(r#"font-family="Test Sans""#));
    }

    #[test]
    fn rasterized_output_keeps_source_dimensions() {
        let svg = render_svg(&blank_png(4, 3), 4, 3, &[], &style());
        let png = render_svg_bytes(&svg, None, None).expect("rasterize");
        let decoded = image::load_from_memory(&png).expect("decode output");
        assert_eq!(decoded.dimensions(), (4, 3));
    }

    #[test]
    fn invalid_svg_is_a_render_error() {
        let err = render_svg_bytes("<svg", None, None).unwrap_err();
        assert!(matches!(err, LabelError::Render(_)));
    }
}
