//! Text placement: splits a label into lines or columns and assigns every
//! glyph an absolute position inside a [`LayoutBox`].

mod breaker;
mod engine;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use breaker::{break_columns, break_lines};
pub use engine::place;

/// Measurement capability of a loaded font.
///
/// Implementations must be additive for the fixed-advance fonts used here:
/// `measure_width("ab") == measure_width("a") + measure_width("b")`.
pub trait FontMetrics: Send + Sync {
    /// Horizontal advance of `text` in pixels.
    fn measure_width(&self, text: &str) -> f32;

    /// Vertical extent of `text` when wrapped at `bound_width`. For a single
    /// character this is the font's line height.
    fn measure_line_height(&self, text: &str, bound_width: f32) -> f32;
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("label text is empty")]
    EmptyInput,
    #[error("layout bounds must be positive (max_width={max_width}, max_height={max_height})")]
    InvalidBounds { max_width: f32, max_height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Start,
    Center,
}

/// What happens to text that does not fit inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep laying out lines/columns past the box edge.
    #[default]
    Overflow,
    /// Drop lines/columns that fall outside the box and report the count.
    Truncate,
}

/// Placement region and policy for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub orientation: Orientation,
    pub alignment: Alignment,
    pub overflow: OverflowPolicy,
    /// Center the block of lines vertically in the box. Horizontal layouts only.
    pub vertical_center: bool,
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, max_width: f32, max_height: f32) -> Self {
        Self {
            x,
            y,
            max_width,
            max_height,
            orientation: Orientation::Horizontal,
            alignment: Alignment::Start,
            overflow: OverflowPolicy::Overflow,
            vertical_center: false,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_vertical_center(mut self, vertical_center: bool) -> Self {
        self.vertical_center = vertical_center;
        self
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let valid = |value: f32| value.is_finite() && value > 0.0;
        if valid(self.max_width) && valid(self.max_height) {
            Ok(())
        } else {
            Err(LayoutError::InvalidBounds {
                max_width: self.max_width,
                max_height: self.max_height,
            })
        }
    }
}

/// One character with its measured size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub width: f32,
    pub height: f32,
}

impl Glyph {
    pub fn measure<M: FontMetrics + ?Sized>(ch: char, metrics: &M) -> Self {
        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        let width = metrics.measure_width(text);
        let height = metrics.measure_line_height(text, width.max(1.0));
        Self { ch, width, height }
    }
}

/// A visual line (horizontal) or column (vertical).
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub glyphs: Vec<Glyph>,
    /// Whitespace consumed by the break after this line. Never drawn.
    pub separator: String,
    /// Advance of the whole line along the wrapping axis.
    pub extent: f32,
}

impl Line {
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|glyph| glyph.ch).collect()
    }
}

/// Instruction to stamp `ch` with the top-left corner of its box at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawCommand {
    pub ch: char,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub commands: Vec<DrawCommand>,
    pub lines: Vec<Line>,
    /// Glyphs removed by [`OverflowPolicy::Truncate`].
    pub dropped: usize,
}

/// Breaks `text` and places every glyph inside `layout_box`.
pub fn layout_text<M: FontMetrics + ?Sized>(
    text: &str,
    metrics: &M,
    layout_box: &LayoutBox,
) -> Result<Layout, LayoutError> {
    if text.trim().is_empty() {
        return Err(LayoutError::EmptyInput);
    }
    layout_box.validate()?;

    let unit = unit_glyph(text, metrics);
    let lines = match layout_box.orientation {
        Orientation::Horizontal => break_lines(text, metrics, layout_box.max_width),
        Orientation::Vertical => break_columns(text, metrics, layout_box.max_height),
    };
    Ok(place(lines, unit, layout_box))
}

/// The first visible glyph sets the line pitch and column advance.
fn unit_glyph<M: FontMetrics + ?Sized>(text: &str, metrics: &M) -> Glyph {
    let ch = text
        .chars()
        .find(|ch| !ch.is_whitespace())
        .unwrap_or(' ');
    Glyph::measure(ch, metrics)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::FontMetrics;

    /// Monospace metrics: every character advances `advance` pixels and
    /// every row is `line_height` pixels tall.
    pub(crate) struct FixedMetrics {
        pub(crate) advance: f32,
        pub(crate) line_height: f32,
    }

    impl FixedMetrics {
        pub(crate) fn new(advance: f32, line_height: f32) -> Self {
            Self {
                advance,
                line_height,
            }
        }
    }

    impl FontMetrics for FixedMetrics {
        fn measure_width(&self, text: &str) -> f32 {
            text.chars().filter(|ch| *ch != '\n').count() as f32 * self.advance
        }

        fn measure_line_height(&self, text: &str, bound_width: f32) -> f32 {
            let rows: usize = text
                .split('\n')
                .map(|row| {
                    let width = self.measure_width(row);
                    ((width / bound_width.max(1.0)).ceil() as usize).max(1)
                })
                .sum();
            rows as f32 * self.line_height
        }
    }
}
