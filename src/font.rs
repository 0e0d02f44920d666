mod registry;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use ttf_parser::name_id;
use ttf_parser::Face;
use tracing::warn;
use usvg::fontdb;

use crate::error::LabelError;
use crate::layout::FontMetrics;

pub use registry::FontRegistry;

/// Font selected by the `font` field of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontChoice {
    Default,
    Sans,
    Serif,
}

impl FontChoice {
    pub fn parse(value: Option<&str>) -> Result<Self, LabelError> {
        match value.map(str::trim) {
            None | Some("") => Ok(FontChoice::Default),
            Some(name) if name.eq_ignore_ascii_case("sans") => Ok(FontChoice::Sans),
            Some(name) if name.eq_ignore_ascii_case("serif") => Ok(FontChoice::Serif),
            Some(name) => Err(LabelError::Validation(format!("unknown font '{}'", name))),
        }
    }
}

/// A parsed TrueType/OpenType face rendered at a fixed pixel size.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    space_advance: u16,
    advances: Arc<HashMap<char, u16>>,
    family: Option<String>,
    size: f32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("size", &self.size)
            .finish()
    }
}

impl FontFace {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    fn scale(&self) -> f32 {
        self.size / self.units_per_em.max(1) as f32
    }

    /// Distance from the top of a line box to the baseline, in pixels.
    pub fn ascent(&self) -> f32 {
        self.ascender as f32 * self.scale()
    }

    pub fn line_height(&self) -> f32 {
        let units = self.ascender as i32 - self.descender as i32 + self.line_gap as i32;
        units.max(1) as f32 * self.scale()
    }
}

impl FontMetrics for FontFace {
    fn measure_width(&self, text: &str) -> f32 {
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph_advance = self.advances.get(&ch).copied().unwrap_or(self.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        advance as f32 * self.scale()
    }

    fn measure_line_height(&self, text: &str, bound_width: f32) -> f32 {
        let bound = bound_width.max(1.0);
        let rows: usize = text
            .split('\n')
            .map(|row| ((self.measure_width(row) / bound).ceil() as usize).max(1))
            .sum();
        rows as f32 * self.line_height()
    }
}

pub fn load_font_face(path: &Path, size: f32) -> Result<FontFace, LabelError> {
    let data = std::fs::read(path)
        .map_err(|err| LabelError::FontLoad(format!("{}: {}", path.display(), err)))?;
    load_font_face_from_data(data, None, size)
        .map_err(|err| LabelError::FontLoad(format!("{}: {}", path.display(), err)))
}

/// Loads a font from `path`, or looks `family` up among the system fonts.
pub fn resolve_font(
    path: Option<&Path>,
    family: Option<&str>,
    size: f32,
) -> Result<FontFace, LabelError> {
    if !(size.is_finite() && size > 0.0) {
        return Err(LabelError::FontLoad(format!("invalid font size {}", size)));
    }
    if let Some(path) = path {
        return load_font_face(path, size);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    load_font_face_from_family(&db, family.unwrap_or("sans-serif"), size)
}

fn load_font_face_from_data(
    data: Vec<u8>,
    face_index: Option<u32>,
    size: f32,
) -> Result<FontFace, String> {
    let indices = match face_index {
        Some(index) => index..index + 1,
        None => 0..ttf_parser::fonts_in_collection(&data).unwrap_or(1),
    };
    for index in indices {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let advances = collect_advances(&face);
        let family = extract_family_name(&face);
        let (ascender, descender, line_gap) = (face.ascender(), face.descender(), face.line_gap());
        return Ok(FontFace {
            data: Arc::new(data),
            face_index: index,
            units_per_em,
            ascender,
            descender,
            line_gap,
            space_advance,
            advances: Arc::new(advances),
            family,
            size,
        });
    }
    Err("failed to parse font data".to_string())
}

/// Generic names first try the matching fontdb family, then common Linux
/// families. fontdb maps the generic names to Arial and Times New Roman.
fn family_candidates(family: &str) -> Option<Vec<fontdb::Family<'static>>> {
    let (generic, named): (fontdb::Family<'static>, [&'static str; 3]) =
        match family.to_ascii_lowercase().as_str() {
            "sans" | "sans-serif" => (
                fontdb::Family::SansSerif,
                ["DejaVu Sans", "Liberation Sans", "Noto Sans"],
            ),
            "serif" => (
                fontdb::Family::Serif,
                ["DejaVu Serif", "Liberation Serif", "Noto Serif"],
            ),
            "monospace" => (
                fontdb::Family::Monospace,
                ["DejaVu Sans Mono", "Liberation Mono", "Noto Sans Mono"],
            ),
            _ => return None,
        };
    let mut families = vec![generic];
    families.extend(named.into_iter().map(fontdb::Family::Name));
    Some(families)
}

fn load_font_face_from_family(
    db: &fontdb::Database,
    family: &str,
    size: f32,
) -> Result<FontFace, LabelError> {
    let id = match family_candidates(family) {
        Some(families) => {
            let query = fontdb::Query {
                families: &families,
                ..Default::default()
            };
            db.query(&query).or_else(|| {
                let first = db.faces().next().map(|face| face.id);
                if first.is_some() {
                    warn!("no system font matches {}, using the first available face", family);
                }
                first
            })
        }
        None => {
            let families = [fontdb::Family::Name(family)];
            db.query(&fontdb::Query {
                families: &families,
                ..Default::default()
            })
        }
    };
    let id = id.ok_or_else(|| LabelError::FontLoad(format!("font not found: {}", family)))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| LabelError::FontLoad(format!("failed to load font data: {}", family)))?;
    load_font_face_from_data(data, Some(face_index), size)
        .map_err(|err| LabelError::FontLoad(format!("{}: {}", family, err)))
}

/// Horizontal advance of every character the face maps, in font units.
fn collect_advances(face: &Face<'_>) -> HashMap<char, u16> {
    let mut advances = HashMap::new();
    let Some(cmap) = face.tables().cmap else {
        return advances;
    };
    for subtable in cmap.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        subtable.codepoints(|code| {
            let Some(ch) = char::from_u32(code) else {
                return;
            };
            if advances.contains_key(&ch) {
                return;
            }
            if let Some(advance) = subtable
                .glyph_index(code)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                advances.insert(ch, advance);
            }
        });
    }
    advances
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::fixture_font_path;
    use tempfile::tempdir;

    fn fixture_db() -> fontdb::Database {
        let mut db = fontdb::Database::new();
        db.load_font_data(std::fs::read(fixture_font_path()).expect("read fixture font"));
        db
    }

    #[test]
    fn font_choice_parses_known_names() {
        assert_eq!(FontChoice::parse(None).unwrap(), FontChoice::Default);
        assert_eq!(FontChoice::parse(Some("  ")).unwrap(), FontChoice::Default);
        assert_eq!(FontChoice::parse(Some("sans")).unwrap(), FontChoice::Sans);
        assert_eq!(FontChoice::parse(Some("Serif")).unwrap(), FontChoice::Serif);
    }

    #[test]
    fn unknown_font_name_is_a_validation_error() {
        let err = FontChoice::parse(Some("comic")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn missing_font_file_fails_to_load() {
        let dir = tempdir().expect("tempdir");
        let err = load_font_face(&dir.path().join("missing.ttf"), 32.0).unwrap_err();
        assert!(matches!(err, LabelError::FontLoad(_)));
    }

    #[test]
    fn garbage_font_file_fails_to_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("font.ttf");
        std::fs::write(&path, b"definitely not a font").expect("write font");
        let err = load_font_face(&path, 32.0).unwrap_err();
        assert!(matches!(err, LabelError::FontLoad(_)));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        let err = resolve_font(None, Some("sans-serif"), 0.0).unwrap_err();
        assert!(matches!(err, LabelError::FontLoad(_)));
    }

    #[test]
    fn width_is_additive_over_characters() {
        let face = load_font_face(&fixture_font_path(), 32.0).expect("load font");
        let a = face.measure_width("A");
        let b = face.measure_width("B");
        assert!(a > 0.0 && b > 0.0);
        assert!((face.measure_width("AB") - (a + b)).abs() < 1e-3);
        assert!((face.measure_width("A B") - (a + face.measure_width(" ") + b)).abs() < 1e-3);
    }

    #[test]
    fn width_scales_with_pixel_size() {
        let small = load_font_face(&fixture_font_path(), 16.0).expect("load font");
        let large = load_font_face(&fixture_font_path(), 32.0).expect("load font");
        let ratio = large.measure_width("Hello") / small.measure_width("Hello");
        assert!((ratio - 2.0).abs() < 1e-3);
    }

    #[test]
    fn single_character_takes_one_line() {
        let face = load_font_face(&fixture_font_path(), 32.0).expect("load font");
        assert!(face.line_height() > 0.0);
        assert_eq!(face.measure_line_height("A", 400.0), face.line_height());
        assert_eq!(face.measure_line_height("A\nB", 400.0), face.line_height() * 2.0);
    }

    #[test]
    fn unmapped_characters_advance_like_a_space() {
        let face = load_font_face(&fixture_font_path(), 32.0).expect("load font");
        assert_eq!(face.measure_width("\u{10FFFD}"), face.measure_width(" "));
    }

    #[test]
    fn generic_families_fall_back_to_an_available_face() {
        let db = fixture_db();
        for family in ["sans-serif", "sans", "serif", "monospace"] {
            let face = load_font_face_from_family(&db, family, 32.0)
                .unwrap_or_else(|err| panic!("{}: {}", family, err));
            assert!(face.family().unwrap_or_default().contains("Tuffy"));
        }
    }

    #[test]
    fn named_families_resolve_exactly_or_fail() {
        let db = fixture_db();
        assert!(load_font_face_from_family(&db, "Tuffy", 32.0).is_ok());
        let err = load_font_face_from_family(&db, "No Such Family", 32.0).unwrap_err();
        assert!(matches!(err, LabelError::FontLoad(_)));
    }

    #[test]
    fn empty_font_database_fails_for_generic_families() {
        let db = fontdb::Database::new();
        let err = load_font_face_from_family(&db, "serif", 32.0).unwrap_err();
        assert!(matches!(err, LabelError::FontLoad(_)));
    }

    #[test]
    fn generic_candidates_start_with_the_generic_family() {
        let serif = family_candidates("Serif").expect("generic");
        assert_eq!(serif[0], fontdb::Family::Serif);
        assert!(serif.contains(&fontdb::Family::Name("DejaVu Serif")));
        let sans = family_candidates("sans-serif").expect("generic");
        assert_eq!(sans[0], fontdb::Family::SansSerif);
        assert!(family_candidates("Tuffy").is_none());
    }
}
