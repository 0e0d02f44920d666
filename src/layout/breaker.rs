use super::{FontMetrics, Glyph, Line};

enum Token<'a> {
    Word(&'a str),
    Space(&'a str),
    Newline,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    fn token(slice: &str, is_space: bool) -> Token<'_> {
        if is_space {
            Token::Space(slice)
        } else {
            Token::Word(slice)
        }
    }

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut run: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            if let Some(is_space) = run.take() {
                tokens.push(token(&text[start..idx], is_space));
            }
            tokens.push(Token::Newline);
            continue;
        }
        let is_space = ch.is_whitespace();
        match run {
            Some(kind) if kind == is_space => {}
            Some(kind) => {
                tokens.push(token(&text[start..idx], kind));
                start = idx;
                run = Some(is_space);
            }
            None => {
                start = idx;
                run = Some(is_space);
            }
        }
    }
    if let Some(is_space) = run {
        tokens.push(token(&text[start..], is_space));
    }
    tokens
}

fn measure_line<M: FontMetrics + ?Sized>(text: &str, separator: String, metrics: &M) -> Line {
    Line {
        glyphs: text.chars().map(|ch| Glyph::measure(ch, metrics)).collect(),
        separator,
        extent: metrics.measure_width(text),
    }
}

/// Greedy word wrap at `max_width`.
///
/// Words are never split: a word wider than `max_width` gets a line of its
/// own. The whitespace at each soft break, and every `\n`, becomes the
/// line's separator.
pub fn break_lines<M: FontMetrics + ?Sized>(text: &str, metrics: &M, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut pending = String::new();

    for token in tokenize(text) {
        match token {
            Token::Newline => {
                pending.push('\n');
                lines.push(measure_line(&current, std::mem::take(&mut pending), metrics));
                current.clear();
            }
            Token::Space(space) => pending.push_str(space),
            Token::Word(word) => {
                if current.is_empty() {
                    current.push_str(&pending);
                    current.push_str(word);
                    pending.clear();
                    continue;
                }
                let candidate = format!("{current}{pending}{word}");
                if metrics.measure_width(&candidate) > max_width {
                    lines.push(measure_line(&current, std::mem::take(&mut pending), metrics));
                    current.clear();
                    current.push_str(word);
                } else {
                    current = candidate;
                    pending.clear();
                }
            }
        }
    }

    if !current.is_empty() || !pending.is_empty() || lines.is_empty() {
        lines.push(measure_line(&current, pending, metrics));
    }
    lines
}

/// Character wrap into columns no taller than `max_height`.
///
/// A glyph that lands exactly on `max_height` stays in the column. The first
/// glyph of a column is always accepted, so the loop always makes progress.
pub fn break_columns<M: FontMetrics + ?Sized>(
    text: &str,
    metrics: &M,
    max_height: f32,
) -> Vec<Line> {
    let mut columns = Vec::new();
    let mut glyphs: Vec<Glyph> = Vec::new();
    let mut height = 0.0;

    for ch in text.chars() {
        if ch == '\n' {
            columns.push(Line {
                glyphs: std::mem::take(&mut glyphs),
                separator: "\n".to_string(),
                extent: height,
            });
            height = 0.0;
            continue;
        }
        let glyph = Glyph::measure(ch, metrics);
        if !glyphs.is_empty() && height + glyph.height > max_height {
            columns.push(Line {
                glyphs: std::mem::take(&mut glyphs),
                separator: String::new(),
                extent: height,
            });
            height = 0.0;
        }
        height += glyph.height;
        glyphs.push(glyph);
    }

    if !glyphs.is_empty() || columns.is_empty() {
        columns.push(Line {
            glyphs,
            separator: String::new(),
            extent: height,
        });
    }
    columns
}
