use super::{Alignment, DrawCommand, Glyph, Layout, LayoutBox, Line, Orientation, OverflowPolicy};

/// Assigns absolute coordinates to broken lines or columns.
///
/// `unit` is the reference glyph: its height is the line pitch in horizontal
/// mode and its width is the column advance in vertical mode.
pub fn place(mut lines: Vec<Line>, unit: Glyph, layout_box: &LayoutBox) -> Layout {
    let dropped = match layout_box.overflow {
        OverflowPolicy::Overflow => 0,
        OverflowPolicy::Truncate => truncate(&mut lines, unit, layout_box),
    };
    let commands = match layout_box.orientation {
        Orientation::Horizontal => place_rows(&lines, unit.height, layout_box),
        Orientation::Vertical => place_columns(&lines, unit.width, layout_box),
    };
    Layout {
        commands,
        lines,
        dropped,
    }
}

/// How many rows (or columns) of `pitch` fit into `extent`. Always at least one.
fn capacity(extent: f32, pitch: f32) -> usize {
    if pitch <= 0.0 {
        return usize::MAX;
    }
    ((extent / pitch).floor() as usize).max(1)
}

fn truncate(lines: &mut Vec<Line>, unit: Glyph, layout_box: &LayoutBox) -> usize {
    let keep = match layout_box.orientation {
        Orientation::Horizontal => capacity(layout_box.max_height, unit.height),
        Orientation::Vertical => capacity(layout_box.max_width, unit.width),
    };
    if lines.len() <= keep {
        return 0;
    }
    lines.split_off(keep).iter().map(Line::len).sum()
}

fn place_rows(lines: &[Line], line_height: f32, layout_box: &LayoutBox) -> Vec<DrawCommand> {
    let block_height = lines.len() as f32 * line_height;
    let top = if layout_box.vertical_center {
        layout_box.y + (layout_box.max_height - block_height) / 2.0
    } else {
        layout_box.y
    };

    let mut commands = Vec::with_capacity(lines.iter().map(Line::len).sum());
    for (row, line) in lines.iter().enumerate() {
        let mut x = match layout_box.alignment {
            Alignment::Start => layout_box.x,
            Alignment::Center => layout_box.x + (layout_box.max_width - line.extent) / 2.0,
        };
        let y = top + row as f32 * line_height;
        for glyph in &line.glyphs {
            commands.push(DrawCommand { ch: glyph.ch, x, y });
            x += glyph.width;
        }
    }
    commands
}

/// Columns run top to bottom and advance right to left.
fn place_columns(columns: &[Line], char_width: f32, layout_box: &LayoutBox) -> Vec<DrawCommand> {
    let mut x = match layout_box.alignment {
        Alignment::Start => layout_box.x,
        Alignment::Center => {
            let block_width = columns.len() as f32 * char_width;
            layout_box.x + block_width / 2.0 + char_width / 2.0
        }
    };

    let mut commands = Vec::with_capacity(columns.iter().map(Line::len).sum());
    for column in columns {
        let mut y = layout_box.y;
        for glyph in &column.glyphs {
            commands.push(DrawCommand { ch: glyph.ch, x, y });
            y += glyph.height;
        }
        x -= char_width;
    }
    commands
}
