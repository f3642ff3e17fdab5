//! Text rasterization with ab_glyph.
//!
//! Each text element is rendered into its own pixmap, which the caller then
//! draws with the element's transform. Bold and italic are synthesized from
//! the single supplied face.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, PxScaleFont, ScaleFont, point};
use canvasink_core::SerializableColor;
use canvasink_core::elements::{TextAlign, TextElement};
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Horizontal shear of synthetic italics, per pixel of height above the baseline.
const ITALIC_SHEAR: f32 = 0.2;

/// A rendered text block and where its top-left pixel lands in canvas space.
pub(crate) struct TextRaster {
    pub pixmap: Pixmap,
    pub origin: (f32, f32),
}

struct PlacedGlyph {
    id: GlyphId,
    x: f32,
    whitespace: bool,
}

struct LineLayout {
    glyphs: Vec<PlacedGlyph>,
    width: f32,
}

fn layout_line(scaled: &PxScaleFont<&FontArc>, line: &str, letter_spacing: f32) -> LineLayout {
    let mut glyphs = Vec::with_capacity(line.len());
    let mut x = 0.0;
    let mut previous: Option<GlyphId> = None;
    for c in line.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            x += scaled.kern(prev, id);
        }
        glyphs.push(PlacedGlyph {
            id,
            x,
            whitespace: c.is_whitespace(),
        });
        x += scaled.h_advance(id) + letter_spacing;
        previous = Some(id);
    }
    let width = if glyphs.is_empty() { 0.0 } else { x - letter_spacing };
    LineLayout { glyphs, width }
}

/// Shift applied to each glyph of a line for the given alignment.
///
/// Justified lines spread the slack over their whitespace; the last line
/// of a block stays left-aligned.
fn align_offsets(layout: &LineLayout, block_width: f32, align: TextAlign, last_line: bool) -> Vec<f32> {
    let slack = (block_width - layout.width).max(0.0);
    match align {
        TextAlign::Left => vec![0.0; layout.glyphs.len()],
        TextAlign::Center => vec![slack / 2.0; layout.glyphs.len()],
        TextAlign::Right => vec![slack; layout.glyphs.len()],
        TextAlign::Justify => {
            let gaps = layout.glyphs.iter().filter(|g| g.whitespace).count();
            if last_line || gaps == 0 {
                return vec![0.0; layout.glyphs.len()];
            }
            let per_gap = slack / gaps as f32;
            let mut shift = 0.0;
            layout
                .glyphs
                .iter()
                .map(|g| {
                    let current = shift;
                    if g.whitespace {
                        shift += per_gap;
                    }
                    current
                })
                .collect()
        }
    }
}

/// Source-over blend of `color` at `coverage` into one premultiplied pixel.
pub(crate) fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: SerializableColor, coverage: f32) {
    let (width, height) = (pixmap.width() as i32, pixmap.height() as i32);
    if x < 0 || y < 0 || x >= width || y >= height {
        return;
    }
    let alpha = color.a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let index = (y * width + x) as usize;
    let dst = pixmap.pixels()[index];
    let inv = 1.0 - alpha;
    let a = (255.0 * alpha + dst.alpha() as f32 * inv).round().min(255.0) as u8;
    let channel = |src: u8, dst: u8| ((src as f32 * alpha + dst as f32 * inv).round() as u8).min(a);
    let r = channel(color.r, dst.red());
    let g = channel(color.g, dst.green());
    let b = channel(color.b, dst.blue());
    if let Some(pixel) = PremultipliedColorU8::from_rgba(r, g, b, a) {
        pixmap.pixels_mut()[index] = pixel;
    }
}

/// Render `text` in `color`, including its outline when `with_outline`.
///
/// Returns `None` for empty content.
pub(crate) fn rasterize_text(
    text: &TextElement,
    font: &FontArc,
    color: SerializableColor,
    with_outline: bool,
) -> Option<TextRaster> {
    if text.content.is_empty() {
        return None;
    }

    let font_size = text.font_size as f32;
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);
    let line_advance = font_size * text.line_height as f32;
    let letter_spacing = text.letter_spacing as f32;

    let lines: Vec<LineLayout> = text
        .content
        .split('\n')
        .map(|line| layout_line(&scaled, line, letter_spacing))
        .collect();
    let block_width = lines.iter().map(|l| l.width).fold(0.0_f32, f32::max);
    let block_height = lines.len() as f32 * line_advance;

    let outline = text.outline.filter(|o| with_outline && o.width > 0.0);
    let outline_width = outline.map_or(0.0, |o| o.width as f32);
    let italic_extra = if text.italic { font_size * ITALIC_SHEAR } else { 0.0 };
    let margin = outline_width.ceil() + 2.0;

    let width = (block_width + italic_extra + 2.0 * margin).ceil().max(1.0) as u32;
    let height = (block_height + 2.0 * margin).ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height)?;

    // Outline passes first so the fill sits on top.
    let mut passes: Vec<(SerializableColor, f32, f32)> = Vec::new();
    if let Some(outline) = outline {
        for step in 0..8 {
            let angle = step as f32 * std::f32::consts::FRAC_PI_4;
            passes.push((outline.color, angle.cos() * outline_width, angle.sin() * outline_width));
        }
    }
    passes.push((color, 0.0, 0.0));
    if text.bold {
        passes.push((color, (font_size / 32.0).max(1.0), 0.0));
    }

    let ascent = scaled.ascent();
    for (index, line) in lines.iter().enumerate() {
        let baseline = margin + index as f32 * line_advance + ascent;
        let offsets = align_offsets(line, block_width, text.alignment, index + 1 == lines.len());
        for (glyph, shift) in line.glyphs.iter().zip(offsets) {
            let positioned = glyph
                .id
                .with_scale_and_position(scale, point(margin + glyph.x + shift, baseline));
            let Some(outlined) = font.outline_glyph(positioned) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            for &(pass_color, dx, dy) in &passes {
                outlined.draw(|gx, gy, coverage| {
                    let py = bounds.min.y + gy as f32;
                    let shear = if text.italic { (baseline - py) * ITALIC_SHEAR } else { 0.0 };
                    let px = bounds.min.x + gx as f32 + dx + shear;
                    blend_pixel(
                        &mut pixmap,
                        px.round() as i32,
                        (py + dy).round() as i32,
                        pass_color,
                        coverage,
                    );
                });
            }
        }

        if text.underline && line.width > 0.0 {
            let thickness = (font_size / 15.0).max(1.0).round() as i32;
            let top = (baseline + font_size * 0.1).round() as i32;
            let start = margin.round() as i32;
            let end = (margin + block_width).round() as i32;
            for y in top..top + thickness {
                for x in start..end {
                    blend_pixel(&mut pixmap, x, y, color, 1.0);
                }
            }
        }
    }

    Some(TextRaster {
        pixmap,
        origin: (text.x as f32 - margin, text.y as f32 - margin),
    })
}
