//! Text element and its style configuration.

use super::{Element, SerializableColor};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Outline drawn around glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    pub color: SerializableColor,
    pub width: f64,
}

/// Drop shadow behind glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    pub color: SerializableColor,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Active text-tool configuration, applied to the next text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: String,
    pub color: SerializableColor,
    pub alignment: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Render content uppercased; the raw input is kept for later edits.
    pub uppercase: bool,
    pub letter_spacing: f64,
    pub line_height: f64,
    pub outline: Option<TextOutline>,
    pub shadow: Option<TextShadow>,
    pub padding: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: TextElement::DEFAULT_FONT_SIZE,
            font_family: "Arial".to_string(),
            color: SerializableColor::black(),
            alignment: TextAlign::Left,
            bold: false,
            italic: false,
            underline: false,
            uppercase: false,
            letter_spacing: 0.0,
            line_height: 1.2,
            outline: None,
            shadow: None,
            padding: 0.0,
        }
    }
}

/// A block of text placed at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Displayed content (after the case transform).
    pub content: String,
    /// Content as typed.
    pub raw_content: String,
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font_family: String,
    pub color: SerializableColor,
    #[serde(default)]
    pub alignment: TextAlign,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub uppercase: bool,
    #[serde(default)]
    pub letter_spacing: f64,
    pub line_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<TextOutline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<TextShadow>,
    #[serde(default)]
    pub padding: f64,
}

impl TextElement {
    pub const DEFAULT_FONT_SIZE: f64 = 32.0;

    /// Average glyph advance as a fraction of the font size.
    const AVERAGE_ADVANCE: f64 = 0.6;

    /// Build a text payload from a style configuration and a position.
    pub fn from_style(style: &TextStyle, raw_content: &str, position: Point) -> Self {
        let mut text = Self {
            content: String::new(),
            raw_content: String::new(),
            x: position.x,
            y: position.y,
            font_size: style.font_size,
            font_family: style.font_family.clone(),
            color: style.color,
            alignment: style.alignment,
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            uppercase: style.uppercase,
            letter_spacing: style.letter_spacing,
            line_height: style.line_height,
            outline: style.outline,
            shadow: style.shadow,
            padding: style.padding,
        };
        text.set_raw_content(raw_content);
        text
    }

    /// Replace the typed content and re-derive the displayed content.
    pub fn set_raw_content(&mut self, raw_content: &str) {
        self.raw_content = raw_content.to_string();
        self.content = if self.uppercase {
            raw_content.to_uppercase()
        } else {
            raw_content.to_string()
        };
    }

    /// CSS-like font style string derived from the bold/italic flags.
    pub fn font_style(&self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => "normal",
            (true, false) => "bold",
            (false, true) => "italic",
            (true, true) => "bold italic",
        }
    }

    /// CSS-like text decoration derived from the underline flag.
    pub fn text_decoration(&self) -> &'static str {
        if self.underline { "underline" } else { "" }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Approximate bounds from the character count.
    ///
    /// Exact metrics need the host's text measurement; this estimate is what
    /// crop filtering works with.
    pub fn estimated_bounds(&self) -> Rect {
        let lines: Vec<&str> = self.content.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = longest as f64 * self.font_size * Self::AVERAGE_ADVANCE;
        let height = lines.len() as f64 * self.font_size * self.line_height;
        Rect::new(self.x, self.y, self.x + width, self.y + height)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}

impl Element {
    /// Create a text element from a style configuration and positional overrides.
    pub fn create_text(style: &TextStyle, raw_content: &str, position: Point) -> Self {
        Element::text(TextElement::from_style(style, raw_content, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_keeps_raw_content() {
        let style = TextStyle {
            uppercase: true,
            ..TextStyle::default()
        };
        let element = Element::create_text(&style, "Hello there", Point::new(5.0, 6.0));
        let text = element.as_text().unwrap();
        assert_eq!(text.content, "HELLO THERE");
        assert_eq!(text.raw_content, "Hello there");
        assert_eq!(text.position(), Point::new(5.0, 6.0));
    }

    #[test]
    fn test_fresh_ids() {
        let style = TextStyle::default();
        let a = Element::create_text(&style, "a", Point::ZERO);
        let b = Element::create_text(&style, "a", Point::ZERO);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_font_style_and_decoration() {
        let mut text = TextElement::from_style(&TextStyle::default(), "x", Point::ZERO);
        assert_eq!(text.font_style(), "normal");
        assert_eq!(text.text_decoration(), "");
        text.bold = true;
        text.italic = true;
        text.underline = true;
        assert_eq!(text.font_style(), "bold italic");
        assert_eq!(text.text_decoration(), "underline");
    }

    #[test]
    fn test_estimated_bounds() {
        let style = TextStyle {
            font_size: 10.0,
            line_height: 1.5,
            ..TextStyle::default()
        };
        let text = TextElement::from_style(&style, "abcd", Point::new(100.0, 50.0));
        let bounds = text.estimated_bounds();
        assert!((bounds.width() - 24.0).abs() < 1e-9);
        assert!((bounds.height() - 15.0).abs() < 1e-9);
        assert!((bounds.x0 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edit_reapplies_transform() {
        let style = TextStyle {
            uppercase: true,
            ..TextStyle::default()
        };
        let mut text = TextElement::from_style(&style, "one", Point::ZERO);
        text.set_raw_content("two\nlines");
        assert_eq!(text.content, "TWO\nLINES");
        assert_eq!(text.raw_content, "two\nlines");
    }
}
