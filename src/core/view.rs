//! Rendered view model
//!
//! These types are what the service hands to an overlay renderer on every
//! refresh. They are rebuilt from scratch each time and never persisted.
//! The serde derives let host integrations ship them over whatever display
//! protocol they use.

use serde::{Deserialize, Serialize};

/// A contiguous run of text sharing one color within a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub text: String,
    /// Normalized `#rrggbb` color, or empty for the renderer's default
    /// ([`DEFAULT_TEXT_COLOR`](crate::core::constants::DEFAULT_TEXT_COLOR))
    #[serde(default)]
    pub color: String,
}

impl LineSegment {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
        }
    }
}

/// One fully rendered line: its colored segments plus the bold flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRender {
    pub segments: Vec<LineSegment>,
    pub bold: bool,
}

impl LineRender {
    pub fn new(segments: Vec<LineSegment>, bold: bool) -> Self {
        Self { segments, bold }
    }

    /// Plain-text concatenation of all segments, colors dropped
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// The complete board state for one client, one refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub title: String,
    /// Normalized title color, empty for the renderer's default
    #[serde(default)]
    pub title_color: String,
    #[serde(default)]
    pub logo_texture_path: String,
    pub offset_right: i32,
    pub offset_top: i32,
    pub lines: Vec<LineRender>,
    pub divider_visible: bool,
    pub logo_visible: bool,
}

impl BoardView {
    /// JSON form for renderers that forward the view over a wire protocol
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
