//! Word-by-word subtitle overlays as ffmpeg `drawtext` filters.
//!
//! Timings are first turned into [`OverlayDirective`] records (one per word,
//! text already escaped) and serialised once by [`OverlayScript::to_filter`].
//!
//! ## drawtext escaping (applied in this order)
//!
//! | Char | Becomes | Why |
//! |------|---------|-----|
//! | `\`  | `\\`    | escape character itself |
//! | `'`  | `\'`    | value is single-quoted |
//! | `:`  | `\:`    | option separator |
//! | `%`  | `%%`    | text expansion |
//! | `\r` | removed | overlay literal is a single line |
//! | `\n` | space   | overlay literal is a single line |

use std::path::{Path, PathBuf};

use crate::timing::WordTiming;

/// Fixed subtitle look: uppercase, bold white, black stroke, centred.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub font_size: u32,
    pub font_color: String,
    pub border_color: String,
    pub border_width: u32,
    /// Embedded only when the file exists on disk.
    pub font_file: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 90,
            font_color: "white".into(),
            border_color: "black".into(),
            border_width: 3,
            font_file: None,
        }
    }
}

/// One timed text overlay. Visible while `start <= t < end`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDirective {
    /// Uppercased and escaped for a single-quoted drawtext value.
    pub escaped_text: String,
    pub start: f64,
    pub end: f64,
}

/// Directives plus the style they share.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScript {
    pub style: OverlayStyle,
    pub directives: Vec<OverlayDirective>,
}

impl OverlayScript {
    /// One directive per timing, in the order given.
    pub fn build(timings: &[WordTiming], style: OverlayStyle) -> Self {
        let directives = timings
            .iter()
            .map(|t| OverlayDirective {
                escaped_text: escape_drawtext(&t.word.to_uppercase()),
                start: t.start,
                end: t.end,
            })
            .collect();
        Self { style, directives }
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Serialise to a comma-joined filter chain. Empty when there are no
    /// directives: callers must then omit `-vf` entirely.
    pub fn to_filter(&self) -> String {
        if self.directives.is_empty() {
            return String::new();
        }

        let font_part = self
            .style
            .font_file
            .as_deref()
            .filter(|p| p.exists())
            .map(|p| format!("fontfile='{}':", escape_font_path(p)))
            .unwrap_or_default();

        self.directives
            .iter()
            .map(|d| {
                format!(
                    "drawtext={font_part}text='{text}':fontsize={size}:fontcolor={color}:\
                     bordercolor={border}:borderw={borderw}:x=(w-text_w)/2:y=(h-text_h)/2:\
                     enable='gte(t,{start:.3})*lt(t,{end:.3})'",
                    text = d.escaped_text,
                    size = self.style.font_size,
                    color = self.style.font_color,
                    border = self.style.border_color,
                    borderw = self.style.border_width,
                    start = d.start,
                    end = d.end,
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Build the overlay filter string for `timings` in one step.
pub fn build_overlay_filter(timings: &[WordTiming], style: OverlayStyle) -> String {
    OverlayScript::build(timings, style).to_filter()
}

/// Escape `text` for a single-quoted drawtext `text=` value.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('%', "%%")
        .replace('\r', "")
        .replace('\n', " ")
}

/// Forward slashes, with the drive-letter colon escaped.
fn escape_font_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(':', "\\:")
}
