//! Turn a document-space query into selected text plus highlight rectangles
//!
//! The backend answers two different questions in two different coordinate
//! frames: "what text lies in this region" (top-left origin, same as the query)
//! and "where does this literal string occur" (text-layer, bottom-left
//! origin). Only the occurrence rectangles get flipped here; region queries are
//! already in the caller's frame.
//!
//! When the same literal line occurs several times on a page every matching
//! occurrence is returned. Text content alone cannot tell identical lines
//! apart, so callers highlight and extract all of them.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::document::{Document, DocumentBackend};
use super::geometry::{Rect, intersect, point_in_rect};
use super::types::TextGranularity;

/// Text plus the rectangles to highlight for it
pub type Resolved = (Option<String>, Vec<Rect>);

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\n\r\x0B\x0C]").expect("control character pattern is valid")
});

/// Replace newline, carriage return, form-feed and vertical-tab with a space.
#[must_use]
pub fn normalize_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, " ").into_owned()
}

/// Occurrences of `line` on the current page, flipped to top-left origin.
fn occurrences<B: DocumentBackend>(doc: &Document<B>, line: &str) -> Vec<Rect> {
    let page_height = doc.page().page_height;
    doc.find_text(line)
        .into_iter()
        .map(|rect| rect.flip_vertical(page_height))
        .collect()
}

/// Single line under the point `(x, y)`.
pub fn find_line<B: DocumentBackend>(doc: &Document<B>, x: f32, y: f32) -> Resolved {
    let query = Rect::from_point(x, y);
    let Some(text) = doc.selected_text(TextGranularity::Line, &query) else {
        return (None, Vec::new());
    };

    let Some(line) = text.lines().next().filter(|line| !line.is_empty()) else {
        return (None, Vec::new());
    };

    let areas: Vec<Rect> = occurrences(doc, line)
        .into_iter()
        .filter(|rect| point_in_rect(x, y, rect))
        .collect();

    debug!("Found line {line:?} at {} area(s)", areas.len());
    (Some(line.to_string()), areas)
}

/// Free multi-line selection over a dragged `query` rectangle.
pub fn find_text<B: DocumentBackend>(doc: &Document<B>, query: &Rect) -> Resolved {
    let Some(text) = doc.selected_text(TextGranularity::Word, query) else {
        return (None, Vec::new());
    };

    let mut areas: Vec<Rect> = Vec::new();
    for line in text.lines().filter(|line| !line.is_empty()) {
        for rect in occurrences(doc, line) {
            if intersect(&rect, query).is_some() {
                areas.push(rect);
            }
        }
    }

    if areas.is_empty() {
        debug!("Text {text:?} has no occurrence inside the query");
        return (None, Vec::new());
    }

    debug!("Found text spanning {} area(s)", areas.len());
    (Some(normalize_control_chars(&text)), areas)
}

/// Image mode selects the dragged rectangle itself.
#[must_use]
pub fn image_region(anchor: (f32, f32), current: (f32, f32)) -> Rect {
    Rect::normalize(anchor.0, anchor.1, current.0, current.1)
}
