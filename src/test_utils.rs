//! In-memory document backend and note sink for tests
//!
//! `FakeBackend` models each page as a list of text lines with known boxes.
//! Glyphs are spread evenly over their line box, which is enough to answer
//! word, line and literal-search queries the way a real engine would.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::notes::NoteSink;
use crate::pdf::{
    Color, DocError, DocumentBackend, Rect, Surface, TextGranularity, geometry::intersect,
};

/// Line of text with its box (top-left origin)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FakeLine {
    pub text: String,
    pub rect: Rect,
}

impl FakeLine {
    /// Box of the characters `start..end` (char indices).
    fn span(&self, start: usize, end: usize) -> Rect {
        let len = self.text.chars().count().max(1) as f32;
        let width = self.rect.x2 - self.rect.x1;
        Rect::new(
            self.rect.x1 + width * start as f32 / len,
            self.rect.y1,
            self.rect.x1 + width * end as f32 / len,
            self.rect.y2,
        )
    }

    /// Whitespace separated words with their boxes.
    fn words(&self) -> Vec<(String, Rect)> {
        let chars: Vec<char> = self.text.chars().collect();
        let mut words = Vec::new();
        let mut start = None;
        for (i, c) in chars.iter().enumerate() {
            match (c.is_whitespace(), start) {
                (false, None) => start = Some(i),
                (true, Some(s)) => {
                    words.push((chars[s..i].iter().collect(), self.span(s, i)));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            words.push((chars[s..].iter().collect(), self.span(s, chars.len())));
        }
        words
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FakePage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub lines: Vec<FakeLine>,
}

/// Scripted document backend
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FakeBackend {
    pub pages: Vec<FakePage>,
    /// Paint line boxes black when rendering
    #[serde(default)]
    pub ink: bool,
    /// Pretend the engine has a native highlight primitive
    #[serde(default)]
    pub native_highlight: bool,
}

impl FakeBackend {
    #[must_use]
    pub fn with_pages(count: usize, width: f32, height: f32) -> Self {
        Self {
            pages: (0..count)
                .map(|_| FakePage {
                    width,
                    height,
                    lines: Vec::new(),
                })
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn single_page(width: f32, height: f32) -> Self {
        Self::with_pages(1, width, height)
    }

    /// Add a line to `page`; `rect` uses the top-left origin.
    #[must_use]
    pub fn with_line(mut self, page: usize, text: &str, rect: Rect) -> Self {
        if let Some(p) = self.pages.get_mut(page) {
            p.lines.push(FakeLine {
                text: text.to_string(),
                rect,
            });
        }
        self
    }

    #[must_use]
    pub fn with_ink(mut self) -> Self {
        self.ink = true;
        self
    }

    #[must_use]
    pub fn with_native_highlight(mut self) -> Self {
        self.native_highlight = true;
        self
    }

    fn lines(&self, page: usize) -> &[FakeLine] {
        self.pages
            .get(page)
            .map(|p| p.lines.as_slice())
            .unwrap_or_default()
    }
}

impl DocumentBackend for FakeBackend {
    /// Loads a JSON fixture describing the pages.
    fn open(path: &Path) -> Result<Self, DocError> {
        let content = fs::read_to_string(path).map_err(|e| DocError::unreadable(path, e))?;
        serde_json::from_str(&content).map_err(|e| DocError::unreadable(path, e))
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<(f32, f32), DocError> {
        self.pages
            .get(page)
            .map(|p| (p.width, p.height))
            .ok_or(DocError::PageOutOfRange { page })
    }

    fn find_text(&self, page: usize, needle: &str) -> Vec<Rect> {
        let Some(height) = self.pages.get(page).map(|p| p.height) else {
            return Vec::new();
        };
        let needle_len = needle.chars().count();
        if needle_len == 0 {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for line in self.lines(page) {
            let chars: Vec<char> = line.text.chars().collect();
            let needle: Vec<char> = needle.chars().collect();
            for start in 0..chars.len().saturating_sub(needle_len - 1) {
                if chars[start..start + needle_len] == needle[..] {
                    hits.push(line.span(start, start + needle_len).flip_vertical(height));
                }
            }
        }
        hits
    }

    fn selected_text(
        &self,
        page: usize,
        granularity: TextGranularity,
        region: &Rect,
    ) -> Option<String> {
        let lines: Vec<String> = self
            .lines(page)
            .iter()
            .filter_map(|line| match granularity {
                TextGranularity::Line => {
                    intersect(&line.rect, region).map(|_| line.text.clone())
                }
                TextGranularity::Word => {
                    let words: Vec<String> = line
                        .words()
                        .into_iter()
                        .filter(|(_, rect)| intersect(rect, region).is_some())
                        .map(|(word, _)| word)
                        .collect();
                    (!words.is_empty()).then(|| words.join(" "))
                }
            })
            .collect();

        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    fn render(
        &self,
        page: usize,
        surface: &mut Surface,
        origin: (f32, f32),
        scale: f32,
    ) -> Result<(), DocError> {
        if page >= self.pages.len() {
            return Err(DocError::PageOutOfRange { page });
        }
        if !self.ink {
            return Ok(());
        }
        for line in self.lines(page) {
            fill(surface, &line.rect.scaled(scale), origin, Rgb([0, 0, 0]));
        }
        Ok(())
    }

    fn render_selection(
        &self,
        _page: usize,
        surface: &mut Surface,
        rect: &Rect,
        scale: f32,
        _glyph: Color,
        background: Color,
    ) -> Result<bool, DocError> {
        if !self.native_highlight {
            return Ok(false);
        }
        fill(surface, &rect.scaled(scale), (0.0, 0.0), background.to_rgb8());
        Ok(true)
    }
}

fn fill(surface: &mut Surface, rect: &Rect, origin: (f32, f32), color: Rgb<u8>) {
    let x0 = (rect.x1 + origin.0).max(0.0) as u32;
    let y0 = (rect.y1 + origin.1).max(0.0) as u32;
    let x1 = ((rect.x2 + origin.0).max(0.0) as u32).min(surface.width());
    let y1 = ((rect.y2 + origin.1).max(0.0) as u32).min(surface.height());
    for y in y0..y1 {
        for x in x0..x1 {
            surface.put_pixel(x, y, color);
        }
    }
}

/// Payload delivered to a [`RecordingSink`]
#[derive(Clone, Debug, PartialEq)]
pub enum Inserted {
    Text(String),
    Image {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// Note sink remembering every insertion
#[derive(Debug)]
pub struct RecordingSink {
    pub dir: PathBuf,
    pub inserted: Vec<Inserted>,
}

impl RecordingSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inserted: Vec::new(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.inserted
            .iter()
            .filter_map(|i| match i {
                Inserted::Text(t) => Some(t.as_str()),
                Inserted::Image { .. } => None,
            })
            .collect()
    }
}

impl NoteSink for RecordingSink {
    fn attachment_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn insert_text(&mut self, text: &str) -> Result<()> {
        self.inserted.push(Inserted::Text(text.to_string()));
        Ok(())
    }

    fn insert_image(&mut self, path: &Path, width_px: u32, height_px: u32) -> Result<()> {
        self.inserted.push(Inserted::Image {
            path: path.to_path_buf(),
            width: width_px,
            height: height_px,
        });
        Ok(())
    }
}
