//! Document adapter over a paginated document backend
//!
//! [`Document`] owns the loaded backend and the [`PageContext`] and is the only
//! place where the current page changes. Everything else reads page state
//! through it.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::geometry::Rect;
use super::types::{Color, Surface, TextGranularity, WHITE};

/// Errors from the document layer
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("cannot open {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("no document loaded")]
    NotLoaded,

    #[error("page {page} out of range")]
    PageOutOfRange { page: usize },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Render { detail: String },
}

impl DocError {
    pub fn unreadable(path: &Path, reason: impl ToString) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render { detail: msg.into() }
    }
}

/// Primitives a document engine has to provide.
///
/// Page numbers are 0-based. Rectangles returned by [`find_text`] use the
/// text-layer convention (origin bottom-left); regions passed to
/// [`selected_text`] and [`render_selection`] use the render convention
/// (origin top-left).
///
/// [`find_text`]: DocumentBackend::find_text
/// [`selected_text`]: DocumentBackend::selected_text
/// [`render_selection`]: DocumentBackend::render_selection
pub trait DocumentBackend {
    fn open(path: &Path) -> Result<Self, DocError>
    where
        Self: Sized;

    fn page_count(&self) -> usize;

    /// Native page size in document units.
    fn page_size(&self, page: usize) -> Result<(f32, f32), DocError>;

    /// Every occurrence of the literal `needle` on `page`, bottom-left origin.
    fn find_text(&self, page: usize, needle: &str) -> Vec<Rect>;

    /// Text units of the given granularity intersecting `region`.
    fn selected_text(
        &self,
        page: usize,
        granularity: TextGranularity,
        region: &Rect,
    ) -> Option<String>;

    /// Rasterise `page` into `surface`, page origin placed at `origin`
    /// (surface pixels) and page units multiplied by `scale`.
    fn render(
        &self,
        page: usize,
        surface: &mut Surface,
        origin: (f32, f32),
        scale: f32,
    ) -> Result<(), DocError>;

    /// Backend-native selection highlight for one rectangle.
    ///
    /// Returns `Ok(false)` when the engine has no such primitive and the
    /// caller has to draw the highlight itself.
    fn render_selection(
        &self,
        _page: usize,
        _surface: &mut Surface,
        _rect: &Rect,
        _scale: f32,
        _glyph: Color,
        _background: Color,
    ) -> Result<bool, DocError> {
        Ok(false)
    }
}

/// Current page of the loaded document
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageContext {
    /// Page index (0-based)
    pub page_number: usize,
    pub page_width: f32,
    pub page_height: f32,
    pub pages_count: usize,
}

/// A document plus the page currently shown
pub struct Document<B> {
    backend: Option<B>,
    path: Option<PathBuf>,
    page: PageContext,
}

impl<B> Default for Document<B> {
    fn default() -> Self {
        Self {
            backend: None,
            path: None,
            page: PageContext::default(),
        }
    }
}

impl<B: DocumentBackend> Document<B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` with the backend and show its first page.
    ///
    /// On failure the previously loaded document (if any) stays as it was.
    pub fn open(&mut self, path: &Path) -> Result<PageContext, DocError> {
        info!("Opening document {}", path.display());
        let backend = B::open(path).inspect_err(|e| warn!("Cannot open document: {e}"))?;
        self.load(path.to_path_buf(), backend)
    }

    /// Adopt an already constructed backend.
    pub fn load(&mut self, path: PathBuf, backend: B) -> Result<PageContext, DocError> {
        let pages_count = backend.page_count();
        let (page_width, page_height) = if pages_count > 0 {
            backend.page_size(0)?
        } else {
            (0.0, 0.0)
        };

        self.backend = Some(backend);
        self.path = Some(path);
        self.page = PageContext {
            page_number: 0,
            page_width,
            page_height,
            pages_count,
        };
        Ok(self.page)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    #[must_use]
    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Switch to page `n` if it exists; otherwise nothing changes.
    pub fn set_page(&mut self, n: usize) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        if n >= self.page.pages_count {
            debug!("Page {n} out of range (0..{})", self.page.pages_count);
            return false;
        }

        match backend.page_size(n) {
            Ok((page_width, page_height)) => {
                debug!("Set page to number {n}");
                self.page.page_number = n;
                self.page.page_width = page_width;
                self.page.page_height = page_height;
                true
            }
            Err(e) => {
                warn!("Cannot read size of page {n}: {e}");
                false
            }
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page.page_number + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.page.page_number.checked_sub(1) {
            Some(n) => self.set_page(n),
            None => false,
        }
    }

    /// Go to a page typed by the user as a 1-based label.
    pub fn go_to_page_label(&mut self, label: &str) -> bool {
        match label.trim().parse::<usize>() {
            Ok(number) if number > 0 => self.set_page(number - 1),
            Ok(_) => false,
            Err(e) => {
                warn!("Cannot convert page label {label:?} to a page number: {e}");
                false
            }
        }
    }

    #[must_use]
    pub fn page_size(&self) -> Option<(f32, f32)> {
        self.backend
            .as_ref()
            .map(|_| (self.page.page_width, self.page.page_height))
    }

    /// Occurrences of `needle` on the current page, text-layer coordinates.
    #[must_use]
    pub fn find_text(&self, needle: &str) -> Vec<Rect> {
        match &self.backend {
            Some(backend) => backend.find_text(self.page.page_number, needle),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn selected_text(&self, granularity: TextGranularity, region: &Rect) -> Option<String> {
        let backend = self.backend.as_ref()?;
        backend
            .selected_text(self.page.page_number, granularity, region)
            .filter(|text| !text.is_empty())
    }

    /// Paint the current page on white at `origin` with `scale`.
    pub fn render_page(
        &self,
        surface: &mut Surface,
        origin: (f32, f32),
        scale: f32,
    ) -> Result<(), DocError> {
        let backend = self.backend.as_ref().ok_or(DocError::NotLoaded)?;

        for pixel in surface.pixels_mut() {
            *pixel = WHITE;
        }

        backend.render(self.page.page_number, surface, origin, scale)
    }

    /// Ask the backend to draw its own highlight for `rect`.
    pub fn render_selection_highlight(
        &self,
        surface: &mut Surface,
        rect: &Rect,
        scale: f32,
        glyph: Color,
        background: Color,
    ) -> Result<bool, DocError> {
        let backend = self.backend.as_ref().ok_or(DocError::NotLoaded)?;
        backend.render_selection(
            self.page.page_number,
            surface,
            rect,
            scale,
            glyph,
            background,
        )
    }
}
