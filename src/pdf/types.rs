//! Core types for selecting content on PDF pages

use image::{Rgb, RgbImage};

use super::geometry::{Rect, point_in_any};

/// Raster target for page rendering: 24-bit RGB, 3 bytes per pixel.
pub type Surface = RgbImage;

/// Fill colour painted under every page before the backend draws on it.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// How the pointer selects content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Hovering highlights the single line under the pointer
    #[default]
    Line,
    /// Free-form multi-line span; only entered by dragging in `Line` mode
    Text,
    /// Rectangular raster region
    Image,
}

impl SelectionMode {
    /// Mode reached through the "switch selection mode" shortcut.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Image => Self::Line,
            Self::Line | Self::Text => Self::Image,
        }
    }

    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Self::Line | Self::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Line => "line",
            SelectionMode::Text => "text",
            SelectionMode::Image => "image",
        }
    }
}

/// Granularity of a backend region-to-text query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextGranularity {
    Word,
    Line,
}

/// Currently held selection
///
/// `areas` keeps the order in which the resolver found them (render order),
/// it is not sorted spatially.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub text: Option<String>,
    pub areas: Vec<Rect>,
    pub mode: SelectionMode,
}

impl Selection {
    #[must_use]
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            text: None,
            areas: Vec::new(),
            mode,
        }
    }

    /// Forget text and areas.
    ///
    /// `Text` only exists while a dragged result is held, so clearing falls
    /// back to `Line`.
    pub fn clear(&mut self) {
        self.text = None;
        self.areas.clear();
        if self.mode == SelectionMode::Text {
            self.mode = SelectionMode::Line;
        }
    }

    pub fn set(&mut self, text: Option<String>, areas: Vec<Rect>) {
        self.text = text;
        self.areas = areas;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        point_in_any(x, y, &self.areas)
    }
}

/// Pointer press being tracked, anchored in document space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragGesture {
    pub active: bool,
    pub anchor_x: f32,
    pub anchor_y: f32,
}

impl DragGesture {
    pub fn start(&mut self, x: f32, y: f32) {
        self.active = true;
        self.anchor_x = x;
        self.anchor_y = y;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Release at exactly the anchor: a click rather than a drag.
    #[must_use]
    pub fn is_click(&self, x: f32, y: f32) -> bool {
        self.anchor_x == x && self.anchor_y == y
    }

    /// Rectangle spanned by the anchor and the given point.
    #[must_use]
    pub fn span_to(&self, x: f32, y: f32) -> Rect {
        Rect::normalize(self.anchor_x, self.anchor_y, x, y)
    }
}

/// Colours used for highlights (RGB in 0.0..=1.0 plus alpha)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const SEA: Color = Color::rgba(0.31, 0.61, 0.71, 1.0);
    pub const SEA_LIGHT: Color = Color::rgba(0.31, 0.61, 0.71, 0.4);
    pub const GLYPH: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn to_rgb8(self) -> Rgb<u8> {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb([channel(self.r), channel(self.g), channel(self.b)])
    }
}
