//! Scale state for the page view
//!
//! Maps pointer positions on the scaled page surface back to document units
//! and owns the zoom policy (fit-to-width or a fixed percentage).

use std::str::FromStr;

/// Scroll direction reported by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Zoom selected by the user
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomSetting {
    /// Scale follows the viewport width
    FitWidth,
    /// Fixed zoom in percent (100.0 = native size)
    Percent(f32),
}

/// Parses `fit` or one of [`ViewState::PRESETS`] (an optional `%` suffix is
/// accepted).
impl FromStr for ZoomSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("fit") {
            return Ok(Self::FitWidth);
        }
        let percent: u32 = s
            .trim_end_matches('%')
            .parse()
            .map_err(|e| format!("{s:?}: {e}"))?;
        if ViewState::PRESETS.contains(&percent) {
            Ok(Self::Percent(percent as f32))
        } else {
            Err(format!(
                "{percent}% is not a zoom preset (fit or one of {:?})",
                ViewState::PRESETS
            ))
        }
    }
}

/// Outcome of a zoom step request
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomChange {
    /// Zoom moved to the given percentage
    Applied(f32),
    /// Already at the limit, nothing changed
    AtLimit,
}

/// Scale and viewport state of the page view
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    /// Current scale factor (1.0 = 100%)
    pub scale: f32,
    /// Visible width of the view in pixels
    pub viewport_width: f32,
    /// Whether `scale` tracks the viewport width
    pub fit_to_width: bool,
    /// Explicit zoom in percent, used when not fitting to width
    pub percent: f32,
    /// Scale pinned by the user for inserted images
    pub image_scale: Option<f32>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            viewport_width: 0.0,
            fit_to_width: true,
            percent: 100.0,
            image_scale: None,
        }
    }
}

impl ViewState {
    /// Zoom change per scroll step, in percentage points
    pub const ZOOM_STEP: f32 = 20.0;
    /// Lowest zoom reachable by scrolling
    pub const MIN_PERCENT: f32 = 20.0;
    /// Highest zoom reachable by scrolling
    pub const MAX_PERCENT: f32 = 400.0;
    /// Zoom levels offered to the user
    pub const PRESETS: [u32; 8] = [20, 40, 60, 80, 100, 200, 300, 400];

    /// Screen pixel on the page surface to document units.
    #[must_use]
    pub fn to_document(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (screen_x / self.scale, screen_y / self.scale)
    }

    /// Document units to screen pixels on the page surface.
    #[must_use]
    pub fn to_screen(&self, doc_x: f32, doc_y: f32) -> (f32, f32) {
        (doc_x * self.scale, doc_y * self.scale)
    }

    #[must_use]
    pub fn compute_fit_scale(viewport_width: f32, page_width: f32) -> f32 {
        viewport_width / page_width
    }

    /// Current zoom in percent, derived from the effective scale.
    #[must_use]
    pub fn zoom_percent(&self) -> f32 {
        self.scale * 100.0
    }

    #[must_use]
    pub fn setting(&self) -> ZoomSetting {
        if self.fit_to_width {
            ZoomSetting::FitWidth
        } else {
            ZoomSetting::Percent(self.percent)
        }
    }

    pub fn set_zoom(&mut self, setting: ZoomSetting) {
        match setting {
            ZoomSetting::FitWidth => self.fit_to_width = true,
            ZoomSetting::Percent(percent) => {
                self.fit_to_width = false;
                self.percent = percent;
            }
        }
    }

    /// Recompute `scale` for a page of `page_width` document units.
    ///
    /// Returns true when the scale changed. A degenerate fit computation (no
    /// viewport yet, zero-width page) keeps the previous scale.
    pub fn update(&mut self, page_width: f32) -> bool {
        let scale = if self.fit_to_width {
            let fit = Self::compute_fit_scale(self.viewport_width, page_width);
            if !fit.is_finite() || fit <= 0.0 {
                return false;
            }
            fit
        } else {
            self.percent / 100.0
        };

        if (self.scale - scale).abs() > f32::EPSILON {
            self.scale = scale;
            true
        } else {
            false
        }
    }

    /// Record a new viewport width; true if it differs from the old one.
    pub fn resize(&mut self, viewport_width: f32) -> bool {
        if (self.viewport_width - viewport_width).abs() > f32::EPSILON {
            self.viewport_width = viewport_width;
            true
        } else {
            false
        }
    }

    /// Step zoom by one scroll notch, leaving fit-to-width.
    pub fn step(&mut self, direction: ScrollDirection) -> ZoomChange {
        let current = self.zoom_percent();
        let target = match direction {
            ScrollDirection::Up if current < Self::MAX_PERCENT => {
                (current + Self::ZOOM_STEP).min(Self::MAX_PERCENT)
            }
            ScrollDirection::Down if current > Self::MIN_PERCENT => {
                (current - Self::ZOOM_STEP).max(Self::MIN_PERCENT)
            }
            _ => return ZoomChange::AtLimit,
        };

        self.fit_to_width = false;
        self.percent = target;
        self.scale = target / 100.0;
        ZoomChange::Applied(target)
    }

    pub fn zoom_in(&mut self) -> ZoomChange {
        self.step(ScrollDirection::Up)
    }

    pub fn zoom_out(&mut self) -> ZoomChange {
        self.step(ScrollDirection::Down)
    }

    /// Remember the current scale for sizing inserted images.
    pub fn pin_image_scale(&mut self) {
        self.image_scale = Some(self.scale);
    }

    /// Pixel size of the page surface at the current scale.
    #[must_use]
    pub fn surface_size(&self, page_width: f32, page_height: f32) -> (u32, u32) {
        (
            (page_width * self.scale).max(0.0) as u32,
            (page_height * self.scale).max(0.0) as u32,
        )
    }
}
