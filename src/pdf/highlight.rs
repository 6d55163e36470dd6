//! Highlight overlay painted over a rendered page surface
//!
//! Text selections are tinted (or drawn by the backend when it has its own
//! selection primitive). Image selections get a thin solid border inside a
//! wide translucent band so the cropped region stays visible.

use super::document::{DocError, Document, DocumentBackend};
use super::geometry::Rect;
use super::types::{Color, Selection, Surface};

/// Solid border width around an image selection, in pixels
const BORDER_PX: f32 = 2.0;
/// Translucent band width around an image selection, in pixels
const BAND_PX: f32 = 20.0;

/// Pixel rectangle clamped to a surface, `x1`/`y1` exclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelRect {
    fn clamp(rect: &Rect, surface: &Surface) -> Option<Self> {
        let max_x = surface.width() as f32;
        let max_y = surface.height() as f32;
        if rect.x2 <= 0.0 || rect.y2 <= 0.0 || rect.x1 >= max_x || rect.y1 >= max_y {
            return None;
        }

        let x0 = rect.x1.floor().max(0.0) as u32;
        let y0 = rect.y1.floor().max(0.0) as u32;
        let x1 = rect.x2.ceil().min(max_x) as u32;
        let y1 = rect.y2.ceil().min(max_y) as u32;

        if x0 >= x1 || y0 >= y1 {
            None
        } else {
            Some(Self { x0, y0, x1, y1 })
        }
    }
}

/// Alpha-blend `color` over every pixel of `rect` (surface pixels).
pub fn blend_rect(surface: &mut Surface, rect: &Rect, color: Color) {
    let Some(px) = PixelRect::clamp(rect, surface) else {
        return;
    };
    let src = color.to_rgb8();
    let alpha = color.a.clamp(0.0, 1.0);

    for y in px.y0..px.y1 {
        for x in px.x0..px.x1 {
            let dst = surface.get_pixel_mut(x, y);
            for c in 0..3 {
                let mixed = f32::from(dst.0[c]) * (1.0 - alpha) + f32::from(src.0[c]) * alpha;
                dst.0[c] = mixed.round() as u8;
            }
        }
    }
}

/// Stroke the outline of `rect` with a line of `width` pixels centred on it.
pub fn stroke_rect(surface: &mut Surface, rect: &Rect, width: f32, color: Color) {
    let half = width / 2.0;
    let outer = Rect::new(rect.x1 - half, rect.y1 - half, rect.x2 + half, rect.y2 + half);
    let inner = Rect::new(rect.x1 + half, rect.y1 + half, rect.x2 - half, rect.y2 - half);

    // Four bands that never overlap, so translucent colours blend once
    let bands = [
        Rect::new(outer.x1, outer.y1, outer.x2, inner.y1),
        Rect::new(outer.x1, inner.y2.max(inner.y1), outer.x2, outer.y2),
        Rect::new(outer.x1, inner.y1, inner.x1, inner.y2),
        Rect::new(inner.x2.max(inner.x1), inner.y1, outer.x2, inner.y2),
    ];
    for band in &bands {
        blend_rect(surface, band, color);
    }
}

/// Paint `selection` over a page surface rendered at `scale`.
pub fn draw_selection<B: DocumentBackend>(
    surface: &mut Surface,
    selection: &Selection,
    scale: f32,
    doc: &Document<B>,
) -> Result<(), DocError> {
    for (i, area) in selection.areas.iter().enumerate() {
        // Repeated lines list the same area more than once
        if selection.areas[..i].contains(area) {
            continue;
        }
        let px = area.scaled(scale);
        if selection.mode.is_text() {
            let native =
                doc.render_selection_highlight(surface, area, scale, Color::GLYPH, Color::SEA)?;
            if !native {
                blend_rect(surface, &px, Color::SEA_LIGHT);
            }
        } else {
            stroke_rect(surface, &px, BAND_PX, Color::SEA_LIGHT);
            stroke_rect(surface, &px, BORDER_PX, Color::SEA);
        }
    }
    Ok(())
}
