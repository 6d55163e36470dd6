//! Crop-render a page region and hand it to the notes as a PNG
//!
//! The region is rendered at the largest scale that keeps the image within the
//! configured pixel limits. The size the note displays it at is computed
//! separately, from the pinned view scale or from the insert width limit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::ImageFormat;
use log::{debug, info, warn};

use super::filename::{document_base_name, unique_snapshot_path};
use crate::notes::NoteSink;
use crate::pdf::{DocError, Document, DocumentBackend, Rect, Surface};
use crate::settings::Settings;

/// Pixel limits applied to extracted images
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageLimits {
    pub max_width_px: u32,
    pub max_height_px: u32,
    /// Widest display width for inserted images without a pinned scale
    pub insert_max_width_px: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ImageLimits {
    fn from(settings: &Settings) -> Self {
        Self {
            max_width_px: settings.image_max_width_px,
            max_height_px: settings.image_max_height_px,
            insert_max_width_px: settings.insert_max_width_px,
        }
    }
}

/// How a region maps onto its output raster
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropPlan {
    /// Region size in document units
    pub extent: (f32, f32),
    pub scale: f32,
    /// Output raster size, at least 1x1
    pub surface: (u32, u32),
    /// Page origin relative to the output raster
    pub origin: (f32, f32),
}

impl CropPlan {
    /// Plan the render of `area`; `None` for a region without extent.
    #[must_use]
    pub fn new(area: &Rect, limits: &ImageLimits) -> Option<Self> {
        let width = area.width();
        let height = area.height();
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        let scale = (limits.max_width_px as f32 / width).min(limits.max_height_px as f32 / height);
        let x1 = area.x1.min(area.x2);
        let y1 = area.y1.min(area.y2);

        Some(Self {
            extent: (width, height),
            scale,
            surface: (
                ((width * scale).floor() as u32).max(1),
                ((height * scale).floor() as u32).max(1),
            ),
            origin: (-x1 * scale, -y1 * scale),
        })
    }

    /// Scale used for the display size of the inserted image.
    #[must_use]
    pub fn attr_scale(&self, pinned: Option<f32>, insert_max_width_px: u32, page_width: f32) -> f32 {
        pinned.unwrap_or_else(|| self.scale.min(insert_max_width_px as f32 / page_width))
    }

    #[must_use]
    pub fn display_size(&self, attr_scale: f32) -> (u32, u32) {
        (
            (self.extent.0 * attr_scale).trunc().abs() as u32,
            (self.extent.1 * attr_scale).trunc().abs() as u32,
        )
    }
}

/// Render the current page region described by `plan`.
pub fn render_region<B: DocumentBackend>(
    doc: &Document<B>,
    plan: &CropPlan,
) -> Result<Surface, DocError> {
    let mut surface = Surface::new(plan.surface.0, plan.surface.1);
    doc.render_page(&mut surface, plan.origin, plan.scale)?;
    Ok(surface)
}

/// Image written to the attachment directory
#[derive(Clone, Debug, PartialEq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
}

/// Write `surface` as `<base>_<timestamp>.png` into `dir`, creating it if needed.
pub fn save_png(surface: &Surface, dir: &Path, base: &str, now: &DateTime<Local>) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create attachment directory {dir:?}"))?;
    }

    let path = unique_snapshot_path(dir, base, now);
    surface
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("Failed to write image {path:?}"))?;
    debug!("Image written to {path:?}");
    Ok(path)
}

/// Render `area` of the current page, save it and insert it into the note.
///
/// Returns `Ok(None)` for a region without extent.
pub fn export_area<B: DocumentBackend, S: NoteSink>(
    doc: &Document<B>,
    area: &Rect,
    limits: &ImageLimits,
    pinned_scale: Option<f32>,
    sink: &mut S,
    now: &DateTime<Local>,
) -> Result<Option<SavedImage>> {
    let Some(plan) = CropPlan::new(area, limits) else {
        warn!("Skipping image region without extent: {area:?}");
        return Ok(None);
    };

    let surface = render_region(doc, &plan).context("Failed to render image region")?;

    let base = doc
        .path()
        .map(document_base_name)
        .unwrap_or_else(|| "untitled".to_string());
    let path = save_png(&surface, &sink.attachment_dir(), &base, now)?;

    let attr_scale = plan.attr_scale(pinned_scale, limits.insert_max_width_px, doc.page().page_width);
    let (width_px, height_px) = plan.display_size(attr_scale);

    sink.insert_image(&path, width_px, height_px)?;
    sink.insert_text("\n")?;
    info!("Image inserted from {path:?} at {width_px}x{height_px}");

    Ok(Some(SavedImage {
        path,
        width_px,
        height_px,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::types::WHITE;
    use crate::test_utils::{FakeBackend, Inserted, RecordingSink};
    use chrono::TimeZone;
    use image::Rgb;

    fn limits(max: u32) -> ImageLimits {
        ImageLimits {
            max_width_px: max,
            max_height_px: max,
            insert_max_width_px: 700,
        }
    }

    fn inked_doc() -> Document<FakeBackend> {
        let mut doc = Document::new();
        doc.load(
            PathBuf::from("/papers/report.pdf"),
            FakeBackend::single_page(600.0, 800.0)
                .with_line(0, "Figure", Rect::new(110.0, 210.0, 150.0, 220.0))
                .with_ink(),
        )
        .unwrap();
        doc
    }

    #[test]
    fn plan_fits_the_limiting_dimension() {
        let plan = CropPlan::new(&Rect::new(100.0, 200.0, 300.0, 250.0), &limits(400)).unwrap();

        assert_eq!(plan.scale, 2.0);
        assert_eq!(plan.surface, (400, 100));
        assert_eq!(plan.origin, (-200.0, -400.0));

        let tall = CropPlan::new(&Rect::new(0.0, 0.0, 50.0, 200.0), &limits(400)).unwrap();
        assert_eq!(tall.scale, 2.0);
        assert_eq!(tall.surface, (100, 400));
    }

    #[test]
    fn plan_rejects_empty_region() {
        assert!(CropPlan::new(&Rect::new(5.0, 5.0, 5.0, 9.0), &limits(400)).is_none());
    }

    #[test]
    fn tiny_surface_is_at_least_one_pixel() {
        let plan = CropPlan::new(&Rect::new(0.0, 0.0, 1000.0, 0.5), &limits(100)).unwrap();
        assert_eq!(plan.surface.1, 1);
    }

    #[test]
    fn attr_scale_prefers_pinned_scale() {
        let plan = CropPlan::new(&Rect::new(100.0, 200.0, 300.0, 250.0), &limits(400)).unwrap();

        assert_eq!(plan.attr_scale(Some(0.5), 700, 600.0), 0.5);
        assert_eq!(plan.display_size(0.5), (100, 25));

        // 700 / 600 caps the render scale of 2
        let scale = plan.attr_scale(None, 700, 600.0);
        assert_eq!(scale, 700.0 / 600.0);
        assert_eq!(plan.display_size(scale), (233, 58));
    }

    #[test]
    fn region_render_is_cropped() {
        let doc = inked_doc();
        let plan = CropPlan::new(&Rect::new(100.0, 200.0, 300.0, 250.0), &limits(400)).unwrap();

        let surface = render_region(&doc, &plan).unwrap();

        assert_eq!(surface.dimensions(), (400, 100));
        assert_eq!(*surface.get_pixel(50, 30), Rgb([0, 0, 0]));
        assert_eq!(*surface.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn export_writes_png_and_inserts_reference() {
        let dir = tempfile::tempdir().unwrap();
        let attachments = dir.path().join("notes").join("page");
        let mut sink = RecordingSink::new(&attachments);
        let doc = inked_doc();
        let now = Local.with_ymd_and_hms(2024, 3, 7, 12, 5, 9).unwrap();

        let saved = export_area(
            &doc,
            &Rect::new(100.0, 200.0, 300.0, 250.0),
            &limits(400),
            None,
            &mut sink,
            &now,
        )
        .unwrap()
        .unwrap();

        assert_eq!(saved.path, attachments.join("report_2024-03-07-120509.png"));
        assert!(saved.path.exists());
        assert_eq!(image::open(&saved.path).unwrap().to_rgb8().dimensions(), (400, 100));
        assert_eq!(
            sink.inserted,
            vec![
                Inserted::Image {
                    path: saved.path.clone(),
                    width: 233,
                    height: 58,
                },
                Inserted::Text("\n".to_string()),
            ]
        );
    }
}
