//! Document backend over MuPDF
//!
//! MuPDF page space already has its origin at the top-left corner. The adapter
//! contract wants literal-search hits in the text-layer convention (origin
//! bottom-left), so [`MupdfBackend::find_text`] mirrors them before handing
//! them out.

use std::path::Path;

use log::{debug, warn};
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Device, Document, Matrix, Page, Pixmap, Quad, TextPageFlags};

use super::document::{DocError, DocumentBackend};
use super::geometry::{Rect, intersect};
use super::types::{Surface, TextGranularity};

/// Upper bound on search hits per literal query
const MAX_SEARCH_HITS: u32 = 512;

pub struct MupdfBackend {
    doc: Document,
    page_count: usize,
}

/// Page loaded together with its bounds origin
struct LoadedPage {
    page: Page,
    origin: (f32, f32),
    height: f32,
}

impl MupdfBackend {
    fn load(&self, page_num: usize) -> Result<LoadedPage, DocError> {
        if page_num >= self.page_count {
            return Err(DocError::PageOutOfRange { page: page_num });
        }
        let page = self.doc.load_page(page_num as i32)?;
        let bounds = page.bounds()?;
        Ok(LoadedPage {
            page,
            origin: (bounds.x0, bounds.y0),
            height: bounds.y1 - bounds.y0,
        })
    }
}

/// Bounding box of a quad relative to the page origin (top-left).
fn quad_rect(quad: &Quad, origin: (f32, f32)) -> Rect {
    Rect::new(
        quad.ul.x.min(quad.ll.x) - origin.0,
        quad.ul.y.min(quad.ur.y) - origin.1,
        quad.ur.x.max(quad.lr.x) - origin.0,
        quad.ll.y.max(quad.lr.y) - origin.1,
    )
}

/// A word being collected while walking the glyphs of a line
#[derive(Default)]
struct WordAcc {
    text: String,
    hit: bool,
}

fn selected_in_page(
    loaded: &LoadedPage,
    granularity: TextGranularity,
    region: &Rect,
) -> Result<Option<String>, DocError> {
    let text_page = loaded.page.to_text_page(TextPageFlags::empty())?;
    let origin = loaded.origin;
    let mut lines: Vec<String> = Vec::new();

    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Text {
            continue;
        }

        for line in block.lines() {
            match granularity {
                TextGranularity::Line => {
                    let bbox = line.bounds();
                    let rect = Rect::new(
                        bbox.x0 - origin.0,
                        bbox.y0 - origin.1,
                        bbox.x1 - origin.0,
                        bbox.y1 - origin.1,
                    )
                    .normalized();
                    if intersect(&rect, region).is_some() {
                        let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                        if !text.is_empty() {
                            lines.push(text);
                        }
                    }
                }
                TextGranularity::Word => {
                    let mut words: Vec<String> = Vec::new();
                    let mut current = WordAcc::default();

                    for ch in line.chars() {
                        let Some(c) = ch.char() else {
                            continue;
                        };
                        if c.is_whitespace() {
                            if current.hit && !current.text.is_empty() {
                                words.push(std::mem::take(&mut current.text));
                            }
                            current = WordAcc::default();
                            continue;
                        }
                        let glyph = quad_rect(&ch.quad(), origin);
                        current.hit |= intersect(&glyph, region).is_some();
                        current.text.push(c);
                    }
                    if current.hit && !current.text.is_empty() {
                        words.push(current.text);
                    }

                    if !words.is_empty() {
                        lines.push(words.join(" "));
                    }
                }
            }
        }
    }

    Ok((!lines.is_empty()).then(|| lines.join("\n")))
}

/// Raw sample layout of a rendered pixmap
struct Samples<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    /// Bytes per pixel
    n: usize,
}

impl<'a> Samples<'a> {
    fn of(pixmap: &'a Pixmap) -> Self {
        Self {
            data: pixmap.samples(),
            width: pixmap.width() as usize,
            height: pixmap.height() as usize,
            stride: pixmap.stride() as usize,
            n: pixmap.n() as usize,
        }
    }
}

/// Copy RGB samples into `surface` at `offset`, clipped to the surface.
fn blit(samples: &Samples, surface: &mut Surface, offset: (i64, i64)) -> Result<(), DocError> {
    let n = samples.n;
    if n < 3 {
        return Err(DocError::render(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }
    if samples.data.len() < samples.stride.saturating_mul(samples.height)
        || samples.width * n > samples.stride
    {
        return Err(DocError::render("Pixmap buffer size mismatch"));
    }

    let target_w = i64::from(surface.width());
    let target_h = i64::from(surface.height());

    for y in 0..samples.height {
        let ty = offset.1 + y as i64;
        if ty < 0 || ty >= target_h {
            continue;
        }
        let start = y * samples.stride;
        let row = &samples.data[start..start + samples.width * n];
        for (x, px) in row.chunks_exact(n).enumerate() {
            let tx = offset.0 + x as i64;
            if tx < 0 || tx >= target_w {
                continue;
            }
            surface.put_pixel(tx as u32, ty as u32, image::Rgb([px[0], px[1], px[2]]));
        }
    }
    Ok(())
}

impl DocumentBackend for MupdfBackend {
    fn open(path: &Path) -> Result<Self, DocError> {
        let doc = Document::open(path.to_string_lossy().as_ref())
            .map_err(|e| DocError::unreadable(path, e))?;
        let page_count = doc.page_count().map_err(|e| DocError::unreadable(path, e))?;
        let page_count = usize::try_from(page_count).unwrap_or(0);
        debug!("Opened {} with {page_count} page(s)", path.display());
        Ok(Self { doc, page_count })
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: usize) -> Result<(f32, f32), DocError> {
        if page >= self.page_count {
            return Err(DocError::PageOutOfRange { page });
        }
        let bounds = self.doc.load_page(page as i32)?.bounds()?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn find_text(&self, page: usize, needle: &str) -> Vec<Rect> {
        if needle.is_empty() {
            return Vec::new();
        }
        let loaded = match self.load(page) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Cannot search page {page}: {e}");
                return Vec::new();
            }
        };

        match loaded.page.search(needle, MAX_SEARCH_HITS) {
            Ok(quads) => quads
                .iter()
                .map(|quad| quad_rect(quad, loaded.origin).flip_vertical(loaded.height))
                .collect(),
            Err(e) => {
                warn!("Search for {needle:?} on page {page} failed: {e}");
                Vec::new()
            }
        }
    }

    fn selected_text(
        &self,
        page: usize,
        granularity: TextGranularity,
        region: &Rect,
    ) -> Option<String> {
        let result = self
            .load(page)
            .and_then(|loaded| selected_in_page(&loaded, granularity, region));
        match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Text query on page {page} failed: {e}");
                None
            }
        }
    }

    fn render(
        &self,
        page: usize,
        surface: &mut Surface,
        origin: (f32, f32),
        scale: f32,
    ) -> Result<(), DocError> {
        let (width, height) = surface.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }
        let loaded = self.load(page)?;
        let pixmap = draw_region(&loaded, (width, height), origin, scale)?;
        blit(&Samples::of(&pixmap), surface, (0, 0))
    }
}

/// Page-to-surface transform: page bounds origin to (0, 0), scale, then
/// shift by the surface offset.
fn surface_matrix(page_origin: (f32, f32), origin: (f32, f32), scale: f32) -> Matrix {
    let mut ctm = Matrix::new_translate(-page_origin.0, -page_origin.1);
    ctm.concat(Matrix::new_scale(scale, scale));
    ctm.concat(Matrix::new_translate(origin.0, origin.1));
    ctm
}

/// Draw only the part of the page that lands on a `size` surface.
fn draw_region(
    loaded: &LoadedPage,
    size: (u32, u32),
    origin: (f32, f32),
    scale: f32,
) -> Result<Pixmap, DocError> {
    let width = i32::try_from(size.0).map_err(|_| DocError::render("Surface too wide"))?;
    let height = i32::try_from(size.1).map_err(|_| DocError::render("Surface too tall"))?;

    let mut pixmap = Pixmap::new_with_w_h(&Colorspace::device_rgb(), width, height, false)?;
    pixmap.clear_with(255)?;
    {
        // Device flushes into the pixmap when dropped
        let device = Device::from_pixmap(&pixmap)?;
        loaded
            .page
            .run(&device, &surface_matrix(loaded.origin, origin, scale))?;
    }
    debug!(
        "Drew {width}x{height} at {origin:?}, scale {scale} (page origin {:?})",
        loaded.origin
    );
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use mupdf::Point;

    use super::*;
    use crate::pdf::types::WHITE;

    /// Two Helvetica text lines plus a black box on a 200x100 page.
    ///
    /// Top-left coordinates: "Hello world" has its baseline at y=30,
    /// "Second line" at y=70, the box covers (120, 60)..(180, 90).
    const CONTENT: &str = "BT /F1 20 Tf 10 70 Td (Hello world) Tj ET\n\
                           BT /F1 20 Tf 10 30 Td (Second line) Tj ET\n\
                           0 0 0 rg 120 10 60 30 re f\n";

    fn tiny_pdf() -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{CONTENT}endstream",
                CONTENT.len()
            ),
        ];

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }

    fn open_tiny() -> (tempfile::TempDir, MupdfBackend) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pdf");
        std::fs::write(&path, tiny_pdf()).unwrap();
        let backend = MupdfBackend::open(&path).unwrap();
        (dir, backend)
    }

    fn quad(x1: f32, y1: f32, x2: f32, y2: f32) -> Quad {
        Quad {
            ul: Point { x: x1, y: y1 },
            ur: Point { x: x2, y: y1 },
            ll: Point { x: x1, y: y2 },
            lr: Point { x: x2, y: y2 },
        }
    }

    #[test]
    fn quad_rect_is_relative_to_page_origin() {
        let rect = quad_rect(&quad(15.0, 90.0, 65.0, 110.0), (5.0, 10.0));
        assert_eq!(rect, Rect::new(10.0, 80.0, 60.0, 100.0));
    }

    #[test]
    fn search_hit_flips_to_text_layer() {
        let hit = quad_rect(&quad(10.0, 80.0, 60.0, 100.0), (0.0, 0.0)).flip_vertical(800.0);
        assert_eq!(hit, Rect::new(10.0, 700.0, 60.0, 720.0));
    }

    #[test]
    fn blit_clips_to_surface() {
        // 2x2 RGB pixmap with one padding byte per row
        let data = [
            10, 10, 10, 20, 20, 20, 0, //
            30, 30, 30, 40, 40, 40, 0,
        ];
        let samples = Samples {
            data: &data,
            width: 2,
            height: 2,
            stride: 7,
            n: 3,
        };
        let mut surface = Surface::from_pixel(3, 3, WHITE);

        blit(&samples, &mut surface, (-1, 2)).unwrap();

        assert_eq!(*surface.get_pixel(0, 2), image::Rgb([20, 20, 20]));
        assert_eq!(*surface.get_pixel(1, 2), WHITE);
        assert_eq!(*surface.get_pixel(0, 1), WHITE);
    }

    #[test]
    fn blit_rejects_short_buffer() {
        let data = [0u8; 5];
        let samples = Samples {
            data: &data,
            width: 2,
            height: 1,
            stride: 6,
            n: 3,
        };
        let mut surface = Surface::new(2, 1);
        assert!(matches!(
            blit(&samples, &mut surface, (0, 0)),
            Err(DocError::Render { .. })
        ));
    }

    #[test]
    fn surface_matrix_scales_then_shifts() {
        let ctm = surface_matrix((5.0, 10.0), (-40.0, -100.0), 2.0);
        assert_eq!(ctm, Matrix::new(2.0, 0.0, 0.0, 2.0, -50.0, -120.0));
    }

    #[test]
    fn opens_generated_pdf() {
        let (_dir, backend) = open_tiny();
        assert_eq!(backend.page_count(), 1);
        assert_eq!(backend.page_size(0).unwrap(), (200.0, 100.0));
        assert!(matches!(
            backend.page_size(1),
            Err(DocError::PageOutOfRange { page: 1 })
        ));
    }

    #[test]
    fn line_under_point_is_whole_line() {
        let (_dir, backend) = open_tiny();
        let text = backend.selected_text(0, TextGranularity::Line, &Rect::from_point(20.0, 25.0));
        assert_eq!(text.as_deref(), Some("Hello world"));

        let blank = backend.selected_text(0, TextGranularity::Line, &Rect::from_point(190.0, 5.0));
        assert_eq!(blank, None);
    }

    #[test]
    fn words_across_two_lines_join_with_newline() {
        let (_dir, backend) = open_tiny();
        // Touches "Hello" and "Second" only; "world" and "line" start past x=60
        let region = Rect::new(12.0, 25.0, 30.0, 60.0);

        let text = backend.selected_text(0, TextGranularity::Word, &region);

        assert_eq!(text.as_deref(), Some("Hello\nSecond"));
    }

    #[test]
    fn one_touched_glyph_selects_the_word() {
        let (_dir, backend) = open_tiny();
        // Single point inside "world"
        let region = Rect::from_point(85.0, 25.0);

        let text = backend.selected_text(0, TextGranularity::Word, &region);

        assert_eq!(text.as_deref(), Some("world"));
    }

    #[test]
    fn search_hits_come_back_bottom_left() {
        let (_dir, backend) = open_tiny();
        let hits = backend.find_text(0, "Second line");

        assert_eq!(hits.len(), 1);
        // Baseline at y=70 from the top is y=30 from the bottom
        assert!(hits[0].y1 <= 30.0 && hits[0].y2 > 40.0, "{:?}", hits[0]);
        assert!(backend.find_text(0, "absent").is_empty());
    }

    #[test]
    fn renders_only_the_cropped_region() {
        let (_dir, backend) = open_tiny();
        // Box region (120, 60)..(180, 90) at scale 2
        let mut surface = Surface::from_pixel(120, 60, WHITE);

        backend
            .render(0, &mut surface, (-240.0, -120.0), 2.0)
            .unwrap();

        assert_eq!(*surface.get_pixel(60, 30), image::Rgb([0, 0, 0]));
        assert_eq!(*surface.get_pixel(110, 50), image::Rgb([0, 0, 0]));
    }

    #[test]
    fn crop_at_large_scale_stays_small() {
        let (_dir, backend) = open_tiny();
        // Full page at this scale would be 100000x50000 pixels
        let scale = 500.0;
        let mut inside = Surface::from_pixel(16, 16, WHITE);
        backend
            .render(0, &mut inside, (-150.0 * scale, -75.0 * scale), scale)
            .unwrap();
        assert_eq!(*inside.get_pixel(8, 8), image::Rgb([0, 0, 0]));

        let mut blank = Surface::from_pixel(16, 16, image::Rgb([7, 7, 7]));
        backend
            .render(0, &mut blank, (-190.0 * scale, -5.0 * scale), scale)
            .unwrap();
        assert_eq!(*blank.get_pixel(8, 8), WHITE);
    }
}
