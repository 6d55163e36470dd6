//! Rectangle helpers shared by the resolver, the interaction state and the
//! highlight overlay.
//!
//! All rectangles here are axis aligned and expressed in document units
//! (unscaled page coordinates). Unless a function says otherwise the origin is
//! the top-left corner of the page.

use serde::{Deserialize, Serialize};

/// Axis aligned rectangle in document coordinates.
///
/// Constructed through [`Rect::normalize`] the bounds always satisfy
/// `x1 <= x2` and `y1 <= y2`. [`Rect::new`] keeps the values verbatim and is
/// meant for rectangles that are already ordered (backend results, tests).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a rectangle from two arbitrary corners.
    ///
    /// Drag gestures can go in any direction, so the corners are sorted on
    /// both axes.
    #[must_use]
    pub fn normalize(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Degenerate rectangle covering a single point.
    #[must_use]
    pub const fn from_point(x: f32, y: f32) -> Self {
        Self::new(x, y, x, y)
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        Self::normalize(self.x1, self.y1, self.x2, self.y2)
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    /// Inclusive containment test; points on the border count as inside.
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        point_in_rect(x, y, self)
    }

    /// Mirror the rectangle vertically inside a page of height `page_height`.
    ///
    /// Converts between the text-layer convention (origin bottom-left) and the
    /// render convention (origin top-left). Applying it twice yields the
    /// original rectangle.
    #[must_use]
    pub fn flip_vertical(&self, page_height: f32) -> Self {
        Self {
            x1: self.x1,
            y1: page_height - self.y2,
            x2: self.x2,
            y2: page_height - self.y1,
        }
    }

    /// Scale every bound by `factor`, e.g. document units to surface pixels.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x1: self.x1 * factor,
            y1: self.y1 * factor,
            x2: self.x2 * factor,
            y2: self.y2 * factor,
        }
    }
}

#[must_use]
pub fn point_in_rect(x: f32, y: f32, rect: &Rect) -> bool {
    rect.x1 <= x && rect.y1 <= y && rect.x2 >= x && rect.y2 >= y
}

/// True when the point lies in at least one rectangle of `rects`.
///
/// Used to decide whether a click landed on the currently held selection.
#[must_use]
pub fn point_in_any(x: f32, y: f32, rects: &[Rect]) -> bool {
    rects.iter().any(|rect| point_in_rect(x, y, rect))
}

/// Axis aligned intersection, `None` when the rectangles are disjoint.
///
/// Touching edges produce a zero-width (or zero-height) rectangle rather than
/// `None`, matching the inclusive point test.
#[must_use]
pub fn intersect(a: &Rect, b: &Rect) -> Option<Rect> {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    if x1 > x2 || y1 > y2 {
        return None;
    }

    Some(Rect::new(x1, y1, x2, y2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sorts_corners() {
        let r = Rect::normalize(60.0, 100.0, 10.0, 80.0);
        assert_eq!(r, Rect::new(10.0, 80.0, 60.0, 100.0));
    }

    #[test]
    fn normalize_is_idempotent_and_order_independent() {
        let samples = [
            (0.0, 0.0, 10.0, 10.0),
            (10.0, 10.0, 0.0, 0.0),
            (-5.5, 3.0, 2.0, -7.25),
            (4.0, 4.0, 4.0, 4.0),
        ];
        for (x1, y1, x2, y2) in samples {
            let once = Rect::normalize(x1, y1, x2, y2);
            assert_eq!(once.normalized(), once);
            assert_eq!(Rect::normalize(x2, y2, x1, y1), once);
        }
    }

    #[test]
    fn point_test_is_inclusive() {
        let r = Rect::new(10.0, 80.0, 60.0, 100.0);
        assert!(point_in_rect(30.0, 90.0, &r));
        assert!(point_in_rect(10.0, 80.0, &r));
        assert!(point_in_rect(60.0, 100.0, &r));
        assert!(!point_in_rect(9.99, 90.0, &r));
        assert!(!point_in_rect(30.0, 100.01, &r));
    }

    #[test]
    fn point_in_any_checks_every_rect() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, 5.0, 6.0, 6.0)];
        assert!(point_in_any(5.5, 5.5, &rects));
        assert!(!point_in_any(3.0, 3.0, &rects));
        assert!(!point_in_any(0.5, 0.5, &[]));
    }

    #[test]
    fn intersect_overlapping() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 20.0, 6.0);
        assert_eq!(intersect(&a, &b), Some(Rect::new(5.0, 0.0, 10.0, 6.0)));
        assert_eq!(intersect(&a, &b), intersect(&b, &a));
    }

    #[test]
    fn intersect_with_itself_is_identity() {
        let a = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(intersect(&a, &a), Some(a));
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(11.0, 0.0, 20.0, 10.0);
        assert_eq!(intersect(&a, &b), None);
        assert_eq!(intersect(&b, &a), None);
    }

    #[test]
    fn intersect_touching_edges_is_degenerate() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(intersect(&a, &b), Some(Rect::new(10.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn flip_vertical_matches_page_height() {
        let raw = Rect::new(10.0, 700.0, 60.0, 720.0);
        let flipped = raw.flip_vertical(800.0);
        assert_eq!(flipped, Rect::new(10.0, 80.0, 60.0, 100.0));
        assert_eq!(flipped.flip_vertical(800.0), raw);
    }
}
