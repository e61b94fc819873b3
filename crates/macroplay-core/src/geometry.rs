//! Screen rectangles and the mapping between absolute and base-relative coordinates.
//!
//! Edges are inclusive: a rectangle from `(0, 0)` to `(99, 99)` is 100 units wide.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Build from two corner points in any order.
    pub fn from_points(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            left: x1.min(x2),
            top: y1.min(y2),
            right: x1.max(x2),
            bottom: y1.max(y2),
        }
    }

    pub fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::from_points(left, top, left + width.max(1) - 1, top + height.max(1) - 1)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// True when both sides exceed `min` units.
    pub fn larger_than(&self, min: i32) -> bool {
        self.width() > min && self.height() > min
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Smallest rectangle covering all of `rects`, e.g. every attached display.
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(a) => Some(a.union(r)),
        })
    }
}

/// Rectangle in fractions of a base rectangle. Every coordinate is in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelRect {
    pub rx1: f64,
    pub ry1: f64,
    pub rx2: f64,
    pub ry2: f64,
}

impl RelRect {
    pub fn new(rx1: f64, ry1: f64, rx2: f64, ry2: f64) -> Self {
        Self {
            rx1: clamp01(rx1),
            ry1: clamp01(ry1),
            rx2: clamp01(rx2),
            ry2: clamp01(ry2),
        }
    }

    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

impl Default for RelRect {
    fn default() -> Self {
        Self::full()
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn denominators(base: &Rect) -> (f64, f64) {
    (
        f64::from((base.width() - 1).max(1)),
        f64::from((base.height() - 1).max(1)),
    )
}

/// Express `rect` in fractions of `base`, clamping anything outside it.
pub fn to_relative(base: &Rect, rect: &Rect) -> RelRect {
    let (dx, dy) = denominators(base);
    RelRect::new(
        f64::from(rect.left - base.left) / dx,
        f64::from(rect.top - base.top) / dy,
        f64::from(rect.right - base.left) / dx,
        f64::from(rect.bottom - base.top) / dy,
    )
}

/// Project fractional coordinates back onto `base`.
pub fn to_absolute(base: &Rect, rel: &RelRect) -> Rect {
    let (dx, dy) = denominators(base);
    let rel = RelRect::new(rel.rx1, rel.ry1, rel.rx2, rel.ry2);
    Rect::from_points(
        base.left + (rel.rx1 * dx).round() as i32,
        base.top + (rel.ry1 * dy).round() as i32,
        base.left + (rel.rx2 * dx).round() as i32,
        base.top + (rel.ry2 * dy).round() as i32,
    )
}

/// Where an action's rectangle lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    Absolute(Rect),
    Relative(RelRect),
}

impl Region {
    pub fn resolve(&self, base: &Rect) -> Rect {
        match self {
            Region::Absolute(r) => *r,
            Region::Relative(rel) => to_absolute(base, rel),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Region::Relative(_))
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::Relative(RelRect::full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_corners() {
        let r = Rect::from_points(50, 40, 10, 20);
        assert_eq!(r, Rect { left: 10, top: 20, right: 50, bottom: 40 });
        assert_eq!(r.width(), 41);
        assert_eq!(r.center(), (30, 30));
    }

    #[test]
    fn round_trip_inside_base() {
        let bases = [
            Rect::from_size(0, 0, 2, 2),
            Rect::from_size(100, 50, 801, 603),
            Rect::from_size(-1920, 0, 1920, 1080),
            Rect::from_size(7, 9, 33, 17),
        ];
        for base in bases {
            for (l, t, w, h) in [(0, 0, 1, 1), (3, 2, 10, 5), (1, 1, 1, 1), (0, 0, 1000, 1000)] {
                let left = base.left + l.min(base.width() - 1);
                let top = base.top + t.min(base.height() - 1);
                let right = (left + w).min(base.right);
                let bottom = (top + h).min(base.bottom);
                let rect = Rect::from_points(left, top, right, bottom);
                let back = to_absolute(&base, &to_relative(&base, &rect));
                assert!((back.left - rect.left).abs() <= 1, "{:?} {:?}", base, rect);
                assert!((back.top - rect.top).abs() <= 1);
                assert!((back.right - rect.right).abs() <= 1);
                assert!((back.bottom - rect.bottom).abs() <= 1);
            }
        }
    }

    #[test]
    fn relative_is_clamped() {
        let base = Rect::from_size(100, 100, 200, 200);
        let outside = Rect::from_points(0, 50, 1000, 900);
        let rel = to_relative(&base, &outside);
        for v in [rel.rx1, rel.ry1, rel.rx2, rel.ry2] {
            assert!((0.0..=1.0).contains(&v));
        }
        assert_eq!(rel, RelRect::full());
    }

    #[test]
    fn one_pixel_base_does_not_divide_by_zero() {
        let base = Rect::from_size(5, 5, 1, 1);
        let rel = to_relative(&base, &Rect::from_points(5, 5, 5, 5));
        assert_eq!(rel, RelRect::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(to_absolute(&base, &RelRect::full()), Rect::from_points(5, 5, 6, 6));
    }

    #[test]
    fn relative_region_tracks_base() {
        let region = Region::Relative(RelRect::new(0.1, 0.1, 0.5, 0.5));
        let base = Rect::from_points(0, 0, 100, 100);
        assert_eq!(region.resolve(&base), Rect::from_points(10, 10, 50, 50));
        let moved = base.translated(200, 30);
        assert_eq!(region.resolve(&moved), Rect::from_points(210, 40, 250, 80));
    }

    #[test]
    fn bounding_of_displays() {
        let a = Rect::from_size(0, 0, 1920, 1080);
        let b = Rect::from_size(1920, -200, 1280, 1024);
        assert_eq!(
            Rect::bounding([a, b].iter()),
            Some(Rect::from_points(0, -200, 3199, 1079))
        );
        assert_eq!(Rect::bounding(std::iter::empty()), None);
    }
}
