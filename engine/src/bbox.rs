/// Axis-aligned region that changed between two frames.
///
/// The rectangle is half-open: `[min_x, max_x) × [min_y, max_y)`. When
/// `changed` is false the coordinates carry no meaning, and the accessors
/// below report an empty region instead of reading them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub changed: bool,
}

/// Origin + size form of a region, as consumed by crop-and-paint code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    /// A box enclosing `[min_x, max_x) × [min_y, max_y)`.
    pub fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            changed: true,
        }
    }

    /// The "nothing changed" result.
    pub fn unchanged() -> Self {
        Self {
            min_x: 0,
            max_x: 0,
            min_y: 0,
            max_y: 0,
            changed: false,
        }
    }

    pub fn width(&self) -> u32 {
        if self.changed {
            self.max_x.saturating_sub(self.min_x)
        } else {
            0
        }
    }

    pub fn height(&self) -> u32 {
        if self.changed {
            self.max_y.saturating_sub(self.min_y)
        } else {
            0
        }
    }

    /// Pixel count inside the box. Zero when nothing changed.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when the box encloses no pixels, whatever `changed` says.
    /// Renderers treat such a box exactly like "no change".
    pub fn is_degenerate(&self) -> bool {
        self.area() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.changed && x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// True if this box lies entirely inside `outer`.
    pub fn is_within(&self, outer: &BoundingBox) -> bool {
        !self.is_degenerate()
            && outer.changed
            && self.min_x >= outer.min_x
            && self.max_x <= outer.max_x
            && self.min_y >= outer.min_y
            && self.max_y <= outer.max_y
    }

    pub fn rect(&self) -> Option<Rect> {
        if self.is_degenerate() {
            return None;
        }
        Some(Rect {
            x: self.min_x,
            y: self.min_y,
            w: self.width(),
            h: self.height(),
        })
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::unchanged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pixel_box() {
        let b = BoundingBox::new(1, 2, 1, 2);
        assert_eq!(b.area(), 1);
        assert!(b.contains(1, 1));
        assert!(!b.contains(2, 1));
        assert!(!b.contains(0, 0));
        assert_eq!(b.rect(), Some(Rect { x: 1, y: 1, w: 1, h: 1 }));
    }

    #[test]
    fn unchanged_box_reads_as_empty() {
        // coordinates of an unchanged box must not leak through the accessors
        let b = BoundingBox {
            min_x: 0,
            max_x: 10,
            min_y: 0,
            max_y: 10,
            changed: false,
        };
        assert_eq!(b.area(), 0);
        assert!(b.is_degenerate());
        assert!(!b.contains(5, 5));
        assert!(b.rect().is_none());
    }

    #[test]
    fn degenerate_when_collapsed_on_one_axis() {
        let b = BoundingBox::new(3, 3, 0, 8);
        assert!(b.changed);
        assert!(b.is_degenerate());
        assert!(b.rect().is_none());
    }

    #[test]
    fn containment() {
        let outer = BoundingBox::new(0, 8, 0, 8);
        assert!(BoundingBox::new(2, 4, 2, 4).is_within(&outer));
        assert!(!BoundingBox::new(2, 9, 2, 4).is_within(&outer));
        assert!(!BoundingBox::unchanged().is_within(&outer));
    }
}
