/// Axis-aligned rectangle with the origin at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

impl<T> Rect<T> {
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl<T> Rect<T>
where
    T: Copy + PartialOrd + std::ops::Add<Output = T>,
{
    pub fn right(&self) -> T {
        self.x + self.width
    }

    pub fn bottom(&self) -> T {
        self.y + self.height
    }

    /// True when the two rectangles share any interior area.
    ///
    /// Rectangles that only touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Rect<T>) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 0.0, 0.125, 0.125);
        let b = Rect::new(0.125, 0.0, 0.125, 0.125);
        let c = Rect::new(0.1, 0.1, 0.125, 0.125);

        assert!(!a.overlaps(&b), "edge-adjacent rects must not overlap");
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }
}
