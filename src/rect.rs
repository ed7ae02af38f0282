use nalgebra::Matrix1x4;
use num::Float;
use std::fmt::Debug;

/* ------------------------------------------------------------------------------
 * Type aliases
 * ------------------------------------------------------------------------------ */
pub type Xyah<T> = Matrix1x4<T>;

/* ------------------------------------------------------------------------------
 * Rect struct
 * ------------------------------------------------------------------------------ */

/// Axis-aligned box stored as top-left x/y, width and height.
#[derive(Debug, Clone, PartialEq)]
pub struct Rect<T>
where
    T: Debug + Float,
{
    tlwh: Matrix1x4<T>,
}

impl<T> Rect<T>
where
    T: Debug + Float + 'static,
{
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            tlwh: Matrix1x4::new(x, y, width, height),
        }
    }

    #[inline(always)]
    pub fn x(&self) -> T {
        self.tlwh[(0, 0)]
    }

    #[inline(always)]
    pub fn set_x(&mut self, x: T) {
        self.tlwh[(0, 0)] = x;
    }

    #[inline(always)]
    pub fn y(&self) -> T {
        self.tlwh[(0, 1)]
    }

    #[inline(always)]
    pub fn set_y(&mut self, y: T) {
        self.tlwh[(0, 1)] = y;
    }

    #[inline(always)]
    pub fn width(&self) -> T {
        self.tlwh[(0, 2)]
    }

    #[inline(always)]
    pub fn set_width(&mut self, width: T) {
        self.tlwh[(0, 2)] = width;
    }

    #[inline(always)]
    pub fn height(&self) -> T {
        self.tlwh[(0, 3)]
    }

    #[inline(always)]
    pub fn set_height(&mut self, height: T) {
        self.tlwh[(0, 3)] = height;
    }

    /// Plain `width * height`, as used by the output area filter.
    pub fn area(&self) -> T {
        self.width() * self.height()
    }

    /// Intersection over union with the inclusive pixel convention:
    /// every extent is measured as `x2 - x1 + 1`.
    pub fn calc_iou(&self, other: &Rect<T>) -> T {
        let one = T::one();
        let [ax1, ay1, ax2, ay2] = self.get_tlbr();
        let [bx1, by1, bx2, by2] = other.get_tlbr();

        let iw = ax2.min(bx2) - ax1.max(bx1) + one;
        if iw <= T::zero() {
            return T::zero();
        }
        let ih = ay2.min(by2) - ay1.max(by1) + one;
        if ih <= T::zero() {
            return T::zero();
        }

        let a_area = (ax2 - ax1 + one) * (ay2 - ay1 + one);
        let b_area = (bx2 - bx1 + one) * (by2 - by1 + one);
        let inter = iw * ih;
        inter / (a_area + b_area - inter)
    }

    /// Get bounding box as [center_x, center_y, aspect_ratio, height]
    pub fn get_xyah(&self) -> Xyah<T> {
        let two = T::from(2).unwrap_or_else(T::one);
        Matrix1x4::new(
            self.x() + self.width() / two,
            self.y() + self.height() / two,
            self.width() / self.height(),
            self.height(),
        )
    }

    /// Create Rect from [center_x, center_y, aspect_ratio, height]
    pub fn from_xyah(cx: T, cy: T, aspect: T, height: T) -> Self {
        let two = T::from(2).unwrap_or_else(T::one);
        let width = aspect * height;
        Self::new(cx - width / two, cy - height / two, width, height)
    }

    /// Get bounding box as [x1, y1, x2, y2] format
    pub fn get_tlbr(&self) -> [T; 4] {
        [
            self.x(),
            self.y(),
            self.x() + self.width(),
            self.y() + self.height(),
        ]
    }

    /// Create Rect from [x1, y1, x2, y2] format
    pub fn from_tlbr(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn get_tlwh(&self) -> [T; 4] {
        [self.x(), self.y(), self.width(), self.height()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearly_eq::assert_nearly_eq;

    #[test]
    fn test_identical_boxes_have_unit_iou() {
        let a = Rect::new(0.0_f32, 0.0, 1.0, 1.0);
        assert_nearly_eq!(a.calc_iou(&a.clone()), 1.0, 1e-6);
    }

    #[test]
    fn test_disjoint_boxes_have_zero_iou() {
        let a = Rect::new(0.0_f32, 0.0, 10.0, 10.0);
        let b = Rect::new(50.0_f32, 50.0, 10.0, 10.0);
        assert_eq!(a.calc_iou(&b), 0.0);
        assert_eq!(b.calc_iou(&a), 0.0);
    }

    #[test]
    fn test_touching_edges_overlap_by_one_pixel() {
        // x2 of a == x1 of b, inclusive convention counts one shared column
        let a = Rect::new(0.0_f32, 0.0, 9.0, 9.0);
        let b = Rect::new(9.0_f32, 0.0, 9.0, 9.0);
        // inter = 1 * 10, union = 100 + 100 - 10
        assert_nearly_eq!(a.calc_iou(&b), 10.0 / 190.0, 1e-6);
    }

    #[test]
    fn test_partial_overlap() {
        let a = Rect::new(10.0_f32, 10.0, 20.0, 20.0);
        let b = Rect::new(12.0_f32, 11.0, 20.0, 20.0);
        // inter = 19 * 20, areas = 21 * 21
        let expected = 380.0 / (441.0 + 441.0 - 380.0);
        assert_nearly_eq!(a.calc_iou(&b), expected, 1e-6);
    }

    #[test]
    fn test_xyah_roundtrip() {
        let rect = Rect::new(10.0_f32, 20.0, 30.0, 60.0);
        let xyah = rect.get_xyah();
        assert_eq!(xyah, Matrix1x4::new(25.0, 50.0, 0.5, 60.0));
        let back = Rect::from_xyah(xyah[0], xyah[1], xyah[2], xyah[3]);
        assert_eq!(back, rect);
    }

    #[test]
    fn test_tlbr_and_area() {
        let rect = Rect::from_tlbr(1.0_f32, 2.0, 11.0, 7.0);
        assert_eq!(rect.get_tlwh(), [1.0, 2.0, 10.0, 5.0]);
        assert_eq!(rect.get_tlbr(), [1.0, 2.0, 11.0, 7.0]);
        assert_eq!(rect.area(), 50.0);
    }
}
