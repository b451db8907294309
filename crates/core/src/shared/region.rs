/// An axis-aligned face rectangle in frame pixel coordinates.
///
/// Produced fresh for every frame; regions carry no identity across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersects the region with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<FaceRegion> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x.saturating_add(self.width)).min(frame_width as i32);
        let y2 = (self.y.saturating_add(self.height)).min(frame_height as i32);
        let clamped = FaceRegion::new(x1, y1, x2 - x1, y2 - y1);
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_clamp_inside_frame_is_unchanged() {
        let r = FaceRegion::new(10, 20, 50, 60);
        assert_eq!(r.clamp_to(640, 480), Some(r));
    }

    #[test]
    fn test_clamp_cuts_left_and_top_overhang() {
        let r = FaceRegion::new(-10, -20, 50, 60);
        assert_eq!(r.clamp_to(640, 480), Some(FaceRegion::new(0, 0, 40, 40)));
    }

    #[test]
    fn test_clamp_cuts_right_and_bottom_overhang() {
        let r = FaceRegion::new(600, 450, 100, 100);
        assert_eq!(r.clamp_to(640, 480), Some(FaceRegion::new(600, 450, 40, 30)));
    }

    #[rstest]
    #[case::left_of_frame(FaceRegion::new(-100, 10, 50, 50))]
    #[case::below_frame(FaceRegion::new(10, 500, 50, 50))]
    #[case::zero_width(FaceRegion::new(10, 10, 0, 50))]
    #[case::negative_height(FaceRegion::new(10, 10, 50, -5))]
    fn test_clamp_outside_or_degenerate_is_none(#[case] r: FaceRegion) {
        assert_eq!(r.clamp_to(640, 480), None);
    }
}
