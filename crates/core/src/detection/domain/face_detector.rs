use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for face detection.
///
/// Takes a grayscale frame and returns every face found, or an empty vector
/// when there is none. Implementations must be deterministic for identical
/// input and must not carry state from one call to the next; `&mut self`
/// only allows reusing inference buffers.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;
}
