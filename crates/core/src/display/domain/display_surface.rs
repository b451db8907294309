use super::annotation::Annotation;
use crate::shared::frame::Frame;

/// Where annotated frames are presented to the operator.
pub trait DisplaySurface: Send {
    /// Presents a frame that already has its face boxes drawn. The
    /// annotations carry the labels for surfaces that render text.
    fn show(
        &mut self,
        frame: &Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// `false` once the operator closed the surface; the loop then exits.
    fn is_open(&self) -> bool;
}
