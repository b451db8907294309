use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// The source has no more frames and never will (file replay finished).
    #[error("end of stream")]
    EndOfStream,
    #[error("capture device error: {0}")]
    Device(String),
    #[error("frame decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A camera (or recorded stream) producing RGB frames on demand.
///
/// `read` is non-blocking from the controller's point of view: `Ok(None)`
/// means no frame is ready yet and the caller should try again later.
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Releases the underlying device. Must be safe to call repeatedly.
    fn close(&mut self);
}
