use thiserror::Error;

use super::face_sample::FaceSample;
use crate::identity::domain::identity::IdentityId;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("recognizer has no training samples")]
    NotTrained,
    #[error("got {samples} samples but {labels} labels")]
    LabelMismatch { samples: usize, labels: usize },
    #[error("update called without samples")]
    EmptyUpdate,
    #[error("sample is {actual:?}, model expects {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Closest trained identity for a sample. Lower distance is more similar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub identity_id: IdentityId,
    pub distance: f64,
}

/// Domain interface for a trainable face classifier.
pub trait FaceRecognizer: Send {
    fn predict(&self, sample: &FaceSample) -> Result<Prediction, RecognizerError>;

    /// Adds labeled samples to the model. Existing samples are kept and
    /// ids may repeat. Either all samples are added or none.
    fn update(&mut self, samples: &[FaceSample], ids: &[IdentityId]) -> Result<(), RecognizerError>;

    /// Number of samples trained so far.
    fn sample_count(&self) -> usize;
}
