use crate::display::domain::annotation::{Annotation, Verdict};
use crate::identity::domain::identity_store::IdentityStore;
use crate::recognition::domain::face_normalizer::FaceNormalizer;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Labels each detected face with the closest enrolled identity.
///
/// A face counts as recognized only when its distance is strictly below
/// the threshold. Normalization or prediction failures (including an
/// untrained model) degrade that face to `Unknown`.
pub struct RecognizeFacesUseCase {
    normalizer: FaceNormalizer,
    threshold: f64,
}

impl RecognizeFacesUseCase {
    pub fn new(normalizer: FaceNormalizer, threshold: f64) -> Self {
        Self {
            normalizer,
            threshold,
        }
    }

    pub fn execute(
        &self,
        recognizer: &dyn FaceRecognizer,
        store: &dyn IdentityStore,
        frame: &Frame,
        regions: &[FaceRegion],
    ) -> Vec<Annotation> {
        regions
            .iter()
            .map(|region| Annotation {
                region: *region,
                verdict: self.classify(recognizer, store, frame, region),
            })
            .collect()
    }

    fn classify(
        &self,
        recognizer: &dyn FaceRecognizer,
        store: &dyn IdentityStore,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Verdict {
        let sample = match self.normalizer.normalize(frame, region) {
            Ok(sample) => sample,
            Err(e) => {
                log::debug!("Skipping face {region:?}: {e}");
                return Verdict::Unknown;
            }
        };
        let prediction = match recognizer.predict(&sample) {
            Ok(prediction) => prediction,
            Err(e) => {
                log::debug!("Prediction failed for {region:?}: {e}");
                return Verdict::Unknown;
            }
        };

        if prediction.distance < self.threshold {
            let name = store.display_name(prediction.identity_id);
            if name == crate::shared::constants::UNKNOWN_LABEL {
                Verdict::Unknown
            } else {
                Verdict::Recognized(name)
            }
        } else {
            Verdict::Unknown
        }
    }
}
