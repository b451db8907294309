use crate::identity::domain::identity::IdentityId;
use crate::identity::domain::identity_store::IdentityStore;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::recognition::domain::face_sample::FaceSample;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
}

/// Re-trains the recognizer from every reference sample in the store, so
/// identities enrolled in earlier sessions are recognized again.
///
/// Samples that do not match the configured geometry are skipped.
pub struct RestoreRecognizerUseCase {
    sample_size: u32,
}

impl RestoreRecognizerUseCase {
    pub fn new(sample_size: u32) -> Self {
        Self { sample_size }
    }

    pub fn execute(
        &self,
        store: &dyn IdentityStore,
        recognizer: &mut dyn FaceRecognizer,
    ) -> Result<RestoreReport, Box<dyn std::error::Error>> {
        let mut samples = Vec::new();
        let mut ids: Vec<IdentityId> = Vec::new();
        let mut skipped = 0;

        for identity in store.identities()? {
            match FaceSample::from_raw(identity.reference_sample, self.sample_size, self.sample_size) {
                Ok(sample) => {
                    samples.push(sample);
                    ids.push(identity.id);
                }
                Err(e) => {
                    log::warn!("Skipping stored sample of identity {}: {e}", identity.id);
                    skipped += 1;
                }
            }
        }

        if !samples.is_empty() {
            recognizer.update(&samples, &ids)?;
        }
        log::info!(
            "Restored recognizer from {} stored sample(s), skipped {skipped}",
            samples.len()
        );

        Ok(RestoreReport {
            restored: samples.len(),
            skipped,
        })
    }
}
