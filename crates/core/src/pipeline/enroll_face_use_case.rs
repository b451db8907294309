use thiserror::Error;

use super::operator_input::OperatorInput;
use crate::identity::domain::identity::{Gender, IdentityId, IdentityProfile};
use crate::identity::domain::identity_store::{IdentityStore, StoreError};
use crate::recognition::domain::face_normalizer::{FaceNormalizer, NormalizeError};
use crate::recognition::domain::face_recognizer::{FaceRecognizer, RecognizerError};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

pub const NAME_PROMPT: &str = "Name";
pub const GENDER_PROMPT: &str = "Gender (m/f/o)";
pub const AGE_PROMPT: &str = "Age";

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("invalid age {0:?}: expected a whole number")]
    InvalidAge(String),
    #[error("could not extract face sample: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("could not store identity: {0}")]
    Store(#[from] StoreError),
    /// The identity was stored but the model was not trained on it.
    #[error("identity {id} was stored but training failed: {source}")]
    Training {
        id: IdentityId,
        #[source]
        source: RecognizerError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled {
        id: IdentityId,
        display_name: String,
    },
    /// The operator cancelled or left a prompt empty; nothing was changed.
    Cancelled,
}

/// Registers the single visible face as a new identity.
///
/// Prompts for the profile, then stores the identity and trains the
/// recognizer on the same sample, in that order. A training failure after
/// the store committed is reported as [`EnrollmentError::Training`] and is
/// not rolled back; the stored sample is picked up again when the model is
/// restored on the next start.
pub struct EnrollFaceUseCase {
    normalizer: FaceNormalizer,
}

impl EnrollFaceUseCase {
    pub fn new(normalizer: FaceNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn execute(
        &self,
        input: &mut dyn OperatorInput,
        store: &mut dyn IdentityStore,
        recognizer: &mut dyn FaceRecognizer,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<EnrollmentOutcome, EnrollmentError> {
        let Some(profile) = ask_profile(input)? else {
            return Ok(EnrollmentOutcome::Cancelled);
        };

        let sample = self.normalizer.normalize(frame, region)?;
        let id = store.create(&profile, sample.pixels())?;
        recognizer
            .update(std::slice::from_ref(&sample), &[id])
            .map_err(|source| EnrollmentError::Training { id, source })?;

        Ok(EnrollmentOutcome::Enrolled {
            id,
            display_name: profile.display_name(),
        })
    }
}

/// `Ok(None)` when any prompt is cancelled or answered with blank text.
fn ask_profile(input: &mut dyn OperatorInput) -> Result<Option<IdentityProfile>, EnrollmentError> {
    let Some(name) = ask(input, NAME_PROMPT) else {
        return Ok(None);
    };
    let Some(gender) = ask(input, GENDER_PROMPT) else {
        return Ok(None);
    };
    let Some(age) = ask(input, AGE_PROMPT) else {
        return Ok(None);
    };
    let age: u32 = age.parse().map_err(|_| EnrollmentError::InvalidAge(age))?;

    Ok(Some(IdentityProfile::new(name, Gender::parse(&gender), age)))
}

fn ask(input: &mut dyn OperatorInput, question: &str) -> Option<String> {
    let answer = input.prompt(question)?;
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::domain::identity::Identity;
    use crate::recognition::domain::face_recognizer::Prediction;
    use crate::recognition::domain::face_sample::FaceSample;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct ScriptedInput {
        answers: VecDeque<Option<String>>,
        asked: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedInput {
        fn new(answers: &[Option<&str>]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
                asked: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl OperatorInput for ScriptedInput {
        fn prompt(&mut self, question: &str) -> Option<String> {
            self.asked.lock().unwrap().push(question.to_string());
            self.answers.pop_front().flatten()
        }

        fn notify(&mut self, _message: &str) {}
    }

    #[derive(Default)]
    struct RecordingStore {
        created: Arc<Mutex<Vec<(IdentityProfile, Vec<u8>)>>>,
        fail: bool,
    }

    impl IdentityStore for RecordingStore {
        fn create(
            &mut self,
            profile: &IdentityProfile,
            sample: &[u8],
        ) -> Result<IdentityId, StoreError> {
            if self.fail {
                return Err(StoreError::Backend("disk full".into()));
            }
            let mut created = self.created.lock().unwrap();
            created.push((profile.clone(), sample.to_vec()));
            Ok(created.len() as IdentityId)
        }

        fn display_name(&self, _id: IdentityId) -> String {
            "Unknown".to_string()
        }

        fn identities(&self) -> Result<Vec<Identity>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingRecognizer {
        updates: Arc<Mutex<Vec<(usize, Vec<IdentityId>)>>>,
        fail: bool,
    }

    impl FaceRecognizer for RecordingRecognizer {
        fn predict(&self, _sample: &FaceSample) -> Result<Prediction, RecognizerError> {
            Err(RecognizerError::NotTrained)
        }

        fn update(
            &mut self,
            samples: &[FaceSample],
            ids: &[IdentityId],
        ) -> Result<(), RecognizerError> {
            if self.fail {
                return Err(RecognizerError::EmptyUpdate);
            }
            self.updates
                .lock()
                .unwrap()
                .push((samples.len(), ids.to_vec()));
            Ok(())
        }

        fn sample_count(&self) -> usize {
            self.updates.lock().unwrap().len()
        }
    }

    // --- Helpers ---

    fn frame() -> Frame {
        Frame::new(vec![120; 64 * 64 * 3], 64, 64, 3, 0)
    }

    fn region() -> FaceRegion {
        FaceRegion::new(8, 8, 40, 40)
    }

    fn use_case() -> EnrollFaceUseCase {
        EnrollFaceUseCase::new(FaceNormalizer::new(200))
    }

    // --- Tests ---

    #[test]
    fn test_enrolls_with_normalized_sample() {
        let mut input = ScriptedInput::new(&[Some("Alice"), Some("Female"), Some("30")]);
        let mut store = RecordingStore::default();
        let created = store.created.clone();
        let mut recognizer = RecordingRecognizer::default();
        let updates = recognizer.updates.clone();

        let outcome = use_case()
            .execute(&mut input, &mut store, &mut recognizer, &frame(), &region())
            .unwrap();

        assert_eq!(
            outcome,
            EnrollmentOutcome::Enrolled {
                id: 1,
                display_name: "Alice (Female, 30)".into()
            }
        );
        let created = created.lock().unwrap();
        assert_eq!(created[0].0, IdentityProfile::new("Alice", Gender::Female, 30));
        assert_eq!(created[0].1.len(), 200 * 200);
        assert_eq!(*updates.lock().unwrap(), vec![(1, vec![1])]);
    }

    #[test]
    fn test_prompts_in_order() {
        let mut input = ScriptedInput::new(&[Some("Bob"), Some("m"), Some("41")]);
        let asked = input.asked.clone();

        use_case()
            .execute(
                &mut input,
                &mut RecordingStore::default(),
                &mut RecordingRecognizer::default(),
                &frame(),
                &region(),
            )
            .unwrap();

        assert_eq!(*asked.lock().unwrap(), vec![NAME_PROMPT, GENDER_PROMPT, AGE_PROMPT]);
    }

    #[test]
    fn test_answers_are_trimmed() {
        let mut input = ScriptedInput::new(&[Some("  Carol \n"), Some(" f "), Some(" 27 ")]);
        let mut store = RecordingStore::default();
        let created = store.created.clone();

        use_case()
            .execute(
                &mut input,
                &mut store,
                &mut RecordingRecognizer::default(),
                &frame(),
                &region(),
            )
            .unwrap();

        assert_eq!(
            created.lock().unwrap()[0].0,
            IdentityProfile::new("Carol", Gender::Female, 27)
        );
    }

    #[rstest]
    #[case::cancel_name(&[None])]
    #[case::empty_name(&[Some("   ")])]
    #[case::cancel_gender(&[Some("Alice"), None])]
    #[case::empty_gender(&[Some("Alice"), Some("")])]
    #[case::cancel_age(&[Some("Alice"), Some("f"), None])]
    #[case::empty_age(&[Some("Alice"), Some("f"), Some(" ")])]
    fn test_cancel_has_no_side_effects(#[case] answers: &[Option<&str>]) {
        let mut input = ScriptedInput::new(answers);
        let mut store = RecordingStore::default();
        let created = store.created.clone();
        let mut recognizer = RecordingRecognizer::default();
        let updates = recognizer.updates.clone();

        let outcome = use_case()
            .execute(&mut input, &mut store, &mut recognizer, &frame(), &region())
            .unwrap();

        assert_eq!(outcome, EnrollmentOutcome::Cancelled);
        assert!(created.lock().unwrap().is_empty());
        assert!(updates.lock().unwrap().is_empty());
    }

    #[rstest]
    #[case::words("thirty")]
    #[case::negative("-4")]
    #[case::fraction("30.5")]
    fn test_invalid_age_is_rejected_without_side_effects(#[case] age: &str) {
        let mut input = ScriptedInput::new(&[Some("Alice"), Some("f"), Some(age)]);
        let mut store = RecordingStore::default();
        let created = store.created.clone();

        let err = use_case()
            .execute(
                &mut input,
                &mut store,
                &mut RecordingRecognizer::default(),
                &frame(),
                &region(),
            )
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::InvalidAge(ref a) if a == age));
        assert!(created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_store_failure_skips_training() {
        let mut input = ScriptedInput::new(&[Some("Alice"), Some("f"), Some("30")]);
        let mut store = RecordingStore {
            fail: true,
            ..Default::default()
        };
        let mut recognizer = RecordingRecognizer::default();
        let updates = recognizer.updates.clone();

        let err = use_case()
            .execute(&mut input, &mut store, &mut recognizer, &frame(), &region())
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::Store(_)));
        assert!(updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_training_failure_names_stored_id() {
        let mut input = ScriptedInput::new(&[Some("Alice"), Some("f"), Some("30")]);
        let mut store = RecordingStore::default();
        let created = store.created.clone();
        let mut recognizer = RecordingRecognizer {
            fail: true,
            ..Default::default()
        };

        let err = use_case()
            .execute(&mut input, &mut store, &mut recognizer, &frame(), &region())
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::Training { id: 1, .. }));
        assert_eq!(created.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_region_outside_frame_stores_nothing() {
        let mut input = ScriptedInput::new(&[Some("Alice"), Some("f"), Some("30")]);
        let mut store = RecordingStore::default();
        let created = store.created.clone();

        let err = use_case()
            .execute(
                &mut input,
                &mut store,
                &mut RecordingRecognizer::default(),
                &frame(),
                &FaceRegion::new(500, 500, 10, 10),
            )
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::Normalize(_)));
        assert!(created.lock().unwrap().is_empty());
    }
}
