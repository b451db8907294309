use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::face_detector::FaceDetector;
use crate::display::domain::annotation::{annotate, Annotation};
use crate::display::domain::display_surface::DisplaySurface;
use crate::identity::domain::identity_store::IdentityStore;
use crate::recognition::domain::face_normalizer::FaceNormalizer;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::shared::constants::{
    DEFAULT_FRAME_INTERVAL_MS, DEFAULT_IDLE_SLEEP_MS, DEFAULT_MATCH_THRESHOLD, SAMPLE_SIZE,
};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::enroll_face_use_case::{EnrollFaceUseCase, EnrollmentError, EnrollmentOutcome};
use super::mode::{Mode, OperatorControls};
use super::operator_input::OperatorInput;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::recognize_faces_use_case::RecognizeFacesUseCase;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Distances strictly below this count as a match.
    pub match_threshold: f64,
    /// Minimum time between processed frames.
    pub frame_interval: Duration,
    /// Sleep while throttled or waiting for a frame.
    pub idle_sleep: Duration,
    pub sample_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            idle_sleep: Duration::from_millis(DEFAULT_IDLE_SLEEP_MS),
            sample_size: SAMPLE_SIZE,
        }
    }
}

/// Result of one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame_index: usize,
    /// Mode the frame was processed in.
    pub mode: Mode,
    pub annotations: Vec<Annotation>,
    /// Set when an enrollment attempt ran on this frame.
    pub enrollment: Option<Result<EnrollmentOutcome, String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Too early since the previous processed frame; the source was not read.
    Throttled,
    /// The source had no frame ready.
    NoFrame,
    EndOfStream,
    /// Reading or detection failed for this frame; the loop continues.
    Failed,
    Processed(FrameReport),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ExitRequested,
    DisplayClosed,
    EndOfStream,
}

/// The live frame loop: read → detect → recognize or enroll → annotate →
/// display.
///
/// Owns every collaborator. The operating mode lives in the shared
/// [`OperatorControls`] and is loaded once per tick. Resources are released
/// by [`shutdown`](Self::shutdown), which `run` calls on every exit path and
/// `Drop` calls as a fallback.
pub struct PipelineController {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    recognizer: Box<dyn FaceRecognizer>,
    store: Box<dyn IdentityStore>,
    display: Box<dyn DisplaySurface>,
    input: Box<dyn OperatorInput>,
    controls: OperatorControls,
    logger: Box<dyn PipelineLogger>,
    config: PipelineConfig,
    recognize: RecognizeFacesUseCase,
    enroll: EnrollFaceUseCase,
    last_processed: Option<Instant>,
    shut_down: bool,
}

impl PipelineController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        recognizer: Box<dyn FaceRecognizer>,
        store: Box<dyn IdentityStore>,
        display: Box<dyn DisplaySurface>,
        input: Box<dyn OperatorInput>,
        controls: OperatorControls,
        logger: Option<Box<dyn PipelineLogger>>,
        config: PipelineConfig,
    ) -> Self {
        let normalizer = FaceNormalizer::new(config.sample_size);
        Self {
            source,
            detector,
            recognizer,
            store,
            display,
            input,
            controls,
            logger: logger.unwrap_or_else(|| Box::new(NullPipelineLogger)),
            recognize: RecognizeFacesUseCase::new(normalizer, config.match_threshold),
            enroll: EnrollFaceUseCase::new(normalizer),
            config,
            last_processed: None,
            shut_down: false,
        }
    }

    pub fn controls(&self) -> OperatorControls {
        self.controls.clone()
    }

    /// Processes at most one frame.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(last) = self.last_processed {
            if last.elapsed() < self.config.frame_interval {
                return TickOutcome::Throttled;
            }
        }

        let frame = match self.source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::NoFrame,
            Err(CaptureError::EndOfStream) => return TickOutcome::EndOfStream,
            Err(e) => {
                log::warn!("Frame read failed: {e}");
                return TickOutcome::Failed;
            }
        };
        self.last_processed = Some(Instant::now());
        self.logger.frame(frame.index());

        let gray = frame.to_grayscale();
        let started = Instant::now();
        let detected = self.detector.detect(&gray);
        self.logger.timing("detect", elapsed_ms(started));

        let regions = match detected {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                self.present(frame, &[]);
                return TickOutcome::Failed;
            }
        };
        self.logger.metric("faces", regions.len() as f64);

        let mode = self.controls.mode();
        let mut enrollment = None;
        let annotations = match mode {
            Mode::Recognizing if !regions.is_empty() => {
                let started = Instant::now();
                let annotations =
                    self.recognize
                        .execute(&*self.recognizer, &*self.store, &gray, &regions);
                self.logger.timing("recognize", elapsed_ms(started));
                annotations
            }
            Mode::Enrolling if regions.len() == 1 => {
                enrollment = Some(self.enroll_single(&gray, &regions[0]));
                detected_only(&regions)
            }
            _ => detected_only(&regions),
        };

        let frame_index = frame.index();
        self.present(frame, &annotations);

        TickOutcome::Processed(FrameReport {
            frame_index,
            mode,
            annotations,
            enrollment,
        })
    }

    /// Runs until exit is requested, the display closes or the source ends,
    /// then shuts down.
    pub fn run(&mut self) -> StopReason {
        log::info!("Pipeline started in {:?} mode", self.controls.mode());
        let reason = loop {
            if self.controls.exit_requested() {
                break StopReason::ExitRequested;
            }
            if !self.display.is_open() {
                break StopReason::DisplayClosed;
            }
            match self.tick() {
                TickOutcome::Processed(_) => {}
                TickOutcome::EndOfStream => break StopReason::EndOfStream,
                TickOutcome::Throttled | TickOutcome::NoFrame | TickOutcome::Failed => {
                    std::thread::sleep(self.config.idle_sleep);
                }
            }
        };
        log::info!("Pipeline stopping: {reason:?}");
        self.shutdown();
        reason
    }

    /// Releases the frame source and emits the session summary. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.source.close();
        self.logger.summary();
    }

    fn enroll_single(
        &mut self,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<EnrollmentOutcome, String> {
        let started = Instant::now();
        let result = self.enroll.execute(
            &mut *self.input,
            &mut *self.store,
            &mut *self.recognizer,
            frame,
            region,
        );
        self.logger.timing("enroll", elapsed_ms(started));

        match &result {
            Ok(EnrollmentOutcome::Enrolled { id, display_name }) => {
                log::info!("Enrolled identity {id}: {display_name}");
                self.input
                    .notify(&format!("Enrolled {display_name} (id {id})"));
            }
            Ok(EnrollmentOutcome::Cancelled) => {
                log::info!("Enrollment cancelled");
                self.input.notify("Enrollment cancelled");
            }
            Err(e @ EnrollmentError::InvalidAge(_)) => {
                log::warn!("Enrollment rejected: {e}");
                self.input.notify(&format!("Enrollment rejected: {e}"));
            }
            Err(e) => {
                log::error!("Enrollment failed: {e}");
                self.input.notify(&format!("Enrollment failed: {e}"));
            }
        }

        self.controls.finish_enrollment();
        result.map_err(|e| e.to_string())
    }

    fn present(&mut self, mut frame: Frame, annotations: &[Annotation]) {
        annotate(&mut frame, annotations);
        if let Err(e) = self.display.show(&frame, annotations) {
            log::warn!("Display update failed: {e}");
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn detected_only(regions: &[FaceRegion]) -> Vec<Annotation> {
    regions.iter().copied().map(Annotation::detected).collect()
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
