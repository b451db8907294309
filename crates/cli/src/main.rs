mod console;
mod settings;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use faceroll_core::capture::domain::frame_source::FrameSource;
use faceroll_core::capture::infrastructure::ffmpeg_frame_source::{
    FfmpegFrameSource, DEFAULT_CAMERA_DEVICE,
};
use faceroll_core::detection::domain::face_detector::FaceDetector;
use faceroll_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_MIN_FACE_SIZE,
};
use faceroll_core::display::infrastructure::snapshot_display::SnapshotDisplay;
use faceroll_core::identity::domain::identity_store::IdentityStore;
use faceroll_core::identity::infrastructure::sqlite_identity_store::SqliteIdentityStore;
use faceroll_core::pipeline::mode::OperatorControls;
use faceroll_core::pipeline::pipeline_controller::{PipelineConfig, PipelineController};
use faceroll_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use faceroll_core::pipeline::restore_recognizer_use_case::RestoreRecognizerUseCase;
use faceroll_core::recognition::infrastructure::lbph_recognizer::LbphRecognizer;
use faceroll_core::shared::constants::{SAMPLE_SIZE, YOLO_MODEL_NAME, YOLO_MODEL_URL};
use faceroll_core::shared::model_resolver::{self, ModelSource};

use console::{TerminalConsole, HELP};
use settings::Settings;

/// Live face enrollment and recognition from a camera.
#[derive(Parser)]
#[command(name = "faceroll")]
struct Cli {
    /// Identity database file.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Camera device (e.g. /dev/video0).
    #[arg(long)]
    device: Option<String>,

    /// Replay a video file instead of opening the camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Face detection model (.onnx). Downloaded on first use when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Recognition distance threshold; lower is stricter.
    #[arg(long)]
    threshold: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Keep a PNG of the latest annotated frame at this path.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Rewrite the snapshot every N processed frames.
    #[arg(long)]
    snapshot_every: Option<usize>,

    /// Print the enrolled identities and exit.
    #[arg(long)]
    list: bool,
}

/// Flags merged over settings.
struct Options {
    database: PathBuf,
    device: String,
    input: Option<PathBuf>,
    model: Option<PathBuf>,
    threshold: f64,
    confidence: f64,
    snapshot: Option<PathBuf>,
    snapshot_every: usize,
}

impl Options {
    fn resolve(cli: Cli, settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let options = Self {
            database: cli
                .database
                .or(settings.database)
                .unwrap_or_else(Settings::default_database_path),
            device: cli
                .device
                .or(settings.device)
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            input: cli.input,
            model: cli.model.or(settings.model),
            threshold: cli.threshold.unwrap_or(settings.match_threshold),
            confidence: cli.confidence.unwrap_or(settings.confidence),
            snapshot: cli.snapshot.or(settings.snapshot),
            snapshot_every: cli.snapshot_every.unwrap_or(settings.snapshot_every),
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(format!("Threshold must be a positive number, got {}", self.threshold).into());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )
            .into());
        }
        if self.snapshot_every == 0 {
            return Err("Snapshot interval must be at least 1 frame".into());
        }
        if let Some(input) = &self.input {
            if !input.exists() {
                return Err(format!("Input file not found: {}", input.display()).into());
            }
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let list = cli.list;
    let options = Options::resolve(cli, Settings::load())?;

    let store = SqliteIdentityStore::open(&options.database)?;
    if list {
        return list_identities(&store);
    }

    let detector = build_detector(&options)?;

    let mut recognizer = LbphRecognizer::default();
    RestoreRecognizerUseCase::new(SAMPLE_SIZE).execute(&store, &mut recognizer)?;

    let source = open_source(&options)?;

    let controls = OperatorControls::new();
    let console = TerminalConsole::spawn(controls.clone());
    eprintln!("{HELP}");

    let config = PipelineConfig {
        match_threshold: options.threshold,
        ..PipelineConfig::default()
    };
    let mut controller = PipelineController::new(
        source,
        detector,
        Box::new(recognizer),
        Box::new(store),
        Box::new(SnapshotDisplay::new(options.snapshot, options.snapshot_every)),
        Box::new(console),
        controls,
        Some(Box::new(StdoutPipelineLogger::default())),
        config,
    );

    let reason = controller.run();
    log::info!("Stopped: {reason:?}");
    Ok(())
}

fn list_identities(store: &dyn IdentityStore) -> Result<(), Box<dyn std::error::Error>> {
    let identities = store.identities()?;
    if identities.is_empty() {
        println!("No identities enrolled.");
    }
    for identity in identities {
        println!("{:>5}  {}", identity.id, identity.profile.display_name());
    }
    Ok(())
}

fn build_detector(options: &Options) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let bundled_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    let model_path = model_resolver::resolve(
        &ModelSource {
            name: YOLO_MODEL_NAME,
            url: YOLO_MODEL_URL,
            explicit: options.model.as_deref(),
            bundled_dir: bundled_dir.as_deref(),
        },
        Some(Box::new(download_progress)),
    )?;

    Ok(Box::new(OnnxYoloDetector::new(
        &model_path,
        options.confidence,
        DEFAULT_MIN_FACE_SIZE,
    )?))
}

fn open_source(options: &Options) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let source = match &options.input {
        Some(path) => {
            log::info!("Replaying {}", path.display());
            FfmpegFrameSource::open_file(path)?
        }
        None => {
            log::info!("Opening camera {}", options.device);
            FfmpegFrameSource::open_camera(&options.device)?
        }
    };
    Ok(Box::new(source))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
