pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Side length of the square grayscale sample fed to the recognizer.
pub const SAMPLE_SIZE: u32 = 200;

/// Prediction distances strictly below this are treated as a match.
///
/// Measured on the LBPH recognizer's alternative chi-square scale,
/// `2 * sum((a - b)^2 / (a + b))`.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 100.0;

/// Minimum time between processed frames (~30 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// Sleep between polls while throttled or waiting for the camera.
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 1;

pub const CAMERA_WIDTH: u32 = 640;
pub const CAMERA_HEIGHT: u32 = 480;
pub const CAMERA_FRAMERATE: u32 = 30;

/// Label for regions without a confident match, and for unknown ids.
pub const UNKNOWN_LABEL: &str = "Unknown";

pub const DEFAULT_DATABASE_NAME: &str = "faces.db";
