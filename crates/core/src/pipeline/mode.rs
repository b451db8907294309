use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// What the pipeline does with detected faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Idle = 0,
    Recognizing = 1,
    Enrolling = 2,
}

impl Mode {
    fn from_u8(value: u8) -> Mode {
        match value {
            1 => Mode::Recognizing,
            2 => Mode::Enrolling,
            _ => Mode::Idle,
        }
    }
}

/// Cloneable handle for operator actions, shared between the input thread
/// and the frame loop.
///
/// Every trigger stores a whole value, so the last request wins and
/// nothing is queued.
#[derive(Clone, Debug)]
pub struct OperatorControls {
    mode: Arc<AtomicU8>,
    exit: Arc<AtomicBool>,
}

impl OperatorControls {
    pub fn new() -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(Mode::Idle as u8)),
            exit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn start_recognition(&self) {
        self.mode.store(Mode::Recognizing as u8, Ordering::SeqCst);
    }

    pub fn start_enrollment(&self) {
        self.mode.store(Mode::Enrolling as u8, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.mode.store(Mode::Idle as u8, Ordering::SeqCst);
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Returns to Idle after an enrollment attempt, unless the operator
    /// already picked another mode while the prompts were open.
    pub(crate) fn finish_enrollment(&self) {
        let _ = self.mode.compare_exchange(
            Mode::Enrolling as u8,
            Mode::Idle as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

impl Default for OperatorControls {
    fn default() -> Self {
        Self::new()
    }
}
