use std::path::{Path, PathBuf};

use crate::display::domain::annotation::Annotation;
use crate::display::domain::display_surface::DisplaySurface;
use crate::shared::frame::Frame;

/// Headless display: logs label changes and, when a path is configured,
/// keeps a PNG of the latest annotated frame on disk.
///
/// The PNG is rewritten every `every` shown frames, via a temporary file
/// and a rename so viewers never see a half-written image.
pub struct SnapshotDisplay {
    path: Option<PathBuf>,
    every: usize,
    shown: usize,
    last_labels: Vec<String>,
}

impl SnapshotDisplay {
    pub fn new(path: Option<PathBuf>, every: usize) -> Self {
        Self {
            path,
            every: every.max(1),
            shown: 0,
            last_labels: Vec::new(),
        }
    }

    fn log_label_changes(&mut self, annotations: &[Annotation]) {
        let labels: Vec<String> = annotations
            .iter()
            .filter_map(|a| a.label().map(str::to_string))
            .collect();
        if labels != self.last_labels {
            if labels.is_empty() {
                log::info!("No labeled faces");
            } else {
                log::info!("Faces: {}", labels.join(", "));
            }
            self.last_labels = labels;
        }
    }
}

impl DisplaySurface for SnapshotDisplay {
    fn show(
        &mut self,
        frame: &Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.log_label_changes(annotations);

        let due = self.shown % self.every == 0;
        self.shown += 1;
        match &self.path {
            Some(path) if due => write_png(path, frame),
            _ => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        true
    }
}

fn write_png(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("png.part");
    let color = match frame.channels() {
        1 => image::ColorType::L8,
        3 => image::ColorType::Rgb8,
        n => return Err(format!("Unsupported channel count: {n}").into()),
    };
    image::save_buffer_with_format(
        &temp_path,
        frame.data(),
        frame.width(),
        frame.height(),
        color,
        image::ImageFormat::Png,
    )?;

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::domain::annotation::Verdict;
    use crate::shared::region::FaceRegion;
    use tempfile::TempDir;

    fn make_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![64; (w * h * 3) as usize], w, h, 3, 0)
    }

    #[test]
    fn test_writes_png_with_frame_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live.png");
        let mut display = SnapshotDisplay::new(Some(path.clone()), 1);

        display.show(&make_frame(32, 24), &[]).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 32);
        assert_eq!(img.height(), 24);
        assert!(!path.with_extension("png.part").exists());
    }

    #[test]
    fn test_writes_grayscale_frames() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gray.png");
        let mut display = SnapshotDisplay::new(Some(path.clone()), 1);

        display
            .show(&Frame::new(vec![200; 16], 4, 4, 1, 0), &[])
            .unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_throttles_writes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live.png");
        let mut display = SnapshotDisplay::new(Some(path.clone()), 3);

        display.show(&make_frame(8, 8), &[]).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();

        display.show(&make_frame(8, 8), &[]).unwrap();
        display.show(&make_frame(8, 8), &[]).unwrap();
        assert!(!path.exists());

        display.show(&make_frame(8, 8), &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_without_path_only_tracks_labels() {
        let mut display = SnapshotDisplay::new(None, 1);
        let annotations = vec![
            Annotation {
                region: FaceRegion::new(0, 0, 4, 4),
                verdict: Verdict::Recognized("Alice (Female, 30)".into()),
            },
            Annotation::detected(FaceRegion::new(4, 4, 4, 4)),
        ];

        display.show(&make_frame(8, 8), &annotations).unwrap();
        assert_eq!(display.last_labels, vec!["Alice (Female, 30)".to_string()]);
        assert!(display.is_open());
    }
}
