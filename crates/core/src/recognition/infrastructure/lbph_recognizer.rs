//! Local Binary Pattern Histograms face recognizer.
//!
//! Each sample is encoded with a circular LBP operator, the code image is
//! split into a grid of cells, and the per-cell histograms are concatenated
//! into one feature vector. Prediction is nearest neighbour under the
//! chi-square distance.

use std::f64::consts::PI;

use crate::identity::domain::identity::IdentityId;
use crate::recognition::domain::face_recognizer::{FaceRecognizer, Prediction, RecognizerError};
use crate::recognition::domain::face_sample::FaceSample;

pub const DEFAULT_RADIUS: usize = 1;
pub const DEFAULT_NEIGHBORS: usize = 8;
pub const DEFAULT_GRID: usize = 8;

pub struct LbphRecognizer {
    radius: usize,
    neighbors: usize,
    grid_x: usize,
    grid_y: usize,
    histograms: Vec<Vec<f32>>,
    labels: Vec<IdentityId>,
    geometry: Option<(u32, u32)>,
}

impl LbphRecognizer {
    pub fn new(radius: usize, neighbors: usize, grid_x: usize, grid_y: usize) -> Self {
        Self {
            radius: radius.max(1),
            neighbors: neighbors.clamp(1, 16),
            grid_x: grid_x.max(1),
            grid_y: grid_y.max(1),
            histograms: Vec::new(),
            labels: Vec::new(),
            geometry: None,
        }
    }

    fn check_geometry(&self, sample: &FaceSample) -> Result<(), RecognizerError> {
        let actual = (sample.width(), sample.height());
        let min_side = 2 * self.radius as u32 + 1;
        if actual.0 < min_side || actual.1 < min_side {
            return Err(RecognizerError::SizeMismatch {
                expected: self.geometry.unwrap_or((min_side, min_side)),
                actual,
            });
        }
        match self.geometry {
            Some(expected) if expected != actual => {
                Err(RecognizerError::SizeMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn features(&self, sample: &FaceSample) -> Vec<f32> {
        let (codes, rows, cols) = elbp(
            sample.pixels(),
            sample.height() as usize,
            sample.width() as usize,
            self.radius,
            self.neighbors,
        );
        spatial_histogram(
            &codes,
            rows,
            cols,
            1 << self.neighbors,
            self.grid_x,
            self.grid_y,
        )
    }
}

impl Default for LbphRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS, DEFAULT_NEIGHBORS, DEFAULT_GRID, DEFAULT_GRID)
    }
}

impl FaceRecognizer for LbphRecognizer {
    fn predict(&self, sample: &FaceSample) -> Result<Prediction, RecognizerError> {
        if self.histograms.is_empty() {
            return Err(RecognizerError::NotTrained);
        }
        self.check_geometry(sample)?;

        let query = self.features(sample);
        let mut best = Prediction {
            identity_id: self.labels[0],
            distance: f64::MAX,
        };
        for (hist, &label) in self.histograms.iter().zip(&self.labels) {
            let distance = chi_square(hist, &query);
            if distance < best.distance {
                best = Prediction {
                    identity_id: label,
                    distance,
                };
            }
        }
        Ok(best)
    }

    fn update(&mut self, samples: &[FaceSample], ids: &[IdentityId]) -> Result<(), RecognizerError> {
        if samples.len() != ids.len() {
            return Err(RecognizerError::LabelMismatch {
                samples: samples.len(),
                labels: ids.len(),
            });
        }
        let Some(first) = samples.first() else {
            return Err(RecognizerError::EmptyUpdate);
        };

        let geometry = self.geometry.unwrap_or((first.width(), first.height()));
        for sample in samples {
            let actual = (sample.width(), sample.height());
            if actual != geometry {
                return Err(RecognizerError::SizeMismatch {
                    expected: geometry,
                    actual,
                });
            }
            self.check_geometry(sample)?;
        }

        let features: Vec<Vec<f32>> = samples.iter().map(|s| self.features(s)).collect();
        self.histograms.extend(features);
        self.labels.extend_from_slice(ids);
        self.geometry = Some(geometry);

        log::debug!(
            "LBPH model updated with {} sample(s), {} total",
            samples.len(),
            self.histograms.len()
        );
        Ok(())
    }

    fn sample_count(&self) -> usize {
        self.histograms.len()
    }
}

// ---------------------------------------------------------------------------
// Feature extraction
// ---------------------------------------------------------------------------

/// Circular (extended) LBP with bilinear sampling of the neighbours.
///
/// Returns the code image and its dimensions, which are the input shrunk by
/// `radius` on every side.
fn elbp(
    src: &[u8],
    rows: usize,
    cols: usize,
    radius: usize,
    neighbors: usize,
) -> (Vec<u16>, usize, usize) {
    let out_rows = rows - 2 * radius;
    let out_cols = cols - 2 * radius;
    let mut dst = vec![0u16; out_rows * out_cols];
    let px = |r: usize, c: usize| src[r * cols + c] as f32;
    let r = radius as f64;

    for n in 0..neighbors {
        let angle = 2.0 * PI * n as f64 / neighbors as f64;
        let x = (r * angle.cos()) as f32;
        let y = (-r * angle.sin()) as f32;

        let fx = x.floor();
        let fy = y.floor();
        let cx = x.ceil();
        let cy = y.ceil();

        let tx = x - fx;
        let ty = y - fy;
        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;

        let (fx, fy, cx, cy) = (fx as isize, fy as isize, cx as isize, cy as isize);

        for i in radius..rows - radius {
            for j in radius..cols - radius {
                let at = |dy: isize, dx: isize| {
                    px(
                        (i as isize + dy) as usize,
                        (j as isize + dx) as usize,
                    )
                };
                let t = w1 * at(fy, fx) + w2 * at(fy, cx) + w3 * at(cy, fx) + w4 * at(cy, cx);
                let center = px(i, j);
                if t > center || (t - center).abs() < f32::EPSILON {
                    dst[(i - radius) * out_cols + (j - radius)] |= 1 << n;
                }
            }
        }
    }

    (dst, out_rows, out_cols)
}

/// Concatenated per-cell histograms, each normalized by the cell's pixel count.
fn spatial_histogram(
    codes: &[u16],
    rows: usize,
    cols: usize,
    num_patterns: usize,
    grid_x: usize,
    grid_y: usize,
) -> Vec<f32> {
    let cell_w = cols / grid_x;
    let cell_h = rows / grid_y;
    let mut result = vec![0f32; grid_x * grid_y * num_patterns];
    if cell_w == 0 || cell_h == 0 {
        return result;
    }

    let cell_total = (cell_w * cell_h) as f32;
    for gy in 0..grid_y {
        for gx in 0..grid_x {
            let offset = (gy * grid_x + gx) * num_patterns;
            let hist = &mut result[offset..offset + num_patterns];
            for row in gy * cell_h..(gy + 1) * cell_h {
                for col in gx * cell_w..(gx + 1) * cell_w {
                    hist[codes[row * cols + col] as usize] += 1.0;
                }
            }
            for bin in hist.iter_mut() {
                *bin /= cell_total;
            }
        }
    }
    result
}

/// Alternative chi-square distance, `2 * sum((h1 - h2)^2 / (h1 + h2))`.
///
/// Symmetric; bins empty in both histograms are skipped.
fn chi_square(a: &[f32], b: &[f32]) -> f64 {
    2.0 * a
        .iter()
        .zip(b)
        .map(|(&h1, &h2)| (h1 as f64, h2 as f64))
        .filter(|(h1, h2)| (h1 + h2).abs() > f64::EPSILON)
        .map(|(h1, h2)| (h1 - h2) * (h1 - h2) / (h1 + h2))
        .sum::<f64>()
}
