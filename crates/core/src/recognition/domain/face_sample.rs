use super::face_normalizer::NormalizeError;

/// Fixed-size grayscale face crop fed to the recognizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceSample {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl FaceSample {
    /// Wraps raw row-major luma bytes, e.g. a reference sample read back
    /// from the identity store.
    pub fn from_raw(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, NormalizeError> {
        let expected = width as usize * height as usize;
        if expected == 0 || pixels.len() != expected {
            return Err(NormalizeError::SampleSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
