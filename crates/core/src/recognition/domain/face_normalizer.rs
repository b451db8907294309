use std::borrow::Cow;

use image::imageops::FilterType;
use thiserror::Error;

use super::face_sample::FaceSample;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("face region {0:?} lies outside the frame")]
    OutsideFrame(FaceRegion),
    #[error("sample has {actual} bytes, expected {expected}")]
    SampleSize { expected: usize, actual: usize },
}

/// Crops a face region and rescales it to a square grayscale sample.
#[derive(Clone, Copy, Debug)]
pub struct FaceNormalizer {
    size: u32,
}

impl FaceNormalizer {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Color frames are converted to luma first. The region is clipped to
    /// the frame; a region with nothing inside the frame is an error.
    pub fn normalize(&self, frame: &Frame, region: &FaceRegion) -> Result<FaceSample, NormalizeError> {
        let clipped = region
            .clamp_to(frame.width(), frame.height())
            .ok_or(NormalizeError::OutsideFrame(*region))?;

        let gray: Cow<'_, Frame> = if frame.is_grayscale() {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(frame.to_grayscale())
        };

        let image = image::ImageBuffer::<image::Luma<u8>, &[u8]>::from_raw(
            gray.width(),
            gray.height(),
            gray.data(),
        )
        .ok_or(NormalizeError::SampleSize {
            expected: gray.width() as usize * gray.height() as usize,
            actual: gray.data().len(),
        })?;

        let crop = image::imageops::crop_imm(
            &image,
            clipped.x as u32,
            clipped.y as u32,
            clipped.width as u32,
            clipped.height as u32,
        );
        let resized = image::imageops::resize(&*crop, self.size, self.size, FilterType::Triangle);

        FaceSample::from_raw(resized.into_raw(), self.size, self.size)
    }
}

impl Default for FaceNormalizer {
    fn default() -> Self {
        Self::new(crate::shared::constants::SAMPLE_SIZE)
    }
}
