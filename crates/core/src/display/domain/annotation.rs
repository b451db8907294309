use std::sync::OnceLock;

use ab_glyph::FontRef;
use image::{ImageBuffer, Luma, Rgb};
use imageproc::definitions::Clamp;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size, Canvas};
use imageproc::rect::Rect;

use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

const RECOGNIZED_COLOR: [u8; 3] = [0, 255, 0];
const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];
const UNLABELED_COLOR: [u8; 3] = [0, 128, 255];

const BOX_THICKNESS: i32 = 2;

/// Label glyph height in pixels.
const LABEL_SCALE: f32 = 16.0;
/// Gap between a box edge and its label.
const LABEL_GAP: i32 = 4;

static LABEL_FONT_BYTES: &[u8] = include_bytes!("../../../assets/DejaVuSansMono.ttf");

/// What the pipeline concluded about one detected face.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Detected only; no recognition was attempted.
    Detected,
    Recognized(String),
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub region: FaceRegion,
    pub verdict: Verdict,
}

impl Annotation {
    pub fn detected(region: FaceRegion) -> Self {
        Self {
            region,
            verdict: Verdict::Detected,
        }
    }

    /// Text shown with the box, if recognition ran for this face.
    pub fn label(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Detected => None,
            Verdict::Recognized(name) => Some(name.as_str()),
            Verdict::Unknown => Some(crate::shared::constants::UNKNOWN_LABEL),
        }
    }

    fn color(&self) -> [u8; 3] {
        match self.verdict {
            Verdict::Detected => UNLABELED_COLOR,
            Verdict::Recognized(_) => RECOGNIZED_COLOR,
            Verdict::Unknown => UNKNOWN_COLOR,
        }
    }
}

/// Draws a box per annotation, clipped to the frame, with its label text
/// above the box (below it when the box touches the top edge).
///
/// Grayscale frames get white boxes and labels.
pub fn annotate(frame: &mut Frame, annotations: &[Annotation]) {
    let (width, height) = (frame.width(), frame.height());
    if frame.is_grayscale() {
        let Some(mut canvas) =
            ImageBuffer::<Luma<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
        else {
            return;
        };
        for annotation in annotations {
            draw(&mut canvas, annotation, Luma([255]));
        }
    } else {
        let Some(mut canvas) =
            ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
        else {
            return;
        };
        for annotation in annotations {
            draw(&mut canvas, annotation, Rgb(annotation.color()));
        }
    }
}

fn draw<C>(canvas: &mut C, annotation: &Annotation, color: C::Pixel)
where
    C: Canvas,
    <C::Pixel as image::Pixel>::Subpixel: Into<f32> + Clamp<f32>,
{
    let (width, height) = canvas.dimensions();
    let Some(r) = annotation.region.clamp_to(width, height) else {
        return;
    };

    for inset in 0..BOX_THICKNESS {
        let (w, h) = (r.width - 2 * inset, r.height - 2 * inset);
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(r.x + inset, r.y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }

    let (Some(text), Some(font)) = (annotation.label(), label_font()) else {
        return;
    };
    let (_, text_height) = text_size(LABEL_SCALE, font, text);
    let above = r.y - text_height as i32 - LABEL_GAP;
    let y = if above >= 0 {
        above
    } else {
        r.y + r.height + LABEL_GAP
    };
    draw_text_mut(canvas, color, r.x, y, LABEL_SCALE, font, text);
}

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(LABEL_FONT_BYTES) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Label font unavailable, drawing boxes only: {e}");
            None
        }
    })
    .as_ref()
}
