use std::path::Path;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::constants::{CAMERA_FRAMERATE, CAMERA_HEIGHT, CAMERA_WIDTH};
use crate::shared::frame::Frame;

/// Capture backend name understood by libavdevice on this platform.
#[cfg(target_os = "linux")]
pub const DEFAULT_CAMERA_BACKEND: &str = "video4linux2";
#[cfg(target_os = "macos")]
pub const DEFAULT_CAMERA_BACKEND: &str = "avfoundation";
#[cfg(target_os = "windows")]
pub const DEFAULT_CAMERA_BACKEND: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_CAMERA_BACKEND: &str = "video4linux2";

#[cfg(target_os = "linux")]
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
#[cfg(target_os = "macos")]
pub const DEFAULT_CAMERA_DEVICE: &str = "0";
#[cfg(target_os = "windows")]
pub const DEFAULT_CAMERA_DEVICE: &str = "video=Integrated Camera";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Pulls frames from a camera device or a video file through ffmpeg-next.
///
/// Every decoded frame is converted to RGB24. The demuxer, decoder and
/// scaler are dropped together on [`FrameSource::close`] or on drop,
/// whichever comes first.
pub struct FfmpegFrameSource {
    stream: Option<DecodeStream>,
    label: String,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

struct DecodeStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
}

impl FfmpegFrameSource {
    /// Opens a camera at 640x480 using the platform's default backend.
    pub fn open_camera(device: &str) -> Result<Self, CaptureError> {
        Self::open_camera_with(
            DEFAULT_CAMERA_BACKEND,
            device,
            CAMERA_WIDTH,
            CAMERA_HEIGHT,
            CAMERA_FRAMERATE,
        )
    }

    pub fn open_camera_with(
        backend: &str,
        device: &str,
        width: u32,
        height: u32,
        framerate: u32,
    ) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(device_err)?;

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == backend)
            .ok_or_else(|| {
                CaptureError::Device(format!("capture backend '{backend}' is not available"))
            })?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set("video_size", &format!("{width}x{height}"));
        options.set("framerate", &framerate.to_string());

        let context = ffmpeg_next::format::open_with(
            device,
            &ffmpeg_next::format::Format::Input(format),
            options,
        )
        .map_err(|e| CaptureError::Device(format!("cannot open camera '{device}': {e}")))?;

        let ictx = match context {
            ffmpeg_next::format::context::Context::Input(ictx) => ictx,
            _ => {
                return Err(CaptureError::Device(format!(
                    "'{device}' did not open as an input device"
                )))
            }
        };

        let stream = DecodeStream::new(ictx)?;
        if stream.width != width || stream.height != height {
            log::warn!(
                "Camera delivered {}x{} instead of the requested {width}x{height}",
                stream.width,
                stream.height
            );
        }
        log::info!(
            "Opened camera {device} ({backend}) at {}x{}",
            stream.width,
            stream.height
        );

        Ok(Self {
            stream: Some(stream),
            label: device.to_string(),
        })
    }

    /// Replays a recorded video; reaching its end yields [`CaptureError::EndOfStream`].
    pub fn open_file(path: &Path) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(device_err)?;

        let ictx = ffmpeg_next::format::input(path).map_err(|e| {
            CaptureError::Device(format!("cannot open {}: {e}", path.display()))
        })?;
        let stream = DecodeStream::new(ictx)?;
        log::info!(
            "Opened {} at {}x{}",
            path.display(),
            stream.width,
            stream.height
        );

        Ok(Self {
            stream: Some(stream),
            label: path.display().to_string(),
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CaptureError::Device(format!(
                "{} is already closed",
                self.label
            )));
        };
        stream.next_frame().map(Some)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Released frame source {}", self.label);
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl DecodeStream {
    fn new(ictx: ffmpeg_next::format::context::Input) -> Result<Self, CaptureError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Device("no video stream found".into()))?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(device_err)?;
        let decoder = codec_ctx.decoder().video().map_err(device_err)?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(device_err)?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            frame_index: 0,
            flushing: false,
        })
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(frame);
            }
            if self.flushing {
                return Err(CaptureError::EndOfStream);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::debug!("Dropped undecodable packet: {e}");
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::Decode(Box::new(e)))?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

fn device_err(e: ffmpeg_next::Error) -> CaptureError {
    CaptureError::Device(e.to_string())
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
