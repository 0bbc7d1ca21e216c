use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info};

use super::CaptureError;

/// Preview size requested from the camera and the fallback frame size.
pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 240;
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            ideal_width: FRAME_WIDTH,
            ideal_height: FRAME_HEIGHT,
        }
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self, constraints: CameraConstraints) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// A live camera stream. `stop` must release the device.
pub trait CameraStream: Send {
    fn grab_frame(&mut self) -> Result<DynamicImage, CaptureError>;
    fn stop(&mut self);
}

/// Owns an open stream and stops it exactly once, at the latest on drop.
pub struct StreamGuard {
    stream: Option<Box<dyn CameraStream>>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn grab_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        match self.stream.as_mut() {
            Some(stream) => stream.grab_frame(),
            None => Err(CaptureError::CameraUnavailable("stream already stopped".to_string())),
        }
    }

    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Camera stream released");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encode a frame as JPEG. Frames without pixels are rejected.
pub fn encode_jpeg(frame: &DynamicImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptyFrame);
    }

    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(buffer.into_inner())
}

/// A "camera" that serves a still image from disk, for running the capture
/// workflow without a video device.
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Camera for StillImageCamera {
    async fn open(&self, constraints: CameraConstraints) -> Result<Box<dyn CameraStream>, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::CameraUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| CaptureError::CameraUnavailable(format!("{}: {}", self.path.display(), e)))?;

        let (width, height) = image.dimensions();
        let image = if width > constraints.ideal_width || height > constraints.ideal_height {
            image.resize(constraints.ideal_width, constraints.ideal_height, FilterType::Triangle)
        } else {
            image
        };

        info!(path = %self.path.display(), "Opened still image camera");
        Ok(Box::new(StillImageStream { image: Some(image) }))
    }
}

struct StillImageStream {
    image: Option<DynamicImage>,
}

impl CameraStream for StillImageStream {
    fn grab_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        self.image
            .clone()
            .ok_or_else(|| CaptureError::CameraUnavailable("stream stopped".to_string()))
    }

    fn stop(&mut self) {
        self.image = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_encode_jpeg() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 24, image::Rgba([200, 10, 10, 255])));
        let bytes = encode_jpeg(&frame, JPEG_QUALITY).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 24));
    }

    #[test]
    fn test_encode_rejects_empty_frame() {
        let frame = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(encode_jpeg(&frame, JPEG_QUALITY), Err(CaptureError::EmptyFrame)));
    }

    #[tokio::test]
    async fn test_still_image_camera_downscales() {
        let dir = std::env::temp_dir().join(format!("moodflix-still-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("face.png");
        DynamicImage::new_rgb8(640, 480).save(&path).unwrap();

        let camera = StillImageCamera::new(&path);
        let mut stream = camera.open(CameraConstraints::default()).await.unwrap();
        assert_eq!(stream.grab_frame().unwrap().dimensions(), (320, 240));

        stream.stop();
        assert!(stream.grab_frame().is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_still_image_camera_missing_file() {
        let camera = StillImageCamera::new("/nonexistent/moodflix/face.jpg");
        let err = camera.open(CameraConstraints::default()).await.err().unwrap();
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
    }
}
