pub mod camera;
pub mod orchestrator;

pub use camera::{
    encode_jpeg, Camera, CameraConstraints, CameraStream, StillImageCamera, StreamGuard,
    FRAME_HEIGHT, FRAME_WIDTH, JPEG_QUALITY,
};
pub use orchestrator::{CaptureOrchestrator, CapturePhase, CaptureStatus};

use crate::error::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{0}")]
    CameraUnavailable(String),
    #[error("Capture not possible while {0:?}")]
    NotReady(CapturePhase),
    #[error("Captured frame is empty")]
    EmptyFrame,
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}
