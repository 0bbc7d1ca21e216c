use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::camera::{encode_jpeg, Camera, CameraConstraints, StreamGuard, JPEG_QUALITY};
use super::CaptureError;
use crate::catalog::CatalogClient;
use crate::mood::{suggest_for_label, MoodClassifier, MoodSuggestions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Starting,
    Ready,
    Capturing,
    Analyzing,
    Error,
}

/// What a UI shows for the capture workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureStatus {
    pub phase: CapturePhase,
    pub message: String,
    pub error: Option<String>,
}

/// The camera stream lives only in the states that need it.
enum CaptureState {
    Idle,
    Starting,
    Ready(StreamGuard),
    Capturing(StreamGuard),
    Analyzing(StreamGuard),
    Error(String),
}

impl CaptureState {
    fn phase(&self) -> CapturePhase {
        match self {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Starting => CapturePhase::Starting,
            CaptureState::Ready(_) => CapturePhase::Ready,
            CaptureState::Capturing(_) => CapturePhase::Capturing,
            CaptureState::Analyzing(_) => CapturePhase::Analyzing,
            CaptureState::Error(_) => CapturePhase::Error,
        }
    }

    fn has_stream(&self) -> bool {
        matches!(
            self,
            CaptureState::Ready(_) | CaptureState::Capturing(_) | CaptureState::Analyzing(_)
        )
    }
}

/// Camera → frame → JPEG → mood → genre → suggestions.
///
/// Methods take `&mut self`, so at most one cycle runs at a time. Dropping the
/// orchestrator releases the camera.
pub struct CaptureOrchestrator {
    camera: Arc<dyn Camera>,
    classifier: Arc<dyn MoodClassifier>,
    catalog: Arc<dyn CatalogClient>,
    constraints: CameraConstraints,
    state: CaptureState,
    last_error: Option<String>,
    status: watch::Sender<CaptureStatus>,
}

impl CaptureOrchestrator {
    pub fn new(
        camera: Arc<dyn Camera>,
        classifier: Arc<dyn MoodClassifier>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Self {
        let (status, _) = watch::channel(CaptureStatus {
            phase: CapturePhase::Idle,
            message: String::new(),
            error: None,
        });
        Self {
            camera,
            classifier,
            catalog,
            constraints: CameraConstraints::default(),
            state: CaptureState::Idle,
            last_error: None,
            status,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.state.phase()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptureStatus> {
        self.status.subscribe()
    }

    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state.has_stream() {
            return Ok(());
        }

        self.last_error = None;
        self.state = CaptureState::Starting;
        self.publish("Starting camera...");

        match self.camera.open(self.constraints).await {
            Ok(stream) => {
                self.state = CaptureState::Ready(StreamGuard::new(stream));
                self.publish("Camera ready. Click \"Snap & Analyse\".");
                info!("Camera started");
                Ok(())
            }
            Err(e) => {
                let message = format!("Could not access camera: {}. Please check permissions.", e);
                warn!("{}", message);
                self.last_error = Some(message.clone());
                self.state = CaptureState::Error(message);
                self.publish("");
                Err(e)
            }
        }
    }

    /// Run one analysis cycle. Failures end the cycle but leave the camera
    /// open in `Ready`.
    pub async fn capture_and_analyze(&mut self) -> Result<MoodSuggestions, CaptureError> {
        // A cycle whose future was dropped mid-way leaves the stream parked
        // in Capturing/Analyzing; take it back.
        self.move_stream(CaptureState::Ready);

        if !matches!(self.state, CaptureState::Ready(_)) {
            return Err(CaptureError::NotReady(self.phase()));
        }

        self.last_error = None;
        let outcome = self.run_cycle().await;
        self.move_stream(CaptureState::Ready);

        match &outcome {
            Ok(suggestions) => {
                let message = format!("Suggestions for {} mood:", suggestions.mood);
                self.publish(&message);
            }
            Err(e) => {
                warn!("Mood analysis failed: {}", e);
                self.last_error = Some(e.to_string());
                self.publish("");
            }
        }
        outcome
    }

    /// Release the camera from any state.
    pub fn stop(&mut self) {
        if let Some(guard) = self.take_stream() {
            guard.release();
            info!("Camera stopped");
        }
        self.state = CaptureState::Idle;
        self.publish("");
    }

    async fn run_cycle(&mut self) -> Result<MoodSuggestions, CaptureError> {
        self.move_stream(CaptureState::Capturing);
        self.publish("Capturing frame...");

        let phase = self.phase();
        let frame = match &mut self.state {
            CaptureState::Capturing(stream) => stream.grab_frame()?,
            _ => return Err(CaptureError::NotReady(phase)),
        };
        let jpeg = encode_jpeg(&frame, JPEG_QUALITY)?;

        self.move_stream(CaptureState::Analyzing);
        self.publish("Analysing mood...");

        let label = self.classifier.classify(jpeg, "image/jpeg").await?;
        let message = format!("Detected mood: {}. Fetching suggestions...", label);
        self.publish(&message);

        Ok(suggest_for_label(self.catalog.as_ref(), label).await?)
    }

    fn take_stream(&mut self) -> Option<StreamGuard> {
        match std::mem::replace(&mut self.state, CaptureState::Idle) {
            CaptureState::Ready(stream)
            | CaptureState::Capturing(stream)
            | CaptureState::Analyzing(stream) => Some(stream),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Re-home the open stream into another stream-owning state. No-op when
    /// no stream is open.
    fn move_stream(&mut self, to: fn(StreamGuard) -> CaptureState) {
        if let Some(stream) = self.take_stream() {
            self.state = to(stream);
        }
    }

    fn publish(&self, message: &str) {
        let error = match &self.state {
            CaptureState::Error(reason) => Some(reason.clone()),
            _ => self.last_error.clone(),
        };
        self.status.send_replace(CaptureStatus {
            phase: self.state.phase(),
            message: message.to_string(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CameraStream;
    use crate::catalog::{GenreId, MovieDetail, MovieId, MovieSummary};
    use crate::error::{ServiceError, ServiceResult};
    use crate::mood::MoodLabel;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        released: AtomicUsize,
    }

    struct FakeCamera {
        counters: Arc<Counters>,
        fail: bool,
    }

    struct FakeStream {
        counters: Arc<Counters>,
    }

    impl CameraStream for FakeStream {
        fn grab_frame(&mut self) -> Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::new_rgb8(16, 12))
        }

        fn stop(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Camera for FakeCamera {
        async fn open(&self, _constraints: CameraConstraints) -> Result<Box<dyn CameraStream>, CaptureError> {
            if self.fail {
                return Err(CaptureError::CameraUnavailable("Permission denied".to_string()));
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream { counters: self.counters.clone() }))
        }
    }

    enum Behaviour {
        Label(&'static str),
        Fail,
        Hang,
    }

    struct FakeClassifier(Behaviour);

    #[async_trait]
    impl MoodClassifier for FakeClassifier {
        async fn classify(&self, image: Vec<u8>, mime_type: &str) -> ServiceResult<MoodLabel> {
            assert_eq!(mime_type, "image/jpeg");
            assert_eq!(image::guess_format(&image).unwrap(), image::ImageFormat::Jpeg);
            match self.0 {
                Behaviour::Label(label) => Ok(MoodLabel::new(label)),
                Behaviour::Fail => Err(ServiceError::Upstream {
                    status: 200,
                    message: "No face detected".to_string(),
                }),
                Behaviour::Hang => futures::future::pending().await,
            }
        }
    }

    struct GenreEcho;

    #[async_trait]
    impl CatalogClient for GenreEcho {
        async fn trending(&self) -> ServiceResult<Vec<MovieSummary>> {
            Ok(Vec::new())
        }

        async fn by_genre(&self, genre: GenreId, min_votes: u32) -> ServiceResult<Vec<MovieSummary>> {
            Ok(vec![MovieSummary {
                id: MovieId::from(genre.0 as u64),
                title: format!("votes>={}", min_votes),
                poster_url: "/placeholder.png".to_string(),
            }])
        }

        async fn by_id(&self, id: &MovieId) -> ServiceResult<MovieDetail> {
            Err(ServiceError::NotFound(id.to_string()))
        }

        async fn search(&self, _term: &str) -> ServiceResult<Vec<MovieSummary>> {
            Ok(Vec::new())
        }
    }

    fn orchestrator(behaviour: Behaviour, fail_camera: bool) -> (CaptureOrchestrator, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let camera = FakeCamera { counters: counters.clone(), fail: fail_camera };
        let orchestrator = CaptureOrchestrator::new(
            Arc::new(camera),
            Arc::new(FakeClassifier(behaviour)),
            Arc::new(GenreEcho),
        );
        (orchestrator, counters)
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let (mut orch, counters) = orchestrator(Behaviour::Label("SAD"), false);
        let status = orch.subscribe();

        orch.start().await.unwrap();
        assert_eq!(orch.phase(), CapturePhase::Ready);

        let suggestions = orch.capture_and_analyze().await.unwrap();
        assert_eq!(suggestions.mood, MoodLabel::new("SAD"));
        assert_eq!(suggestions.genre_id, GenreId(18));
        assert_eq!(suggestions.movies[0].title, "votes>=100");

        assert_eq!(orch.phase(), CapturePhase::Ready);
        assert_eq!(status.borrow().message, "Suggestions for SAD mood:");
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);

        orch.stop();
        assert_eq!(orch.phase(), CapturePhase::Idle);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (mut orch, counters) = orchestrator(Behaviour::Label("happy"), false);
        orch.start().await.unwrap();
        orch.start().await.unwrap();
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_analysis_failure_keeps_camera_open() {
        let (mut orch, counters) = orchestrator(Behaviour::Fail, false);
        orch.start().await.unwrap();

        let err = orch.capture_and_analyze().await.unwrap_err();
        assert!(matches!(err, CaptureError::Service(ServiceError::Upstream { .. })));
        assert_eq!(orch.phase(), CapturePhase::Ready);
        assert_eq!(orch.last_error(), Some("Upstream error (200): No face detected"));
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_camera_failure_enters_error_state() {
        let (mut orch, _) = orchestrator(Behaviour::Label("happy"), true);
        let status = orch.subscribe();

        assert!(orch.start().await.is_err());
        assert_eq!(orch.phase(), CapturePhase::Error);
        let error = status.borrow().error.clone().unwrap();
        assert!(error.starts_with("Could not access camera"));

        assert!(matches!(
            orch.capture_and_analyze().await,
            Err(CaptureError::NotReady(CapturePhase::Error))
        ));
    }

    #[tokio::test]
    async fn test_capture_requires_ready() {
        let (mut orch, _) = orchestrator(Behaviour::Label("happy"), false);
        assert!(matches!(
            orch.capture_and_analyze().await,
            Err(CaptureError::NotReady(CapturePhase::Idle))
        ));
    }

    #[tokio::test]
    async fn test_drop_releases_camera() {
        let (mut orch, counters) = orchestrator(Behaviour::Label("happy"), false);
        orch.start().await.unwrap();
        drop(orch);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_cycle_still_releases_once() {
        let (mut orch, counters) = orchestrator(Behaviour::Hang, false);
        orch.start().await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), orch.capture_and_analyze()).await;
        assert!(timed_out.is_err());
        assert_eq!(orch.phase(), CapturePhase::Analyzing);

        orch.stop();
        orch.stop();
        drop(orch);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }
}
