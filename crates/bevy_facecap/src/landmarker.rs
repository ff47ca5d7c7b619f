use std::sync::Arc;

use bevy::prelude::Resource;
use parking_lot::Mutex;

use facecap_api::FaceLandmarkerResult;

use crate::tracking::VideoFrame;

/// Runs face landmark detection on a video frame.
pub trait FaceLandmarker: Send + Sync + 'static {
    fn detect_for_video(&mut self, frame: &VideoFrame, timestamp: f64) -> Option<FaceLandmarkerResult>;
}

/// The detector used by the frame capture callback.
#[derive(Resource)]
pub struct Landmarker(Box<dyn FaceLandmarker>);

impl Landmarker {
    pub fn new(landmarker: impl FaceLandmarker) -> Self {
        Self(Box::new(landmarker))
    }

    pub fn detect_for_video(&mut self, frame: &VideoFrame, timestamp: f64) -> Option<FaceLandmarkerResult> {
        self.0.detect_for_video(frame, timestamp)
    }
}

/// A landmarker whose inference runs out of process.
///
/// Results are submitted by the tracker through the API and handed out to
/// the next frame that asks for one.
#[derive(Clone, Default)]
pub struct RemoteLandmarker {
    pending: Arc<Mutex<Option<FaceLandmarkerResult>>>,
}

impl RemoteLandmarker {
    pub fn submit(&self, result: FaceLandmarkerResult) {
        if self.pending.lock().replace(result).is_some() {
            tracing::debug!("dropping unconsumed face landmarker result");
        }
    }
}

impl FaceLandmarker for RemoteLandmarker {
    fn detect_for_video(&mut self, _frame: &VideoFrame, _timestamp: f64) -> Option<FaceLandmarkerResult> {
        self.pending.lock().take()
    }
}
