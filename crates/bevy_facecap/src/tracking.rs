use bevy::prelude::{Event, EventReader, Handle, Image, ResMut, Resource};

use facecap_api::FaceLandmarkerResult;

use crate::landmarker::Landmarker;

#[derive(Debug, Clone, PartialEq)]
pub struct Blendshape {
    pub name: String,
    pub value: f32,
}

/// The most recently detected expression.
///
/// Only the frame capture callback writes this; each publish replaces the
/// whole list.
#[derive(Debug, Default, Resource)]
pub struct BlendshapeState {
    blendshapes: Vec<Blendshape>,
    generation: u64,
}

impl BlendshapeState {
    pub fn blendshapes(&self) -> &[Blendshape] {
        &self.blendshapes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn publish(&mut self, blendshapes: Vec<Blendshape>) {
        self.blendshapes = blendshapes;
        self.generation += 1;
    }
}

/// A video frame delivered for detection.
#[derive(Debug, Clone, Event)]
pub struct VideoFrame {
    /// Capture time in milliseconds.
    pub time: f64,
    pub image: Option<Handle<Image>>,
}

/// Converts the first detected face into a blendshape list.
///
/// Returns `None` when there is no face or the face has no categories.
pub fn blendshapes_from_result(result: &FaceLandmarkerResult) -> Option<Vec<Blendshape>> {
    let categories = result.first_face_categories()?;
    if categories.is_empty() {
        return None;
    }

    Some(categories.iter()
        .map(|c| Blendshape {
            name: c.category_name.clone(),
            value: c.score,
        })
        .collect())
}

pub fn capture_video_frames(
    mut frames: EventReader<VideoFrame>,
    mut landmarker: ResMut<Landmarker>,
    mut state: ResMut<BlendshapeState>,
) {
    for frame in frames.read() {
        let Some(result) = landmarker.detect_for_video(frame, frame.time) else {
            tracing::trace!("no detection for frame at {} (image: {})", frame.time, frame.image.is_some());
            continue;
        };

        match blendshapes_from_result(&result) {
            Some(blendshapes) => {
                let count = blendshapes.len();
                state.publish(blendshapes);
                tracing::trace!("published {} blendshapes, generation {}", count, state.generation());
            }
            None => tracing::trace!("no face in frame at {}", frame.time),
        }
    }
}
