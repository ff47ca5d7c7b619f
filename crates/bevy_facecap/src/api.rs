use std::sync::Arc;

use axum::{Json, Router};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::put;
use axum_extra::TypedHeader;
use bevy::prelude::{Assets, EventWriter, Image, Query, Res, ResMut, Resource, StandardMaterial};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bytes::Bytes;
use headers::ContentLength;
use tokio::sync::mpsc;

use facecap_api::{ApiError, FaceLandmarkerResult, FrameError, SetCameraRequest};

use crate::landmarker::RemoteLandmarker;
use crate::tracking::VideoFrame;
use crate::webcam::{WebcamPreview, WebcamTexture};

pub enum Command {
    SetFaces(FaceLandmarkerResult),
    SetCamera(SetCameraRequest),
}

pub struct ApiState {
    tx: mpsc::UnboundedSender<Command>,
}

impl ApiState {
    pub fn new(landmarker: RemoteLandmarker) -> (Arc<Self>, ApiResource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self {
            tx,
        }), ApiResource {
            rx,
            landmarker,
        })
    }

    fn send(&self, command: Command) -> Result<StatusCode, ApiError> {
        self.tx.send(command).map_err(|_| ApiError::unavailable())?;
        Ok(StatusCode::OK)
    }
}

fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &'static str) -> Result<Option<T>, FrameError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    value.to_str().ok()
        .and_then(|s| s.parse::<T>().ok())
        .map(Some)
        .ok_or(FrameError::InvalidHeader(name))
}

fn camera_request(headers: &HeaderMap, content_length: u64, payload: Bytes) -> Result<SetCameraRequest, FrameError> {
    let width = header::<u32>(headers, "width")?.ok_or(FrameError::MissingHeader("width"))?;
    let height = header::<u32>(headers, "height")?.ok_or(FrameError::MissingHeader("height"))?;
    let timestamp = header::<f64>(headers, "timestamp")?.unwrap_or(0.0);
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyFrame { width, height });
    }

    let expected = width as u64 * height as u64 * 4;
    if content_length != expected {
        return Err(FrameError::PayloadSize { expected, actual: content_length });
    }

    SetCameraRequest::new(width, height, timestamp, payload)
}

async fn put_camera(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    TypedHeader(ContentLength(content_length)): TypedHeader<ContentLength>,
    payload: Bytes,
) -> Result<StatusCode, ApiError> {
    let request = camera_request(&headers, content_length, payload)?;
    state.send(Command::SetCamera(request))
}

async fn put_faces(
    State(state): State<Arc<ApiState>>,
    Json(result): Json<FaceLandmarkerResult>,
) -> Result<StatusCode, ApiError> {
    state.send(Command::SetFaces(result))
}

pub fn new_api() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/v1/camera", put(put_camera))
        .route("/v1/faces", put(put_faces))
        .layer(DefaultBodyLimit::disable())
}

#[derive(Resource)]
pub struct ApiResource {
    rx: mpsc::UnboundedReceiver<Command>,
    landmarker: RemoteLandmarker,
}

pub fn update_api(
    mut api: ResMut<ApiResource>,
    webcam: Res<WebcamTexture>,
    previews: Query<&WebcamPreview>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut frames: EventWriter<VideoFrame>,
) {
    while let Ok(command) = api.rx.try_recv() {
        match command {
            Command::SetFaces(result) => {
                // Detection ran on the tracker's side, so the result stands
                // in for a frame.
                let time = result.timestamp_ms.unwrap_or(0.0);
                api.landmarker.submit(result);
                frames.send(VideoFrame { time, image: None });
            }
            Command::SetCamera(request) => {
                let size = Extent3d {
                    width: request.width,
                    height: request.height,
                    depth_or_array_layers: 1,
                };
                let image = Image::new(
                    size,
                    TextureDimension::D2,
                    request.payload.to_vec(),
                    TextureFormat::Rgba8UnormSrgb,
                    RenderAssetUsages::default(),
                );
                images.insert(&webcam.image, image);
                for preview in &previews {
                    materials.get_mut(&preview.material);
                }
                frames.send(VideoFrame {
                    time: request.timestamp,
                    image: Some(webcam.image.clone()),
                });
            }
        }
    }
}
