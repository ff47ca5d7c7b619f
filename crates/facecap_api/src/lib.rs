use std::borrow::Cow;

use axum::http::StatusCode;
use axum::Json;
use axum::response::{IntoResponse, Response};

use bytes::Bytes;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Cancelled,
    InvalidArgument,
}

impl ErrorCategory {
    pub fn to_status_code(self) -> StatusCode {
        match self {
            ErrorCategory::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::InvalidArgument => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub category: ErrorCategory,
    pub error_code: Cow<'static, str>,
    pub instance_id: String,
    pub message: Cow<'static, str>,
}

impl ApiError {
    pub fn with_message(
        category: ErrorCategory,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            category,
            error_code: code.into(),
            instance_id: nanoid::nanoid!(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_message(ErrorCategory::InvalidArgument, "invalidArgument", message)
    }

    pub fn unavailable() -> Self {
        Self::with_message(ErrorCategory::Cancelled, "unavailable", "service unavailable")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.category.to_status_code();
        (status_code, Json(self)).into_response()
    }
}

/// Rejections for a raw camera frame upload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),
    #[error("empty frame: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
    #[error("invalid payload size: expected {expected} bytes, got {actual}")]
    PayloadSize { expected: u64, actual: u64 },
}

impl From<FrameError> for ApiError {
    fn from(value: FrameError) -> Self {
        ApiError::invalid_argument(value.to_string())
    }
}

/// A single blendshape score as emitted by the face landmarker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_name: String,
    pub score: f32,
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The blendshape categories for one detected face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifications {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub head_index: Option<i32>,
    #[serde(default)]
    pub head_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
    #[serde(default)]
    pub presence: Option<f32>,
}

impl NormalizedLandmark {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Output of one face landmarker invocation, in the camel-case JSON layout
/// produced by MediaPipe's web and python bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarkerResult {
    #[serde(default)]
    pub face_blendshapes: Vec<Classifications>,
    #[serde(default)]
    pub face_landmarks: Vec<Vec<NormalizedLandmark>>,
    #[serde(default)]
    pub timestamp_ms: Option<f64>,
}

impl FaceLandmarkerResult {
    /// Blendshape categories of the first detected face, if there is one.
    pub fn first_face_categories(&self) -> Option<&[Category]> {
        self.face_blendshapes.first().map(|face| face.categories.as_slice())
    }
}

#[derive(Debug, Clone)]
pub struct SetCameraRequest {
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
    pub payload: Bytes,
}

impl SetCameraRequest {
    /// Builds an RGBA8 frame request, checking the payload matches the
    /// advertised dimensions.
    pub fn new(width: u32, height: u32, timestamp: f64, payload: Bytes) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyFrame { width, height });
        }

        let expected = width as u64 * height as u64 * 4;
        let actual = payload.len() as u64;
        if expected != actual {
            return Err(FrameError::PayloadSize { expected, actual });
        }

        Ok(Self {
            width,
            height,
            timestamp,
            payload,
        })
    }
}
