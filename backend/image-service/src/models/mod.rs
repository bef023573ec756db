/// Data models for image-service
///
/// This module defines structures for:
/// - Image: persisted upload metadata and processing status
/// - Action: the closed set of transformations a client can request
/// - TaskMessage: the unit of work published to Kafka
///
use crate::error::AppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ========================================
// Actions
// ========================================

/// Named transformation applied by the worker pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Resize,
    #[serde(alias = "Miniature_generate")]
    Miniature,
    Watermark,
    Grayscale,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resize => "Resize",
            Self::Miniature => "Miniature",
            Self::Watermark => "Watermark",
            Self::Grayscale => "Grayscale",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Resize" => Ok(Self::Resize),
            "Miniature" | "Miniature_generate" => Ok(Self::Miniature),
            "Watermark" => Ok(Self::Watermark),
            "Grayscale" => Ok(Self::Grayscale),
            other => Err(AppError::UnknownAction(other.to_string())),
        }
    }
}

/// Parse the comma-separated `actions` form field.
///
/// Segments are trimmed, empty and unrecognised names are dropped, and an
/// empty result falls back to `[Resize]`.
pub fn parse_action_list(raw: &str) -> Vec<Action> {
    let actions: Vec<Action> = raw
        .split(',')
        .map(|segment| segment.trim_matches(|c: char| c.is_ascii_whitespace()))
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.parse().ok())
        .collect();

    if actions.is_empty() {
        vec![Action::Resize]
    } else {
        actions
    }
}

// ========================================
// Image Models
// ========================================

/// Processing status of an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStatus {
    Pending,
    Done,
    Failed,
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Done" => Some(Self::Done),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Image metadata record, one per upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub filename: String,
    pub file_size: i64,
    #[serde(rename = "raw_image_id")]
    pub raw_object_key: String,
    #[serde(rename = "processed_image_id", default, skip_serializing_if = "String::is_empty")]
    pub processed_object_key: String,
    #[serde(rename = "action")]
    pub actions: Vec<Action>,
    pub status: ImageStatus,
}

/// Raw key layout: `raw/<image_id>/<uuid>`
pub fn raw_object_key(image_id: &str) -> String {
    format!("raw/{}/{}", image_id, uuid::Uuid::new_v4())
}

/// Processed key layout: `processed/<image_id>/<uuid>_<unix-seconds>.jpg`
pub fn processed_object_key(image_id: &str) -> String {
    format!(
        "processed/{}/{}_{}.jpg",
        image_id,
        uuid::Uuid::new_v4(),
        Utc::now().timestamp()
    )
}

// ========================================
// Task Message
// ========================================

/// Task published to Kafka for every accepted upload.
///
/// Actions travel as plain strings so an unknown name reaches the pipeline
/// and fails there instead of at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub image_id: String,
    pub actions: Vec<String>,
    pub timestamp: i64,
}

impl TaskMessage {
    pub fn new(image_id: &str, actions: &[Action]) -> Self {
        Self {
            image_id: image_id.to_string(),
            actions: actions.iter().map(|a| a.as_str().to_string()).collect(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

// ========================================
// API Responses
// ========================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub status: ImageStatus,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
