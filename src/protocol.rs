//! Line-delimited JSON messages exchanged with the controlling process.
//!
//! One request object per input line, one response object per output line.

use crate::depth::{BoundingBox, RegionDepth};
use crate::error::DepthError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Incoming command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Request {
    Process {
        image_path: PathBuf,
        /// `[x, y, w, h]` in image pixels; fractional values are truncated
        #[serde(default)]
        bounding_boxes: Option<Vec<[f64; 4]>>,
    },
    Ping,
    Exit,
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, DepthError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Convert wire boxes to pixel boxes, truncating toward zero
pub fn boxes_from_wire(boxes: &[[f64; 4]]) -> Vec<BoundingBox> {
    boxes
        .iter()
        .map(|&[x, y, w, h]| BoundingBox::new(x as i64, y as i64, w as i64, h as i64))
        .collect()
}

/// Result of one successful pipeline pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthReport {
    pub focal_length_px: f64,
    /// `[height, width]` of the depth map, equal to the input image
    pub depth_map_shape: [usize; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<RegionDepth>>,
}

/// Outgoing message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success(DepthReport),
    Error { error: String },
    Ok,
}

impl Response {
    pub fn error(error: impl Into<String>) -> Self {
        Response::Error {
            error: error.into(),
        }
    }
}
