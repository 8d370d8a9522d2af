//! Image shape definitions and their crop geometry.

mod crop;
mod image;

pub use crop::{
    CROP_EPSILON, ContainerStyle, Crop, CropError, CropReset, ExportGeometry,
    compute_container_style, resolve_edge_crop_reset, rotate_vec, to_export_geometry,
    true_asset_size,
};
pub use image::{ImageShape, ImageView, MotionPreference};

use crate::assets::AssetKind;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Shape errors caused by a caller breaking a contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{kind} assets can't be rendered as images")]
    UnsupportedAsset { kind: AssetKind },
}

/// Shape type tag carried by partial updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Image,
}

/// Prop changes carried by a [`ShapePartial`]. `None` leaves a prop untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePropsPartial {
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
}

/// A partial update submitted to the editor's update API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePartial {
    pub id: ShapeId,
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default)]
    pub props: ImagePropsPartial,
}

impl ShapePartial {
    /// Create an empty partial for an image shape.
    pub fn new(id: ShapeId) -> Self {
        Self {
            id,
            kind: ShapeKind::Image,
            x: None,
            y: None,
            props: ImagePropsPartial::default(),
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.x = Some(position.x);
        self.y = Some(position.y);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.props.width = Some(size.width);
        self.props.height = Some(size.height);
        self
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.props.crop = Some(crop);
        self
    }

    pub fn with_playing(mut self, playing: bool) -> Self {
        self.props.playing = Some(playing);
        self
    }

    /// Apply this partial to a shape. Returns false if the ids differ.
    pub fn apply(&self, shape: &mut ImageShape) -> bool {
        if shape.id() != self.id {
            log::warn!("Partial for {} applied to shape {}", self.id, shape.id());
            return false;
        }
        if let Some(x) = self.x {
            shape.position.x = x;
        }
        if let Some(y) = self.y {
            shape.position.y = y;
        }
        if let Some(width) = self.props.width {
            shape.width = width;
        }
        if let Some(height) = self.props.height {
            shape.height = height;
        }
        if let Some(crop) = self.props.crop {
            shape.crop = Some(crop);
        }
        if let Some(playing) = self.props.playing {
            shape.playing = playing;
        }
        true
    }
}
