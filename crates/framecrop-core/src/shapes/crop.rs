//! Crop geometry for image shapes.
//!
//! A crop is a normalized window onto the true (uncropped) asset. The shape's
//! frame shows only that window, so the true size is always
//! `frame / (bottom_right - top_left)`. Everything here is pure.

use super::image::ImageShape;
use super::{ShapeId, ShapePartial};
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest crop extent used as a divisor.
pub const CROP_EPSILON: f64 = 1e-6;

/// Crop errors signaled to the caller of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CropError {
    #[error("Shape has no crop to reset")]
    NoCrop,
    #[error("Shape {0} is not the shape being cropped")]
    NotCropping(ShapeId),
}

/// Normalized crop rectangle, relative to the true asset size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Default for Crop {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Crop {
    /// The uncropped window.
    pub const IDENTITY: Crop = Crop {
        top_left: Point::ZERO,
        bottom_right: Point::new(1.0, 1.0),
    };

    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Size of the window as a fraction of the asset, clamped to [`CROP_EPSILON`].
    ///
    /// Interactive drags can briefly produce empty or inverted windows; those
    /// are logged and clamped so downstream geometry stays finite.
    pub fn extent(&self) -> Vec2 {
        let raw = self.bottom_right - self.top_left;
        if !(raw.x > CROP_EPSILON && raw.y > CROP_EPSILON) {
            log::warn!(
                "Degenerate crop {:?} -> {:?}, clamping extent",
                self.top_left,
                self.bottom_right
            );
        }
        Vec2::new(raw.x.max(CROP_EPSILON), raw.y.max(CROP_EPSILON))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Size and placement of the element holding the full asset inside a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerStyle {
    pub width: f64,
    pub height: f64,
    /// Translation placing the crop window at the shape origin. Absent when uncropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Vec2>,
}

impl ContainerStyle {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The transform as an affine map (identity when uncropped).
    pub fn affine(&self) -> Affine {
        self.transform.map_or(Affine::IDENTITY, Affine::translate)
    }

    /// CSS form of the transform, e.g. `translate(-50px, -50px)`.
    pub fn css_transform(&self) -> Option<String> {
        self.transform
            .map(|t| format!("translate({}px, {}px)", t.x, t.y))
    }
}

/// True (uncropped) asset size recovered from the visible frame.
pub fn true_asset_size(frame: Size, crop: Option<&Crop>) -> Size {
    match crop {
        None => frame,
        Some(crop) => {
            let extent = crop.extent();
            Size::new(frame.width / extent.x, frame.height / extent.y)
        }
    }
}

/// Container style mapping the full asset into the cropped viewport.
pub fn compute_container_style(frame: Size, crop: Option<&Crop>) -> ContainerStyle {
    let Some(crop) = crop else {
        return ContainerStyle {
            width: frame.width,
            height: frame.height,
            transform: None,
        };
    };

    let true_size = true_asset_size(frame, Some(crop));
    let offset = Vec2::new(
        -crop.top_left.x * true_size.width,
        -crop.top_left.y * true_size.height,
    );
    ContainerStyle {
        width: true_size.width,
        height: true_size.height,
        transform: Some(offset),
    }
}

/// Rotate a vector by `angle` radians, the same way shapes rotate on the canvas.
pub fn rotate_vec(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Result of restoring the full image from a cropped shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropReset {
    /// Rotated offset subtracted from the shape position.
    pub delta: Vec2,
    pub position: Point,
    pub size: Size,
    pub crop: Crop,
}

impl CropReset {
    /// Package the reset as a single shape partial.
    pub fn to_partial(&self, id: ShapeId) -> ShapePartial {
        ShapePartial::new(id)
            .with_position(self.position)
            .with_size(self.size)
            .with_crop(self.crop)
    }
}

/// Resolve the frame change that shows the whole asset without moving it on screen.
///
/// The crop window's top-left sits at the shape origin; the uncropped asset's
/// top-left lies `top_left * true_size` before it in shape-local space, which
/// must be rotated into canvas space before it is applied to the position.
pub fn resolve_edge_crop_reset(shape: &ImageShape) -> Result<CropReset, CropError> {
    let crop = shape.crop.as_ref().ok_or(CropError::NoCrop)?;
    let true_size = true_asset_size(shape.size(), Some(crop));

    let local = Vec2::new(
        crop.top_left.x * true_size.width,
        crop.top_left.y * true_size.height,
    );
    let delta = rotate_vec(local, shape.rotation);

    Ok(CropReset {
        delta,
        position: shape.position - delta,
        size: true_size,
        crop: Crop::IDENTITY,
    })
}

/// Geometry needed to reproduce the interactive view in a static document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportGeometry {
    /// Clip rectangle in shape-local space; present only when cropped.
    pub clip_polygon: Option<[Point; 4]>,
    pub image_transform: Affine,
    pub image_size: Size,
}

/// Export geometry for a shape, consistent with [`compute_container_style`].
pub fn to_export_geometry(shape: &ImageShape) -> ExportGeometry {
    let crop = shape.crop.as_ref();
    let style = compute_container_style(shape.size(), crop);

    match (crop, style.transform) {
        (Some(crop), Some(_)) => {
            let extent = crop.extent();
            let cropped_w = extent.x * style.width;
            let cropped_h = extent.y * style.height;
            ExportGeometry {
                clip_polygon: Some([
                    Point::new(0.0, 0.0),
                    Point::new(cropped_w, 0.0),
                    Point::new(cropped_w, cropped_h),
                    Point::new(0.0, cropped_h),
                ]),
                image_transform: style.affine(),
                image_size: style.size(),
            }
        }
        _ => ExportGeometry {
            clip_polygon: None,
            image_transform: Affine::IDENTITY,
            image_size: shape.size(),
        },
    }
}
