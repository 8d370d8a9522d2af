//! Image shape for raster, GIF and video assets.

use super::crop::{
    ContainerStyle, Crop, CropError, compute_container_style, resolve_edge_crop_reset,
};
use super::{ShapeError, ShapeId, ShapePartial};
use crate::assets::{Asset, AssetId};
use crate::editor::Editor;
use crate::static_frame::StaticFrameCache;
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User preference for reduced motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionPreference {
    pub prefers_reduced_motion: bool,
}

impl MotionPreference {
    pub fn reduced() -> Self {
        Self {
            prefers_reduced_motion: true,
        }
    }

    /// Whether motion should be suppressed for this asset.
    pub fn reduces(&self, asset: &Asset) -> bool {
        self.prefers_reduced_motion && asset.is_motion_capable()
    }
}

/// What the presentation layer should draw for an image shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageView {
    /// No drawable source. `broken` is set when the asset is missing entirely,
    /// which shows the broken-asset icon and a border.
    Placeholder {
        size: Size,
        container: ContainerStyle,
        broken: bool,
        hyperlink: Option<String>,
    },
    Image {
        size: Size,
        container: ContainerStyle,
        /// Source to draw. `None` while a static frame is still being captured.
        src: Option<String>,
        /// Draw a faint copy of the full asset behind the crop window.
        crop_preview: bool,
        /// Show the "GIF" badge on a paused animation.
        gif_badge: bool,
        hyperlink: Option<String>,
    },
}

/// An image shape that displays an asset, optionally cropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageShape {
    pub(crate) id: ShapeId,
    /// Top-left corner position (the rotation origin).
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Rotation angle in radians around `position`.
    #[serde(default)]
    pub rotation: f64,
    pub asset_id: Option<AssetId>,
    /// Whether an animated asset is playing.
    #[serde(default = "default_playing")]
    pub playing: bool,
    /// Optional hyperlink.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub crop: Option<Crop>,
}

fn default_playing() -> bool {
    true
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::new(Point::ZERO, Size::new(Self::DEFAULT_SIZE, Self::DEFAULT_SIZE))
    }
}

impl ImageShape {
    pub const DEFAULT_SIZE: f64 = 100.0;

    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width: size.width,
            height: size.height,
            rotation: 0.0,
            asset_id: None,
            playing: true,
            url: String::new(),
            crop: None,
        }
    }

    pub fn with_asset(mut self, asset_id: AssetId) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Unrotated frame in canvas space.
    pub fn frame(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }

    /// Shape-local to canvas transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.position.to_vec2()) * Affine::rotate(self.rotation)
    }

    /// Axis-aligned bounds of the rotated frame.
    pub fn bounds(&self) -> Rect {
        if self.rotation.abs() < 0.001 {
            return self.frame();
        }
        self.transform()
            .transform_rect_bbox(Rect::from_origin_size(Point::ZERO, self.size()))
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.transform().inverse() * point;
        Rect::from_origin_size(Point::ZERO, self.size())
            .inflate(tolerance, tolerance)
            .contains(local)
    }

    pub fn is_aspect_ratio_locked(&self) -> bool {
        true
    }

    pub fn can_crop(&self) -> bool {
        true
    }

    pub fn container_style(&self) -> ContainerStyle {
        compute_container_style(self.size(), self.crop.as_ref())
    }

    fn hyperlink(&self) -> Option<String> {
        (!self.url.is_empty()).then(|| self.url.clone())
    }

    fn lookup_asset(&self, editor: &impl Editor) -> Option<Asset> {
        self.asset_id.and_then(|id| editor.asset(id))
    }

    /// Decide what to draw for this shape.
    ///
    /// Missing assets degrade to a placeholder; only a bookmark asset, which
    /// can never be drawn as an image, is an error.
    pub fn view(
        &self,
        editor: &impl Editor,
        statics: &StaticFrameCache,
        motion: MotionPreference,
    ) -> Result<ImageView, ShapeError> {
        let asset = self.lookup_asset(editor);
        if let Some(asset @ Asset::Bookmark(_)) = &asset {
            return Err(ShapeError::UnsupportedAsset { kind: asset.kind() });
        }

        let container = self.container_style();
        let hyperlink = self.hyperlink();

        let Some((asset, src)) = asset
            .as_ref()
            .and_then(|a| a.src().map(|src| (a, src.to_string())))
        else {
            return Ok(ImageView::Placeholder {
                size: self.size(),
                container,
                broken: asset.is_none(),
                hyperlink,
            });
        };

        let is_cropping = editor.cropping_shape_id() == Some(self.id);
        let is_only_selected = editor.only_selected_shape_id() == Some(self.id);
        let crop_preview = is_only_selected && is_cropping && editor.is_in_crop_interaction();

        let src = if !self.playing || motion.reduces(asset) {
            statics.static_src(asset.id()).map(str::to_string)
        } else {
            Some(src)
        };

        Ok(ImageView::Image {
            size: self.size(),
            container,
            src,
            crop_preview,
            gif_badge: asset.is_animated() && !self.playing,
            hyperlink,
        })
    }

    /// Selection outline in shape-local space, hidden while cropping.
    pub fn indicator(&self, editor: &impl Editor) -> Option<Rect> {
        if editor.cropping_shape_id() == Some(self.id) {
            return None;
        }
        Some(Rect::from_origin_size(Point::ZERO, self.size()))
    }

    /// Toggle playback of a GIF. Returns true if an update was submitted.
    pub fn on_double_click(&self, editor: &mut impl Editor) -> bool {
        let Some(asset) = self.lookup_asset(&*editor) else {
            return false;
        };
        if !asset.is_playable_gif() {
            return false;
        }
        editor.update_shapes(vec![ShapePartial::new(self.id).with_playing(!self.playing)]);
        true
    }

    /// Restore the full image when the crop edge is double-clicked.
    pub fn on_double_click_edge(&self, editor: &mut impl Editor) -> Result<(), CropError> {
        if editor.cropping_shape_id() != Some(self.id) {
            return Err(CropError::NotCropping(self.id));
        }
        let reset = resolve_edge_crop_reset(self)?;
        editor.update_shapes(vec![reset.to_partial(self.id)]);
        Ok(())
    }
}
