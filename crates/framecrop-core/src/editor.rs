//! The editor seam: shape and asset records are owned elsewhere.
//!
//! Image shapes read assets and interaction state through [`Editor`] and
//! propose changes as [`ShapePartial`]s. The transactional and undo
//! semantics of applying them belong to the implementation.

use crate::assets::{Asset, AssetId};
use crate::shapes::{ImageShape, ShapeId, ShapePartial};
use std::collections::HashMap;

/// Operations the host editor provides to image shapes.
pub trait Editor {
    /// Resolve an asset. `None` means the asset is missing.
    fn asset(&self, id: AssetId) -> Option<Asset>;

    /// The shape currently in crop mode, if any.
    fn cropping_shape_id(&self) -> Option<ShapeId>;

    /// Whether a crop gesture (crop, cropping, pointing a crop handle) is active.
    fn is_in_crop_interaction(&self) -> bool;

    /// The selected shape when exactly one shape is selected.
    fn only_selected_shape_id(&self) -> Option<ShapeId>;

    /// Apply partial updates.
    fn update_shapes(&mut self, partials: Vec<ShapePartial>);
}

/// In-memory editor for testing and headless use.
#[derive(Debug, Default)]
pub struct MemoryEditor {
    shapes: HashMap<ShapeId, ImageShape>,
    assets: HashMap<AssetId, Asset>,
    cropping: Option<ShapeId>,
    crop_interaction: bool,
    only_selected: Option<ShapeId>,
    history: Vec<ShapePartial>,
}

impl MemoryEditor {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_shape(&mut self, shape: ImageShape) {
        self.shapes.insert(shape.id(), shape);
    }

    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.id(), asset);
    }

    pub fn remove_asset(&mut self, id: AssetId) -> Option<Asset> {
        self.assets.remove(&id)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&ImageShape> {
        self.shapes.get(&id)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ImageShape> {
        self.shapes.values()
    }

    pub fn set_cropping(&mut self, id: Option<ShapeId>) {
        self.cropping = id;
    }

    pub fn set_crop_interaction(&mut self, active: bool) {
        self.crop_interaction = active;
    }

    pub fn select_only(&mut self, id: Option<ShapeId>) {
        self.only_selected = id;
    }

    /// Every partial applied so far, oldest first.
    pub fn history(&self) -> &[ShapePartial] {
        &self.history
    }
}

impl Editor for MemoryEditor {
    fn asset(&self, id: AssetId) -> Option<Asset> {
        self.assets.get(&id).cloned()
    }

    fn cropping_shape_id(&self) -> Option<ShapeId> {
        self.cropping
    }

    fn is_in_crop_interaction(&self) -> bool {
        self.crop_interaction
    }

    fn only_selected_shape_id(&self) -> Option<ShapeId> {
        self.only_selected
    }

    fn update_shapes(&mut self, partials: Vec<ShapePartial>) {
        for partial in partials {
            match self.shapes.get_mut(&partial.id) {
                Some(shape) => {
                    partial.apply(shape);
                }
                None => log::warn!("Update for unknown shape {}", partial.id),
            }
            self.history.push(partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use uuid::Uuid;

    #[test]
    fn test_update_applies_and_records() {
        let mut editor = MemoryEditor::new();
        let shape = ImageShape::new(Point::ZERO, Size::new(10.0, 20.0));
        let id = shape.id();
        editor.insert_shape(shape);

        editor.update_shapes(vec![
            ShapePartial::new(id).with_size(Size::new(30.0, 40.0)),
            ShapePartial::new(Uuid::new_v4()).with_playing(false),
        ]);

        assert_eq!(editor.shape(id).unwrap().size(), Size::new(30.0, 40.0));
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.shapes().count(), 1);
    }

    #[test]
    fn test_missing_asset_lookup() {
        let editor = MemoryEditor::new();
        assert!(editor.asset(Uuid::new_v4()).is_none());
        assert!(editor.cropping_shape_id().is_none());
        assert!(!editor.is_in_crop_interaction());
    }
}
