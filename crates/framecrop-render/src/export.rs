//! Static export of image shapes.
//!
//! Exported documents must not depend on the network, so remote sources are
//! fetched and inlined first. A failed fetch only drops that one image.

use crate::fetch::{AssetFetcher, FetchError, inline_src};
use framecrop_core::shapes::to_export_geometry;
use framecrop_core::{Asset, AssetId, Editor, ExportGeometry, ImageShape, ShapeError, ShapeId};
use std::fmt::Write as _;
use thiserror::Error;

/// Why a single image could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("Failed to inline asset: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Export settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Fetch remote sources and embed them as data urls.
    pub inline_remote: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            inline_remote: true,
        }
    }
}

/// Export result for one shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedImage {
    /// Nothing to draw: no asset, or an asset without a source.
    Empty { shape_id: ShapeId },
    /// The asset exists but could not be exported.
    Unavailable {
        shape_id: ShapeId,
        asset_id: AssetId,
        reason: ExportError,
    },
    Image {
        shape_id: ShapeId,
        href: String,
        geometry: ExportGeometry,
    },
}

impl ExportedImage {
    pub fn shape_id(&self) -> ShapeId {
        match self {
            ExportedImage::Empty { shape_id }
            | ExportedImage::Unavailable { shape_id, .. }
            | ExportedImage::Image { shape_id, .. } => *shape_id,
        }
    }

    /// SVG fragment for this image, in shape-local coordinates.
    pub fn to_svg(&self) -> String {
        let ExportedImage::Image {
            shape_id,
            href,
            geometry,
        } = self
        else {
            return "<g/>".to_string();
        };

        let size = geometry.image_size;
        let mut svg = String::from("<g>");
        match geometry.clip_polygon {
            Some(points) => {
                let clip_id = format!("crop-{}", shape_id);
                let points = points
                    .iter()
                    .map(|p| format!("{},{}", p.x, p.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                let coeffs = geometry.image_transform.as_coeffs();
                let _ = write!(
                    svg,
                    r#"<defs><clipPath id="{clip_id}"><polygon points="{points}"/></clipPath></defs><g clip-path="url(#{clip_id})"><image href="{}" width="{}" height="{}" transform="translate({} {})"/></g>"#,
                    escape_attr(href),
                    size.width,
                    size.height,
                    coeffs[4],
                    coeffs[5],
                );
            }
            None => {
                let _ = write!(
                    svg,
                    r#"<image href="{}" width="{}" height="{}"/>"#,
                    escape_attr(href),
                    size.width,
                    size.height,
                );
            }
        }
        svg.push_str("</g>");
        svg
    }
}

/// Export results for a batch of shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub images: Vec<ExportedImage>,
}

impl ExportReport {
    /// Shapes whose asset could not be exported.
    pub fn unavailable(&self) -> impl Iterator<Item = (ShapeId, AssetId)> + '_ {
        self.images.iter().filter_map(|image| match image {
            ExportedImage::Unavailable {
                shape_id, asset_id, ..
            } => Some((*shape_id, *asset_id)),
            _ => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable().next().is_none()
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Export one image shape.
pub async fn export_image(
    shape: &ImageShape,
    editor: &impl Editor,
    fetcher: &impl AssetFetcher,
    options: ExportOptions,
) -> ExportedImage {
    let shape_id = shape.id();
    let Some(asset) = shape.asset_id.and_then(|id| editor.asset(id)) else {
        return ExportedImage::Empty { shape_id };
    };
    if let Asset::Bookmark(_) = asset {
        return ExportedImage::Unavailable {
            shape_id,
            asset_id: asset.id(),
            reason: ShapeError::UnsupportedAsset { kind: asset.kind() }.into(),
        };
    }
    let Some(src) = asset.src() else {
        return ExportedImage::Empty { shape_id };
    };

    let href = if options.inline_remote {
        match inline_src(fetcher, src).await {
            Ok(href) => href,
            Err(e) => {
                log::warn!("Skipping image {} in export: {}", shape_id, e);
                return ExportedImage::Unavailable {
                    shape_id,
                    asset_id: asset.id(),
                    reason: e.into(),
                };
            }
        }
    } else {
        src.to_string()
    };

    ExportedImage::Image {
        shape_id,
        href,
        geometry: to_export_geometry(shape),
    }
}

/// Export every shape; one failed asset never aborts the rest.
pub async fn export_images<'a>(
    shapes: impl IntoIterator<Item = &'a ImageShape>,
    editor: &impl Editor,
    fetcher: &impl AssetFetcher,
    options: ExportOptions,
) -> ExportReport {
    let mut report = ExportReport::default();
    for shape in shapes {
        report
            .images
            .push(export_image(shape, editor, fetcher, options).await);
    }
    log::debug!(
        "Exported {} images ({} unavailable)",
        report.images.len(),
        report.unavailable().count()
    );
    report
}
