//! framecrop render library
//!
//! Static export of image shapes and first-frame capture for animated assets.
//! Geometry comes from `framecrop-core`; this crate adds the parts that touch
//! asset bytes.

pub mod capture;
pub mod export;
pub mod fetch;

pub use capture::{CaptureError, CapturedFrame, capture_first_frame, capture_into, run_capture};
pub use export::{ExportError, ExportOptions, ExportReport, ExportedImage, export_image, export_images};
pub use fetch::{AssetFetcher, BoxFuture, FetchError, FetchResult, FetchedAsset, MemoryFetcher};
