//! framecrop core library
//!
//! Platform-agnostic crop geometry, image shape behaviour and frame-budgeted
//! update scheduling for raster-image shapes on an infinite canvas.

pub mod assets;
pub mod cancellation;
pub mod editor;
pub mod scheduler;
pub mod shapes;
pub mod static_frame;

pub use assets::{Asset, AssetId, AssetKind, ImageFormat};
pub use cancellation::{CancellationSource, CancellationToken};
pub use editor::{Editor, MemoryEditor};
pub use scheduler::{
    Clock, FrameCallback, FrameScheduler, ManualClock, QueuedTicks, SchedulerConfig,
    SchedulerMode, SystemClock, Throttled, TickSource,
};
pub use shapes::{
    ContainerStyle, Crop, CropError, CropReset, ExportGeometry, ImageShape, ImageView,
    MotionPreference, ShapeError, ShapeId, ShapePartial,
};
pub use static_frame::{CaptureRequest, StaticFrame, StaticFrameCache};
