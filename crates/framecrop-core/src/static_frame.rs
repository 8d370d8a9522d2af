//! Per-shape cache of a motion asset's first frame.
//!
//! Paused or reduced-motion GIFs are drawn from a captured still. Capture runs
//! outside the cache (decoding lives in the render crate); the cache hands out
//! a [`CaptureRequest`] whenever the asset dependency changes and accepts the
//! result only if that request is still current.

use crate::assets::{Asset, AssetId};
use crate::cancellation::{CancelOnDrop, CancellationToken};

/// A captured still for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFrame {
    pub asset_id: AssetId,
    /// Data url of the still image.
    pub src: String,
}

/// Work order for capturing an asset's first frame.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub asset_id: AssetId,
    pub src: String,
    token: CancellationToken,
}

impl CaptureRequest {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the result of this request would be discarded.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct InFlight {
    asset_id: AssetId,
    guard: CancelOnDrop,
}

/// Static-frame state owned by one mounted image shape.
#[derive(Debug, Default)]
pub struct StaticFrameCache {
    dependency: Option<(AssetId, Option<String>)>,
    in_flight: Option<InFlight>,
    frame: Option<StaticFrame>,
}

impl StaticFrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the shape's current asset.
    ///
    /// When the asset (or its source) changed, any in-flight capture is
    /// cancelled and the cached still dropped. Returns a request if the new
    /// asset needs a still.
    pub fn sync(&mut self, asset: Option<&Asset>) -> Option<CaptureRequest> {
        let dependency = asset.map(|a| (a.id(), a.src().map(str::to_string)));
        if dependency == self.dependency {
            return None;
        }
        self.dependency = dependency;

        // Dropping the guard cancels the stale capture.
        self.in_flight = None;
        self.frame = None;

        let asset = asset?;
        let src = asset.src().filter(|_| asset.is_playable_gif())?;

        let guard = CancelOnDrop::new();
        let request = CaptureRequest {
            asset_id: asset.id(),
            src: src.to_string(),
            token: guard.token(),
        };
        self.in_flight = Some(InFlight {
            asset_id: asset.id(),
            guard,
        });
        log::debug!("Capturing static frame for asset {}", asset.id());
        Some(request)
    }

    /// Accept a capture result. Returns true if it was applied.
    pub fn complete<E: std::fmt::Display>(
        &mut self,
        request: &CaptureRequest,
        result: Result<String, E>,
    ) -> bool {
        let current = self.in_flight.as_ref().is_some_and(|f| {
            f.asset_id == request.asset_id && f.guard.token().same_source(request.token())
        });
        if request.is_cancelled() || !current {
            log::debug!("Discarding stale static frame for asset {}", request.asset_id);
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(src) => {
                self.frame = Some(StaticFrame {
                    asset_id: request.asset_id,
                    src,
                });
                true
            }
            Err(e) => {
                log::warn!("Static frame capture failed for asset {}: {}", request.asset_id, e);
                false
            }
        }
    }

    /// Release everything when the owning shape unmounts.
    pub fn teardown(&mut self) {
        self.dependency = None;
        self.in_flight = None;
        self.frame = None;
    }

    /// The captured still for `asset_id`, if any.
    pub fn static_src(&self, asset_id: AssetId) -> Option<&str> {
        self.frame
            .as_ref()
            .filter(|f| f.asset_id == asset_id)
            .map(|f| f.src.as_str())
    }

    pub fn is_capturing(&self) -> bool {
        self.in_flight.is_some()
    }
}
