//! The waypoint catalog and its shared coordination state
//!
//! A [`Grid`] owns every [`Point`] and the decoded buffers behind them.
//! Workers and the renderer share it through `Arc<Grid>`; nothing in the
//! crate keeps global state. The grid-level mutex guards only cross-cutting
//! data (nearest index, last ranked position, event epoch) and is never held
//! across a decode or eviction.

pub mod loader;
pub mod metrics;
pub mod point;
pub mod rank;
pub mod view;

pub use loader::load_catalog;
pub use metrics::{GridMetrics, MetricsSnapshot, write_report};
pub use point::{ImageData, ParseError, Point, UNRANKED};
pub use view::CurrentImage;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use glam::Vec3;

use crate::core::types::Result;

/// Caller-supplied cache parameters
///
/// Both values are deployment decisions; the crate provides no defaults.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    /// Maximum number of points allowed to hold a decoded image at once
    pub resident_limit: usize,
    /// Number of background decode/evict workers
    pub workers: usize,
}

/// Cross-cutting state guarded by the grid mutex
struct Shared {
    /// Index of the rank-0 point after the latest ranking pass
    nearest: usize,
    /// Viewer position of the latest ranking pass, `None` before the first
    last_ranked: Option<Vec3>,
    /// Bumped on every grid event: rank change, transition, shutdown
    epoch: u64,
}

/// The catalog plus shared coordination state
pub struct Grid {
    points: Vec<Point>,
    /// Resident-set budget; zero doubles as the shutdown signal
    resident_limit: AtomicUsize,
    shared: Mutex<Shared>,
    event: Condvar,
    metrics: GridMetrics,
}

impl Grid {
    /// Build a grid from an already-parsed point sequence
    pub fn new(points: Vec<Point>, resident_limit: usize) -> Self {
        Self {
            points,
            resident_limit: AtomicUsize::new(resident_limit),
            shared: Mutex::new(Shared {
                nearest: 0,
                last_ranked: None,
                epoch: 0,
            }),
            event: Condvar::new(),
            metrics: GridMetrics::new(),
        }
    }

    /// Load a grid from a catalog file
    pub fn load(catalog: &Path, resident_limit: usize) -> Result<Self> {
        Ok(Self::new(loader::load_catalog(catalog)?, resident_limit))
    }

    /// Build a one-point grid around a single image, decoded eagerly
    ///
    /// The point sits at the origin with rank 0 pre-assigned, so the image
    /// can be fetched without ranking or running any workers.
    pub fn single(image: &Path, resident_limit: usize) -> Result<Self> {
        let mut point = Point::new(image.to_path_buf(), Vec3::ZERO);
        point.install_image(ImageData::decode(image)?);
        point.set_rank(0);
        Ok(Self::new(vec![point], resident_limit))
    }

    /// Number of points in the catalog
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points, in catalog order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// A single point by catalog index
    pub fn point(&self, index: usize) -> &Point {
        &self.points[index]
    }

    /// Current resident-set budget; zero means shutdown was requested
    pub fn resident_limit(&self) -> usize {
        self.resident_limit.load(Ordering::Relaxed)
    }

    /// Index of the nearest point after the latest ranking pass
    pub fn nearest_index(&self) -> usize {
        self.shared.lock().unwrap().nearest
    }

    /// Cache metrics counters
    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    /// Number of points currently holding a decoded image
    pub fn resident_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_resident()).count()
    }

    /// Request shutdown: zero the budget and wake everything
    ///
    /// Workers observe the zero budget at the top of their next pass and
    /// exit. Safe to call more than once.
    pub fn shutdown(&self) {
        self.resident_limit.store(0, Ordering::Relaxed);
        self.signal_event();
    }

    /// Broadcast a grid event, waking all waiting workers
    pub(crate) fn signal_event(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.epoch = shared.epoch.wrapping_add(1);
        self.event.notify_all();
    }

    /// Snapshot the event epoch; pass the value to [`wait_event`](Self::wait_event)
    pub(crate) fn event_epoch(&self) -> u64 {
        self.shared.lock().unwrap().epoch
    }

    /// Block until the epoch moves past `seen` or shutdown is requested
    ///
    /// A signal raised between the epoch snapshot and this call is observed
    /// through the changed epoch, so it cannot be lost.
    pub(crate) fn wait_event(&self, seen: u64) {
        let mut shared = self.shared.lock().unwrap();
        while shared.epoch == seen && self.resident_limit.load(Ordering::Relaxed) != 0 {
            shared = self.event.wait(shared).unwrap();
        }
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("points", &self.points.len())
            .field("resident_limit", &self.resident_limit())
            .finish()
    }
}
