//! Background decode and eviction of waypoint images

pub mod worker;

pub use worker::WorkerPool;

use std::path::Path;
use std::sync::Arc;

use crate::core::types::Result;
use crate::grid::{CacheConfig, Grid};

/// Load a catalog and start its worker pool in one call
///
/// Convenience wiring for the common startup sequence; the pieces remain
/// usable separately (e.g. [`Grid::single`] needs no pool at all).
pub fn start(catalog: &Path, config: CacheConfig) -> Result<(Arc<Grid>, WorkerPool)> {
    let grid = Arc::new(Grid::load(catalog, config.resident_limit)?);
    let pool = WorkerPool::spawn(grid.clone(), config.workers);
    Ok((grid, pool))
}
