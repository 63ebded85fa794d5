//! Prefetch/eviction worker pool
//!
//! Each worker repeatedly sweeps the whole catalog with non-blocking lock
//! attempts: a near point without pixels is decoded, a far point with pixels
//! is evicted, everything else is left alone. A point locked by a peer or by
//! the accessor is simply skipped until the next pass. After a pass with no
//! transitions and no contended skips the worker sleeps on the grid event
//! channel; a pass that had to skip a locked point re-runs after a yield,
//! since the skipped point may still need work and nobody is obliged to
//! signal for it. A zero resident budget ends the loop.
//!
//! There is no ordering between workers. Two of them may race to decode
//! different near points while a far one still awaits eviction; convergence
//! of the resident set only needs repeated sweeps, not transition order.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::grid::Grid;
use crate::grid::point::{ImageData, Slot};

/// Fixed set of background worker threads driving the resident set
pub struct WorkerPool {
    grid: Arc<Grid>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` threads scanning `grid`
    pub fn spawn(grid: Arc<Grid>, workers: usize) -> Self {
        let handles = (0..workers)
            .map(|index| {
                let grid = Arc::clone(&grid);
                thread::Builder::new()
                    .name(format!("pano-worker-{index}"))
                    .spawn(move || worker_loop(&grid))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { grid, handles }
    }

    /// Number of worker threads still owned by the pool
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check whether the pool has been shut down
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Zero the resident budget, wake every worker, and join them all
    ///
    /// Idempotent; also runs on drop if the caller never got here.
    pub fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        self.grid.shutdown();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("image worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(grid: &Grid) {
    loop {
        let limit = grid.resident_limit();
        if limit == 0 {
            break;
        }

        let epoch = grid.event_epoch();
        let (transitions, skipped) = scan_pass(grid, limit);
        if transitions > 0 {
            grid.signal_event();
        } else if skipped > 0 {
            // A contended point may still need work once its holder lets
            // go, and that holder will not raise a grid event. Rescan.
            thread::yield_now();
        } else {
            // Quiescent pass: sleep until a rank change, a peer's
            // transition, or shutdown moves the epoch past our snapshot.
            grid.wait_event(epoch);
        }
    }

    log::debug!("worker exiting");
}

/// One full trylock-and-skip sweep over the catalog
///
/// Returns the number of state transitions made and the number of points
/// skipped because someone else held their lock. Decoding happens while the
/// point's slot is held, so an accessor blocked on the same point wakes with
/// the pixels already in place.
fn scan_pass(grid: &Grid, limit: usize) -> (usize, usize) {
    let mut transitions = 0;
    let mut skipped = 0;

    for point in grid.points() {
        let Some(mut slot) = point.try_lock_slot() else {
            skipped += 1;
            continue;
        };
        let rank = point.rank();

        match &*slot {
            Slot::Absent if rank < limit => {
                match ImageData::decode(point.path()) {
                    Ok(image) => {
                        log::debug!(
                            "decoded {} ({}x{})",
                            point.path().display(),
                            image.width,
                            image.height
                        );
                        *slot = Slot::Present(image);
                        grid.metrics().record_decode();
                    }
                    Err(err) => {
                        log::error!("failed to decode {}: {err}", point.path().display());
                        *slot = Slot::Errored(err.to_string());
                        grid.metrics().record_decode_failure();
                    }
                }
                point.notify_ready();
                transitions += 1;
            }
            Slot::Present(_) if rank >= limit => {
                log::debug!("evicted {}", point.path().display());
                *slot = Slot::Absent;
                grid.metrics().record_eviction();
                transitions += 1;
            }
            _ => {}
        }
    }

    (transitions, skipped)
}
