//! Blocking access to the nearest point's image
//!
//! The renderer's side of the cache: fetch the decoded pixels of the point
//! ranked 0, sleeping on the point's condition variable until a worker has
//! produced them. The returned guard keeps the point's mutex held, so the
//! buffer cannot be evicted while a texture upload is still reading it.

use std::sync::MutexGuard;
use std::time::Instant;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grid::Grid;
use crate::grid::point::{ImageData, Slot};

/// Locked, read-only view of the nearest point's decoded image
///
/// Holds the point's mutex for its lifetime; workers skip the point until
/// this is dropped.
#[derive(Debug)]
pub struct CurrentImage<'a> {
    guard: MutexGuard<'a, Slot>,
    index: usize,
}

impl CurrentImage<'_> {
    /// Catalog index of the point this image belongs to
    ///
    /// Compare against the previously bound index to decide whether a
    /// re-upload is needed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The decoded image
    pub fn image(&self) -> &ImageData {
        match &*self.guard {
            Slot::Present(image) => image,
            _ => unreachable!("guard is only constructed from a present slot"),
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.image().width
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.image().height
    }

    /// Tightly packed RGB8 pixels, top row first
    pub fn pixels(&self) -> &[u8] {
        &self.image().pixels
    }
}

impl Grid {
    /// Fetch the decoded image of the nearest point, blocking until ready
    ///
    /// Blocks only while the image is absent, which requires at least one
    /// worker to be running for progress; once ranked 0 the point is in
    /// every worker's near set. A point whose decode failed yields
    /// [`Error::Unavailable`] instead of blocking forever. The wait counter
    /// moves only when this call actually slept.
    pub fn current_image(&self) -> Result<CurrentImage<'_>> {
        let index = self.nearest_index();
        let point = self.point(index);

        let mut slot = point.lock_slot();
        let mut wait_start = None;
        loop {
            match &*slot {
                Slot::Present(_) => break,
                Slot::Errored(reason) => {
                    return Err(Error::Unavailable {
                        index,
                        reason: reason.clone(),
                    });
                }
                Slot::Absent => {
                    if wait_start.is_none() {
                        log::info!("image {} is not ready, waiting", point.path().display());
                        wait_start = Some(Instant::now());
                    }
                    slot = point.wait_ready(slot);
                }
            }
        }

        if let Some(start) = wait_start {
            self.metrics().record_wait(start.elapsed());
        }

        Ok(CurrentImage { guard: slot, index })
    }
}
