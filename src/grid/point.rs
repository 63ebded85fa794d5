//! Waypoints and their decoded-image slots
//!
//! A [`Point`] pairs a fixed 3-D position with the path of a panoramic image
//! and a slot that may or may not hold the decoded pixels at any given
//! moment. The slot is guarded by the point's own mutex so that decoding one
//! point never contends with evicting another; the condition variable wakes
//! anyone blocked on the slot leaving [`Slot::Absent`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, TryLockError};

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::core::error::Error;
use crate::core::types::Result;

/// Rank sentinel for a point that has not been ranked yet
pub const UNRANKED: usize = usize::MAX;

/// Error from parsing a single catalog record
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("record has fewer than four fields")]
    TooFewFields,
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] std::num::ParseFloatError),
}

/// Decoded 24-bit RGB image, tightly packed, top row first
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Decode the image file at `path` to RGB8
    ///
    /// Any format the `image` crate recognizes is accepted; the result is
    /// always converted to tightly packed RGB.
    pub fn decode(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let rgb = decoded.into_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                reason: "zero-area image".to_string(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: rgb.into_raw(),
        })
    }
}

/// Contents of a point's image slot
#[derive(Debug)]
pub(crate) enum Slot {
    /// No decoded image resident
    Absent,
    /// Decoded image resident in memory
    Present(ImageData),
    /// Decode failed; terminal for this run
    Errored(String),
}

/// One waypoint of the grid
///
/// Created by the catalog loader and never moved afterwards; workers and the
/// accessor address it by index into the grid's point sequence.
pub struct Point {
    path: PathBuf,
    position: Vec3,
    orientation: Quat,
    rank: AtomicUsize,
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl Point {
    /// Create a point with an empty slot and no rank
    pub fn new(path: PathBuf, position: Vec3) -> Self {
        Self {
            path,
            position,
            // Identity until per-point rotation is wired through the catalog
            orientation: Quat::IDENTITY,
            rank: AtomicUsize::new(UNRANKED),
            slot: Mutex::new(Slot::Absent),
            ready: Condvar::new(),
        }
    }

    /// Parse a catalog record of the form `<path> <x> <y> <z>`
    ///
    /// Fields are whitespace-delimited; anything past the fourth field is
    /// ignored. Records with fewer than four fields or with coordinates that
    /// fail to parse are rejected.
    pub fn parse(line: &str) -> std::result::Result<Self, ParseError> {
        let mut fields = line.split_whitespace();
        let path = fields.next().ok_or(ParseError::TooFewFields)?;

        let mut coords = [0.0f32; 3];
        for coord in &mut coords {
            *coord = fields.next().ok_or(ParseError::TooFewFields)?.parse()?;
        }

        Ok(Self::new(PathBuf::from(path), Vec3::from_array(coords)))
    }

    /// Get the image file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the waypoint position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the waypoint orientation (identity for now)
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Get the current distance rank, or [`UNRANKED`]
    ///
    /// Relaxed load: a reader may observe a rank that is one ranking pass
    /// stale, which only delays a load/evict decision by one scan cycle.
    pub fn rank(&self) -> usize {
        self.rank.load(Ordering::Relaxed)
    }

    pub(crate) fn set_rank(&self, rank: usize) {
        self.rank.store(rank, Ordering::Relaxed);
    }

    /// Check whether a decoded image is currently resident
    pub fn is_resident(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Present(_))
    }

    /// Check whether this point's decode has failed
    pub fn is_errored(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Errored(_))
    }

    /// Drop the decoded image, keeping path and position intact
    pub fn release(&self) {
        *self.lock_slot() = Slot::Absent;
    }

    pub(crate) fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap()
    }

    /// Non-blocking slot acquisition; `None` means another thread holds it
    pub(crate) fn try_lock_slot(&self) -> Option<MutexGuard<'_, Slot>> {
        match self.slot.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(e)) => panic!("point slot lock poisoned: {e}"),
        }
    }

    pub(crate) fn wait_ready<'a>(&self, guard: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        self.ready.wait(guard).unwrap()
    }

    pub(crate) fn notify_ready(&self) {
        self.ready.notify_all();
    }

    /// Install a decoded image before the point is shared across threads
    pub(crate) fn install_image(&mut self, image: ImageData) {
        *self.slot.get_mut().unwrap() = Slot::Present(image);
    }
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Point")
            .field("path", &self.path)
            .field("position", &self.position)
            .field("rank", &self.rank())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_record() {
        let point = Point::parse("img/north.jpg 1.5 -2.0 3.25").unwrap();

        assert_eq!(point.path(), Path::new("img/north.jpg"));
        assert_eq!(point.position(), Vec3::new(1.5, -2.0, 3.25));
        assert_eq!(point.orientation(), Quat::IDENTITY);
        assert_eq!(point.rank(), UNRANKED);
        assert!(!point.is_resident());
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let point = Point::parse("img/a.jpg 0 0 0 trailing junk").unwrap();
        assert_eq!(point.position(), Vec3::ZERO);
    }

    #[test]
    fn test_parse_too_few_fields() {
        assert!(matches!(
            Point::parse("img/a.jpg 1.0 2.0"),
            Err(ParseError::TooFewFields)
        ));
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(matches!(Point::parse(""), Err(ParseError::TooFewFields)));
        assert!(matches!(Point::parse("   "), Err(ParseError::TooFewFields)));
    }

    #[test]
    fn test_parse_bad_coordinate() {
        assert!(matches!(
            Point::parse("img/a.jpg 1.0 north 3.0"),
            Err(ParseError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_decode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pano.png");
        image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let first = ImageData::decode(&path).unwrap();
        assert_eq!((first.width, first.height), (4, 2));
        assert_eq!(first.pixels.len(), 4 * 2 * 3);
        assert_eq!(&first.pixels[..3], &[10, 20, 30]);

        // Decode, release, decode again: a stable file yields stable
        // dimensions.
        let point = Point::new(path.clone(), Vec3::ZERO);
        *point.lock_slot() = Slot::Present(first.clone());
        point.release();

        let second = ImageData::decode(&path).unwrap();
        assert_eq!((second.width, second.height), (first.width, first.height));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageData::decode(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_decode_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        assert!(ImageData::decode(&path).is_err());
    }

    #[test]
    fn test_release_clears_slot() {
        let point = Point::new(PathBuf::from("img/a.jpg"), Vec3::ZERO);
        *point.lock_slot() = Slot::Present(ImageData {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0],
        });
        assert!(point.is_resident());

        point.release();
        assert!(!point.is_resident());
        assert_eq!(point.path(), Path::new("img/a.jpg"));
        assert_eq!(point.position(), Vec3::ZERO);
    }
}
