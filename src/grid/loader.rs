//! Two-pass catalog loading
//!
//! Records are `<path> <x> <y> <z>`, one per line. The first pass counts the
//! well-formed lines so the point vector can be sized exactly once; the
//! second pass populates it. Malformed lines are skipped and counted, never
//! fatal.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grid::point::Point;

/// Load all valid points from the catalog file at `path`
///
/// Returns an error if the file cannot be read or yields no valid points.
pub fn load_catalog(path: &Path) -> Result<Vec<Point>> {
    let mut file = File::open(path)?;

    // Pass 1: count valid records so the vector never grows after this.
    let mut valid = 0usize;
    for line in BufReader::new(&mut file).lines() {
        if Point::parse(&line?).is_ok() {
            valid += 1;
        }
    }

    file.seek(SeekFrom::Start(0))?;

    // Pass 2: populate.
    let mut points = Vec::with_capacity(valid);
    let mut skipped = 0usize;
    for line in BufReader::new(&mut file).lines() {
        let line = line?;
        match Point::parse(&line) {
            Ok(point) => {
                let pos = point.position();
                log::debug!(
                    "parsed point {} @ ({:.2}, {:.2}, {:.2})",
                    point.path().display(),
                    pos.x,
                    pos.y,
                    pos.z
                );
                points.push(point);
            }
            Err(err) => {
                skipped += 1;
                log::debug!("skipping malformed catalog line: {err}");
            }
        }
    }

    if points.is_empty() {
        return Err(Error::Catalog(format!(
            "{} contains no valid points",
            path.display()
        )));
    }

    if skipped > 0 {
        log::warn!(
            "skipped {skipped} malformed line(s) in {}",
            path.display()
        );
    }
    log::info!("loaded {} points from {}", points.len(), path.display());

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn write_catalog(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.txt");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_keeps_input_order() {
        let (_dir, path) = write_catalog(
            "img/a.jpg 0 0 0\n\
             img/b.jpg 1 0 0\n\
             img/c.jpg 5 0 0\n",
        );

        let points = load_catalog(&path).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].path(), Path::new("img/a.jpg"));
        assert_eq!(points[1].position(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(points[2].position(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let (_dir, path) = write_catalog(
            "img/a.jpg 0 0 0\n\
             \n\
             only-a-path\n\
             img/b.jpg 1 nope 0\n\
             img/c.jpg 2 0 0\n",
        );

        let points = load_catalog(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].path(), Path::new("img/a.jpg"));
        assert_eq!(points[1].path(), Path::new("img/c.jpg"));
    }

    #[test]
    fn test_load_empty_catalog_is_an_error() {
        let (_dir, path) = write_catalog("no coords here\n\n");
        assert!(matches!(load_catalog(&path), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_catalog(&dir.path().join("absent.txt"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
