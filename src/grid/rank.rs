//! Distance ranking of waypoints
//!
//! Ranks order every point by squared distance from the viewer: rank 0 is
//! the nearest point, rank n-1 the farthest. Workers compare ranks against
//! the resident budget to decide what to decode and what to evict.

use glam::Vec3;

use crate::grid::Grid;

impl Grid {
    /// Re-rank every point by distance from `viewer`
    ///
    /// Skips all work when the viewer has not moved since the previous call
    /// (exact float equality, a cache key rather than a threshold).
    /// Otherwise assigns each point its position in ascending
    /// squared-distance order, updates the nearest index, and broadcasts the
    /// grid event so workers re-evaluate. Exactly-equal distances keep
    /// catalog order.
    pub fn rank(&self, viewer: Vec3) {
        {
            let shared = self.shared.lock().unwrap();
            if shared.last_ranked == Some(viewer) {
                return;
            }
        }

        // Distance computation and sort stay outside the grid mutex; only
        // the O(n) publication below holds it.
        let mut order: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| (index, point.position().distance_squared(viewer)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut shared = self.shared.lock().unwrap();
        for (rank, &(index, _)) in order.iter().enumerate() {
            self.points[index].set_rank(rank);
        }
        if let Some(&(nearest, _)) = order.first() {
            shared.nearest = nearest;
        }
        shared.last_ranked = Some(viewer);
        shared.epoch = shared.epoch.wrapping_add(1);
        self.event.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::point::Point;
    use std::path::PathBuf;

    fn grid_at(positions: &[Vec3]) -> Grid {
        let points = positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| Point::new(PathBuf::from(format!("img/{i}.png")), pos))
            .collect();
        Grid::new(points, 2)
    }

    fn ranks(grid: &Grid) -> Vec<usize> {
        grid.points().iter().map(|p| p.rank()).collect()
    }

    #[test]
    fn test_ranks_are_a_permutation() {
        let grid = grid_at(&[
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(10.0, 10.0, 10.0),
        ]);

        grid.rank(Vec3::ZERO);

        let mut assigned = ranks(&grid);
        assigned.sort_unstable();
        assert_eq!(assigned, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_nearest_index_tracks_rank_zero() {
        let grid = grid_at(&[
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
        ]);

        grid.rank(Vec3::ZERO);

        assert_eq!(grid.nearest_index(), 1);
        assert_eq!(grid.point(1).rank(), 0);
    }

    #[test]
    fn test_ranks_follow_the_viewer() {
        let grid = grid_at(&[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
        ]);

        grid.rank(Vec3::ZERO);
        assert_eq!(ranks(&grid), vec![0, 1, 2]);

        grid.rank(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(ranks(&grid), vec![2, 1, 0]);
        assert_eq!(grid.nearest_index(), 2);
    }

    #[test]
    fn test_ranking_twice_at_same_position_is_skipped() {
        let grid = grid_at(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
        let viewer = Vec3::new(0.25, 0.0, 0.0);

        grid.rank(viewer);
        let first = ranks(&grid);
        let epoch = grid.event_epoch();

        grid.rank(viewer);
        assert_eq!(ranks(&grid), first);
        // No event was raised for the skipped pass.
        assert_eq!(grid.event_epoch(), epoch);
    }

    #[test]
    fn test_equal_distances_keep_catalog_order() {
        let grid = grid_at(&[
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);

        grid.rank(Vec3::ZERO);

        assert_eq!(ranks(&grid), vec![0, 1, 2]);
        assert_eq!(grid.nearest_index(), 0);
    }

    #[test]
    fn test_reranking_after_moving_back() {
        let grid = grid_at(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]);

        grid.rank(Vec3::ZERO);
        grid.rank(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(grid.nearest_index(), 1);

        grid.rank(Vec3::ZERO);
        assert_eq!(grid.nearest_index(), 0);
        assert_eq!(ranks(&grid), vec![0, 1]);
    }
}
