//! Index and UV helpers shared by every surface kind.

use crate::bounds::UvBounds;
use glam::Vec2;

/// Linear index of `(x, y)` in a row-major grid `width` wide.
pub fn index_of(x: usize, y: usize, width: usize) -> usize {
    y * width + x
}

/// Inverse of [`index_of`].
pub fn coords_of(index: usize, width: usize) -> (usize, usize) {
    (index % width, index / width)
}

/// Number of indices [`triangle_grid_indices`] emits for a `width × height` grid.
pub fn triangle_index_count(width: usize, height: usize) -> usize {
    6 * width.saturating_sub(1) * height.saturating_sub(1)
}

/// Two triangles per grid quad: `[tl, bl, br]` and `[br, tr, tl]`.
pub fn triangle_grid_indices(width: usize, height: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(triangle_index_count(width, height));
    for y in 0..height.saturating_sub(1) {
        for x in 0..width.saturating_sub(1) {
            let top_left = index_of(x, y, width) as u32;
            let top_right = index_of(x + 1, y, width) as u32;
            let bottom_left = index_of(x, y + 1, width) as u32;
            let bottom_right = index_of(x + 1, y + 1, width) as u32;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                bottom_right,
                bottom_right,
                top_right,
                top_left,
            ]);
        }
    }
    indices
}

/// UV of grid point `(x, y)` mapped into `bounds`. Row 0 gets `v_max`.
pub fn grid_uv(x: usize, y: usize, width: usize, height: usize, bounds: &UvBounds) -> Vec2 {
    let u = if width > 1 { x as f32 / (width - 1) as f32 } else { 0.0 };
    let v = if height > 1 { 1.0 - y as f32 / (height - 1) as f32 } else { 1.0 };
    Vec2::new(
        bounds.u_min + u * bounds.width(),
        bounds.v_min + v * bounds.height(),
    )
}

/// The closed border loop of a grid: top row, right column, bottom row
/// reversed and left column reversed. The last entry repeats the first.
pub fn border_loop(width: usize, height: usize) -> Vec<usize> {
    if width < 2 || height < 2 {
        return Vec::new();
    }

    let mut ring = Vec::with_capacity(2 * width + 2 * height - 3);
    ring.extend((0..width).map(|x| index_of(x, 0, width)));
    ring.extend((1..height).map(|y| index_of(width - 1, y, width)));
    ring.extend((0..width - 1).rev().map(|x| index_of(x, height - 1, width)));
    ring.extend((0..height - 1).rev().map(|y| index_of(0, y, width)));
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2, 2)]
    #[case(3, 5)]
    #[case(17, 9)]
    #[case(1, 4)]
    fn triangle_indices_cover_grid(#[case] width: usize, #[case] height: usize) {
        let indices = triangle_grid_indices(width, height);
        assert_eq!(indices.len(), 6 * width.saturating_sub(1) * height.saturating_sub(1));
        assert_eq!(indices.len(), triangle_index_count(width, height));
        assert!(indices.iter().all(|&i| (i as usize) < width * height));
    }

    #[test]
    fn single_quad_winding() {
        assert_eq!(triangle_grid_indices(2, 2), vec![0, 2, 3, 3, 1, 0]);
    }

    #[test]
    fn coords_round_trip() {
        for index in 0..35 {
            let (x, y) = coords_of(index, 7);
            assert_eq!(index_of(x, y, 7), index);
        }
    }

    #[test]
    fn uv_corners_full_bounds() {
        let full = UvBounds::FULL;
        assert_eq!(grid_uv(0, 0, 5, 3, &full), Vec2::new(0.0, 1.0));
        assert_eq!(grid_uv(4, 2, 5, 3, &full), Vec2::new(1.0, 0.0));
        assert_eq!(grid_uv(2, 1, 5, 3, &full), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn uv_maps_into_sub_rectangle() {
        let bounds = UvBounds::new(0.25, 0.5, 0.75, 1.0);
        assert_eq!(grid_uv(0, 0, 3, 3, &bounds), Vec2::new(0.25, 1.0));
        assert_eq!(grid_uv(2, 2, 3, 3, &bounds), Vec2::new(0.75, 0.5));
    }

    #[test]
    fn border_loop_is_closed() {
        // 0 1 2
        // 3 4 5
        // 6 7 8
        let ring = border_loop(3, 3);
        assert_eq!(ring, vec![0, 1, 2, 5, 8, 7, 6, 3, 0]);
        assert_eq!(ring.len(), 2 * 3 + 2 * 3 - 3);
    }

    #[test]
    fn border_loop_degenerate() {
        assert!(border_loop(1, 5).is_empty());
    }
}
