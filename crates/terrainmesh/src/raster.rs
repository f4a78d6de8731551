use crate::error::{Result, TerrainError};

/// How out-of-range coordinates are resolved when reading a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryMode {
    /// Out-of-range reads yield nothing and are skipped by averages.
    #[default]
    None,
    /// Coordinates wrap around modulo the raster size.
    Wrap,
    /// Coordinates are clamped to the nearest edge pixel.
    Repeat,
}

/// Pixel types that can be block-averaged.
///
/// `Sum` is a wider accumulator so averaging a uniform block returns the
/// sample unchanged.
pub trait BlendSample: Copy + Default {
    type Sum: Copy + Default;

    /// Samples per pixel (1 for elevation, 3/4 for color).
    const CHANNELS: usize;

    fn accumulate(sum: Self::Sum, sample: Self) -> Self::Sum;

    /// `count` is always > 0.
    fn resolve(sum: Self::Sum, count: u32) -> Self;
}

impl BlendSample for f32 {
    type Sum = f64;
    const CHANNELS: usize = 1;

    fn accumulate(sum: f64, sample: f32) -> f64 {
        sum + sample as f64
    }

    fn resolve(sum: f64, count: u32) -> f32 {
        (sum / count as f64) as f32
    }
}

impl BlendSample for f64 {
    type Sum = f64;
    const CHANNELS: usize = 1;

    fn accumulate(sum: f64, sample: f64) -> f64 {
        sum + sample
    }

    fn resolve(sum: f64, count: u32) -> f64 {
        sum / count as f64
    }
}

macro_rules! integer_blend_sample {
    ($($ty:ty => $sum:ty),* $(,)?) => {
        $(
            impl BlendSample for $ty {
                type Sum = $sum;
                const CHANNELS: usize = 1;

                fn accumulate(sum: $sum, sample: $ty) -> $sum {
                    sum + sample as $sum
                }

                fn resolve(sum: $sum, count: u32) -> $ty {
                    (sum as f64 / count as f64).round() as $ty
                }
            }
        )*
    };
}

integer_blend_sample!(u8 => u64, u16 => u64, i16 => i64);

macro_rules! color_blend_sample {
    ($($n:literal),*) => {
        $(
            impl BlendSample for [u8; $n] {
                type Sum = [u32; $n];
                const CHANNELS: usize = $n;

                fn accumulate(mut sum: [u32; $n], sample: [u8; $n]) -> [u32; $n] {
                    for (acc, channel) in sum.iter_mut().zip(sample) {
                        *acc += channel as u32;
                    }
                    sum
                }

                fn resolve(sum: [u32; $n], count: u32) -> [u8; $n] {
                    sum.map(|acc| ((acc as f32 / count as f32).round()).min(255.0) as u8)
                }
            }
        )*
    };
}

color_blend_sample!(3, 4);

/// Row-major 2D sample store. Row 0 is the top (north) row.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

pub type ElevationRaster = RasterBuffer<f32>;
pub type ColorRaster = RasterBuffer<[u8; 4]>;
pub type RgbRaster = RasterBuffer<[u8; 3]>;

fn resolve_axis(v: i64, len: usize, mode: BoundaryMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    match mode {
        BoundaryMode::None => (0..len).contains(&v).then_some(v as usize),
        BoundaryMode::Wrap => Some(v.rem_euclid(len) as usize),
        BoundaryMode::Repeat => Some(v.clamp(0, len - 1) as usize),
    }
}

impl<T: Copy + Default> RasterBuffer<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(TerrainError::InvalidRaster(format!(
                "{} samples supplied for a {}x{} raster",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    /// Maps a possibly out-of-range coordinate to a pixel according to `mode`.
    pub fn resolve(&self, x: i64, y: i64, mode: BoundaryMode) -> Option<(usize, usize)> {
        self.resolve_axes(x, y, mode, mode)
    }

    /// Like [`RasterBuffer::resolve`] with a separate mode per axis.
    pub fn resolve_axes(
        &self,
        x: i64,
        y: i64,
        x_mode: BoundaryMode,
        y_mode: BoundaryMode,
    ) -> Option<(usize, usize)> {
        Some((
            resolve_axis(x, self.width, x_mode)?,
            resolve_axis(y, self.height, y_mode)?,
        ))
    }

    pub fn get(&self, x: i64, y: i64, mode: BoundaryMode) -> Option<T> {
        self.resolve(x, y, mode)
            .map(|(px, py)| self.data[py * self.width + px])
    }

    /// Writes a sample; coordinates outside the raster are ignored.
    pub fn set(&mut self, x: i64, y: i64, value: T) {
        if let Some((px, py)) = self.resolve(x, y, BoundaryMode::None) {
            self.data[py * self.width + px] = value;
        }
    }
}

impl<T: BlendSample> RasterBuffer<T> {
    pub fn samples_per_pixel(&self) -> usize {
        T::CHANNELS
    }

    /// Mean of the `w × h` window whose top-left corner is `(x, y)`.
    ///
    /// Under [`BoundaryMode::None`] samples outside the raster do not count
    /// towards the denominator. An empty window yields `T::default()`.
    pub fn average(&self, x: i64, y: i64, w: usize, h: usize, mode: BoundaryMode) -> T {
        self.average_axes(x, y, w, h, mode, mode)
    }

    pub fn average_axes(
        &self,
        x: i64,
        y: i64,
        w: usize,
        h: usize,
        x_mode: BoundaryMode,
        y_mode: BoundaryMode,
    ) -> T {
        let mut sum = T::Sum::default();
        let mut count = 0u32;

        for dy in 0..h as i64 {
            for dx in 0..w as i64 {
                if let Some((px, py)) = self.resolve_axes(x + dx, y + dy, x_mode, y_mode) {
                    sum = T::accumulate(sum, self.data[py * self.width + px]);
                    count += 1;
                }
            }
        }

        if count == 0 {
            T::default()
        } else {
            T::resolve(sum, count)
        }
    }

    /// Mean of a `size × size` window centred on `(x, y)`.
    pub fn centered_average(&self, x: i64, y: i64, size: usize, mode: BoundaryMode) -> T {
        self.centered_average_axes(x, y, size, mode, mode)
    }

    pub fn centered_average_axes(
        &self,
        x: i64,
        y: i64,
        size: usize,
        x_mode: BoundaryMode,
        y_mode: BoundaryMode,
    ) -> T {
        let half = (size / 2) as i64;
        self.average_axes(x - half, y - half, size, size, x_mode, y_mode)
    }

    /// Block-averages by `factor` into a `ceil(w / factor) × ceil(h / factor)` raster.
    pub fn downsample(&self, factor: usize, mode: BoundaryMode) -> Self {
        let factor = factor.max(1);
        let width = self.width.div_ceil(factor);
        let height = self.height.div_ceil(factor);

        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(self.average(
                    (x * factor) as i64,
                    (y * factor) as i64,
                    factor,
                    factor,
                    mode,
                ));
            }
        }

        Self {
            width,
            height,
            data,
        }
    }
}

impl ElevationRaster {
    /// Smallest and largest finite sample, if any.
    pub fn elevation_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ramp(width: usize, height: usize) -> ElevationRaster {
        let data = (0..width * height).map(|i| i as f32).collect();
        RasterBuffer::from_vec(width, height, data).unwrap()
    }

    #[rstest]
    fn uniform_centered_average_is_exact(
        #[values(1, 2, 3, 4, 7, 8, 16)] size: usize,
        #[values(BoundaryMode::None, BoundaryMode::Wrap, BoundaryMode::Repeat)] mode: BoundaryMode,
    ) {
        let k = 1234.567_f32;
        let raster = RasterBuffer::filled(9, 5, k);
        for (x, y) in [(0, 0), (4, 2), (8, 4), (1, 3)] {
            assert_eq!(raster.centered_average(x, y, size, mode), k);
        }
    }

    #[rstest]
    #[case(BoundaryMode::None, None)]
    #[case(BoundaryMode::Wrap, Some(3.0))]
    #[case(BoundaryMode::Repeat, Some(0.0))]
    fn test_boundary_get(#[case] mode: BoundaryMode, #[case] expected: Option<f32>) {
        let raster = ramp(4, 3);
        assert_eq!(raster.get(-1, 0, mode), expected);
    }

    #[test]
    fn wrap_and_repeat_far_outside() {
        let raster = ramp(4, 3);
        assert_eq!(raster.get(9, 4, BoundaryMode::Wrap), Some(5.0));
        assert_eq!(raster.get(9, 4, BoundaryMode::Repeat), Some(11.0));
        assert_eq!(raster.get(9, 4, BoundaryMode::None), None);
    }

    #[test]
    fn set_outside_is_ignored() {
        let mut raster = ramp(3, 3);
        let before = raster.clone();
        raster.set(-1, 0, 99.0);
        raster.set(3, 1, 99.0);
        raster.set(0, 7, 99.0);
        assert_eq!(raster, before);

        raster.set(2, 2, 99.0);
        assert_eq!(raster.get(2, 2, BoundaryMode::None), Some(99.0));
    }

    #[test]
    fn average_none_skips_missing_samples() {
        // 0 1 2
        // 3 4 5
        let raster = ramp(3, 2);
        // Window (-1,-1)..(1,1) only covers pixel (0,0)
        assert_eq!(raster.average(-1, -1, 2, 2, BoundaryMode::None), 0.0);
        // Window (1,0)..(3,2) covers 1,2,4,5
        assert_eq!(raster.average(1, 0, 3, 3, BoundaryMode::None), 3.0);
        // Nothing in range
        assert_eq!(raster.average(10, 10, 2, 2, BoundaryMode::None), 0.0);
    }

    #[test]
    fn average_repeat_weights_edges() {
        let raster = ramp(3, 2);
        // (-1,0),(0,0) -> 0, 0 ; (-1,1),(0,1) -> 3, 3
        assert_eq!(raster.average(-1, 0, 2, 2, BoundaryMode::Repeat), 1.5);
    }

    #[test]
    fn average_wraps_one_axis_only() {
        let mut raster = RasterBuffer::filled(4, 3, 0.0_f32);
        raster.set(3, 0, 8.0);
        // The window [-1, 1) x [-1, 1) wraps x onto column 3 and clamps y onto row 0
        let value = raster.average_axes(-1, -1, 2, 2, BoundaryMode::Wrap, BoundaryMode::Repeat);
        assert_eq!(value, 4.0);
        assert_eq!(raster.get(3, 0, BoundaryMode::None), Some(8.0));
        assert_eq!(
            raster.resolve_axes(-1, 5, BoundaryMode::Wrap, BoundaryMode::None),
            None
        );
    }

    #[test]
    fn downsample_averages_blocks() {
        let raster = ramp(4, 4);
        let half = raster.downsample(2, BoundaryMode::None);
        assert_eq!(half.width(), 2);
        assert_eq!(half.height(), 2);
        assert_eq!(half.data(), &[2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn downsample_keeps_partial_blocks() {
        let raster = ramp(5, 3);
        let half = raster.downsample(2, BoundaryMode::None);
        assert_eq!((half.width(), half.height()), (3, 2));
        // Right column block only holds x = 4
        assert_eq!(half.get(2, 0, BoundaryMode::None), Some(6.5));
        assert_eq!(half.get(2, 1, BoundaryMode::None), Some(14.0));
    }

    #[test]
    fn color_average_rounds_per_channel() {
        let raster = RasterBuffer::from_vec(2, 1, vec![[0u8, 10, 255, 255], [1, 20, 254, 0]]).unwrap();
        assert_eq!(raster.samples_per_pixel(), 4);
        assert_eq!(raster.average(0, 0, 2, 1, BoundaryMode::None), [1, 15, 255, 128]);
    }

    #[test]
    fn integer_samples_round() {
        let raster = RasterBuffer::from_vec(2, 1, vec![-3i16, -4]).unwrap();
        assert_eq!(raster.average(0, 0, 2, 1, BoundaryMode::None), -4);
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(matches!(
            RasterBuffer::<f32>::from_vec(3, 3, vec![0.0; 8]),
            Err(TerrainError::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_elevation_range() {
        let raster = RasterBuffer::from_vec(2, 2, vec![3.0, f32::NAN, -2.0, 8.5]).unwrap();
        assert_eq!(raster.elevation_range(), Some((-2.0, 8.5)));
        assert_eq!(ElevationRaster::new(0, 0).elevation_range(), None);
    }
}
