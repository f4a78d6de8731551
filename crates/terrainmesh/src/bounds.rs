use crate::error::{Result, TerrainError};
use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shared read/write surface of both bounding box variants.
///
/// Components are addressed as `[lon_start, lat_start, lon_end, lat_end]`, in degrees.
/// Every write goes through the variant's own normalization, so a box read
/// back after `set_component` may have its start/end swapped.
pub trait GeoBounds {
    fn to_array(&self) -> [f32; 4];

    fn set_component(&mut self, index: usize, value: f32) -> Result<()>;

    fn median_longitude(&self) -> f32;

    fn component(&self, index: usize) -> Result<f32> {
        self.to_array()
            .get(index)
            .copied()
            .ok_or(TerrainError::IndexOutOfRange(index))
    }

    fn lon_start(&self) -> f32 {
        self.to_array()[0]
    }

    fn lat_start(&self) -> f32 {
        self.to_array()[1]
    }

    fn lon_end(&self) -> f32 {
        self.to_array()[2]
    }

    fn lat_end(&self) -> f32 {
        self.to_array()[3]
    }

    /// Eastward angular extent from `lon_start` to `lon_end`.
    fn lon_swing(&self) -> f32 {
        lon_swing(self.lon_start(), self.lon_end())
    }

    fn lat_swing(&self) -> f32 {
        self.lat_end() - self.lat_start()
    }

    fn median_latitude(&self) -> f32 {
        (self.lat_start() + self.lat_end()) * 0.5
    }

    /// Serializes as `lon_start{d}lat_start{d}lon_end{d}lat_end`.
    ///
    /// This is both the debug representation and the query-parameter format
    /// product-subsetting services expect.
    fn to_delimited_string(&self, delimiter: &str, precision: Option<usize>) -> String {
        self.to_array()
            .iter()
            .map(|value| match precision {
                Some(digits) => format!("{:.*}", digits, value),
                None => format!("{}", value),
            })
            .collect::<Vec<_>>()
            .join(delimiter)
    }

    fn to_vec4(&self) -> Vec4 {
        Vec4::from_array(self.to_array())
    }
}

/// Eastward sweep from `start` to `end` in degrees.
pub fn lon_swing(start: f32, end: f32) -> f32 {
    if end < start {
        360.0 + end - start
    } else {
        end - start
    }
}

/// Wraps a longitude into (-180, 180].
pub fn wrap_longitude(lon: f32) -> f32 {
    let wrapped = (lon + 180.0).rem_euclid(360.0);
    if wrapped == 0.0 { 180.0 } else { wrapped - 180.0 }
}

fn clamp_latitude(lat: f32) -> f32 {
    lat.clamp(-90.0, 90.0)
}

fn check_component(index: usize, value: f32) -> Result<()> {
    if index > 3 {
        return Err(TerrainError::IndexOutOfRange(index));
    }
    if !value.is_finite() {
        return Err(TerrainError::NonFiniteBound { index, value });
    }
    Ok(())
}

fn check_components(components: &[f32; 4]) -> Result<()> {
    components
        .iter()
        .enumerate()
        .try_for_each(|(index, &value)| check_component(index, value))
}

fn parse_components(s: &str) -> Result<[f32; 4]> {
    let values = s
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| TerrainError::ParseBoundingBox(s.to_string()))?;

    let components = <[f32; 4]>::try_from(values)
        .map_err(|_| TerrainError::ParseBoundingBox(s.to_string()))?;
    check_components(&components).map_err(|_| TerrainError::ParseBoundingBox(s.to_string()))?;
    Ok(components)
}

/// Geographic rectangle whose longitude sweep never exceeds 180°.
///
/// Boxes crossing the antimeridian are stored with `lon_start > lon_end`,
/// e.g. `(170, -10, -170, 10)` sweeps 20° eastward through 180°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f32; 4]", try_from = "[f32; 4]")]
pub struct GeoBoundingBox {
    lon_start: f32,
    lat_start: f32,
    lon_end: f32,
    lat_end: f32,
}

impl GeoBoundingBox {
    /// Components are expected to be finite; see [`Self::try_from_array`] for unchecked input.
    pub fn new(lon_start: f32, lat_start: f32, lon_end: f32, lat_end: f32) -> Self {
        let mut bounds = Self {
            lon_start,
            lat_start,
            lon_end,
            lat_end,
        };
        bounds.normalize();
        bounds
    }

    pub fn from_array(components: [f32; 4]) -> Self {
        Self::new(components[0], components[1], components[2], components[3])
    }

    pub fn try_from_array(components: [f32; 4]) -> Result<Self> {
        check_components(&components)?;
        Ok(Self::from_array(components))
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self::from_array(v.to_array())
    }

    pub fn to_unrestricted(&self) -> UnrestrictedGeoBoundingBox {
        UnrestrictedGeoBoundingBox::from_array(self.to_array())
    }

    fn normalize(&mut self) {
        self.lon_start = wrap_longitude(self.lon_start);
        self.lon_end = wrap_longitude(self.lon_end);
        self.lat_start = clamp_latitude(self.lat_start);
        self.lat_end = clamp_latitude(self.lat_end);

        if self.lat_start > self.lat_end {
            std::mem::swap(&mut self.lat_start, &mut self.lat_end);
        }
        // The swapped pair sweeps 360 - swing, so whichever ordering is <= 180 wins
        if lon_swing(self.lon_start, self.lon_end) > 180.0 {
            std::mem::swap(&mut self.lon_start, &mut self.lon_end);
        }
    }

    /// Grows the shorter sweep around the box centre until both sweeps match.
    ///
    /// Used before requesting square textures/DEMs. Latitude is shifted away
    /// from the poles instead of clipped so the result stays square.
    pub fn expanded_to_square(&self) -> Self {
        let lon_swing = self.lon_swing();
        let lat_swing = self.lat_swing();
        let side = lon_swing.max(lat_swing);

        let center_lon = self.lon_start + lon_swing * 0.5;
        let center_lat = self.median_latitude();

        let mut lat_lo = center_lat - side * 0.5;
        let mut lat_hi = lat_lo + side;
        if lat_hi > 90.0 {
            lat_hi = 90.0;
            lat_lo = 90.0 - side;
        }
        if lat_lo < -90.0 {
            lat_lo = -90.0;
            lat_hi = -90.0 + side;
        }

        Self::new(
            center_lon - side * 0.5,
            lat_lo,
            center_lon + side * 0.5,
            lat_hi,
        )
    }

    /// Where this box sits inside `outer`, in texture space (v grows northward).
    pub fn sub_uv_bounds(&self, outer: &GeoBoundingBox) -> UvBounds {
        let outer_lon = outer.lon_swing();
        let outer_lat = outer.lat_swing();
        if outer_lon <= 0.0 || outer_lat <= 0.0 {
            return UvBounds::FULL;
        }

        let lon_offset = (self.lon_start - outer.lon_start).rem_euclid(360.0);
        let u_min = lon_offset / outer_lon;
        let u_max = u_min + self.lon_swing() / outer_lon;
        let v_min = (self.lat_start - outer.lat_start) / outer_lat;
        let v_max = (self.lat_end - outer.lat_start) / outer_lat;

        UvBounds::new(u_min, v_min, u_max, v_max)
    }
}

impl GeoBounds for GeoBoundingBox {
    fn to_array(&self) -> [f32; 4] {
        [self.lon_start, self.lat_start, self.lon_end, self.lat_end]
    }

    fn set_component(&mut self, index: usize, value: f32) -> Result<()> {
        check_component(index, value)?;
        match index {
            0 => self.lon_start = value,
            1 => self.lat_start = value,
            2 => self.lon_end = value,
            3 => self.lat_end = value,
            _ => return Err(TerrainError::IndexOutOfRange(index)),
        }
        self.normalize();
        Ok(())
    }

    fn median_longitude(&self) -> f32 {
        wrap_longitude(self.lon_start + self.lon_swing() * 0.5)
    }
}

impl TryFrom<[f32; 4]> for GeoBoundingBox {
    type Error = TerrainError;

    fn try_from(components: [f32; 4]) -> Result<Self> {
        Self::try_from_array(components)
    }
}

impl From<GeoBoundingBox> for [f32; 4] {
    fn from(bounds: GeoBoundingBox) -> Self {
        bounds.to_array()
    }
}

impl fmt::Display for GeoBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited_string(", ", None))
    }
}

impl FromStr for GeoBoundingBox {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        parse_components(s).map(Self::from_array)
    }
}

/// Geographic rectangle with an arbitrary longitude sweep (e.g. the whole globe).
///
/// Longitudes are kept exactly as given. Only latitudes are clamped and sorted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f32; 4]", try_from = "[f32; 4]")]
pub struct UnrestrictedGeoBoundingBox {
    lon_start: f32,
    lat_start: f32,
    lon_end: f32,
    lat_end: f32,
}

impl UnrestrictedGeoBoundingBox {
    pub const GLOBE: Self = Self {
        lon_start: -180.0,
        lat_start: -90.0,
        lon_end: 180.0,
        lat_end: 90.0,
    };

    /// Components are expected to be finite; see [`Self::try_from_array`] for unchecked input.
    pub fn new(lon_start: f32, lat_start: f32, lon_end: f32, lat_end: f32) -> Self {
        let mut bounds = Self {
            lon_start,
            lat_start,
            lon_end,
            lat_end,
        };
        bounds.normalize();
        bounds
    }

    pub fn from_array(components: [f32; 4]) -> Self {
        Self::new(components[0], components[1], components[2], components[3])
    }

    pub fn try_from_array(components: [f32; 4]) -> Result<Self> {
        check_components(&components)?;
        Ok(Self::from_array(components))
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self::from_array(v.to_array())
    }

    /// Wraps into a restricted box. Sweeps over 180° come back as the complementary sweep.
    pub fn to_restricted(&self) -> GeoBoundingBox {
        GeoBoundingBox::from_array(self.to_array())
    }

    fn normalize(&mut self) {
        self.lat_start = clamp_latitude(self.lat_start);
        self.lat_end = clamp_latitude(self.lat_end);
        if self.lat_start > self.lat_end {
            std::mem::swap(&mut self.lat_start, &mut self.lat_end);
        }
    }
}

impl GeoBounds for UnrestrictedGeoBoundingBox {
    fn to_array(&self) -> [f32; 4] {
        [self.lon_start, self.lat_start, self.lon_end, self.lat_end]
    }

    fn set_component(&mut self, index: usize, value: f32) -> Result<()> {
        check_component(index, value)?;
        match index {
            0 => self.lon_start = value,
            1 => self.lat_start = value,
            2 => self.lon_end = value,
            3 => self.lat_end = value,
            _ => return Err(TerrainError::IndexOutOfRange(index)),
        }
        self.normalize();
        Ok(())
    }

    fn median_longitude(&self) -> f32 {
        self.lon_start + self.lon_swing() * 0.5
    }
}

impl TryFrom<[f32; 4]> for UnrestrictedGeoBoundingBox {
    type Error = TerrainError;

    fn try_from(components: [f32; 4]) -> Result<Self> {
        Self::try_from_array(components)
    }
}

impl From<UnrestrictedGeoBoundingBox> for [f32; 4] {
    fn from(bounds: UnrestrictedGeoBoundingBox) -> Self {
        bounds.to_array()
    }
}

impl fmt::Display for UnrestrictedGeoBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited_string(", ", None))
    }
}

impl FromStr for UnrestrictedGeoBoundingBox {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        parse_components(s).map(Self::from_array)
    }
}

/// Sub-rectangle of a (possibly shared) texture, `v` pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvBounds {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl UvBounds {
    pub const FULL: Self = Self {
        u_min: 0.0,
        v_min: 0.0,
        u_max: 1.0,
        v_max: 1.0,
    };

    pub fn new(u_min: f32, v_min: f32, u_max: f32, v_max: f32) -> Self {
        Self {
            u_min,
            v_min,
            u_max,
            v_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.u_max - self.u_min
    }

    pub fn height(&self) -> f32 {
        self.v_max - self.v_min
    }
}

impl Default for UvBounds {
    fn default() -> Self {
        Self::FULL
    }
}
