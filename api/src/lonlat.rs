use serde::{Deserialize, Serialize};

/// A WGS84 position. The backend always speaks longitude first.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    lon: f64,
    lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn x(self) -> f64 {
        self.lon
    }

    pub fn y(self) -> f64 {
        self.lat
    }

    /// Only a two-element array of finite numbers is a usable position.
    pub fn from_coords(coords: &[f64]) -> Option<Self> {
        match coords {
            [lon, lat] if lon.is_finite() && lat.is_finite() => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }

    pub fn to_coords(self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }

    /// The `lon,lat` form used by the routing endpoints.
    pub fn to_query(self) -> String {
        format!("{},{}", self.lon, self.lat)
    }

    /// Parses `lon,lat`.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let parts: Vec<&str> = input.split(',').map(|x| x.trim()).collect();
        if parts.len() != 2 {
            bail!("Expected lon,lat but got {input}");
        }
        let lon: f64 = parts[0].parse()?;
        let lat: f64 = parts[1].parse()?;
        Self::from_coords(&[lon, lat]).ok_or_else(|| anyhow!("{input} isn't a finite position"))
    }
}

impl std::fmt::Display for LonLat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// An axis-aligned box in lon/lat space. Starts out empty and grows with `update`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GPSBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GPSBounds {
    pub fn new() -> Self {
        Self {
            min_lon: f64::MAX,
            min_lat: f64::MAX,
            max_lon: f64::MIN,
            max_lat: f64::MIN,
        }
    }

    pub fn from(pts: &[LonLat]) -> Self {
        let mut b = Self::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    /// Takes west, south, east, north.
    pub fn from_corners(west: f64, south: f64, east: f64, north: f64) -> anyhow::Result<Self> {
        if !(west <= east && south <= north) {
            bail!("Bad bounding box {west},{south},{east},{north}");
        }
        Ok(Self {
            min_lon: west,
            min_lat: south,
            max_lon: east,
            max_lat: north,
        })
    }

    pub fn around(center: LonLat, half_width: f64, half_height: f64) -> Self {
        Self {
            min_lon: center.x() - half_width,
            min_lat: center.y() - half_height,
            max_lon: center.x() + half_width,
            max_lat: center.y() + half_height,
        }
    }

    pub fn update(&mut self, pt: LonLat) {
        self.min_lon = self.min_lon.min(pt.x());
        self.min_lat = self.min_lat.min(pt.y());
        self.max_lon = self.max_lon.max(pt.x());
        self.max_lat = self.max_lat.max(pt.y());
    }

    pub fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    pub fn contains(&self, pt: LonLat) -> bool {
        pt.x() >= self.min_lon
            && pt.x() <= self.max_lon
            && pt.y() >= self.min_lat
            && pt.y() <= self.max_lat
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Grows the box by `ratio` of its size on every side, but never by less than `min_pad`
    /// degrees, so a single point still yields a viewable area.
    pub fn padded(&self, ratio: f64, min_pad: f64) -> Self {
        let pad_lon = ((self.max_lon - self.min_lon) * ratio).max(min_pad);
        let pad_lat = ((self.max_lat - self.min_lat) * ratio).max(min_pad);
        Self {
            min_lon: self.min_lon - pad_lon,
            min_lat: self.min_lat - pad_lat,
            max_lon: self.max_lon + pad_lon,
            max_lat: self.max_lat + pad_lat,
        }
    }

    /// The `W,S,E,N` form used by `/places?bbox=`.
    pub fn to_bbox_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl Default for GPSBounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_need_exactly_two_finite_numbers() {
        assert_eq!(
            LonLat::from_coords(&[106.9, 47.9]),
            Some(LonLat::new(106.9, 47.9))
        );
        assert_eq!(LonLat::from_coords(&[106.9]), None);
        assert_eq!(LonLat::from_coords(&[106.9, 47.9, 1.0]), None);
        assert_eq!(LonLat::from_coords(&[f64::NAN, 47.9]), None);
    }

    #[test]
    fn parse_lon_lat() {
        assert_eq!(
            LonLat::parse(" 106.917, 47.918").unwrap(),
            LonLat::new(106.917, 47.918)
        );
        assert!(LonLat::parse("106.917").is_err());
        assert!(LonLat::parse("a,b").is_err());
    }

    #[test]
    fn bounds_grow_and_pad() {
        let mut b = GPSBounds::new();
        assert!(b.is_empty());
        b.update(LonLat::new(106.9, 47.9));
        assert!(!b.is_empty());
        let padded = b.padded(0.1, 0.01);
        assert!(padded.contains(LonLat::new(106.905, 47.895)));
        assert!(!padded.contains(LonLat::new(107.0, 47.9)));

        b.update(LonLat::new(107.0, 48.0));
        assert_eq!(b.to_bbox_query(), "106.9,47.9,107,48");
        let center = b.center();
        assert!((center.x() - 106.95).abs() < 1e-9);
        assert!((center.y() - 47.95).abs() < 1e-9);
    }

    #[test]
    fn corners_must_be_ordered() {
        assert!(GPSBounds::from_corners(1.0, 1.0, 0.0, 2.0).is_err());
        assert!(GPSBounds::from_corners(0.0, 1.0, 1.0, 2.0).is_ok());
    }
}
