//! Ground distance between cell centres
//!
//! Projected DEMs have a constant spacing. Geographic (lon/lat) DEMs do not:
//! the east-west extent of a cell shrinks with cos(latitude), so gradients
//! use per-row dx/dy on the WGS84 spheroid:
//!
//! - dx = N·cos(φ)·Δλ, with N the prime-vertical radius of curvature
//! - dy = M·Δφ, with M the meridional radius of curvature

use sunraster_core::raster::Raster;
use sunraster_core::{Error, Result};

/// WGS84 semi-major axis (m)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// How cell spacing is derived for terrain derivatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellSpacing {
    /// Geographic if the DEM's CRS is geographic, projected otherwise
    #[default]
    Auto,
    /// Constant spacing from the geotransform (map units)
    Projected,
    /// Latitude-dependent spacing in metres on the WGS84 spheroid
    Geographic,
}

/// Cell dimensions in ground units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDimensions {
    /// East-west size
    pub dx: f64,
    /// North-south size
    pub dy: f64,
}

/// Per-row cell dimensions for one DEM
#[derive(Debug, Clone)]
pub struct RowSpacing {
    rows: Vec<CellDimensions>,
}

impl RowSpacing {
    /// Dimensions of the cells in `row`
    #[inline]
    pub fn at(&self, row: usize) -> CellDimensions {
        self.rows[row]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CellSpacing {
    /// Whether this spacing treats `dem` as lon/lat
    pub fn is_geographic(self, dem: &Raster<f64>) -> bool {
        match self {
            CellSpacing::Auto => dem.crs().is_some_and(|crs| crs.is_geographic()),
            CellSpacing::Projected => false,
            CellSpacing::Geographic => true,
        }
    }

    /// Resolve the spacing of every row of `dem`.
    ///
    /// `z_factor` scales the horizontal spacing of projected grids; it is
    /// ignored for geographic grids, whose spacing is already in metres.
    pub fn resolve(self, dem: &Raster<f64>, z_factor: f64) -> Result<RowSpacing> {
        if !(z_factor.is_finite() && z_factor > 0.0) {
            return Err(Error::InvalidParameter {
                name: "z_factor",
                value: z_factor.to_string(),
                reason: "must be a positive number".into(),
            });
        }

        let tf = dem.transform();
        let (d_lon, d_lat) = (tf.pixel_width.abs(), tf.pixel_height.abs());
        if d_lon == 0.0 || d_lat == 0.0 {
            return Err(Error::Algorithm("DEM has a zero pixel size".into()));
        }

        let rows = if self.is_geographic(dem) {
            (0..dem.rows())
                .map(|row| {
                    let (_, lat) = dem.pixel_to_geo(0, row);
                    cell_dimensions(lat, d_lon, d_lat)
                })
                .collect()
        } else {
            let dims = CellDimensions {
                dx: d_lon * z_factor,
                dy: d_lat * z_factor,
            };
            vec![dims; dem.rows()]
        };
        Ok(RowSpacing { rows })
    }
}

/// Cell dimensions at `latitude_deg` for a grid of `d_lon` × `d_lat` degrees
pub fn cell_dimensions(latitude_deg: f64, d_lon: f64, d_lat: f64) -> CellDimensions {
    let lat = latitude_deg.to_radians();
    let e2 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
    let w2 = 1.0 - e2 * lat.sin().powi(2);

    let n = WGS84_A / w2.sqrt();
    let m = WGS84_A * (1.0 - e2) / w2.powf(1.5);

    CellDimensions {
        dx: (n * lat.cos() * d_lon.to_radians()).abs(),
        dy: (m * d_lat.to_radians()).abs(),
    }
}
