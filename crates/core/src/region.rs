//! Spatial extents over which per-pixel rasters are evaluated
//!
//! A [`Region`] is a lon/lat geometry (degrees, WGS84): either a bounding
//! box or an arbitrary polygon. Regions are validated on construction so
//! that nothing downstream ever evaluates a pixel at a pole.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use geo::{BoundingRect, Centroid, Intersects};
use geo_types::{Geometry, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Latitude bound of the default global region
pub const GLOBAL_MAX_LATITUDE: f64 = 85.0;

/// Longitude bound of the default global region
pub const GLOBAL_MAX_LONGITUDE: f64 = 179.99;

/// Largest grid [`Region::template`] will allocate
pub const MAX_TEMPLATE_CELLS: usize = 1 << 28;

/// A validated lon/lat extent
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    geometry: Geometry<f64>,
}

/// Axis-aligned bounds of a region in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Region {
    /// The whole globe without the polar caps: lon ±179.99, lat ±85
    pub fn global() -> Self {
        Self {
            geometry: Geometry::Rect(Rect::new(
                (-GLOBAL_MAX_LONGITUDE, -GLOBAL_MAX_LATITUDE),
                (GLOBAL_MAX_LONGITUDE, GLOBAL_MAX_LATITUDE),
            )),
        }
    }

    /// A bounding box in degrees
    pub fn bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        validate_bounds(RegionBounds {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })?;
        Ok(Self {
            geometry: Geometry::Rect(Rect::new((min_lon, min_lat), (max_lon, max_lat))),
        })
    }

    /// An arbitrary polygon in degrees
    pub fn polygon(polygon: Polygon<f64>) -> Result<Self> {
        Self::from_geometry(Geometry::Polygon(polygon))
    }

    /// Any areal or point geometry in degrees
    pub fn from_geometry(geometry: Geometry<f64>) -> Result<Self> {
        match &geometry {
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Point(_) => {}
            _ => {
                return Err(Error::InvalidParameter {
                    name: "geometry",
                    value: "line or collection".into(),
                    reason: "region must be a point, rectangle or (multi)polygon".into(),
                })
            }
        }
        let rect = geometry.bounding_rect().ok_or(Error::InvalidParameter {
            name: "geometry",
            value: "empty".into(),
            reason: "region has no extent".into(),
        })?;
        let bounds = RegionBounds {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        };
        if matches!(geometry, Geometry::Point(_)) {
            validate_coordinates(bounds)?;
        } else {
            validate_bounds(bounds)?;
        }
        Ok(Self { geometry })
    }

    /// The underlying geometry
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// Bounding box of the region
    pub fn bounds(&self) -> RegionBounds {
        match self.geometry.bounding_rect() {
            Some(r) => RegionBounds {
                min_lon: r.min().x,
                min_lat: r.min().y,
                max_lon: r.max().x,
                max_lat: r.max().y,
            },
            None => RegionBounds {
                min_lon: 0.0,
                min_lat: 0.0,
                max_lon: 0.0,
                max_lat: 0.0,
            },
        }
    }

    /// Whether a lon/lat position lies inside (or on the edge of) the region
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.intersects(&Point::new(lon, lat))
    }

    /// Centroid of the region, used as the representative solar sample point
    pub fn centroid(&self) -> Point<f64> {
        self.geometry.centroid().unwrap_or_else(|| {
            let b = self.bounds();
            Point::new((b.min_lon + b.max_lon) / 2.0, (b.min_lat + b.max_lat) / 2.0)
        })
    }

    /// EPSG:4326 grid covering the region bounds at `resolution` degrees.
    ///
    /// Cells whose centre falls outside the region are NaN, all others 0.
    /// The grid is the pixel template for solar computations without a DEM.
    pub fn template(&self, resolution: f64) -> Result<Raster<f64>> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "must be a positive number of degrees".into(),
            });
        }
        let b = self.bounds();
        let cols = ((b.max_lon - b.min_lon) / resolution).ceil().max(1.0);
        let rows = ((b.max_lat - b.min_lat) / resolution).ceil().max(1.0);
        if rows * cols > MAX_TEMPLATE_CELLS as f64 {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: format!(
                    "gives a {rows} x {cols} grid, more than {MAX_TEMPLATE_CELLS} cells"
                ),
            });
        }
        let (rows, cols) = (rows as usize, cols as usize);

        let mut grid: Raster<f64> = Raster::new(rows, cols);
        grid.set_transform(GeoTransform::new(b.min_lon, b.max_lat, resolution, -resolution));
        grid.set_crs(Some(CRS::wgs84()));
        grid.set_nodata(Some(f64::NAN));
        Ok(self.clip(&grid))
    }

    /// Copy of `raster` with every cell whose centre lies outside the region
    /// set to no-data.
    ///
    /// Point regions keep only the cell containing the point.
    pub fn clip<T: RasterElement>(&self, raster: &Raster<T>) -> Raster<T> {
        let fill = raster.nodata().unwrap_or_else(T::default_nodata);
        let mut out = raster.clone();
        out.set_nodata(Some(fill));

        if let Geometry::Point(p) = &self.geometry {
            let keep = raster.pixel_index(p.x(), p.y());
            for ((row, col), v) in out.data_mut().indexed_iter_mut() {
                if keep != Some((row, col)) {
                    *v = fill;
                }
            }
            return out;
        }

        let transform = *raster.transform();
        for ((row, col), v) in out.data_mut().indexed_iter_mut() {
            let (x, y) = transform.pixel_to_geo(col, row);
            if !self.contains(x, y) {
                *v = fill;
            }
        }
        out
    }
}

impl From<Region> for Geometry<f64> {
    fn from(region: Region) -> Self {
        region.geometry
    }
}

impl TryFrom<MultiPolygon<f64>> for Region {
    type Error = Error;

    fn try_from(value: MultiPolygon<f64>) -> Result<Self> {
        Region::from_geometry(Geometry::MultiPolygon(value))
    }
}

fn validate_coordinates(b: RegionBounds) -> Result<()> {
    for (field, value) in [("min_lon", b.min_lon), ("max_lon", b.max_lon)] {
        if !value.is_finite() || value.abs() > 180.0 {
            return Err(Error::InvalidExtent {
                field,
                value,
                reason: "longitude must lie within ±180".into(),
            });
        }
    }
    for (field, value) in [("min_lat", b.min_lat), ("max_lat", b.max_lat)] {
        if !value.is_finite() || value.abs() >= 90.0 {
            return Err(Error::InvalidExtent {
                field,
                value,
                reason: "extent must stay strictly between the poles".into(),
            });
        }
    }
    Ok(())
}

fn validate_bounds(b: RegionBounds) -> Result<()> {
    validate_coordinates(b)?;
    if b.min_lon >= b.max_lon {
        return Err(Error::InvalidExtent {
            field: "max_lon",
            value: b.max_lon,
            reason: format!("must be greater than min_lon ({})", b.min_lon),
        });
    }
    if b.min_lat >= b.max_lat {
        return Err(Error::InvalidExtent {
            field: "max_lat",
            value: b.max_lat,
            reason: format!("must be greater than min_lat ({})", b.min_lat),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::polygon;

    #[test]
    fn test_global_template_stays_below_85() {
        let grid = Region::global().template(1.0).unwrap();
        assert_eq!(grid.shape(), (170, 360));
        for row in 0..grid.rows() {
            let (_, lat) = grid.pixel_to_geo(0, row);
            assert!(lat.abs() <= GLOBAL_MAX_LATITUDE, "latitude {} beyond bound", lat);
        }
    }

    #[test]
    fn test_pole_reaching_bbox_rejected() {
        let err = Region::bbox(-10.0, 60.0, 10.0, 90.0).unwrap_err();
        match err {
            Error::InvalidExtent { field, .. } => assert_eq!(field, "max_lat"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(Region::bbox(10.0, 0.0, -10.0, 5.0).is_err());
        assert!(Region::bbox(-190.0, 0.0, 10.0, 5.0).is_err());
        assert!(Region::bbox(f64::NAN, 0.0, 10.0, 5.0).is_err());
    }

    #[test]
    fn test_polygon_clip_and_centroid() {
        let tri = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)];
        let region = Region::polygon(tri).unwrap();
        let grid = region.template(1.0).unwrap();
        assert_eq!(grid.shape(), (4, 4));
        // upper-right corner cell centre (3.5, 3.5) is outside the triangle
        assert!(grid.get(0, 3).unwrap().is_nan());
        // lower-left cell centre (0.5, 0.5) is inside
        assert_eq!(grid.get(3, 0).unwrap(), 0.0);

        let c = region.centroid();
        assert_relative_eq!(c.x(), 4.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(c.y(), 4.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(Region::global().template(0.0).is_err());
        assert!(Region::global().template(-1.0).is_err());
    }

    #[test]
    fn test_oversized_template_rejected() {
        match Region::global().template(1e-9) {
            Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "resolution"),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(grid) => panic!("allocated a {:?} grid", grid.shape()),
        }
        // same resolution on a small box is fine
        let small = Region::bbox(10.0, 45.0, 10.000001, 45.000001).unwrap();
        assert!(small.template(1e-9).is_ok());
    }
}
