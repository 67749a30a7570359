//! Per-pixel UTC offsets
//!
//! The grid is built once (from a raster, a polygon layer or the nautical
//! 15° bands) and then only read. Share it across threads behind an `Arc`.

use std::path::Path;
use sunraster_core::raster::{Raster, RasterElement};
use sunraster_core::vector::{rasterize_first, FeatureCollection};
use sunraster_core::{Error, Result};

/// Attribute carrying the UTC offset in the time-zone polygon layer
pub const DEFAULT_ZONE_PROPERTY: &str = "zone";

/// Lon/lat grid of integer UTC offsets in hours
#[derive(Debug, Clone)]
pub struct TimeZoneGrid {
    grid: Raster<i32>,
}

impl TimeZoneGrid {
    /// Use an existing offset raster; cells equal to its no-data are uncovered
    pub fn from_raster(mut grid: Raster<i32>) -> Result<Self> {
        if let Some(crs) = grid.crs() {
            if !crs.is_geographic() {
                return Err(Error::CrsMismatch(crs.identifier(), "EPSG:4326".into()));
            }
        }
        if grid.nodata().is_none() {
            grid.set_nodata(Some(i32::default_nodata()));
        }
        Ok(Self { grid })
    }

    /// Rasterize a polygon layer onto `template`.
    ///
    /// Overlapping polygons resolve to the first feature; fractional offsets
    /// such as −3.5 truncate toward zero.
    pub fn from_features<T: RasterElement>(
        features: &FeatureCollection,
        property: &str,
        template: &Raster<T>,
    ) -> Result<Self> {
        Self::from_raster(rasterize_first(features, property, template)?)
    }

    /// Load a GeoJSON time-zone layer and rasterize it onto `template`
    pub fn from_geojson_path<T: RasterElement, P: AsRef<Path>>(
        path: P,
        property: &str,
        template: &Raster<T>,
    ) -> Result<Self> {
        let features = FeatureCollection::from_geojson_path(path.as_ref())?;
        tracing::debug!(
            path = %path.as_ref().display(),
            features = features.len(),
            "loaded time-zone layer"
        );
        Self::from_features(&features, property, template)
    }

    /// Nautical time zones, `round(lon / 15)`, covering every cell of `template`
    pub fn nautical<T: RasterElement>(template: &Raster<T>) -> Result<Self> {
        let (rows, cols) = template.shape();
        let data = (0..rows * cols)
            .map(|k| {
                let (lon, _) = template.pixel_to_geo(k % cols, k / cols);
                (lon / 15.0).round() as i32
            })
            .collect();
        let mut grid = template.derive_vec(data, Some(i32::default_nodata()))?;
        if grid.crs().is_none() {
            grid.set_crs(Some(sunraster_core::CRS::wgs84()));
        }
        Self::from_raster(grid)
    }

    /// The underlying offset raster
    pub fn grid(&self) -> &Raster<i32> {
        &self.grid
    }

    /// UTC offset at a lon/lat position, `None` where the grid has no zone
    pub fn offset_at(&self, lon: f64, lat: f64) -> Option<i32> {
        let (row, col) = self.grid.pixel_index(lon, lat)?;
        let v = self.grid.get(row, col).ok()?;
        (!self.grid.is_nodata(v)).then_some(v)
    }

    /// Offsets sampled at the pixel centres of `template` (nearest cell),
    /// NaN where uncovered
    pub fn resample_to<T: RasterElement>(&self, template: &Raster<T>) -> Result<Raster<f64>> {
        let (rows, cols) = template.shape();
        let data = (0..rows * cols)
            .map(|k| {
                let (lon, lat) = template.pixel_to_geo(k % cols, k / cols);
                self.offset_at(lon, lat).map_or(f64::NAN, f64::from)
            })
            .collect();
        template.derive_vec(data, Some(f64::NAN))
    }

    /// 1 where `template` pixels have a zone, 0 elsewhere
    pub fn coverage_mask<T: RasterElement>(&self, template: &Raster<T>) -> Result<Raster<u8>> {
        Ok(self.resample_to(template)?.compare(|v| !v.is_nan()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Rect};
    use sunraster_core::vector::{AttributeValue, Feature};
    use sunraster_core::{GeoTransform, CRS};

    fn template() -> Raster<f64> {
        // 1° cells, lon -45..45, lat -1..1
        let mut r: Raster<f64> = Raster::new(2, 90);
        r.set_transform(GeoTransform::new(-45.0, 1.0, 1.0, -1.0));
        r.set_crs(Some(CRS::wgs84()));
        r
    }

    #[test]
    fn test_nautical_bands() {
        let tz = TimeZoneGrid::nautical(&template()).unwrap();
        assert_eq!(tz.offset_at(0.5, 0.0), Some(0));
        assert_eq!(tz.offset_at(8.5, 0.0), Some(1));
        assert_eq!(tz.offset_at(-30.5, 0.0), Some(-2));
        assert_eq!(tz.offset_at(100.0, 0.0), None);
    }

    #[test]
    fn test_from_features_truncates_and_reports_coverage() {
        let newfoundland = Feature::new(Geometry::Rect(Rect::new((-45.0, -1.0), (-30.0, 1.0))))
            .with_property(DEFAULT_ZONE_PROPERTY, AttributeValue::Float(-3.5));
        let layer: FeatureCollection = vec![newfoundland].into_iter().collect();

        let tz = TimeZoneGrid::from_features(&layer, DEFAULT_ZONE_PROPERTY, &template()).unwrap();
        assert_eq!(tz.offset_at(-40.0, 0.5), Some(-3));
        assert_eq!(tz.offset_at(10.0, 0.5), None);

        let mask = tz.coverage_mask(&template()).unwrap();
        assert_eq!(mask.count_set(), 2 * 15);

        let offsets = tz.resample_to(&template()).unwrap();
        assert_eq!(offsets.get(0, 0).unwrap(), -3.0);
        assert!(offsets.get(0, 60).unwrap().is_nan());
    }

    #[test]
    fn test_projected_grid_rejected() {
        let mut grid: Raster<i32> = Raster::new(2, 2);
        grid.set_crs(Some(CRS::from_epsg(32633)));
        assert!(matches!(TimeZoneGrid::from_raster(grid), Err(Error::CrsMismatch(..))));
    }

    #[test]
    fn test_missing_layer_is_dataset_error() {
        let err = TimeZoneGrid::from_geojson_path("/nonexistent/zones.geojson", "zone", &template())
            .unwrap_err();
        assert!(matches!(err, Error::Dataset { .. }));
    }
}
