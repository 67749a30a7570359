//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives.

use super::horn;
use super::spacing::CellSpacing;
use crate::maybe_rayon::*;
use sunraster_core::raster::Raster;
use sunraster_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent (0-infinity, typically 0-100+)
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    /// Output units
    pub units: SlopeUnits,
    /// Horizontal scale applied to projected cell sizes (default 1.0)
    pub z_factor: f64,
    /// Cell spacing model
    pub spacing: CellSpacing,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
            spacing: CellSpacing::Auto,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Calculate slope (rate of change of elevation) from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// slope = atan(sqrt(dz/dx² + dz/dy²)), with Horn gradients.
///
/// Border cells use a replicated window, so a flat DEM has zero slope
/// everywhere. Cells with no-data anywhere in their window are NaN.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let spacing = params.spacing.resolve(dem, params.z_factor)?;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let dims = spacing.at(row);
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(grad) = horn::gradient(dem, row, col, dims) else {
                    continue;
                };
                let slope_rad = grad.slope_rad();

                *out = match params.units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Percent => slope_rad.tan() * 100.0,
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    dem.derive_vec(output_data, Some(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sunraster_core::GeoTransform;

    fn create_test_dem() -> Raster<f64> {
        // Create a simple tilted plane: z = x + y
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, (row + col) as f64).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_slope_flat_everywhere() {
        let mut dem: Raster<f64> = Raster::filled(10, 10, 100.0);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let result = slope(&dem, SlopeParams::default()).unwrap();

        for &val in result.data().iter() {
            assert!(val.abs() < 1e-12, "Expected 0 slope for flat surface, got {}", val);
        }
    }

    #[test]
    fn test_slope_tilted_uniform() {
        let dem = create_test_dem();
        let result = slope(&dem, SlopeParams::default()).unwrap();

        let expected = 2.0_f64.sqrt().atan().to_degrees();
        for (row, col) in [(0, 0), (3, 3), (5, 5), (9, 4)] {
            let val = result.get(row, col).unwrap();
            assert!(
                (val - expected).abs() < 1e-9,
                "Expected {} at ({}, {}), got {}",
                expected,
                row,
                col,
                val
            );
        }
    }

    #[test]
    fn test_slope_units() {
        let dem = create_test_dem();
        let with_units = |units| {
            slope(&dem, SlopeParams { units, ..Default::default() })
                .unwrap()
                .get(5, 5)
                .unwrap()
        };

        let deg_val = with_units(SlopeUnits::Degrees);
        let rad_val = with_units(SlopeUnits::Radians);
        let pct_val = with_units(SlopeUnits::Percent);

        assert!((deg_val - rad_val.to_degrees()).abs() < 0.001, "Degree/radian mismatch");
        assert!((pct_val - rad_val.tan() * 100.0).abs() < 0.001, "Percent mismatch");
    }

    #[test]
    fn test_slope_nodata_propagates() {
        let mut dem = create_test_dem();
        dem.set(4, 4, f64::NAN).unwrap();
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(4, 4).unwrap().is_nan());
        assert!(result.get(3, 5).unwrap().is_nan());
        assert!(!result.get(0, 0).unwrap().is_nan());
    }
}
