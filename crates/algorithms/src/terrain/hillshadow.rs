//! Cast shadows (hillshadow) for a given sun position
//!
//! For every cell a ray is marched toward the sun azimuth, up to
//! `neighborhood_size` ground units. The cell is shadowed as soon as a cell
//! on the ray rises above the sun, i.e. its elevation angle seen from the
//! origin exceeds the sun elevation (90° − zenith). Marching stops at the
//! raster edge or at no-data.

use super::spacing::CellSpacing;
use crate::maybe_rayon::*;
use sunraster_core::raster::Raster;
use sunraster_core::{Algorithm, Error, Result};

/// Illumination value of a lit cell
pub const LIT: f64 = 1.0;
/// Illumination value of a shadowed cell
pub const SHADOWED: f64 = 0.0;

/// Parameters for hillshadow calculation
#[derive(Debug, Clone)]
pub struct HillshadowParams {
    /// Sun azimuth in degrees (0 = North, clockwise)
    pub azimuth: f64,
    /// Sun zenith in degrees (0 = overhead, 90 = horizon)
    pub zenith: f64,
    /// Occluder search distance in ground units (metres on geographic grids)
    pub neighborhood_size: f64,
    /// Cell spacing model
    pub spacing: CellSpacing,
}

impl Default for HillshadowParams {
    fn default() -> Self {
        Self {
            azimuth: 180.0,
            zenith: 45.0,
            neighborhood_size: 1000.0,
            spacing: CellSpacing::Auto,
        }
    }
}

/// Hillshadow algorithm
#[derive(Debug, Clone, Default)]
pub struct Hillshadow;

impl Algorithm for Hillshadow {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = HillshadowParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Hillshadow"
    }

    fn description(&self) -> &'static str {
        "Mark cells lit (1) or in terrain shadow (0) for a sun position"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        hillshadow(&input, params)
    }
}

/// Compute illumination: [`LIT`] or [`SHADOWED`] per cell, NaN on no-data.
///
/// With the sun at or below the horizon (zenith ≥ 90°) every valid cell is
/// shadowed.
pub fn hillshadow(dem: &Raster<f64>, params: HillshadowParams) -> Result<Raster<f64>> {
    validate(&params)?;

    let (rows, cols) = dem.shape();
    let spacing = params.spacing.resolve(dem, 1.0)?;
    let below_horizon = params.zenith >= 90.0;
    let tan_sun = (90.0 - params.zenith).to_radians().tan();
    let (sin_az, cos_az) = params.azimuth.to_radians().sin_cos();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let dims = spacing.at(row);

            // direction toward the sun in cells per metre, rescaled so the
            // larger component advances exactly one cell per step
            let dc = sin_az / dims.dx;
            let dr = -cos_az / dims.dy;
            let step_m = 1.0 / dc.abs().max(dr.abs());
            let (dc, dr) = (dc * step_m, dr * step_m);
            let max_steps = (params.neighborhood_size / step_m).floor() as usize;

            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                // SAFETY: row < rows, col < cols
                let z0 = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(z0) {
                    continue;
                }
                if below_horizon {
                    *out = SHADOWED;
                    continue;
                }

                let occluded = trace_occluder(dem, row, col, z0, dr, dc, step_m, max_steps, tan_sun);
                *out = if occluded { SHADOWED } else { LIT };
            }
            row_data
        })
        .collect();

    dem.derive_vec(output_data, Some(f64::NAN))
}

fn validate(params: &HillshadowParams) -> Result<()> {
    if !params.azimuth.is_finite() {
        return Err(Error::InvalidParameter {
            name: "azimuth",
            value: params.azimuth.to_string(),
            reason: "must be a finite angle".into(),
        });
    }
    if !(0.0..=180.0).contains(&params.zenith) {
        return Err(Error::InvalidParameter {
            name: "zenith",
            value: params.zenith.to_string(),
            reason: "must lie within 0-180 degrees".into(),
        });
    }
    if !(params.neighborhood_size.is_finite() && params.neighborhood_size > 0.0) {
        return Err(Error::InvalidParameter {
            name: "neighborhood_size",
            value: params.neighborhood_size.to_string(),
            reason: "must be a positive distance".into(),
        });
    }
    Ok(())
}

/// March from (row, col) toward the sun; true if terrain rises above it
#[allow(clippy::too_many_arguments)]
#[inline]
fn trace_occluder(
    dem: &Raster<f64>,
    row: usize,
    col: usize,
    z0: f64,
    dr: f64,
    dc: f64,
    step_m: f64,
    max_steps: usize,
    tan_sun: f64,
) -> bool {
    let (rows, cols) = dem.shape();

    for step in 1..=max_steps {
        let nr = (row as f64 + dr * step as f64).round();
        let nc = (col as f64 + dc * step as f64).round();
        if nr < 0.0 || nc < 0.0 || nr >= rows as f64 || nc >= cols as f64 {
            break;
        }

        // SAFETY: bounds checked above
        let z = unsafe { dem.get_unchecked(nr as usize, nc as usize) };
        if dem.is_nodata(z) {
            break;
        }

        if (z - z0) / (step as f64 * step_m) > tan_sun {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use sunraster_core::GeoTransform;

    /// 1 m grid with a 50 m wall along column 10
    fn wall_dem() -> Raster<f64> {
        let mut dem: Raster<f64> = Raster::filled(21, 21, 0.0);
        dem.set_transform(GeoTransform::new(0.0, 21.0, 1.0, -1.0));
        for row in 0..21 {
            dem.set(row, 10, 50.0).unwrap();
        }
        dem
    }

    #[test]
    fn test_flat_terrain_fully_lit() {
        let dem: Raster<f64> = Raster::filled(10, 10, 100.0);
        let out = hillshadow(&dem, HillshadowParams::default()).unwrap();
        assert!(out.data().iter().all(|&v| v == LIT));
    }

    #[test]
    fn test_wall_casts_shadow_away_from_sun() {
        let dem = wall_dem();
        // sun low in the east: cells just west of the wall are shadowed
        let params = HillshadowParams {
            azimuth: 90.0,
            zenith: 80.0,
            ..Default::default()
        };
        let out = hillshadow(&dem, params).unwrap();
        assert_eq!(out.get(10, 9).unwrap(), SHADOWED);
        assert_eq!(out.get(10, 0).unwrap(), SHADOWED);
        assert_eq!(out.get(10, 11).unwrap(), LIT);
        assert_eq!(out.get(10, 20).unwrap(), LIT);
        assert_eq!(out.get(10, 10).unwrap(), LIT);
    }

    #[test]
    fn test_neighborhood_limits_search() {
        let dem = wall_dem();
        let params = HillshadowParams {
            azimuth: 90.0,
            zenith: 80.0,
            neighborhood_size: 3.0,
            ..Default::default()
        };
        let out = hillshadow(&dem, params).unwrap();
        assert_eq!(out.get(10, 8).unwrap(), SHADOWED);
        // wall is 10 m away, beyond the search distance
        assert_eq!(out.get(10, 0).unwrap(), LIT);
    }

    #[test]
    fn test_sun_below_horizon_all_shadow() {
        let mut dem = wall_dem();
        dem.set(0, 0, f64::NAN).unwrap();
        let params = HillshadowParams {
            zenith: 95.0,
            ..Default::default()
        };
        let out = hillshadow(&dem, params).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_eq!(out.get(5, 5).unwrap(), SHADOWED);
        assert_eq!(out.valid_count(), 21 * 21 - 1);
    }

    #[test]
    fn test_invalid_params() {
        let dem = wall_dem();
        for params in [
            HillshadowParams { zenith: -1.0, ..Default::default() },
            HillshadowParams { azimuth: f64::NAN, ..Default::default() },
            HillshadowParams { neighborhood_size: 0.0, ..Default::default() },
        ] {
            assert!(hillshadow(&dem, params).is_err());
        }
    }
}
