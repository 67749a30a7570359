//! Terrain illumination over a time series and the sun-hours aggregate
//!
//! Each timestamp gives one [`IlluminationFrame`]: the sun position sampled
//! at a single centroid drives a hillshadow over the whole DEM. Frames with
//! the sun below the horizon at the centroid are dropped, and the rest are
//! summed and converted to hours:
//!
//! ```text
//! sun_hours = Σ illumination / (60 / step_minutes)
//! ```

use super::calendar::TimeFields;
use super::position::compute_solar_position_on;
use super::surface::{SolarSurfaceResult, TerrainSample};
use super::timezone::TimeZoneGrid;
use crate::maybe_rayon::*;
use crate::terrain::{hillshadow, CellSpacing, HillshadowParams, SHADOWED};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};
use sunraster_core::raster::Raster;
use sunraster_core::{reduce_region, Error, Reducer, Result};
use tracing::{debug, warn};

/// Frames evaluated concurrently before they are folded into the sum
const FRAME_BATCH: usize = 32;

/// Evenly spaced UTC instants `start, start + step, …` not past `end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    start: TimeFields,
    step_minutes: u32,
    len: usize,
}

impl TimeSeries {
    /// Both ends included when the step divides the span.
    ///
    /// Errors when `step_minutes` is 0 or `end` precedes `start`.
    pub fn new(start: &TimeFields, end: &TimeFields, step_minutes: u32) -> Result<Self> {
        if step_minutes == 0 {
            return Err(Error::InvalidParameter {
                name: "step_minutes",
                value: "0".into(),
                reason: "must be at least one minute".into(),
            });
        }
        let span = end.to_datetime()? - start.to_datetime()?;
        if span.num_seconds() < 0 {
            return Err(Error::InvalidParameter {
                name: "end",
                value: end.to_string(),
                reason: format!("precedes start {}", start),
            });
        }
        let len = (span.num_minutes() / i64::from(step_minutes)) as usize + 1;
        Ok(Self {
            start: *start,
            step_minutes,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    pub fn start(&self) -> TimeFields {
        self.start
    }

    /// Frames per hour, `60 / step`
    pub fn steps_per_hour(&self) -> f64 {
        60.0 / f64::from(self.step_minutes)
    }

    /// The `index`-th instant
    pub fn get(&self, index: usize) -> Option<TimeFields> {
        if index >= self.len {
            return None;
        }
        let minutes = i64::try_from(index).ok()? * i64::from(self.step_minutes);
        self.start.advance_minutes(minutes).ok()
    }

    /// Iterate the instants from the start; each call restarts
    pub fn iter(&self) -> TimeSeriesIter<'_> {
        TimeSeriesIter {
            series: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = TimeFields;
    type IntoIter = TimeSeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`TimeSeries`]
#[derive(Debug, Clone)]
pub struct TimeSeriesIter<'a> {
    series: &'a TimeSeries,
    next: usize,
}

impl Iterator for TimeSeriesIter<'_> {
    type Item = TimeFields;

    fn next(&mut self) -> Option<TimeFields> {
        let t = self.series.get(self.next)?;
        self.next += 1;
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.series.len.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for TimeSeriesIter<'_> {}

/// Per-frame properties, one record per timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// `YYYY-MM-DDTHH:MM:SS`
    pub date: String,
    pub year: i32,
    pub doy: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Sun elevation at the centroid, `None` where it is undefined there
    pub elevation: Option<f64>,
}

impl FrameMetadata {
    pub fn new(fields: &TimeFields, elevation: Option<f64>) -> Self {
        Self {
            date: fields.to_string(),
            year: fields.year,
            doy: fields.day_of_year,
            day: fields.day,
            hour: fields.hour,
            minute: fields.minute,
            second: fields.second,
            elevation,
        }
    }

    /// Daylight filter: the sun is at or above the horizon at the centroid
    pub fn is_daylight(&self) -> bool {
        self.elevation.is_some_and(|e| e >= 0.0)
    }
}

/// Illumination of the DEM at one instant
#[derive(Debug, Clone)]
pub struct IlluminationFrame {
    pub fields: TimeFields,
    pub metadata: FrameMetadata,
    /// 1 where the cell is shadowed
    pub shadow_mask: Raster<u8>,
    /// 1 lit, 0 shadowed, NaN undefined
    pub illumination: Raster<f64>,
    pub elevation_at_centroid: Option<f64>,
    /// Solar-surface bands, when requested
    pub surface: Option<SolarSurfaceResult>,
}

/// Parameters for the sun-hours series
#[derive(Debug, Clone)]
pub struct SunHoursParams {
    /// Hillshadow search distance in ground units
    pub neighborhood_size: f64,
    /// Cell spacing for hillshadow and the surface bands
    pub spacing: CellSpacing,
    /// Keep the retained frames in the result
    pub keep_frames: bool,
    /// Attach solar-surface bands to every frame
    pub with_surface: bool,
}

impl Default for SunHoursParams {
    fn default() -> Self {
        Self {
            neighborhood_size: 1000.0,
            spacing: CellSpacing::Auto,
            keep_frames: false,
            with_surface: false,
        }
    }
}

/// A time series of illumination frames over one DEM.
///
/// Frames are produced on demand, so a consumer can stream them (for an
/// animation or a progress bar) without holding the series in memory.
pub struct IlluminationSeries<'a> {
    times: TimeSeries,
    dem: &'a Raster<f64>,
    time_zones: &'a TimeZoneGrid,
    centroid: Geometry<f64>,
    params: SunHoursParams,
    terrain: Option<TerrainSample>,
}

impl<'a> IlluminationSeries<'a> {
    pub fn new(
        times: TimeSeries,
        centroid: Point<f64>,
        dem: &'a Raster<f64>,
        time_zones: &'a TimeZoneGrid,
        params: SunHoursParams,
    ) -> Result<Self> {
        if !(params.neighborhood_size.is_finite() && params.neighborhood_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "neighborhood_size",
                value: params.neighborhood_size.to_string(),
                reason: "must be positive".into(),
            });
        }
        let terrain = if params.with_surface {
            Some(TerrainSample::from_dem(dem, params.spacing)?)
        } else {
            None
        };
        Ok(Self {
            times,
            dem,
            time_zones,
            centroid: Geometry::Point(centroid),
            params,
            terrain,
        })
    }

    pub fn times(&self) -> &TimeSeries {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Evaluate one instant
    pub fn frame(&self, fields: &TimeFields) -> Result<IlluminationFrame> {
        let position = compute_solar_position_on(fields, self.dem, self.time_zones)?;

        let at_centroid = |band: &Raster<f64>| reduce_region(band, Reducer::Max, &self.centroid);
        let elevation = at_centroid(&position.elevation);
        let zenith = at_centroid(&position.zenith);
        let azimuth = at_centroid(&position.azimuth);

        let illumination = match (zenith, azimuth) {
            (Some(zenith), Some(azimuth)) => hillshadow(
                self.dem,
                HillshadowParams {
                    azimuth,
                    zenith,
                    neighborhood_size: self.params.neighborhood_size,
                    spacing: self.params.spacing,
                },
            )?,
            _ => {
                let mut undefined = self.dem.like(f64::NAN);
                undefined.set_nodata(Some(f64::NAN));
                undefined
            }
        };
        let shadow_mask = illumination.compare(|v| v == SHADOWED);

        let surface = match &self.terrain {
            Some(terrain) => Some(SolarSurfaceResult::from_position(position, terrain)?),
            None => None,
        };

        Ok(IlluminationFrame {
            fields: *fields,
            metadata: FrameMetadata::new(fields, elevation),
            shadow_mask,
            illumination,
            elevation_at_centroid: elevation,
            surface,
        })
    }

    /// Lazy frames in chronological order
    pub fn frames(&self) -> impl Iterator<Item = Result<IlluminationFrame>> + '_ {
        self.times.iter().map(move |t| self.frame(&t))
    }

    /// Every frame, evaluated in parallel, in chronological order
    pub fn compute_all(&self) -> Result<Vec<IlluminationFrame>> {
        let times: Vec<TimeFields> = self.times.iter().collect();
        times.into_par_iter().map(|t| self.frame(&t)).collect()
    }

    /// An empty sun-hours sum on this series' DEM grid
    pub fn accumulator(&self) -> SunHoursAccumulator {
        SunHoursAccumulator::new(self.dem, self.times.step_minutes())
    }

    /// Frames in chronological batches of up to 32, each batch evaluated
    /// in parallel
    pub fn batches(&self) -> impl Iterator<Item = Result<Vec<IlluminationFrame>>> + '_ {
        let len = self.len();
        (0..len).step_by(FRAME_BATCH).map(move |first| {
            let batch: Vec<TimeFields> = (first..(first + FRAME_BATCH).min(len))
                .filter_map(|i| self.times.get(i))
                .collect();
            batch.par_iter().map(|t| self.frame(t)).collect::<Result<Vec<_>>>()
        })
    }

    /// Evaluate every frame and aggregate to sun hours
    pub fn sun_hours(&self) -> Result<SunHours> {
        let mut acc = self.accumulator();
        let mut kept = Vec::new();

        for batch in self.batches() {
            for frame in batch? {
                if acc.push(&frame)? && self.params.keep_frames {
                    kept.push(frame);
                }
            }
        }

        let mut result = acc.finish()?;
        result.frames = kept;
        Ok(result)
    }
}

/// Running sum of retained illumination frames
#[derive(Debug, Clone)]
pub struct SunHoursAccumulator {
    steps_per_hour: f64,
    sum: Raster<f64>,
    defined: Raster<u8>,
    metadata: Vec<FrameMetadata>,
    retained: usize,
}

impl SunHoursAccumulator {
    pub fn new(dem: &Raster<f64>, step_minutes: u32) -> Self {
        if step_minutes == 0 || 60 % step_minutes != 0 {
            warn!(step_minutes, "step does not divide an hour, sun hours are approximate");
        }
        Self {
            steps_per_hour: 60.0 / f64::from(step_minutes.max(1)),
            sum: dem.constant_like(0.0),
            defined: dem.constant_like(0u8),
            metadata: Vec::new(),
            retained: 0,
        }
    }

    /// Add a frame; returns whether it passed the daylight filter.
    ///
    /// NaN illumination contributes nothing.
    pub fn push(&mut self, frame: &IlluminationFrame) -> Result<bool> {
        self.metadata.push(frame.metadata.clone());
        if !frame.metadata.is_daylight() {
            debug!(date = %frame.metadata.date, elevation = ?frame.metadata.elevation, "frame below horizon at centroid, skipped");
            return Ok(false);
        }
        self.sum = self
            .sum
            .zip_map(&frame.illumination, |s, v| if v.is_nan() { s } else { s + v })?;
        self.defined = self
            .defined
            .zip_map(&frame.illumination, |d, v| d | u8::from(!v.is_nan()))?;
        self.retained += 1;
        Ok(true)
    }

    pub fn retained(&self) -> usize {
        self.retained
    }

    /// Convert the sum to hours.
    ///
    /// With no retained frame the grid is all zeros; otherwise cells no
    /// retained frame defined are NaN.
    pub fn finish(self) -> Result<SunHours> {
        let rejected = self.metadata.len() - self.retained;
        if rejected > 0 {
            warn!(rejected, retained = self.retained, "frames dropped by the daylight filter");
        }
        let steps_per_hour = self.steps_per_hour;
        let mut hours = if self.retained == 0 {
            self.sum
        } else {
            self.sum
                .map(|s| s / steps_per_hour)
                .zip_map(&self.defined, |h, d| if d == 0 { f64::NAN } else { h })?
        };
        hours.set_nodata(Some(f64::NAN));
        Ok(SunHours {
            hours,
            frames: Vec::new(),
            metadata: self.metadata,
            retained: self.retained,
        })
    }
}

/// Total sunlit hours over a series
#[derive(Debug, Clone)]
pub struct SunHours {
    pub hours: Raster<f64>,
    /// Retained frames, kept only with [`SunHoursParams::keep_frames`]
    pub frames: Vec<IlluminationFrame>,
    /// One record per timestamp, retained or not
    pub metadata: Vec<FrameMetadata>,
    pub retained: usize,
}

/// Sun hours over `dem` between `start` and `end`, sampling the sun at
/// `centroid`.
pub fn compute_sun_hours(
    start: &TimeFields,
    end: &TimeFields,
    step_minutes: u32,
    centroid: Point<f64>,
    dem: &Raster<f64>,
    time_zones: &TimeZoneGrid,
    params: SunHoursParams,
) -> Result<SunHours> {
    let times = TimeSeries::new(start, end, step_minutes)?;
    debug!(
        start = %start,
        end = %end,
        step_minutes,
        frames = times.len(),
        lon = centroid.x(),
        lat = centroid.y(),
        "sun hours"
    );
    IlluminationSeries::new(times, centroid, dem, time_zones, params)?.sun_hours()
}
