//! Region reduction: aggregate a raster to one scalar over a geometry

use crate::raster::{Raster, RasterElement};
use geo::{BoundingRect, Centroid, Intersects};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};

/// Reducer applied to the valid pixels covered by a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reducer {
    /// First valid pixel in row-major order
    First,
    Max,
    Min,
    Mean,
    Sum,
    Count,
}

impl Reducer {
    fn reduce(self, values: impl Iterator<Item = f64>) -> Option<f64> {
        let mut n = 0usize;
        let mut acc: Option<f64> = None;
        for v in values {
            n += 1;
            acc = Some(match (self, acc) {
                (Reducer::First, Some(a)) => return Some(a),
                (_, None) => v,
                (Reducer::Max, Some(a)) => a.max(v),
                (Reducer::Min, Some(a)) => a.min(v),
                (Reducer::Mean | Reducer::Sum, Some(a)) => a + v,
                (Reducer::Count, Some(a)) => a,
            });
        }
        match self {
            Reducer::Count => Some(n as f64),
            Reducer::Mean => acc.map(|s| s / n as f64),
            _ => acc,
        }
    }
}

/// Reduce the valid pixels of `raster` covered by `geometry` to one value.
///
/// Coverage is by pixel centre. A point samples the pixel it falls in; an
/// area smaller than a pixel falls back to the pixel containing its
/// centroid. The reduction runs at the raster's own resolution. Returns
/// `None` when no valid pixel is covered (`Count` returns `Some(0.0)`).
pub fn reduce_region<T: RasterElement>(
    raster: &Raster<T>,
    reducer: Reducer,
    geometry: &Geometry<f64>,
) -> Option<f64> {
    let valid = |row: usize, col: usize| -> Option<f64> {
        let v = raster.get(row, col).ok()?;
        if raster.is_nodata(v) {
            return None;
        }
        v.to_f64().filter(|f| !f.is_nan())
    };

    if let Geometry::Point(p) = geometry {
        let cell = raster.pixel_index(p.x(), p.y()).and_then(|(r, c)| valid(r, c));
        return reducer.reduce(cell.into_iter());
    }

    let covered = covered_pixels(raster, geometry);
    if covered.is_empty() {
        let cell = geometry
            .centroid()
            .and_then(|c| raster.pixel_index(c.x(), c.y()))
            .and_then(|(r, c)| valid(r, c));
        return reducer.reduce(cell.into_iter());
    }

    reducer.reduce(covered.into_iter().filter_map(|(r, c)| valid(r, c)))
}

/// Pixels whose centre intersects `geometry`, restricted to its bounding box
fn covered_pixels<T: RasterElement>(raster: &Raster<T>, geometry: &Geometry<f64>) -> Vec<(usize, usize)> {
    let Some(bbox) = geometry.bounding_rect() else {
        return Vec::new();
    };
    let (rows, cols) = raster.shape();
    let (c0, r0) = raster.geo_to_pixel(bbox.min().x, bbox.max().y);
    let (c1, r1) = raster.geo_to_pixel(bbox.max().x, bbox.min().y);
    if ![c0, r0, c1, r1].iter().all(|v| v.is_finite()) {
        return Vec::new();
    }

    let clamp = |v: f64, n: usize| v.floor().clamp(0.0, n as f64) as usize;
    let (row_lo, row_hi) = (clamp(r0.min(r1), rows), clamp(r0.max(r1) + 1.0, rows));
    let (col_lo, col_hi) = (clamp(c0.min(c1), cols), clamp(c0.max(c1) + 1.0, cols));

    let mut out = Vec::new();
    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            let (x, y) = raster.pixel_to_geo(col, row);
            if geometry.intersects(&Point::new(x, y)) {
                out.push((row, col));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use geo_types::{point, Rect};

    fn grid() -> Raster<f64> {
        // 4x4 unit cells covering x 0..4, y 0..4
        let mut r = Raster::from_vec((0..16).map(|v| v as f64).collect(), 4, 4).unwrap();
        r.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_point_first_and_max() {
        let r = grid();
        let p = Geometry::Point(point!(x: 1.5, y: 2.5));
        assert_eq!(reduce_region(&r, Reducer::First, &p), Some(5.0));
        assert_eq!(reduce_region(&r, Reducer::Max, &p), Some(5.0));
    }

    #[test]
    fn test_rect_reducers() {
        let r = grid();
        let rect = Geometry::Rect(Rect::new((0.0, 2.0), (2.0, 4.0)));
        assert_eq!(reduce_region(&r, Reducer::Max, &rect), Some(5.0));
        assert_eq!(reduce_region(&r, Reducer::Min, &rect), Some(0.0));
        assert_eq!(reduce_region(&r, Reducer::Sum, &rect), Some(10.0));
        assert_eq!(reduce_region(&r, Reducer::Mean, &rect), Some(2.5));
        assert_eq!(reduce_region(&r, Reducer::Count, &rect), Some(4.0));
        assert_eq!(reduce_region(&r, Reducer::First, &rect), Some(0.0));
    }

    #[test]
    fn test_nodata_skipped_and_outside() {
        let mut r = grid();
        r.set(1, 1, f64::NAN).unwrap();
        let p = Geometry::Point(point!(x: 1.5, y: 2.5));
        assert_eq!(reduce_region(&r, Reducer::Max, &p), None);
        assert_eq!(reduce_region(&r, Reducer::Count, &p), Some(0.0));

        let outside = Geometry::Point(point!(x: 10.0, y: 10.0));
        assert_eq!(reduce_region(&r, Reducer::First, &outside), None);
    }

    #[test]
    fn test_subpixel_area_uses_centroid() {
        let r = grid();
        let tiny = Geometry::Rect(Rect::new((3.1, 0.1), (3.2, 0.2)));
        assert_eq!(reduce_region(&r, Reducer::Max, &tiny), Some(15.0));
    }
}
