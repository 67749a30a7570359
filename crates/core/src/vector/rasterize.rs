//! Burn a numeric feature attribute onto a raster grid

use super::FeatureCollection;
use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement};
use geo::{BoundingRect, Intersects};
use geo_types::{Geometry, Point, Rect};

/// No-data value of rasterized attribute grids
pub const RASTERIZE_NODATA: i32 = i32::MIN;

/// Rasterize `property` onto the grid of `template`.
///
/// Each cell takes the value of the first feature (in collection order)
/// whose geometry covers the cell centre. Values are truncated toward zero,
/// so a `-3.5` attribute burns as `-3`. Cells no feature covers, and
/// features whose attribute is missing or non-numeric, leave
/// [`RASTERIZE_NODATA`].
pub fn rasterize_first<T: RasterElement>(
    collection: &FeatureCollection,
    property: &str,
    template: &Raster<T>,
) -> Result<Raster<i32>> {
    let burnable: Vec<(&Geometry<f64>, Rect<f64>, i32)> = collection
        .iter()
        .filter_map(|f| {
            let geometry = f.geometry.as_ref()?;
            let value = f.get_property(property)?.as_f64()?;
            let bbox = geometry.bounding_rect()?;
            Some((geometry, bbox, value.trunc() as i32))
        })
        .collect();

    if burnable.is_empty() && !collection.is_empty() {
        return Err(Error::Other(format!(
            "no feature carries a numeric '{}' attribute",
            property
        )));
    }

    let mut out: Raster<i32> = template.with_same_meta(template.rows(), template.cols());
    out.set_nodata(Some(RASTERIZE_NODATA));
    let transform = *template.transform();
    let last_col = template.cols().saturating_sub(1);

    for (row, mut line) in out.data_mut().outer_iter_mut().enumerate() {
        line.fill(RASTERIZE_NODATA);
        let (_, y0) = transform.pixel_to_geo(0, row);
        let (_, y1) = transform.pixel_to_geo(last_col, row);
        let (row_min, row_max) = (y0.min(y1), y0.max(y1));
        // features whose bounds cross this row, still in collection order
        let band: Vec<&(&Geometry<f64>, Rect<f64>, i32)> = burnable
            .iter()
            .filter(|(_, bbox, _)| row_max >= bbox.min().y && row_min <= bbox.max().y)
            .collect();
        if band.is_empty() {
            continue;
        }

        for (col, cell) in line.iter_mut().enumerate() {
            let (x, y) = transform.pixel_to_geo(col, row);
            let centre = Point::new(x, y);
            if let Some((_, _, v)) = band.iter().find(|(geometry, bbox, _)| {
                x >= bbox.min().x
                    && x <= bbox.max().x
                    && y >= bbox.min().y
                    && y <= bbox.max().y
                    && geometry.intersects(&centre)
            }) {
                *cell = *v;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use crate::vector::{AttributeValue, Feature};

    fn template() -> Raster<f64> {
        let mut r: Raster<f64> = Raster::new(2, 4);
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        r
    }

    fn square(x0: f64, x1: f64) -> Geometry<f64> {
        Geometry::Rect(Rect::new((x0, 0.0), (x1, 2.0)))
    }

    #[test]
    fn test_first_feature_wins_and_truncates() {
        let fc: FeatureCollection = vec![
            Feature::new(square(0.0, 2.0)).with_property("zone", AttributeValue::Float(-3.5)),
            Feature::new(square(1.0, 3.0)).with_property("zone", AttributeValue::Int(5)),
        ]
        .into_iter()
        .collect();

        let out = rasterize_first(&fc, "zone", &template()).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), -3);
        // overlap: cell centre x=1.5 is in both, first wins
        assert_eq!(out.get(0, 1).unwrap(), -3);
        assert_eq!(out.get(1, 2).unwrap(), 5);
        assert_eq!(out.get(1, 3).unwrap(), RASTERIZE_NODATA);
        assert_eq!(out.transform(), template().transform());
    }

    #[test]
    fn test_matches_cell_by_cell_scan() {
        // staggered overlapping boxes, most of them far from any given row
        let fc: FeatureCollection = (0..40)
            .map(|i| {
                let (x0, y0) = ((i % 7) as f64 * 1.3, i as f64 * 0.45);
                Feature::new(Geometry::Rect(Rect::new((x0, y0), (x0 + 2.5, y0 + 1.2))))
                    .with_property("zone", AttributeValue::Int(i))
            })
            .collect();
        let mut grid: Raster<f64> = Raster::new(40, 24);
        grid.set_transform(GeoTransform::new(-0.5, 19.5, 0.45, -0.5));

        let out = rasterize_first(&fc, "zone", &grid).unwrap();
        let mut burned = 0;
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let (x, y) = grid.pixel_to_geo(col, row);
                let expected = fc
                    .iter()
                    .find(|f| f.geometry.as_ref().is_some_and(|g| g.intersects(&Point::new(x, y))))
                    .and_then(|f| f.get_property("zone")?.as_f64())
                    .map_or(RASTERIZE_NODATA, |v| v as i32);
                assert_eq!(out.get(row, col).unwrap(), expected, "cell ({row}, {col})");
                burned += usize::from(expected != RASTERIZE_NODATA);
            }
        }
        assert!(burned > 0 && burned < grid.len());
    }

    #[test]
    fn test_missing_attribute() {
        let fc: FeatureCollection = vec![Feature::new(square(0.0, 4.0))].into_iter().collect();
        assert!(rasterize_first(&fc, "zone", &template()).is_err());

        let empty = FeatureCollection::new();
        let out = rasterize_first(&empty, "zone", &template()).unwrap();
        assert_eq!(out.valid_count(), 0);
    }
}
