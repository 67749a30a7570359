//! Elementwise raster operations
//!
//! The building blocks of "raster algebra": unary maps (trig, abs, scaling),
//! binary zips (add, subtract, multiply, divide), comparison to a mask and
//! per-pixel selection. Every operation returns a new raster that shares
//! the transform and CRS of `self`.
//!
//! Masks are `Raster<u8>` with 1 = true, 0 = false.

use crate::error::Result;
use crate::raster::{Raster, RasterElement};
use ndarray::Zip;

impl<T: RasterElement> Raster<T> {
    /// Apply `f` to every cell
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        let data = self.data().mapv(f);
        self.rewrap(data, None)
    }

    /// Combine two co-registered rasters cell by cell
    pub fn zip_map<U, V, F>(&self, other: &Raster<U>, f: F) -> Result<Raster<V>>
    where
        U: RasterElement,
        V: RasterElement,
        F: Fn(T, U) -> V,
    {
        self.ensure_same_shape(other)?;
        let data = Zip::from(self.data())
            .and(other.data())
            .map_collect(|&a, &b| f(a, b));
        Ok(self.rewrap(data, None))
    }

    /// Comparison to mask: 1 where `pred` holds, 0 elsewhere
    pub fn compare<F>(&self, pred: F) -> Raster<u8>
    where
        F: Fn(T) -> bool,
    {
        self.map(|v| u8::from(pred(v)))
    }

    /// Elementwise `where(mask, if_true, if_false)`
    pub fn select(mask: &Raster<u8>, if_true: &Raster<T>, if_false: &Raster<T>) -> Result<Raster<T>> {
        mask.ensure_same_shape(if_true)?;
        mask.ensure_same_shape(if_false)?;
        let data = Zip::from(mask.data())
            .and(if_true.data())
            .and(if_false.data())
            .map_collect(|&m, &a, &b| if m != 0 { a } else { b });
        Ok(if_true.rewrap(data, if_true.nodata()))
    }

    /// Broadcast a constant over this raster's grid
    pub fn constant_like<U: RasterElement>(&self, value: U) -> Raster<U> {
        let data = ndarray::Array2::from_elem(self.shape(), value);
        self.rewrap(data, None)
    }

    fn rewrap<U: RasterElement>(&self, data: ndarray::Array2<U>, nodata: Option<U>) -> Raster<U> {
        let mut out = Raster::from_array(data);
        out.set_transform(*self.transform());
        out.set_crs(self.crs().cloned());
        out.set_nodata(nodata);
        out
    }
}

impl Raster<u8> {
    /// Number of set cells
    pub fn count_set(&self) -> usize {
        self.data().iter().filter(|&&v| v != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use crate::raster::{GeoTransform, Raster};
    use approx::assert_relative_eq;

    fn ramp() -> Raster<f64> {
        let mut r = Raster::from_vec((0..12).map(|v| v as f64).collect(), 3, 4).unwrap();
        r.set_transform(GeoTransform::new(-2.0, 1.5, 1.0, -1.0));
        r
    }

    #[test]
    fn test_map_and_zip() {
        let r = ramp();
        let doubled = r.map(|v| v * 2.0);
        let sum = r.zip_map(&doubled, |a, b| a + b).unwrap();
        assert_relative_eq!(sum.get(2, 3).unwrap(), 33.0);
        assert_eq!(sum.transform(), r.transform());
    }

    #[test]
    fn test_zip_shape_mismatch() {
        let a: Raster<f64> = Raster::new(3, 4);
        let b: Raster<f64> = Raster::new(4, 3);
        assert!(a.zip_map(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn test_select_where() {
        let r = ramp();
        let mask = r.compare(|v| v >= 6.0);
        let neg = r.map(|v| -v);
        let out = Raster::select(&mask, &neg, &r).unwrap();
        assert_eq!(out.get(0, 1).unwrap(), 1.0);
        assert_eq!(out.get(2, 0).unwrap(), -8.0);
        assert_eq!(mask.count_set(), 6);
    }
}
