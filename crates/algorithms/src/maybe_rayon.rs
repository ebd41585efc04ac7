//! Row-parallel execution with a sequential fallback.
//!
//! With the `parallel` feature the per-row loop runs on rayon's pool. Without
//! it, `into_par_iter()` resolves to `into_iter()` so the same iterator chain
//! compiles against the standard `Iterator` methods. Row results are
//! concatenated in row order either way, so output never depends on the
//! feature.

use grassmap_core::raster::{Raster, RasterElement};
use grassmap_core::{Error, Result};
use ndarray::{Array2, ArrayView1};

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

/// Compute an output raster on the grid of `template`, one row at a time.
///
/// `row_fn` receives the row index and must return exactly `cols` values.
pub(crate) fn map_rows<T, U, F>(template: &Raster<T>, nodata: Option<U>, row_fn: F) -> Result<Raster<U>>
where
    T: RasterElement,
    U: RasterElement,
    F: Fn(usize) -> Vec<U> + Sync + Send,
{
    let (rows, cols) = template.shape();
    let data: Vec<U> = (0..rows).into_par_iter().flat_map(row_fn).collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    template.derive(array, nodata)
}

/// Apply `cell_fn` to every cell of `raster`, passing `None` for no-data cells
pub(crate) fn map_cells<T, U, F>(raster: &Raster<T>, nodata: Option<U>, cell_fn: F) -> Result<Raster<U>>
where
    T: RasterElement,
    U: RasterElement,
    F: Fn(Option<T>) -> U + Sync + Send,
{
    map_rows(raster, nodata, |row| {
        let values: ArrayView1<T> = raster.data().row(row);
        values
            .iter()
            .map(|&v| cell_fn((!raster.is_nodata(v)).then_some(v)))
            .collect()
    })
}
