use crate::error::{MtError, Stage};
use nalgebra::{ClosedAddAssign, Scalar};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_traits::Zero;
use std::ops::Mul;

/// Coordinate-format accumulator for assembling CSR operators.
/// Duplicate entries are summed by the CSR conversion.
pub struct Triplets<T> {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
}

impl<T> Triplets<T>
where
    T: Scalar + Copy + Zero + ClosedAddAssign,
{
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self::with_capacity(nrows, ncols, 0)
    }

    pub fn with_capacity(nrows: usize, ncols: usize, capacity: usize) -> Self {
        Self {
            nrows,
            ncols,
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, row: usize, col: usize, value: T) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// Copy every entry of `block` into this matrix, shifted by (`row0`, `col0`)
    /// and multiplied by `scale`.
    pub fn push_block<S>(&mut self, block: &CsrMatrix<S>, row0: usize, col0: usize, scale: T)
    where
        S: Scalar + Copy + Into<T>,
        T: Mul<Output = T>,
    {
        for (i, j, v) in block.triplet_iter() {
            self.push(row0 + i, col0 + j, scale * (*v).into());
        }
    }

    pub fn into_csr(self) -> Result<CsrMatrix<T>, MtError> {
        let coo =
            CooMatrix::try_from_triplets(self.nrows, self.ncols, self.rows, self.cols, self.values)
                .map_err(|e| {
                    MtError::numerical(Stage::Assembly, format!("invalid sparse layout: {e}"))
                })?;
        Ok(CsrMatrix::from(&coo))
    }
}

pub fn diagonal(values: &[f64]) -> Result<CsrMatrix<f64>, MtError> {
    let n = values.len();
    let mut t = Triplets::with_capacity(n, n, n);
    for (i, &v) in values.iter().enumerate() {
        t.push(i, i, v);
    }
    t.into_csr()
}
