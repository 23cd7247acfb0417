use crate::error::{MtError, check_len};
use crate::physics::system::Complex64;
use nalgebra::{DMatrix, DVector};

/// Solution of the Maxwell system at every survey frequency.
///
/// Column `k` holds the field vector for the k-th survey frequency:
/// Ex at the cell centres (first `n_cells` rows) followed by Hy on the
/// faces (`n_cells + 1` rows, the last one at the surface).
#[derive(Clone, Debug, PartialEq)]
pub struct Fields {
    n_cells: usize,
    values: DMatrix<Complex64>,
}

impl Fields {
    pub fn from_columns(n_cells: usize, columns: &[DVector<Complex64>]) -> Result<Self, MtError> {
        let n = 2 * n_cells + 1;
        for col in columns {
            check_len("field column", n, col.len())?;
        }
        Ok(Self {
            n_cells,
            values: DMatrix::from_fn(n, columns.len(), |i, k| columns[k][i]),
        })
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn n_frequencies(&self) -> usize {
        self.values.ncols()
    }

    pub fn matrix(&self) -> &DMatrix<Complex64> {
        &self.values
    }

    pub fn column(&self, k: usize) -> DVector<Complex64> {
        self.values.column(k).into_owned()
    }

    /// Ex at the cell centres for frequency index `k`.
    pub fn ex(&self, k: usize) -> DVector<Complex64> {
        self.values.column(k).rows(0, self.n_cells).into_owned()
    }

    /// Hy on the faces for frequency index `k`, surface last.
    pub fn hy(&self, k: usize) -> DVector<Complex64> {
        self.values
            .column(k)
            .rows(self.n_cells, self.n_cells + 1)
            .into_owned()
    }

    pub fn surface_hy(&self, k: usize) -> Complex64 {
        self.values[(2 * self.n_cells, k)]
    }
}
