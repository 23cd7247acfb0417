use crate::error::{MtError, Stage, check_len};
use crate::physics::system::Complex64;
use faer::Mat;
use faer::prelude::Solve;
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};
use nalgebra_sparse::CsrMatrix;

/// A reusable factorization of a square complex system.
pub trait Factorization: Sized + Send + Sync {
    fn factorize(matrix: &CsrMatrix<Complex64>) -> Result<Self, MtError>;

    fn solve(&self, rhs: &DVector<Complex64>) -> Result<DVector<Complex64>, MtError>;
}

fn check_square_and_finite(matrix: &CsrMatrix<Complex64>) -> Result<usize, MtError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(MtError::config(
            Stage::Factorization,
            format!("matrix must be square, got {}x{}", n, matrix.ncols()),
        ));
    }
    if matrix.values().iter().any(|v| !(v.re.is_finite() && v.im.is_finite())) {
        return Err(MtError::numerical(
            Stage::Factorization,
            "matrix contains NaN or Inf",
        ));
    }
    Ok(n)
}

fn check_solution(x: DVector<Complex64>) -> Result<DVector<Complex64>, MtError> {
    if !x.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        return Err(MtError::numerical(Stage::Solve, "solution contains NaN or Inf"));
    }
    Ok(x)
}

/// Sparse LU of the assembled system.
pub struct SparseLu {
    lu: Lu<usize, Complex64>,
    n: usize,
}

impl Factorization for SparseLu {
    fn factorize(matrix: &CsrMatrix<Complex64>) -> Result<Self, MtError> {
        let n = check_square_and_finite(matrix)?;
        let triplets: Vec<Triplet<usize, usize, Complex64>> = matrix
            .triplet_iter()
            .map(|(i, j, v)| Triplet::new(i, j, *v))
            .collect();
        let a = SparseColMat::<usize, Complex64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|e| {
                MtError::numerical(Stage::Factorization, format!("invalid sparse layout: {e:?}"))
            })?;
        let lu = a.sp_lu().map_err(|e| {
            MtError::numerical(Stage::Factorization, format!("sparse LU failed: {e:?}"))
        })?;
        Ok(Self { lu, n })
    }

    fn solve(&self, rhs: &DVector<Complex64>) -> Result<DVector<Complex64>, MtError> {
        check_len("right-hand side", self.n, rhs.len())?;
        let b = Mat::from_fn(self.n, 1, |i, _| rhs[i]);
        let x = self.lu.solve(&b);
        check_solution(DVector::from_fn(self.n, |i, _| x[(i, 0)]))
    }
}

/// LU with partial pivoting on the densified matrix. Only practical for
/// small meshes; used to cross-check [`SparseLu`].
pub struct DenseLu {
    lu: LU<Complex64, Dyn, Dyn>,
    n: usize,
}

impl Factorization for DenseLu {
    fn factorize(matrix: &CsrMatrix<Complex64>) -> Result<Self, MtError> {
        let n = check_square_and_finite(matrix)?;
        let lu = DMatrix::from(matrix).lu();
        if !lu.is_invertible() {
            return Err(MtError::numerical(Stage::Factorization, "matrix is singular"));
        }
        Ok(Self { lu, n })
    }

    fn solve(&self, rhs: &DVector<Complex64>) -> Result<DVector<Complex64>, MtError> {
        check_len("right-hand side", self.n, rhs.len())?;
        let x = self
            .lu
            .solve(rhs)
            .ok_or_else(|| MtError::numerical(Stage::Solve, "linear solve failed"))?;
        check_solution(x)
    }
}
