use crate::error::MtError;
use crate::numerics::factor::Factorization;
use crate::numerics::timing::{SweepPhase, record};
use crate::physics::system::MaxwellSystem;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// Which matrix a factorization was computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// A, used by forward solves and Jvec.
    Direct,
    /// Aᵗ, used by the adjoint solves in Jtvec.
    Transposed,
}

/// Model-dependent state of a problem: conductivity, mapping Jacobian and
/// the per-frequency factorizations of A and Aᵗ.
///
/// Every slot is either absent or valid for the current model. The owner
/// must call [`SystemCache::invalidate`] whenever the model changes.
pub struct SystemCache<F> {
    sigma: Option<DVector<f64>>,
    sigma_deriv: Option<CsrMatrix<f64>>,
    a_inv: Option<Vec<F>>,
    at_inv: Option<Vec<F>>,
}

impl<F> Default for SystemCache<F> {
    fn default() -> Self {
        Self {
            sigma: None,
            sigma_deriv: None,
            a_inv: None,
            at_inv: None,
        }
    }
}

impl<F: Factorization> SystemCache<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.sigma = None;
        self.sigma_deriv = None;
        self.a_inv = None;
        self.at_inv = None;
    }

    pub fn is_empty(&self) -> bool {
        self.sigma.is_none()
            && self.sigma_deriv.is_none()
            && self.a_inv.is_none()
            && self.at_inv.is_none()
    }

    pub fn sigma_or_try_insert_with(
        &mut self,
        f: impl FnOnce() -> Result<DVector<f64>, MtError>,
    ) -> Result<&DVector<f64>, MtError> {
        let sigma = match self.sigma.take() {
            Some(sigma) => sigma,
            None => f()?,
        };
        Ok(self.sigma.insert(sigma))
    }

    pub fn sigma_deriv_or_try_insert_with(
        &mut self,
        f: impl FnOnce() -> Result<CsrMatrix<f64>, MtError>,
    ) -> Result<&CsrMatrix<f64>, MtError> {
        let jac = match self.sigma_deriv.take() {
            Some(jac) => jac,
            None => f()?,
        };
        Ok(self.sigma_deriv.insert(jac))
    }

    pub fn sigma(&self) -> Option<&DVector<f64>> {
        self.sigma.as_ref()
    }

    pub fn sigma_deriv(&self) -> Option<&CsrMatrix<f64>> {
        self.sigma_deriv.as_ref()
    }

    pub fn factors(&self, orientation: Orientation) -> Option<&[F]> {
        match orientation {
            Orientation::Direct => self.a_inv.as_deref(),
            Orientation::Transposed => self.at_inv.as_deref(),
        }
    }

    pub fn store(&mut self, orientation: Orientation, factors: Vec<F>) {
        match orientation {
            Orientation::Direct => self.a_inv = Some(factors),
            Orientation::Transposed => self.at_inv = Some(factors),
        }
    }
}

/// Assemble and factorize the system at every frequency. Frequencies are
/// processed in parallel and returned in input order; the first failure
/// aborts the whole sweep.
pub fn factorize_all<F: Factorization>(
    system: &MaxwellSystem,
    sigma: &DVector<f64>,
    frequencies: &[f64],
    orientation: Orientation,
) -> Result<Vec<F>, MtError> {
    record(SweepPhase::Factorization, || {
        frequencies
            .par_iter()
            .map(|&freq| -> Result<F, MtError> {
                let a = system.system_matrix(freq, sigma).map_err(|e| e.at_frequency(freq))?;
                let a = match orientation {
                    Orientation::Direct => a,
                    Orientation::Transposed => a.transpose(),
                };
                F::factorize(&a).map_err(|e| e.at_frequency(freq))
            })
            .collect()
    })
}
