//! Parameterizations mapping the inversion model onto cell conductivity.
//!
//! The problem never inspects the model directly: it asks the injected
//! [`Parameterization`] for the physical conductivity and for the Jacobian
//! `d sigma / d m` used by the sensitivity products.

use crate::error::MtError;
use crate::numerics::sparse::diagonal;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use num_dual::{Dual64, DualNum};

pub trait Parameterization: Send + Sync {
    /// Conductivity (S/m) per cell for model `m`.
    fn to_physical(&self, m: &DVector<f64>) -> DVector<f64>;

    /// Sparse Jacobian `d sigma / d m` (`n_cells` x `m.len()`).
    fn jacobian(&self, m: &DVector<f64>) -> Result<CsrMatrix<f64>, MtError>;
}

/// A map acting independently on every cell. The value is written once,
/// generically over dual numbers, and the diagonal Jacobian falls out of
/// forward-mode differentiation.
pub trait ElementwiseMap: Send + Sync {
    fn value<D: DualNum<f64>>(&self, m: D) -> D;
}

impl<M: ElementwiseMap> Parameterization for M {
    fn to_physical(&self, m: &DVector<f64>) -> DVector<f64> {
        m.map(|mi| self.value(mi))
    }

    fn jacobian(&self, m: &DVector<f64>) -> Result<CsrMatrix<f64>, MtError> {
        let derivatives: Vec<f64> = m
            .iter()
            .map(|&mi| self.value(Dual64::new(mi, 1.0)).eps)
            .collect();
        diagonal(&derivatives)
    }
}

/// Model is the conductivity itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMap;

impl ElementwiseMap for IdentityMap {
    fn value<D: DualNum<f64>>(&self, m: D) -> D {
        m
    }
}

/// Model is the natural log of conductivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpMap;

impl ElementwiseMap for ExpMap {
    fn value<D: DualNum<f64>>(&self, m: D) -> D {
        m.exp()
    }
}

/// Model is resistivity (Ohm m); conductivity is its reciprocal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReciprocalMap;

impl ElementwiseMap for ReciprocalMap {
    fn value<D: DualNum<f64>>(&self, m: D) -> D {
        m.recip()
    }
}

/// Model is the natural log of resistivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogResistivityMap;

impl ElementwiseMap for LogResistivityMap {
    fn value<D: DualNum<f64>>(&self, m: D) -> D {
        m.exp().recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use approx::assert_relative_eq;

    fn check_diagonal<M: Parameterization>(map: &M, m: &DVector<f64>, expected: impl Fn(f64) -> f64) {
        let jac = DMatrix::from(&map.jacobian(m).unwrap());
        assert_eq!(jac.shape(), (m.len(), m.len()));
        for (i, &mi) in m.iter().enumerate() {
            assert_relative_eq!(jac[(i, i)], expected(mi), max_relative = 1e-12);
        }
    }

    #[test]
    fn identity_has_unit_jacobian() {
        let m = DVector::from_vec(vec![0.01, 0.1, 1.0]);
        assert_eq!(IdentityMap.to_physical(&m), m);
        check_diagonal(&IdentityMap, &m, |_| 1.0);
    }

    #[test]
    fn exp_map_derivative_is_the_conductivity() {
        let m = DVector::from_vec(vec![-4.0, -2.0, 0.5]);
        let sigma = ExpMap.to_physical(&m);
        assert_relative_eq!(sigma[0], (-4.0f64).exp());
        check_diagonal(&ExpMap, &m, |x| x.exp());
    }

    #[test]
    fn resistivity_maps_are_reciprocal() {
        let rho = DVector::from_vec(vec![10.0, 100.0]);
        let sigma = ReciprocalMap.to_physical(&rho);
        assert_relative_eq!(sigma[1], 0.01);
        check_diagonal(&ReciprocalMap, &rho, |r| -1.0 / (r * r));

        let log_rho = rho.map(f64::ln);
        let sigma_log = LogResistivityMap.to_physical(&log_rho);
        assert_relative_eq!(sigma_log[1], 0.01, max_relative = 1e-12);
        check_diagonal(&LogResistivityMap, &log_rho, |x| -(-x).exp());
    }
}
