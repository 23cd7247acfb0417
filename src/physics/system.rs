use crate::discretization::mesh::Mesh;
use crate::error::{MtError, Stage, check_len};
use crate::numerics::sparse::Triplets;
use crate::physics::bc::BoundaryCondition;
use crate::physics::{MU_0, omega};
use nalgebra::{Complex, DVector};
use nalgebra_sparse::CsrMatrix;

pub type Complex64 = Complex<f64>;

/// Quasi-static 1D Maxwell system in (Ex, Hy):
///
/// ```text
/// A = [ Grad        i w Mmu ]     rhs = [ -B Exbc ]
///     [ Msigma_hat  Div     ]           [    0    ]
/// ```
///
/// The mesh operators and the permeability mass matrix are computed once;
/// the conductivity and frequency are supplied per assembly.
#[derive(Clone, Debug)]
pub struct MaxwellSystem {
    n_cells: usize,
    grad: CsrMatrix<f64>,
    grad_bc: CsrMatrix<f64>,
    div: CsrMatrix<f64>,
    mf_mu: DVector<f64>,
}

impl MaxwellSystem {
    /// Uniform free-space permeability.
    pub fn new(mesh: &Mesh) -> Result<Self, MtError> {
        Self::with_mu(mesh, &DVector::from_element(mesh.n_cells(), MU_0))
    }

    pub fn with_mu(mesh: &Mesh, mu: &DVector<f64>) -> Result<Self, MtError> {
        match mesh.boundary_conditions() {
            Some([BoundaryCondition::Dirichlet, BoundaryCondition::Dirichlet]) => {}
            Some(bc) => {
                return Err(MtError::config(
                    Stage::Assembly,
                    format!("Ex needs Dirichlet conditions on both ends, mesh has {bc:?}"),
                ));
            }
            None => {
                return Err(MtError::config(
                    Stage::Assembly,
                    "mesh boundary conditions must be set to Dirichlet on both ends",
                ));
            }
        }
        check_len("permeability", mesh.n_cells(), mu.len())?;

        let ave = mesh.ave_cc2f()?;
        Ok(Self {
            n_cells: mesh.n_cells(),
            grad: mesh.cell_grad()?,
            grad_bc: mesh.cell_grad_bc()?,
            div: mesh.face_div()?,
            mf_mu: &ave * mu,
        })
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn n_faces(&self) -> usize {
        self.n_cells + 1
    }

    /// Number of unknowns, `2 n_cells + 1`.
    pub fn size(&self) -> usize {
        2 * self.n_cells + 1
    }

    /// Assemble A at `frequency` (Hz) for the cell conductivities `sigma`.
    pub fn system_matrix(
        &self,
        frequency: f64,
        sigma: &DVector<f64>,
    ) -> Result<CsrMatrix<Complex64>, MtError> {
        check_len("conductivity", self.n_cells, sigma.len())?;
        let (nc, nf) = (self.n_cells, self.n_faces());
        let n = self.size();
        let nnz = self.grad.nnz() + self.div.nnz() + nf + nc;
        let mut t = Triplets::with_capacity(n, n, nnz);

        let one = Complex64::new(1.0, 0.0);
        t.push_block(&self.grad, 0, 0, one);
        let iw = Complex64::new(0.0, omega(frequency));
        for (j, mu) in self.mf_mu.iter().enumerate() {
            t.push(j, nc + j, iw * *mu);
        }
        for (i, s) in sigma.iter().enumerate() {
            t.push(nf + i, i, Complex64::new(*s, 0.0));
        }
        t.push_block(&self.div, nf, nc, one);
        t.into_csr()
    }

    /// Right-hand side for boundary values `ex_bc` = [bottom, surface].
    pub fn rhs(&self, ex_bc: [f64; 2]) -> DVector<Complex64> {
        let bc = &self.grad_bc * &DVector::from_vec(ex_bc.to_vec());
        let mut rhs = DVector::from_element(self.size(), Complex64::new(0.0, 0.0));
        for (j, b) in bc.iter().enumerate() {
            rhs[j] = Complex64::new(-b, 0.0);
        }
        rhs
    }

    /// `dA/dm f v`: only the conductivity block depends on the model, so the
    /// result is zero on the first `n_faces` rows and `diag(Ex) S v` below.
    pub fn a_deriv_sigma(
        &self,
        field: &DVector<Complex64>,
        sigma_deriv: &CsrMatrix<f64>,
        v: &DVector<f64>,
    ) -> Result<DVector<Complex64>, MtError> {
        check_len("field", self.size(), field.len())?;
        check_len("model perturbation", sigma_deriv.ncols(), v.len())?;
        let dsigma = sigma_deriv * v;
        check_len("mapping jacobian", self.n_cells, dsigma.len())?;

        let nf = self.n_faces();
        let mut out = DVector::from_element(self.size(), Complex64::new(0.0, 0.0));
        for i in 0..self.n_cells {
            out[nf + i] = field[i] * dsigma[i];
        }
        Ok(out)
    }

    /// Adjoint of [`Self::a_deriv_sigma`]: `Sᵗ diag(Ex) y[n_faces..]`.
    pub fn a_deriv_sigma_adjoint(
        &self,
        field: &DVector<Complex64>,
        sigma_deriv: &CsrMatrix<f64>,
        y: &DVector<Complex64>,
    ) -> Result<DVector<Complex64>, MtError> {
        check_len("field", self.size(), field.len())?;
        check_len("adjoint vector", self.size(), y.len())?;
        check_len("mapping jacobian", self.n_cells, sigma_deriv.nrows())?;

        let nf = self.n_faces();
        let weighted =
            DVector::from_iterator(self.n_cells, (0..self.n_cells).map(|i| field[i] * y[nf + i]));
        let st = sigma_deriv.transpose();
        let re = &st * &weighted.map(|c| c.re);
        let im = &st * &weighted.map(|c| c.im);
        Ok(re.zip_map(&im, Complex64::new))
    }
}
