use crate::error::{MtError, Stage};
use crate::numerics::sparse::Triplets;
use crate::physics::bc::BoundaryCondition;
use nalgebra_sparse::CsrMatrix;

/// A 1D tensor mesh of vertically stacked layers.
///
/// Cells are ordered from the bottom of the domain up to the surface, which
/// sits at z = 0. Faces coincide with nodes in 1D, so `n_faces == n_nodes ==
/// n_cells + 1`, and face 0 is the bottom boundary.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub widths: Vec<f64>,
    /// Elevation of the bottom node (negative, the surface is at 0).
    pub origin: f64,
    boundary_conditions: Option<[BoundaryCondition; 2]>,
}

impl Mesh {
    /// Build a mesh from cell widths listed bottom to top.
    pub fn from_widths(widths: Vec<f64>) -> Result<Self, MtError> {
        if widths.is_empty() {
            return Err(MtError::config(Stage::Mesh, "mesh needs at least one cell"));
        }
        if let Some(h) = widths.iter().find(|h| !(h.is_finite() && **h > 0.0)) {
            return Err(MtError::config(
                Stage::Mesh,
                format!("cell widths must be positive and finite, got {h}"),
            ));
        }
        let depth: f64 = widths.iter().sum();
        Ok(Self {
            widths,
            origin: -depth,
            boundary_conditions: None,
        })
    }

    pub fn uniform(n_cells: usize, width: f64) -> Result<Self, MtError> {
        Self::from_widths(vec![width; n_cells])
    }

    pub fn n_cells(&self) -> usize {
        self.widths.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.widths.len() + 1
    }

    pub fn n_faces(&self) -> usize {
        self.n_nodes()
    }

    pub fn nodes(&self) -> Vec<f64> {
        let mut z = self.origin;
        let mut nodes = Vec::with_capacity(self.n_nodes());
        nodes.push(z);
        for h in &self.widths {
            z += h;
            nodes.push(z);
        }
        nodes
    }

    pub fn cell_centers(&self) -> Vec<f64> {
        self.nodes()
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    pub fn depth(&self) -> f64 {
        -self.origin
    }

    pub fn set_cell_grad_bc(&mut self, bc: [BoundaryCondition; 2]) {
        self.boundary_conditions = Some(bc);
    }

    pub fn boundary_conditions(&self) -> Option<[BoundaryCondition; 2]> {
        self.boundary_conditions
    }

    fn require_bc(&self) -> Result<[BoundaryCondition; 2], MtError> {
        self.boundary_conditions.ok_or_else(|| {
            MtError::config(
                Stage::Mesh,
                "cell gradient boundary conditions have not been set",
            )
        })
    }

    /// Volume associated with each face: neighbouring cell widths averaged,
    /// extrapolated from the single neighbour on the boundary.
    fn face_volumes(&self) -> Vec<f64> {
        let n = self.n_cells();
        (0..=n)
            .map(|j| match j {
                0 => self.widths[0],
                j if j == n => self.widths[n - 1],
                j => 0.5 * (self.widths[j - 1] + self.widths[j]),
            })
            .collect()
    }

    /// Cell-centre to face averaging operator (`n_faces` x `n_cells`).
    pub fn ave_cc2f(&self) -> Result<CsrMatrix<f64>, MtError> {
        let n = self.n_cells();
        let mut t = Triplets::with_capacity(n + 1, n, 2 * n);
        t.push(0, 0, 1.0);
        for j in 1..n {
            t.push(j, j - 1, 0.5);
            t.push(j, j, 0.5);
        }
        t.push(n, n - 1, 1.0);
        t.into_csr()
    }

    /// Face divergence (`n_cells` x `n_faces`).
    pub fn face_div(&self) -> Result<CsrMatrix<f64>, MtError> {
        let n = self.n_cells();
        let mut t = Triplets::with_capacity(n, n + 1, 2 * n);
        for (i, h) in self.widths.iter().enumerate() {
            t.push(i, i, -1.0 / h);
            t.push(i, i + 1, 1.0 / h);
        }
        t.into_csr()
    }

    /// Cell gradient onto faces (`n_faces` x `n_cells`), with the boundary
    /// rows modified according to the boundary conditions.
    pub fn cell_grad(&self) -> Result<CsrMatrix<f64>, MtError> {
        let [lower, upper] = self.require_bc()?;
        let n = self.n_cells();
        let v = self.face_volumes();
        let mut t = Triplets::with_capacity(n + 1, n, 2 * n);

        let w0 = lower.cell_weight();
        if w0 != 0.0 {
            t.push(0, 0, w0 / v[0]);
        }
        for j in 1..n {
            t.push(j, j - 1, -1.0 / v[j]);
            t.push(j, j, 1.0 / v[j]);
        }
        let wn = upper.cell_weight();
        if wn != 0.0 {
            t.push(n, n - 1, -wn / v[n]);
        }
        t.into_csr()
    }

    /// Boundary injection for the cell gradient (`n_faces` x 2). Column 0 is
    /// the bottom boundary value, column 1 the surface value.
    pub fn cell_grad_bc(&self) -> Result<CsrMatrix<f64>, MtError> {
        let [lower, upper] = self.require_bc()?;
        let n = self.n_cells();
        let v = self.face_volumes();
        let mut t = Triplets::with_capacity(n + 1, 2, 2);

        let w0 = lower.boundary_weight();
        if w0 != 0.0 {
            t.push(0, 0, -w0 / v[0]);
        }
        let wn = upper.boundary_weight();
        if wn != 0.0 {
            t.push(n, 1, wn / v[n]);
        }
        t.into_csr()
    }
}
