use crate::error::{MtError, Stage};
use std::str::FromStr;

/// Boundary condition applied to the cell-centred field at one end of the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryCondition {
    /// Prescribed value on the boundary face.
    Dirichlet,
    /// Zero normal derivative on the boundary face.
    Neumann,
}

impl BoundaryCondition {
    /// Stencil weight of the boundary cell in the boundary face gradient.
    /// The boundary face sits half a cell from the cell centre, hence the 2.
    pub(crate) fn cell_weight(self) -> f64 {
        match self {
            BoundaryCondition::Dirichlet => 2.0,
            BoundaryCondition::Neumann => 0.0,
        }
    }

    /// Weight of the boundary value injected into the boundary face gradient.
    pub(crate) fn boundary_weight(self) -> f64 {
        match self {
            BoundaryCondition::Dirichlet => 2.0,
            BoundaryCondition::Neumann => 0.0,
        }
    }
}

impl FromStr for BoundaryCondition {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dirichlet" => Ok(BoundaryCondition::Dirichlet),
            "neumann" => Ok(BoundaryCondition::Neumann),
            other => Err(MtError::config(
                Stage::Mesh,
                format!("boundary condition must be dirichlet or neumann, not {other}"),
            )),
        }
    }
}

/// Prescribed Ex values on the (bottom, surface) boundaries for a plane-wave source.
pub const PLANE_WAVE_EX_BC: [f64; 2] = [0.0, 1.0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "Dirichlet".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Dirichlet
        );
        assert_eq!(
            "neumann".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Neumann
        );
        assert!("robin".parse::<BoundaryCondition>().is_err());
    }
}
