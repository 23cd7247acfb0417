use crate::discretization::mesh::Mesh;
use crate::error::{MtError, Stage};
use crate::numerics::factor::{Factorization, SparseLu};
use crate::physics::bc::{BoundaryCondition, PLANE_WAVE_EX_BC};
use crate::physics::system::{Complex64, MaxwellSystem};
use crate::survey::SurfaceProjection;
use crate::survey::receiver::{apparent_resistivity, impedance, phase_degrees};
use nalgebra::DVector;
use rayon::prelude::*;
use std::str::FromStr;

/// What [`simulate_forward`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Impedance,
    AppRes,
}

impl FromStr for ResponseType {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "impedance" => Ok(ResponseType::Impedance),
            "app_res" => Ok(ResponseType::AppRes),
            _ => Err(MtError::config(
                Stage::Evaluation,
                format!("rtype must be 'impedance' or 'app_res', not {lower}"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ForwardResponse {
    /// Zxy per frequency.
    Impedance(Vec<Complex64>),
    /// Apparent resistivity (Ohm m) and phase (degrees) per frequency.
    AppRes { app_res: Vec<f64>, phase: Vec<f64> },
}

/// One-shot forward simulation on a conductivity model, without a survey.
/// Frequencies are used in the order given.
pub fn simulate_forward(
    mesh: &Mesh,
    sigma: &DVector<f64>,
    frequencies: &[f64],
    response: ResponseType,
) -> Result<ForwardResponse, MtError> {
    let mut mesh = mesh.clone();
    mesh.set_cell_grad_bc([BoundaryCondition::Dirichlet, BoundaryCondition::Dirichlet]);
    let system = MaxwellSystem::new(&mesh)?;
    let p0 = SurfaceProjection::new(mesh.n_cells())?;
    let rhs = system.rhs(PLANE_WAVE_EX_BC);

    let z: Vec<Complex64> = frequencies
        .par_iter()
        .map(|&freq| -> Result<Complex64, MtError> {
            let a = system.system_matrix(freq, sigma)?;
            let sol = SparseLu::factorize(&a)
                .and_then(|lu| lu.solve(&rhs))
                .map_err(|e| e.at_frequency(freq))?;
            Ok(impedance(p0.apply(&sol)))
        })
        .collect::<Result<_, _>>()?;

    Ok(match response {
        ResponseType::Impedance => ForwardResponse::Impedance(z),
        ResponseType::AppRes => ForwardResponse::AppRes {
            app_res: z
                .iter()
                .zip(frequencies)
                .map(|(z, &f)| apparent_resistivity(*z, f))
                .collect(),
            phase: z.iter().map(|z| phase_degrees(*z)).collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn response_type_is_case_insensitive() {
        assert_eq!("Impedance".parse::<ResponseType>().unwrap(), ResponseType::Impedance);
        assert_eq!("APP_RES".parse::<ResponseType>().unwrap(), ResponseType::AppRes);

        let err = "Phase".parse::<ResponseType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error during evaluation: rtype must be 'impedance' or 'app_res', not phase"
        );
    }

    #[test]
    fn both_responses_agree() {
        let mesh = Mesh::uniform(40, 100.0).unwrap();
        let sigma = DVector::from_element(40, 0.02);
        let freqs = [10.0, 1.0];

        let z = match simulate_forward(&mesh, &sigma, &freqs, ResponseType::Impedance).unwrap() {
            ForwardResponse::Impedance(z) => z,
            other => panic!("unexpected response {other:?}"),
        };
        let (rho, phase) =
            match simulate_forward(&mesh, &sigma, &freqs, ResponseType::AppRes).unwrap() {
                ForwardResponse::AppRes { app_res, phase } => (app_res, phase),
                other => panic!("unexpected response {other:?}"),
            };

        assert_eq!(z.len(), 2);
        for k in 0..2 {
            assert_relative_eq!(rho[k], apparent_resistivity(z[k], freqs[k]), max_relative = 1e-12);
            assert_relative_eq!(phase[k], phase_degrees(z[k]), max_relative = 1e-12);
        }
    }

    #[test]
    fn conductivity_length_is_checked() {
        let mesh = Mesh::uniform(4, 10.0).unwrap();
        let err = simulate_forward(&mesh, &DVector::zeros(3), &[1.0], ResponseType::AppRes);
        assert!(matches!(err, Err(MtError::DimensionMismatch { .. })));
    }
}
