use approx::assert_abs_diff_eq;
use nalgebra::DVector;

use mt1d_rs::discretization::generator::{SkinDepthMeshConfig, skin_depth_mesh};
use mt1d_rs::discretization::mesh::Mesh;
use mt1d_rs::models::mt1d::{ForwardResponse, Mt1dProblem, ResponseType, simulate_forward};
use mt1d_rs::physics::mapping::{IdentityMap, LogResistivityMap};
use mt1d_rs::survey::{AppResPhaseComponent, ImpedanceComponent, Receiver, Source, Survey};

const SIGMA: f64 = 0.01;

// 200 core cells of 25 m under the surface, 20 padding cells growing by 1.3
// below them.
fn halfspace_mesh() -> Mesh {
    let mut widths: Vec<f64> = (1..=20).rev().map(|i| 25.0 * 1.3f64.powi(i)).collect();
    widths.extend(std::iter::repeat_n(25.0, 200));
    Mesh::from_widths(widths).unwrap()
}

fn app_res_survey(frequencies: &[f64]) -> Survey {
    Survey::new(vec![Source::plane_wave(vec![Receiver::app_res_phase(
        AppResPhaseComponent::Both,
        frequencies.to_vec(),
    )])])
    .unwrap()
}

#[test]
fn halfspace_apparent_resistivity_and_phase() {
    let mesh = halfspace_mesh();
    let frequencies = [3.0, 10.0];
    let mut problem: Mt1dProblem =
        Mt1dProblem::new(mesh.clone(), app_res_survey(&frequencies), Box::new(IdentityMap))
            .unwrap();

    let sigma = DVector::from_element(mesh.n_cells(), SIGMA);
    let data = problem.dpred(&sigma).unwrap();
    let values = data.get(0, 0).unwrap();
    let (app_res, phase) = values.split_at(frequencies.len());

    for k in 0..frequencies.len() {
        assert!(
            (app_res[k] - 1.0 / SIGMA).abs() < 0.02 / SIGMA,
            "app_res at {} Hz: {}",
            frequencies[k],
            app_res[k]
        );
        assert_abs_diff_eq!(phase[k], 45.0, epsilon = 0.5);
    }
}

#[test]
fn resistivity_parameterization_gives_same_data() {
    let mesh = halfspace_mesh();
    let frequencies = [10.0];
    let survey = app_res_survey(&frequencies);

    let mut by_sigma: Mt1dProblem =
        Mt1dProblem::new(mesh.clone(), survey.clone(), Box::new(IdentityMap)).unwrap();
    let mut by_log_rho: Mt1dProblem =
        Mt1dProblem::new(mesh.clone(), survey, Box::new(LogResistivityMap)).unwrap();

    let d1 = by_sigma
        .dpred(&DVector::from_element(mesh.n_cells(), SIGMA))
        .unwrap();
    let d2 = by_log_rho
        .dpred(&DVector::from_element(mesh.n_cells(), (1.0 / SIGMA).ln()))
        .unwrap();

    let diff = (d1.as_vector() - d2.as_vector()).norm();
    assert!(diff < 1e-9 * d1.as_vector().norm(), "diff = {diff}");
}

#[test]
fn simulate_forward_matches_problem() {
    let mesh = halfspace_mesh();
    let frequencies = [10.0, 3.0];
    let sigma = DVector::from_element(mesh.n_cells(), SIGMA);

    let z = match simulate_forward(&mesh, &sigma, &frequencies, "impedance".parse().unwrap())
        .unwrap()
    {
        ForwardResponse::Impedance(z) => z,
        other => panic!("unexpected response {other:?}"),
    };
    let (app_res, phase) = match simulate_forward(&mesh, &sigma, &frequencies, ResponseType::AppRes)
        .unwrap()
    {
        ForwardResponse::AppRes { app_res, phase } => (app_res, phase),
        other => panic!("unexpected response {other:?}"),
    };

    // Survey frequencies are sorted, simulate_forward keeps the given order.
    let survey = Survey::new(vec![Source::plane_wave(vec![
        Receiver::impedance(ImpedanceComponent::Both, frequencies.to_vec()),
        Receiver::app_res_phase(AppResPhaseComponent::Both, frequencies.to_vec()),
    ])])
    .unwrap();
    let mut problem: Mt1dProblem =
        Mt1dProblem::new(mesh, survey, Box::new(IdentityMap)).unwrap();
    let data = problem.dpred(&sigma).unwrap();

    let zdata = data.get(0, 0).unwrap();
    let rdata = data.get(0, 1).unwrap();
    for (k, j) in [(0, 1), (1, 0)] {
        assert_abs_diff_eq!(zdata[j], z[k].re, epsilon = 1e-12);
        assert_abs_diff_eq!(zdata[2 + j], z[k].im, epsilon = 1e-12);
        assert_abs_diff_eq!(rdata[j], app_res[k], epsilon = 1e-8);
        assert_abs_diff_eq!(rdata[2 + j], phase[k], epsilon = 1e-8);
    }
}

#[test]
fn designed_mesh_reproduces_halfspace() {
    let frequencies = [1.0, 10.0];
    let config = SkinDepthMeshConfig {
        sigma: SIGMA,
        max_depth_core: 5000.0,
        cells_per_skin_depth: 20.0,
        skin_depths: 4.0,
        ..Default::default()
    };
    let mesh = skin_depth_mesh(&frequencies, &config, false).unwrap();
    let sigma = DVector::from_element(mesh.n_cells(), SIGMA);

    match simulate_forward(&mesh, &sigma, &frequencies, ResponseType::AppRes).unwrap() {
        ForwardResponse::AppRes { app_res, phase } => {
            for k in 0..2 {
                assert!((app_res[k] * SIGMA - 1.0).abs() < 0.03, "{:?}", app_res);
                assert_abs_diff_eq!(phase[k], 45.0, epsilon = 1.0);
            }
        }
        other => panic!("unexpected response {other:?}"),
    }
}
