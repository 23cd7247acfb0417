use mt1d_rs::discretization::generator::{SkinDepthMeshConfig, skin_depth_mesh};
use mt1d_rs::discretization::mesh::Mesh;
use mt1d_rs::models::mt1d::Mt1dProblem;
use mt1d_rs::numerics::timing::{print_timing, reset_timing};
use mt1d_rs::physics::mapping::ExpMap;
use mt1d_rs::processing::csv_writer;
use mt1d_rs::processing::summary::SimulationSummary;
use mt1d_rs::survey::{AppResPhaseComponent, Receiver, Source, Survey};
use nalgebra::DVector;
use std::fs;

fn main() {
    fs::create_dir_all("output/main").expect("Failed to create output directory");
    reset_timing();

    let frequencies: Vec<f64> = (0..17).map(|i| 10f64.powf(-2.0 + 0.25 * i as f64)).collect();

    let config = SkinDepthMeshConfig {
        sigma: 0.01,
        max_depth_core: 2000.0,
        ..Default::default()
    };
    let mesh = skin_depth_mesh(&frequencies, &config, true).expect("Failed to design mesh");
    let sigma = layered_model(&mesh);

    let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::app_res_phase(
        AppResPhaseComponent::Both,
        frequencies.clone(),
    )])])
    .expect("Invalid survey");

    let mut summary = SimulationSummary::from_problem(&mesh, &survey, &sigma);

    let mut problem: Mt1dProblem = Mt1dProblem::new(mesh, survey, Box::new(ExpMap))
        .expect("Failed to set up problem")
        .verbose(true);
    let m = sigma.map(f64::ln);

    let fields = match problem.fields(Some(&m)) {
        Ok(fields) => fields,
        Err(e) => {
            eprintln!("Forward solve failed: {}", e);
            return;
        }
    };
    let data = problem.eval(&fields).expect("Failed to evaluate survey");
    let values = data.as_vector().as_slice();
    let nf = frequencies.len();
    let (app_res, phase) = values.split_at(nf);
    summary.add_sounding(app_res);

    csv_writer::write_sounding("output/main/sounding.csv", &frequencies, app_res, phase)
        .expect("Failed to write sounding");
    println!("Sounding saved to output/main/sounding.csv");

    csv_writer::write_model("output/main/model.csv", &problem.mesh().nodes(), sigma.as_slice())
        .expect("Failed to write model");
    println!("Model saved to output/main/model.csv");

    // lowest frequency penetrates deepest
    let mesh = problem.mesh();
    csv_writer::write_profile("output/main/ex_profile.csv", &mesh.cell_centers(), &fields.ex(0))
        .expect("Failed to write Ex profile");
    csv_writer::write_profile("output/main/hy_profile.csv", &mesh.nodes(), &fields.hy(0))
        .expect("Failed to write Hy profile");
    println!("Field profiles at {:.3e} Hz saved to output/main/", frequencies[0]);
    println!();

    match adjoint_check(&mut problem, &m, &fields) {
        Ok((w_jv, v_jtw)) => {
            println!("Adjoint test: w.Jv = {:.6e}, v.Jtw = {:.6e}", w_jv, v_jtw);
            summary.add_adjoint_check(w_jv, v_jtw);
        }
        Err(e) => eprintln!("Sensitivity check failed: {}", e),
    }

    summary
        .write_to_file("output/main/simulation_summary.txt")
        .expect("Failed to write summary");
    summary.print_to_console();
    print_timing();

    println!("Summary saved to output/main/simulation_summary.txt");
}

/// 100 Ohm m half-space with a 10 Ohm m layer between 500 m and 1000 m depth.
fn layered_model(mesh: &Mesh) -> DVector<f64> {
    let centers = mesh.cell_centers();
    DVector::from_iterator(
        centers.len(),
        centers
            .iter()
            .map(|z| if (-1000.0..-500.0).contains(z) { 0.1 } else { 0.01 }),
    )
}

fn adjoint_check(
    problem: &mut Mt1dProblem,
    m: &DVector<f64>,
    fields: &mt1d_rs::physics::fields::Fields,
) -> Result<(f64, f64), mt1d_rs::MtError> {
    let n_data = problem.survey().n_data();
    let v = DVector::from_fn(m.len(), |i, _| (0.7 * i as f64).sin());
    let w = DVector::from_fn(n_data, |i, _| (1.3 * i as f64 + 0.5).cos());

    let jv = problem.jvec(m, &v, Some(fields))?;
    let jtw = problem.jtvec(m, &w, Some(fields))?;
    Ok((w.dot(&jv), v.dot(&jtw)))
}
