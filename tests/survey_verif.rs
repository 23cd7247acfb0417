use nalgebra::DVector;

use mt1d_rs::discretization::mesh::Mesh;
use mt1d_rs::error::{MtError, Stage};
use mt1d_rs::models::mt1d::Mt1dProblem;
use mt1d_rs::numerics::cache::Orientation;
use mt1d_rs::physics::mapping::{ExpMap, ReciprocalMap};
use mt1d_rs::survey::{AppResPhaseComponent, ImpedanceComponent, Receiver, Source, Survey};

fn mesh() -> Mesh {
    let mut widths: Vec<f64> = (1..=8).rev().map(|i| 50.0 * 1.3f64.powi(i)).collect();
    widths.extend(std::iter::repeat_n(50.0, 40));
    Mesh::from_widths(widths).unwrap()
}

#[test]
fn receivers_must_share_the_frequency_set() {
    let err = Survey::new(vec![
        Source::plane_wave(vec![Receiver::impedance(
            ImpedanceComponent::Real,
            vec![1.0, 10.0],
        )]),
        Source::plane_wave(vec![Receiver::app_res_phase(
            AppResPhaseComponent::AppRes,
            vec![1.0, 10.0, 100.0],
        )]),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        MtError::Configuration {
            stage: Stage::Survey,
            ..
        }
    ));
}

#[test]
fn both_components_concatenate_single_components() {
    let freqs = vec![1.0, 3.0, 10.0];
    let survey = Survey::new(vec![Source::plane_wave(vec![
        Receiver::app_res_phase(AppResPhaseComponent::AppRes, freqs.clone()),
        Receiver::app_res_phase(AppResPhaseComponent::Phase, freqs.clone()),
        Receiver::app_res_phase(AppResPhaseComponent::Both, freqs.clone()),
        Receiver::impedance(ImpedanceComponent::Real, freqs.clone()),
        Receiver::impedance(ImpedanceComponent::Imag, freqs.clone()),
        Receiver::impedance(ImpedanceComponent::Both, freqs),
    ])])
    .unwrap();
    let mut p: Mt1dProblem = Mt1dProblem::new(mesh(), survey, Box::new(ExpMap)).unwrap();
    let m = DVector::from_element(48, (0.02f64).ln());
    let data = p.dpred(&m).unwrap();

    let concat = |a: &[f64], b: &[f64]| [a, b].concat();
    let both = data.get(0, 2).unwrap();
    assert_eq!(both.len(), 6);
    assert_eq!(both, concat(data.get(0, 0).unwrap(), data.get(0, 1).unwrap()).as_slice());
    let both = data.get(0, 5).unwrap();
    assert_eq!(both, concat(data.get(0, 3).unwrap(), data.get(0, 4).unwrap()).as_slice());
}

#[test]
fn repeated_fields_are_identical() {
    let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::impedance(
        ImpedanceComponent::Both,
        vec![0.5, 5.0],
    )])])
    .unwrap();
    let mut p: Mt1dProblem = Mt1dProblem::new(mesh(), survey, Box::new(ExpMap)).unwrap();
    let m = DVector::from_fn(48, |i, _| (0.01f64).ln() + 0.01 * i as f64);

    let f1 = p.fields(Some(&m)).unwrap();
    let f2 = p.fields(Some(&m)).unwrap();
    let f3 = p.fields(None).unwrap();
    assert_eq!(f1, f2);
    assert_eq!(f1, f3);
}

#[test]
fn new_model_invalidates_cached_factorizations() {
    let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::app_res_phase(
        AppResPhaseComponent::AppRes,
        vec![1.0],
    )])])
    .unwrap();
    let mut p: Mt1dProblem = Mt1dProblem::new(mesh(), survey, Box::new(ReciprocalMap)).unwrap();
    let rho1 = DVector::from_element(48, 100.0);
    let rho2 = DVector::from_element(48, 10.0);

    let d1 = p.dpred(&rho1).unwrap().into_vector();
    p.jtvec(&rho1, &DVector::from_element(1, 1.0), None).unwrap();
    assert!(p.cache().factors(Orientation::Direct).is_some());
    assert!(p.cache().factors(Orientation::Transposed).is_some());

    p.set_model(&rho2).unwrap();
    assert!(p.cache().factors(Orientation::Direct).is_none());
    assert!(p.cache().factors(Orientation::Transposed).is_none());
    assert!(p.cache().sigma_deriv().is_none());

    let fields = p.fields(None).unwrap();
    let d2 = p.eval(&fields).unwrap().into_vector();
    assert!(d2[0] < 0.5 * d1[0], "{} vs {}", d2[0], d1[0]);

    // back to the first model: same data as the first solve
    let d3 = p.dpred(&rho1).unwrap().into_vector();
    assert_eq!(d1, d3);
}

#[test]
fn survey_level_derivative_is_unimplemented() {
    let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::impedance(
        ImpedanceComponent::Real,
        vec![1.0],
    )])])
    .unwrap();
    assert!(matches!(survey.eval_deriv(), Err(MtError::Unimplemented(_))));
}

#[test]
fn unknown_component_strings_are_rejected() {
    assert!("real".parse::<ImpedanceComponent>().is_ok());
    assert!("appres".parse::<AppResPhaseComponent>().is_ok());
    let err = "tipper".parse::<ImpedanceComponent>().unwrap_err();
    assert!(err.to_string().contains("must be real, imag, or both"));
}
