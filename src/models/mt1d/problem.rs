use crate::discretization::mesh::Mesh;
use crate::error::{MtError, Stage, check_len};
use crate::numerics::cache::{Orientation, SystemCache, factorize_all};
use crate::numerics::factor::{Factorization, SparseLu};
use crate::numerics::timing::{SweepPhase, record};
use crate::physics::bc::BoundaryCondition;
use crate::physics::fields::Fields;
use crate::physics::mapping::Parameterization;
use crate::physics::system::{Complex64, MaxwellSystem};
use crate::survey::{Data, SurfaceProjection, Survey};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// 1D MT forward problem in (Ex, Hy) with sensitivity products.
///
/// Holds one factorization of A (and, on demand, of Aᵗ) per survey
/// frequency for the current model. Changing the model drops them.
pub struct Mt1dProblem<F: Factorization = SparseLu> {
    mesh: Mesh,
    survey: Survey,
    system: MaxwellSystem,
    projection: SurfaceProjection,
    mapping: Box<dyn Parameterization>,
    model: Option<DVector<f64>>,
    cache: SystemCache<F>,
    verbose: bool,
}

impl<F: Factorization> Mt1dProblem<F> {
    /// Ex is fixed on both ends of the mesh, whatever conditions it carried.
    pub fn new(
        mut mesh: Mesh,
        survey: Survey,
        mapping: Box<dyn Parameterization>,
    ) -> Result<Self, MtError> {
        mesh.set_cell_grad_bc([BoundaryCondition::Dirichlet, BoundaryCondition::Dirichlet]);
        let system = MaxwellSystem::new(&mesh)?;
        let projection = SurfaceProjection::new(mesh.n_cells())?;
        Ok(Self {
            mesh,
            survey,
            system,
            projection,
            mapping,
            model: None,
            cache: SystemCache::new(),
            verbose: false,
        })
    }

    /// Replace the free-space permeability with one value per cell.
    pub fn with_mu(mut self, mu: &DVector<f64>) -> Result<Self, MtError> {
        self.system = MaxwellSystem::with_mu(&self.mesh, mu)?;
        self.cache.invalidate();
        Ok(self)
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn projection(&self) -> &SurfaceProjection {
        &self.projection
    }

    pub fn model(&self) -> Option<&DVector<f64>> {
        self.model.as_ref()
    }

    pub fn cache(&self) -> &SystemCache<F> {
        &self.cache
    }

    /// Store `m` and drop every model-dependent quantity.
    pub fn set_model(&mut self, m: &DVector<f64>) -> Result<(), MtError> {
        let sigma = self.mapping.to_physical(m);
        check_len("conductivity", self.mesh.n_cells(), sigma.len())?;
        if let Some(s) = sigma.iter().find(|s| !s.is_finite()) {
            return Err(MtError::config(
                Stage::Assembly,
                format!("conductivity must be finite, got {s}"),
            ));
        }

        self.cache.invalidate();
        self.cache.sigma_or_try_insert_with(|| Ok(sigma))?;
        self.model = Some(m.clone());
        Ok(())
    }

    /// Conductivity for the current model.
    pub fn sigma(&mut self) -> Result<&DVector<f64>, MtError> {
        let model = self.model.as_ref().ok_or_else(missing_model)?;
        let mapping = &self.mapping;
        self.cache
            .sigma_or_try_insert_with(|| Ok(mapping.to_physical(model)))
    }

    fn update_model(&mut self, m: Option<&DVector<f64>>) -> Result<(), MtError> {
        match m {
            Some(m) => self.set_model(m),
            None if self.model.is_some() => Ok(()),
            None => Err(missing_model()),
        }
    }

    /// Fields must come from this mesh and cover every survey frequency.
    fn check_fields(&self, fields: &Fields) -> Result<(), MtError> {
        self.projection.check_fields(fields)?;
        check_len("field columns", self.survey.n_frequencies(), fields.n_frequencies())
    }

    fn prepare(&mut self, orientation: Orientation) -> Result<(), MtError> {
        if self.cache.factors(orientation).is_some() {
            return Ok(());
        }
        if self.verbose {
            match orientation {
                Orientation::Direct => println!("Factorize A matrix"),
                Orientation::Transposed => println!("Factorize A^T matrix"),
            }
        }
        let model = self.model.as_ref().ok_or_else(missing_model)?;
        let mapping = &self.mapping;
        let sigma = self
            .cache
            .sigma_or_try_insert_with(|| Ok(mapping.to_physical(model)))?;
        let factors =
            factorize_all::<F>(&self.system, sigma, self.survey.frequencies(), orientation)?;
        self.cache.store(orientation, factors);
        Ok(())
    }

    fn prepare_sigma_deriv(&mut self) -> Result<(), MtError> {
        let model = self.model.as_ref().ok_or_else(missing_model)?;
        let mapping = &self.mapping;
        self.cache
            .sigma_deriv_or_try_insert_with(|| mapping.jacobian(model))?;
        Ok(())
    }

    /// Solve for (Ex, Hy) at every survey frequency. Passing a model replaces
    /// the current one and drops its factorizations first.
    pub fn fields(&mut self, m: Option<&DVector<f64>>) -> Result<Fields, MtError> {
        self.update_model(m)?;
        self.prepare(Orientation::Direct)?;
        if self.verbose {
            println!("Compute fields");
        }

        let factors = self
            .cache
            .factors(Orientation::Direct)
            .ok_or_else(|| MtError::numerical(Stage::Solve, "factorizations are missing"))?;
        let rhs = self.system.rhs(self.survey.ex_boundary());
        let frequencies = self.survey.frequencies();

        let columns: Vec<DVector<Complex64>> = record(SweepPhase::Solve, || {
            factors
                .par_iter()
                .zip(frequencies.par_iter())
                .map(|(lu, &freq)| lu.solve(&rhs).map_err(|e| e.at_frequency(freq)))
                .collect::<Result<Vec<_>, MtError>>()
        })?;
        Fields::from_columns(self.mesh.n_cells(), &columns)
    }

    /// Predicted data for model `m`.
    pub fn dpred(&mut self, m: &DVector<f64>) -> Result<Data, MtError> {
        let fields = self.fields(Some(m))?;
        self.survey.eval(&fields, &self.projection)
    }

    /// Evaluate the survey on precomputed fields.
    pub fn eval(&self, fields: &Fields) -> Result<Data, MtError> {
        self.survey.eval(fields, &self.projection)
    }

    /// Sensitivity times a model perturbation, `J v`, laid out like the data.
    pub fn jvec(
        &mut self,
        m: &DVector<f64>,
        v: &DVector<f64>,
        fields: Option<&Fields>,
    ) -> Result<DVector<f64>, MtError> {
        self.update_model(Some(m))?;
        check_len("model perturbation", m.len(), v.len())?;
        let computed;
        let fields = match fields {
            Some(f) => f,
            None => {
                computed = self.fields(None)?;
                &computed
            }
        };
        self.check_fields(fields)?;
        self.prepare(Orientation::Direct)?;
        self.prepare_sigma_deriv()?;

        let (factors, sigma_deriv) = self.cached_operators(Orientation::Direct)?;
        let system = &self.system;
        let p0 = &self.projection;
        let survey = &self.survey;
        let frequencies = survey.frequencies();

        // per frequency, per receiver: one value per component
        let per_frequency: Vec<Vec<Vec<f64>>> = record(SweepPhase::Solve, || {
            factors
                .par_iter()
                .zip(frequencies.par_iter())
                .enumerate()
                .map(|(k, (lu, &freq))| -> Result<Vec<Vec<f64>>, MtError> {
                    let field = fields.column(k);
                    let rhs = system.a_deriv_sigma(&field, sigma_deriv, v)?;
                    let df = -lu.solve(&rhs).map_err(|e| e.at_frequency(freq))?;
                    survey
                        .receivers()
                        .map(|rx| rx.eval_deriv(&field, freq, p0, &df))
                        .collect()
                })
                .collect::<Result<Vec<_>, MtError>>()
        })?;

        let mut jv = DVector::zeros(survey.n_data());
        for (r, (block, rx)) in survey.layout().iter().zip(survey.receivers()).enumerate() {
            let out = &mut jv.as_mut_slice()[block.range.clone()];
            for (k, values) in per_frequency.iter().enumerate() {
                rx.place(out, k, &values[r]);
            }
        }
        Ok(jv)
    }

    /// Transposed sensitivity times a data vector, `Jᵗ w`.
    pub fn jtvec(
        &mut self,
        m: &DVector<f64>,
        w: &DVector<f64>,
        fields: Option<&Fields>,
    ) -> Result<DVector<f64>, MtError> {
        self.update_model(Some(m))?;
        check_len("data vector", self.survey.n_data(), w.len())?;
        let computed;
        let fields = match fields {
            Some(f) => f,
            None => {
                computed = self.fields(None)?;
                &computed
            }
        };
        self.check_fields(fields)?;
        self.prepare(Orientation::Transposed)?;
        self.prepare_sigma_deriv()?;

        let (factors, sigma_deriv) = self.cached_operators(Orientation::Transposed)?;
        let system = &self.system;
        let p0 = &self.projection;
        let survey = &self.survey;
        let frequencies = survey.frequencies();
        let layout = survey.layout();
        let w = w.as_slice();

        let contributions: Vec<DVector<f64>> = record(SweepPhase::Solve, || {
            factors
                .par_iter()
                .zip(frequencies.par_iter())
                .enumerate()
                .map(|(k, (lu, &freq))| -> Result<DVector<f64>, MtError> {
                    let field = fields.column(k);
                    let mut rhs = DVector::from_element(system.size(), Complex64::new(0.0, 0.0));
                    for (block, rx) in layout.iter().zip(survey.receivers()) {
                        let ordinates = rx.ordinates(&w[block.range.clone()], k);
                        rhs += rx.eval_deriv_adjoint(&field, freq, p0, &ordinates)?;
                    }
                    let y = lu.solve(&rhs).map_err(|e| e.at_frequency(freq))?;
                    let d = system.a_deriv_sigma_adjoint(&field, sigma_deriv, &y)?;
                    Ok(-d.map(|c| c.re))
                })
                .collect::<Result<Vec<_>, MtError>>()
        })?;

        let mut jtv = DVector::zeros(m.len());
        for c in &contributions {
            jtv += c;
        }
        Ok(jtv)
    }

    fn cached_operators(
        &self,
        orientation: Orientation,
    ) -> Result<(&[F], &CsrMatrix<f64>), MtError> {
        let factors = self
            .cache
            .factors(orientation)
            .ok_or_else(|| MtError::numerical(Stage::Sensitivity, "factorizations are missing"))?;
        let sigma_deriv = self.cache.sigma_deriv().ok_or_else(|| {
            MtError::numerical(Stage::Sensitivity, "mapping jacobian is missing")
        })?;
        Ok((factors, sigma_deriv))
    }
}

fn missing_model() -> MtError {
    MtError::config(Stage::Solve, "model has not been set")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::factor::DenseLu;
    use crate::physics::mapping::{ExpMap, IdentityMap};
    use crate::survey::{ImpedanceComponent, Receiver, Source};

    fn problem() -> Mt1dProblem {
        problem_on(Mesh::uniform(20, 100.0).unwrap())
    }

    fn problem_on<F: Factorization>(mesh: Mesh) -> Mt1dProblem<F> {
        let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::impedance(
            ImpedanceComponent::Both,
            vec![1.0, 10.0],
        )])])
        .unwrap();
        Mt1dProblem::new(mesh, survey, Box::new(ExpMap)).unwrap()
    }

    #[test]
    fn fields_without_model_is_a_configuration_error() {
        let mut p = problem();
        assert!(matches!(
            p.fields(None),
            Err(MtError::Configuration { stage: Stage::Solve, .. })
        ));
    }

    #[test]
    fn model_length_is_checked() {
        let mut p = problem();
        let err = p.set_model(&DVector::zeros(19)).unwrap_err();
        assert!(matches!(err, MtError::DimensionMismatch { .. }));
        assert!(p.model().is_none());
    }

    #[test]
    fn changing_the_model_drops_factorizations() {
        let mut p = problem();
        let m = DVector::from_element(20, (0.01f64).ln());
        p.fields(Some(&m)).unwrap();
        assert!(p.cache().factors(Orientation::Direct).is_some());

        // passing the model again refactorizes, stale transposed factors included
        p.jtvec(&m, &DVector::zeros(4), None).unwrap();
        assert!(p.cache().factors(Orientation::Transposed).is_some());
        p.fields(Some(&m)).unwrap();
        assert!(p.cache().factors(Orientation::Direct).is_some());
        assert!(p.cache().factors(Orientation::Transposed).is_none());

        p.set_model(&m.map(|x| x + 0.1)).unwrap();
        assert!(p.cache().factors(Orientation::Direct).is_none());
        assert!(p.cache().sigma_deriv().is_none());
        assert!(p.cache().sigma().is_some());
    }

    #[test]
    fn surface_magnetic_field_is_nonzero() {
        let mesh = Mesh::uniform(10, 200.0).unwrap();
        let survey = Survey::new(vec![Source::plane_wave(vec![Receiver::impedance(
            ImpedanceComponent::Real,
            vec![5.0],
        )])])
        .unwrap();
        let mut p: Mt1dProblem = Mt1dProblem::new(mesh, survey, Box::new(IdentityMap))
            .unwrap()
            .verbose(false);
        let fields = p.fields(Some(&DVector::from_element(10, 0.05))).unwrap();
        assert_eq!(fields.matrix().shape(), (21, 1));
        assert!(fields.surface_hy(0).norm() > 0.0);
    }

    #[test]
    fn sensitivity_inputs_are_length_checked() {
        let mut p = problem();
        let m = DVector::from_element(20, (0.01f64).ln());
        assert!(p.jvec(&m, &DVector::zeros(3), None).is_err());
        assert!(p.jtvec(&m, &DVector::zeros(3), None).is_err());
        assert_eq!(p.jtvec(&m, &DVector::zeros(4), None).unwrap().len(), 20);
    }

    #[test]
    fn fields_from_another_mesh_are_rejected() {
        let mut small: Mt1dProblem = problem_on(Mesh::uniform(5, 100.0).unwrap());
        let foreign = small
            .fields(Some(&DVector::from_element(5, (0.01f64).ln())))
            .unwrap();

        let mut p = problem();
        let m = DVector::from_element(20, (0.01f64).ln());
        p.set_model(&m).unwrap();
        let mismatch = |r: Result<_, MtError>| {
            matches!(
                r,
                Err(MtError::DimensionMismatch {
                    expected: 41,
                    found: 11,
                    ..
                })
            )
        };
        assert!(mismatch(p.eval(&foreign).map(|_| ())));
        assert!(mismatch(
            p.jvec(&m, &DVector::zeros(20), Some(&foreign)).map(|_| ())
        ));
        assert!(mismatch(
            p.jtvec(&m, &DVector::zeros(4), Some(&foreign)).map(|_| ())
        ));
    }

    #[test]
    fn sparse_and_dense_factorizations_give_the_same_fields() {
        let m = DVector::from_fn(20, |i, _| (0.01f64).ln() + 0.05 * i as f64);
        let mut sparse = problem();
        let mut dense: Mt1dProblem<DenseLu> = problem_on(Mesh::uniform(20, 100.0).unwrap());

        let fs = sparse.fields(Some(&m)).unwrap();
        let fd = dense.fields(Some(&m)).unwrap();
        let diff = (fs.matrix() - fd.matrix()).norm();
        assert!(diff < 1e-9 * fd.matrix().norm(), "{diff}");
    }
}
