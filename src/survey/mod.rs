pub mod data;
pub mod receiver;

use crate::error::{MtError, Stage, check_len};
use crate::numerics::sparse::Triplets;
use crate::physics::bc::PLANE_WAVE_EX_BC;
use crate::physics::fields::Fields;
use crate::physics::system::Complex64;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::ops::Range;

pub use data::{Data, DataBlock};
pub use receiver::{AppResPhaseComponent, ImpedanceComponent, Receiver};

/// Plane-wave source: Ex = 0 at the bottom of the mesh and Ex = 1 at the
/// surface.
#[derive(Clone, Debug)]
pub struct Source {
    receivers: Vec<Receiver>,
    ex_boundary: [f64; 2],
}

impl Source {
    pub fn plane_wave(receivers: Vec<Receiver>) -> Self {
        Self {
            receivers,
            ex_boundary: PLANE_WAVE_EX_BC,
        }
    }

    pub fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    /// Ex boundary values as [bottom, surface].
    pub fn ex_boundary(&self) -> [f64; 2] {
        self.ex_boundary
    }

    pub fn n_data(&self) -> usize {
        self.receivers.iter().map(Receiver::n_data).sum()
    }
}

/// Row selector picking the surface Hy out of a field vector.
#[derive(Clone, Debug)]
pub struct SurfaceProjection {
    row: CsrMatrix<Complex64>,
    column: CsrMatrix<Complex64>,
}

impl SurfaceProjection {
    pub fn new(n_cells: usize) -> Result<Self, MtError> {
        let n = 2 * n_cells + 1;
        let mut t = Triplets::with_capacity(1, n, 1);
        t.push(0, 2 * n_cells, Complex64::new(1.0, 0.0));
        let row = t.into_csr()?;
        let column = row.transpose();
        Ok(Self { row, column })
    }

    /// Length of the field vectors this operator acts on.
    pub fn dim(&self) -> usize {
        self.row.ncols()
    }

    pub fn apply(&self, field: &DVector<Complex64>) -> Complex64 {
        (&self.row * field)[0]
    }

    pub fn apply_transpose(&self, value: Complex64) -> DVector<Complex64> {
        &self.column * &DVector::from_element(1, value)
    }

    /// Fails unless every column of `fields` has this operator's length.
    pub fn check_fields(&self, fields: &Fields) -> Result<(), MtError> {
        check_len("field rows", self.dim(), fields.matrix().nrows())
    }
}

/// Ordered sources and receivers, plus the frequency set they share.
#[derive(Clone, Debug)]
pub struct Survey {
    sources: Vec<Source>,
    frequencies: Vec<f64>,
}

impl Survey {
    /// Every receiver must measure exactly the survey's frequency set. Receiver
    /// frequency lists are stored in ascending order afterwards, so column `k`
    /// of a field matrix lines up with entry `k` of every receiver.
    pub fn new(mut sources: Vec<Source>) -> Result<Self, MtError> {
        let n_receivers: usize = sources.iter().map(|s| s.receivers.len()).sum();
        if n_receivers == 0 {
            return Err(MtError::config(Stage::Survey, "survey has no receivers"));
        }

        let mut frequencies: Vec<f64> = Vec::new();
        for rx in sources.iter().flat_map(|s| s.receivers.iter()) {
            if let Some(f) = rx.frequencies().iter().find(|f| !(f.is_finite() && **f > 0.0)) {
                return Err(MtError::config(
                    Stage::Survey,
                    format!("frequencies must be positive and finite, got {f}"),
                ));
            }
            frequencies.extend_from_slice(rx.frequencies());
        }
        let n_entries = frequencies.len();
        frequencies.sort_by(f64::total_cmp);
        frequencies.dedup();

        if n_entries != n_receivers * frequencies.len() {
            return Err(MtError::config(
                Stage::Survey,
                format!(
                    "# of frequencies of each receiver should be the same: {} entries over {} receivers, {} unique frequencies",
                    n_entries,
                    n_receivers,
                    frequencies.len()
                ),
            ));
        }

        for rx in sources.iter_mut().flat_map(|s| s.receivers.iter_mut()) {
            let sorted = rx.sort_frequencies();
            if sorted != frequencies.as_slice() {
                return Err(MtError::config(
                    Stage::Survey,
                    format!("receiver frequencies {sorted:?} differ from the survey set {frequencies:?}"),
                ));
            }
        }

        Ok(Self {
            sources,
            frequencies,
        })
    }

    /// Unique frequencies in ascending order.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn n_frequencies(&self) -> usize {
        self.frequencies.len()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn n_data(&self) -> usize {
        self.sources.iter().map(Source::n_data).sum()
    }

    /// Ex boundary values shared by the plane-wave sources.
    pub fn ex_boundary(&self) -> [f64; 2] {
        self.sources
            .first()
            .map_or(PLANE_WAVE_EX_BC, Source::ex_boundary)
    }

    pub fn receivers(&self) -> impl Iterator<Item = &Receiver> {
        self.sources.iter().flat_map(|s| s.receivers.iter())
    }

    /// Range of the data vector owned by each (source, receiver) pair, in
    /// survey order.
    pub fn layout(&self) -> Vec<DataBlock> {
        let mut offset = 0;
        let mut blocks = Vec::new();
        for (i, src) in self.sources.iter().enumerate() {
            for (j, rx) in src.receivers.iter().enumerate() {
                let range: Range<usize> = offset..offset + rx.n_data();
                offset = range.end;
                blocks.push(DataBlock {
                    source: i,
                    receiver: j,
                    range,
                });
            }
        }
        blocks
    }

    pub fn eval(&self, fields: &Fields, p0: &SurfaceProjection) -> Result<Data, MtError> {
        p0.check_fields(fields)?;
        check_len("field columns", self.n_frequencies(), fields.n_frequencies())?;
        let mut values = Vec::with_capacity(self.n_data());
        for rx in self.sources.iter().flat_map(|s| s.receivers.iter()) {
            values.extend(rx.eval(fields, &self.frequencies, p0)?);
        }
        Data::new(self, DVector::from_vec(values))
    }

    /// Field derivatives are projected by the receivers, not by the survey.
    pub fn eval_deriv(&self) -> Result<Data, MtError> {
        Err(MtError::Unimplemented("use receivers to project field derivatives"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rx(freqs: &[f64]) -> Receiver {
        Receiver::impedance(ImpedanceComponent::Real, freqs.to_vec())
    }

    #[test]
    fn frequencies_are_unique_and_sorted() {
        let survey = Survey::new(vec![
            Source::plane_wave(vec![rx(&[10.0, 1.0, 0.1])]),
            Source::plane_wave(vec![Receiver::app_res_phase(
                AppResPhaseComponent::Both,
                vec![0.1, 10.0, 1.0],
            )]),
        ])
        .unwrap();

        assert_eq!(survey.frequencies(), &[0.1, 1.0, 10.0]);
        assert_eq!(survey.sources()[0].receivers()[0].frequencies(), &[0.1, 1.0, 10.0]);
        assert_eq!(survey.n_data(), 3 + 6);

        let layout = survey.layout();
        assert_eq!(layout[0].range, 0..3);
        assert_eq!((layout[1].source, layout[1].receiver), (1, 0));
        assert_eq!(layout[1].range, 3..9);
    }

    #[test]
    fn mismatched_receiver_frequencies_are_rejected() {
        let err = Survey::new(vec![Source::plane_wave(vec![rx(&[1.0, 10.0]), rx(&[1.0])])])
            .err()
            .unwrap();
        assert_eq!(err.stage(), Some(Stage::Survey));
        assert!(err.to_string().contains("should be the same"), "{err}");

        // Same counts, different sets.
        let err = Survey::new(vec![Source::plane_wave(vec![
            rx(&[1.0, 1.0]),
            rx(&[1.0, 10.0]),
            rx(&[10.0, 10.0]),
        ])])
        .err()
        .unwrap();
        assert!(matches!(err, MtError::Configuration { .. }));
    }

    #[test]
    fn empty_survey_is_rejected() {
        assert!(Survey::new(vec![Source::plane_wave(vec![])]).is_err());
        assert!(Survey::new(vec![Source::plane_wave(vec![rx(&[-1.0])])]).is_err());
    }

    #[test]
    fn survey_level_derivative_is_unimplemented() {
        let survey = Survey::new(vec![Source::plane_wave(vec![rx(&[1.0])])]).unwrap();
        let err = survey.eval_deriv().unwrap_err();
        assert!(matches!(err, MtError::Unimplemented(_)));
        assert!(err.to_string().contains("use receivers to project field derivatives"));
    }

    #[test]
    fn projection_selects_the_surface_face() {
        let p0 = SurfaceProjection::new(3).unwrap();
        assert_eq!(p0.dim(), 7);
        let f = DVector::from_fn(7, |i, _| Complex64::new(i as f64, 1.0));
        assert_eq!(p0.apply(&f), Complex64::new(6.0, 1.0));

        let back = p0.apply_transpose(Complex64::new(2.0, -1.0));
        assert_eq!(back[6], Complex64::new(2.0, -1.0));
        assert_eq!(back.iter().filter(|c| c.norm() > 0.0).count(), 1);
    }

    #[test]
    fn fields_from_another_mesh_are_rejected() {
        let survey = Survey::new(vec![Source::plane_wave(vec![rx(&[1.0, 10.0])])]).unwrap();
        let p0 = SurfaceProjection::new(4).unwrap();
        let col = DVector::from_element(7, Complex64::new(1.0, -1.0));
        let fields = Fields::from_columns(3, &[col.clone(), col]).unwrap();

        assert!(matches!(
            p0.check_fields(&fields),
            Err(MtError::DimensionMismatch {
                expected: 9,
                found: 7,
                ..
            })
        ));
        assert!(matches!(
            survey.eval(&fields, &p0),
            Err(MtError::DimensionMismatch { .. })
        ));
    }
}
