use crate::error::{MtError, Stage, check_len};
use crate::physics::fields::Fields;
use crate::physics::system::Complex64;
use crate::physics::{MU_0, omega};
use crate::survey::SurfaceProjection;
use nalgebra::DVector;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpedanceComponent {
    Real,
    Imag,
    Both,
}

impl FromStr for ImpedanceComponent {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real" => Ok(ImpedanceComponent::Real),
            "imag" => Ok(ImpedanceComponent::Imag),
            "both" => Ok(ImpedanceComponent::Both),
            other => Err(MtError::config(
                Stage::Survey,
                format!("impedance component must be real, imag, or both, not {other:?}"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppResPhaseComponent {
    AppRes,
    Phase,
    Both,
}

impl FromStr for AppResPhaseComponent {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appres" => Ok(AppResPhaseComponent::AppRes),
            "phase" => Ok(AppResPhaseComponent::Phase),
            "both" => Ok(AppResPhaseComponent::Both),
            other => Err(MtError::config(
                Stage::Survey,
                format!("apparent resistivity component must be appres, phase, or both, not {other:?}"),
            )),
        }
    }
}

/// A surface MT receiver.
///
/// "Both" receivers return their two components one after the other: all
/// frequencies of the first component, then all frequencies of the second.
/// Sensitivities use the same layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Receiver {
    /// Surface impedance Zxy.
    Impedance {
        location: f64,
        component: ImpedanceComponent,
        frequencies: Vec<f64>,
    },
    /// Apparent resistivity (Ohm m) and phase (degrees) derived from Zxy.
    AppResPhase {
        location: f64,
        component: AppResPhaseComponent,
        frequencies: Vec<f64>,
    },
}

/// Zxy = -1 / Hy(surface)
#[inline]
pub fn impedance(hy_surface: Complex64) -> Complex64 {
    -hy_surface.inv()
}

pub fn apparent_resistivity(z: Complex64, frequency: f64) -> f64 {
    z.norm_sqr() / (MU_0 * omega(frequency))
}

pub fn phase_degrees(z: Complex64) -> f64 {
    (z.im / z.re).atan().to_degrees()
}

/// `d appres / dZ` in the sense `d appres = Re(c dZ)`.
fn appres_sensitivity(z: Complex64, frequency: f64) -> Complex64 {
    z.conj() * (2.0 / (MU_0 * omega(frequency)))
}

impl Receiver {
    pub fn impedance(component: ImpedanceComponent, frequencies: Vec<f64>) -> Self {
        Receiver::Impedance {
            location: 0.0,
            component,
            frequencies,
        }
    }

    pub fn app_res_phase(component: AppResPhaseComponent, frequencies: Vec<f64>) -> Self {
        Receiver::AppResPhase {
            location: 0.0,
            component,
            frequencies,
        }
    }

    pub fn location(&self) -> f64 {
        match self {
            Receiver::Impedance { location, .. } | Receiver::AppResPhase { location, .. } => {
                *location
            }
        }
    }

    pub fn frequencies(&self) -> &[f64] {
        match self {
            Receiver::Impedance { frequencies, .. }
            | Receiver::AppResPhase { frequencies, .. } => frequencies,
        }
    }

    pub(crate) fn sort_frequencies(&mut self) -> &[f64] {
        let frequencies = match self {
            Receiver::Impedance { frequencies, .. }
            | Receiver::AppResPhase { frequencies, .. } => frequencies,
        };
        frequencies.sort_by(f64::total_cmp);
        frequencies
    }

    /// Number of data per frequency (2 for "both" receivers).
    pub fn n_components(&self) -> usize {
        match self {
            Receiver::Impedance {
                component: ImpedanceComponent::Both,
                ..
            }
            | Receiver::AppResPhase {
                component: AppResPhaseComponent::Both,
                ..
            } => 2,
            _ => 1,
        }
    }

    pub fn n_data(&self) -> usize {
        self.frequencies().len() * self.n_components()
    }

    /// Project the fields onto this receiver's data, one column of `fields`
    /// per entry of `frequencies`.
    pub fn eval(
        &self,
        fields: &Fields,
        frequencies: &[f64],
        p0: &SurfaceProjection,
    ) -> Result<Vec<f64>, MtError> {
        p0.check_fields(fields)?;
        check_len("field columns", frequencies.len(), fields.n_frequencies())?;
        let z: Vec<Complex64> = (0..frequencies.len())
            .map(|k| impedance(p0.apply(&fields.column(k))))
            .collect();

        let out = match self {
            Receiver::Impedance { component, .. } => {
                let re = z.iter().map(|z| z.re);
                let im = z.iter().map(|z| z.im);
                match component {
                    ImpedanceComponent::Real => re.collect(),
                    ImpedanceComponent::Imag => im.collect(),
                    ImpedanceComponent::Both => re.chain(im).collect(),
                }
            }
            Receiver::AppResPhase { component, .. } => {
                let appres = z
                    .iter()
                    .zip(frequencies)
                    .map(|(z, &f)| apparent_resistivity(*z, f));
                let phase = z.iter().map(|z| phase_degrees(*z));
                match component {
                    AppResPhaseComponent::AppRes => appres.collect(),
                    AppResPhaseComponent::Phase => phase.collect(),
                    AppResPhaseComponent::Both => appres.chain(phase).collect(),
                }
            }
        };
        Ok(out)
    }

    /// Derivative of this receiver's data at one frequency along the field
    /// perturbation `df`. Returns one value per component.
    pub fn eval_deriv(
        &self,
        field: &DVector<Complex64>,
        frequency: f64,
        p0: &SurfaceProjection,
        df: &DVector<Complex64>,
    ) -> Result<Vec<f64>, MtError> {
        check_len("field", p0.dim(), field.len())?;
        check_len("field perturbation", p0.dim(), df.len())?;
        let hy = p0.apply(field);
        let dz = p0.apply(df) / (hy * hy);

        let out = match self {
            Receiver::Impedance { component, .. } => match component {
                ImpedanceComponent::Real => vec![dz.re],
                ImpedanceComponent::Imag => vec![dz.im],
                ImpedanceComponent::Both => vec![dz.re, dz.im],
            },
            Receiver::AppResPhase { component, .. } => {
                let dappres = (appres_sensitivity(impedance(hy), frequency) * dz).re;
                // phase is excluded from the sensitivities
                match component {
                    AppResPhaseComponent::AppRes => vec![dappres],
                    AppResPhaseComponent::Phase => vec![0.0],
                    AppResPhaseComponent::Both => vec![dappres, 0.0],
                }
            }
        };
        Ok(out)
    }

    /// Adjoint of [`Receiver::eval_deriv`]: maps one value per component to a
    /// vector in field space (`dZ/df^T v`).
    pub fn eval_deriv_adjoint(
        &self,
        field: &DVector<Complex64>,
        frequency: f64,
        p0: &SurfaceProjection,
        v: &[f64],
    ) -> Result<DVector<Complex64>, MtError> {
        check_len("receiver adjoint ordinates", self.n_components(), v.len())?;
        check_len("field", p0.dim(), field.len())?;
        let hy = p0.apply(field);

        let weight = match self {
            Receiver::Impedance { component, .. } => match component {
                ImpedanceComponent::Real => Complex64::new(v[0], 0.0),
                ImpedanceComponent::Imag => Complex64::new(0.0, -v[0]),
                ImpedanceComponent::Both => Complex64::new(v[0], -v[1]),
            },
            Receiver::AppResPhase { component, .. } => match component {
                AppResPhaseComponent::Phase => {
                    return Ok(DVector::from_element(p0.dim(), Complex64::new(0.0, 0.0)));
                }
                AppResPhaseComponent::AppRes | AppResPhaseComponent::Both => {
                    appres_sensitivity(impedance(hy), frequency) * v[0]
                }
            },
        };
        Ok(p0.apply_transpose(weight / (hy * hy)))
    }

    /// Ordinates of `block` (this receiver's slice of a data vector) that
    /// belong to frequency index `k`.
    pub fn ordinates(&self, block: &[f64], k: usize) -> Vec<f64> {
        let nf = self.frequencies().len();
        (0..self.n_components()).map(|c| block[c * nf + k]).collect()
    }

    /// Inverse of [`Receiver::ordinates`].
    pub fn place(&self, block: &mut [f64], k: usize, values: &[f64]) {
        let nf = self.frequencies().len();
        for (c, value) in values.iter().enumerate() {
            block[c * nf + k] = *value;
        }
    }
}
