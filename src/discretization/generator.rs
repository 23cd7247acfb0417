use super::mesh::Mesh;
use crate::error::{MtError, Stage};

/// Layout of the core (finely discretized) part of the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoreLayout {
    /// Constant cell width equal to the smallest cell size.
    Linear,
    /// Widths log-spaced from the smallest cell size up to `max_hz_core`
    /// (ten times the smallest cell when `None`).
    Log { max_hz_core: Option<f64> },
}

/// Parameters for sizing a mesh from the skin depths of the survey band.
#[derive(Clone, Debug)]
pub struct SkinDepthMeshConfig {
    /// Background conductivity used to estimate skin depths (S/m).
    pub sigma: f64,
    pub max_depth_core: f64,
    pub cells_per_skin_depth: f64,
    /// Padding length in skin depths at the lowest frequency.
    pub skin_depths: f64,
    pub core: CoreLayout,
    pub padding_factor: f64,
}

impl Default for SkinDepthMeshConfig {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            max_depth_core: 3000.0,
            cells_per_skin_depth: 10.0,
            skin_depths: 2.0,
            core: CoreLayout::Linear,
            padding_factor: 1.3,
        }
    }
}

/// Approximate skin depth in metres, `500 sqrt(rho / f)`.
pub fn skin_depth(resistivity: f64, frequency: f64) -> f64 {
    500.0 * (resistivity / frequency).sqrt()
}

fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let (a, b) = (start.log10(), stop.log10());
    (0..n)
        .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n - 1) as f64))
        .collect()
}

fn padding_widths(start: f64, factor: f64, n: usize) -> Vec<f64> {
    (1..=n).map(|i| start * factor.powi(i as i32)).collect()
}

/// Build a mesh whose smallest cell resolves the highest frequency and whose
/// padding reaches several skin depths at the lowest frequency.
pub fn skin_depth_mesh(
    frequencies: &[f64],
    config: &SkinDepthMeshConfig,
    logging: bool,
) -> Result<Mesh, MtError> {
    if frequencies.is_empty() {
        return Err(MtError::config(Stage::Mesh, "no frequencies to design the mesh for"));
    }
    if frequencies.iter().any(|f| !(f.is_finite() && *f > 0.0)) {
        return Err(MtError::config(Stage::Mesh, "frequencies must be positive"));
    }
    if !(config.sigma > 0.0 && config.max_depth_core > 0.0 && config.cells_per_skin_depth > 0.0) {
        return Err(MtError::config(
            Stage::Mesh,
            "sigma, max_depth_core and cells_per_skin_depth must be positive",
        ));
    }
    if !(config.padding_factor > 1.0 && config.skin_depths > 0.0) {
        return Err(MtError::config(
            Stage::Mesh,
            "padding_factor must exceed 1 and skin_depths must be positive",
        ));
    }

    let rho = 1.0 / config.sigma;
    let fmin = frequencies.iter().cloned().fold(f64::INFINITY, f64::min);
    let fmax = frequencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let cs = skin_depth(rho, fmax) / config.cells_per_skin_depth;
    let length_bc = skin_depth(rho, fmin) * config.skin_depths;

    if logging {
        println!(">> Smallest cell size = {:.0} m", cs);
        println!(">> Padding distance = {:.0} m", length_bc);
    }

    let (max_hz_core, core) = match config.core {
        CoreLayout::Linear => {
            let ncz = ((config.max_depth_core / cs) as usize).max(1);
            (cs, vec![cs; ncz])
        }
        CoreLayout::Log { max_hz_core } => {
            let max_hz = max_hz_core.unwrap_or(cs * 10.0);
            if max_hz < cs {
                return Err(MtError::config(
                    Stage::Mesh,
                    format!("max_hz_core ({max_hz}) is smaller than the smallest cell ({cs})"),
                ));
            }
            let mut ncz = 2;
            let mut hz = logspace(cs, max_hz, ncz);
            while hz.iter().sum::<f64>() < config.max_depth_core {
                ncz += 1;
                hz = logspace(cs, max_hz, ncz);
            }
            // Finest cells at the surface
            hz.reverse();
            (max_hz, hz)
        }
    };

    let mut npad = 1;
    while padding_widths(max_hz_core, config.padding_factor, npad)
        .iter()
        .sum::<f64>()
        < length_bc
    {
        npad += 1;
    }

    if logging {
        println!(">> # of padding cells {}", npad);
        println!(">> # of core cells {}", core.len());
    }

    let mut widths = padding_widths(max_hz_core, config.padding_factor, npad);
    widths.reverse();
    widths.extend(core);
    Mesh::from_widths(widths)
}
