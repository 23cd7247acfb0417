pub mod bc;
pub mod fields;
pub mod mapping;
pub mod system;

use std::f64::consts::PI;

/// Magnetic permeability of free space (H/m).
pub const MU_0: f64 = 4.0e-7 * PI;

/// Angular frequency (rad/s) for a frequency in Hz.
#[inline]
pub fn omega(frequency: f64) -> f64 {
    2.0 * PI * frequency
}
