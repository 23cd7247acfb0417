//! Frequency-domain 1D magnetotelluric modelling: finite-volume forward
//! solves in (Ex, Hy), surface responses and the sensitivity products
//! `J v` / `Jᵗ w` needed by gradient-based inversion.

pub mod discretization;
pub mod error;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;
pub mod survey;

pub use error::{MtError, Stage};
