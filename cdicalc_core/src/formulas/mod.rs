//! # Experiment Setup Formulas
//!
//! Physical relations used to plan coherent X-ray diffraction experiments,
//! grouped the way the calculator tabs are:
//!
//! - [`bcdi`] - Bragg CDI: fringe spacing, detector sampling, rocking curve sampling
//! - [`cdi`] - Forward CDI: speckle size
//! - [`diffraction`] - Photon energy, Bragg's law, scattering vector
//! - [`coherence`] - Source divergence, transverse coherence, secondary slits
//! - [`registry`] - Formula definitions, validation and solving
//! - [`roles`] - The shared variable slots
//!
//! The plain functions in the category modules take and return canonical
//! magnitudes (m, rad, J, 1/m). They return `None` when the relation has no
//! real solution for the inputs (zero denominators, arcsine arguments outside
//! [-1, 1]).

pub mod bcdi;
pub mod cdi;
pub mod coherence;
pub mod diffraction;
pub mod registry;
pub mod roles;

pub use registry::{
    generate_formulas_markdown, Category, Formula, FormulaDescriptor, FormulaRegistry, Knowns,
    RoleDescriptor, SolveFn, Solver, REGISTRY,
};
pub use roles::Role;

/// Planck constant (J·s), exact since the 2019 SI redefinition
pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// h·c in J·m, the photon energy-wavelength product
pub const HC: f64 = PLANCK_CONSTANT * SPEED_OF_LIGHT;

/// `numerator / denominator`, or `None` for a zero denominator.
#[inline]
pub(crate) fn divide(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Principal arcsine, or `None` outside [-1, 1].
#[inline]
pub(crate) fn arcsin(x: f64) -> Option<f64> {
    if (-1.0..=1.0).contains(&x) {
        Some(x.asin())
    } else {
        None
    }
}
