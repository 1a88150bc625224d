//! # Forward CDI Formulas
//!
//! In forward-scattering CDI the illuminated area sets the speckle size on
//! the detector: s = λ·D / b, with `b` the beam size at the sample.

use super::divide;
use super::registry::{Category, Formula, Solver};
use super::roles::Role;

/// Speckle size on the detector: s = λ·D / b
#[inline]
pub fn speckle_size(wavelength: f64, detector_distance: f64, beam_size: f64) -> Option<f64> {
    divide(wavelength * detector_distance, beam_size)
}

pub(crate) fn formulas() -> Vec<Formula> {
    vec![Formula {
        name: "speckle_size",
        title: "Speckle Size",
        description: "Speckle size on the detector for a given illuminated area",
        relation: "speckle_size = wavelength * detector_distance / beam_size",
        category: Category::Cdi,
        roles: vec![Role::SpeckleSize, Role::Wavelength, Role::DetectorDistance, Role::BeamSize],
        solvers: vec![
            Solver::new(Role::SpeckleSize, |k| {
                speckle_size(k.get(Role::Wavelength)?, k.get(Role::DetectorDistance)?, k.get(Role::BeamSize)?)
            }),
            Solver::new(Role::Wavelength, |k| {
                divide(k.get(Role::SpeckleSize)? * k.get(Role::BeamSize)?, k.get(Role::DetectorDistance)?)
            }),
            Solver::new(Role::DetectorDistance, |k| {
                divide(k.get(Role::SpeckleSize)? * k.get(Role::BeamSize)?, k.get(Role::Wavelength)?)
            }),
            Solver::new(Role::BeamSize, |k| {
                speckle_size(k.get(Role::Wavelength)?, k.get(Role::DetectorDistance)?, k.get(Role::SpeckleSize)?)
            }),
        ],
        assumptions: vec!["Small-angle approximation", "Fully coherent illumination"],
    }]
}
