//! # Coherence Formulas
//!
//! Transverse coherence of an undulator source and the secondary slit opening
//! needed to preserve it.
//!
//! ## Notation
//!
//! - `σ` = Source size
//! - `L` = Source to sample distance
//! - `δ` = Divergence of the source seen from the sample, σ/L
//! - `ξ` = Transverse coherence length, λ/δ
//! - `L_s` = Secondary source (slits) to sample distance
//! - `w` = Slit opening giving a coherence length ξ at the sample
//!
//! ## Horizontal and vertical planes
//!
//! The relations are identical in both transverse planes, so the roles carry
//! no direction. Undulator sources are strongly asymmetric. Evaluate or
//! propagate once with the horizontal source size and once with the vertical
//! one to get both columns of a beamline table.

use super::divide;
use super::registry::{Category, Formula, Solver};
use super::roles::Role;

/// δ = σ / L
#[inline]
pub fn source_divergence(source_size: f64, source_distance: f64) -> Option<f64> {
    divide(source_size, source_distance)
}

/// ξ = λ / δ
#[inline]
pub fn coherence_length(wavelength: f64, divergence: f64) -> Option<f64> {
    divide(wavelength, divergence)
}

/// w = L_s·λ / ξ
#[inline]
pub fn slit_opening(secondary_distance: f64, wavelength: f64, coherence_length: f64) -> Option<f64> {
    divide(secondary_distance * wavelength, coherence_length)
}

pub(crate) fn formulas() -> Vec<Formula> {
    vec![
        Formula {
            name: "source_divergence",
            title: "Source Divergence",
            description: "Angle subtended by the source as seen from the sample",
            relation: "divergence = source_size / source_distance",
            category: Category::Coherence,
            roles: vec![Role::Divergence, Role::SourceSize, Role::SourceDistance],
            solvers: vec![
                Solver::new(Role::Divergence, |k| {
                    source_divergence(k.get(Role::SourceSize)?, k.get(Role::SourceDistance)?)
                }),
                Solver::new(Role::SourceSize, |k| Some(k.get(Role::Divergence)? * k.get(Role::SourceDistance)?)),
                Solver::new(Role::SourceDistance, |k| divide(k.get(Role::SourceSize)?, k.get(Role::Divergence)?)),
            ],
            assumptions: vec!["Small-angle approximation"],
        },
        Formula {
            name: "transverse_coherence",
            title: "Transverse Coherence Length",
            description: "Transverse coherence length at the sample for a given source divergence",
            relation: "coherence_length = wavelength / divergence",
            category: Category::Coherence,
            roles: vec![Role::CoherenceLength, Role::Wavelength, Role::Divergence],
            solvers: vec![
                Solver::new(Role::CoherenceLength, |k| {
                    coherence_length(k.get(Role::Wavelength)?, k.get(Role::Divergence)?)
                }),
                Solver::new(Role::Wavelength, |k| Some(k.get(Role::CoherenceLength)? * k.get(Role::Divergence)?)),
                Solver::new(Role::Divergence, |k| {
                    coherence_length(k.get(Role::Wavelength)?, k.get(Role::CoherenceLength)?)
                }),
            ],
            assumptions: vec!["Gaussian Schell-model source", "Small-angle approximation"],
        },
        Formula {
            name: "secondary_slits",
            title: "Secondary Source Slits",
            description: "Slit opening of a secondary source giving the required coherence length at the sample",
            relation: "slit_opening = secondary_source_distance * wavelength / coherence_length",
            category: Category::Coherence,
            roles: vec![
                Role::SlitOpening,
                Role::SecondarySourceDistance,
                Role::Wavelength,
                Role::CoherenceLength,
            ],
            solvers: vec![
                Solver::new(Role::SlitOpening, |k| {
                    slit_opening(
                        k.get(Role::SecondarySourceDistance)?,
                        k.get(Role::Wavelength)?,
                        k.get(Role::CoherenceLength)?,
                    )
                }),
                Solver::new(Role::SecondarySourceDistance, |k| {
                    divide(k.get(Role::SlitOpening)? * k.get(Role::CoherenceLength)?, k.get(Role::Wavelength)?)
                }),
                Solver::new(Role::Wavelength, |k| {
                    divide(
                        k.get(Role::SlitOpening)? * k.get(Role::CoherenceLength)?,
                        k.get(Role::SecondarySourceDistance)?,
                    )
                }),
                Solver::new(Role::CoherenceLength, |k| {
                    slit_opening(
                        k.get(Role::SecondarySourceDistance)?,
                        k.get(Role::Wavelength)?,
                        k.get(Role::SlitOpening)?,
                    )
                }),
            ],
            assumptions: vec!["Slits act as the secondary source", "Small-angle approximation"],
        },
    ]
}
