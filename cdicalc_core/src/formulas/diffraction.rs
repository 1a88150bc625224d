//! # Diffraction Geometry
//!
//! Photon energy, Bragg's law and the scattering vector.
//!
//! ## Notation
//!
//! - `E` = Photon energy
//! - `λ` = Wavelength
//! - `d` = Interplanar spacing
//! - `θ` = Bragg angle (half of the scattering angle 2θ)
//! - `q` = Scattering vector magnitude, 4π·sin(θ)/λ

use std::f64::consts::PI;

use super::registry::{Category, Formula, Solver};
use super::roles::Role;
use super::{arcsin, divide, HC};

// =============================================================================
// PHOTON ENERGY
// =============================================================================

/// E = h·c / λ
#[inline]
pub fn energy_from_wavelength(wavelength: f64) -> Option<f64> {
    divide(HC, wavelength)
}

/// λ = h·c / E
#[inline]
pub fn wavelength_from_energy(energy: f64) -> Option<f64> {
    divide(HC, energy)
}

// =============================================================================
// BRAGG'S LAW (first order)
// =============================================================================

/// λ = 2d·sin(θ)
#[inline]
pub fn bragg_wavelength(d_spacing: f64, bragg_angle: f64) -> f64 {
    2.0 * d_spacing * bragg_angle.sin()
}

/// θ = asin(λ / 2d)
#[inline]
pub fn bragg_angle(wavelength: f64, d_spacing: f64) -> Option<f64> {
    arcsin(divide(wavelength, 2.0 * d_spacing)?)
}

/// d = λ / (2 sin θ)
#[inline]
pub fn bragg_d_spacing(wavelength: f64, bragg_angle: f64) -> Option<f64> {
    divide(wavelength, 2.0 * bragg_angle.sin())
}

// =============================================================================
// SCATTERING VECTOR
// =============================================================================

/// q = 4π·sin(θ) / λ
#[inline]
pub fn scattering_vector(bragg_angle: f64, wavelength: f64) -> Option<f64> {
    divide(4.0 * PI * bragg_angle.sin(), wavelength)
}

/// d = 2π / q
#[inline]
pub fn d_spacing_from_q(q: f64) -> Option<f64> {
    divide(2.0 * PI, q)
}

pub(crate) fn formulas() -> Vec<Formula> {
    vec![
        Formula {
            name: "photon_energy",
            title: "Photon Energy",
            description: "Conversion between X-ray photon energy and wavelength",
            relation: "xray_energy * wavelength = h * c",
            category: Category::Diffraction,
            roles: vec![Role::XrayEnergy, Role::Wavelength],
            solvers: vec![
                Solver::new(Role::XrayEnergy, |k| energy_from_wavelength(k.get(Role::Wavelength)?)),
                Solver::new(Role::Wavelength, |k| wavelength_from_energy(k.get(Role::XrayEnergy)?)),
            ],
            assumptions: vec![],
        },
        Formula {
            name: "bragg_law",
            title: "Bragg's Law",
            description: "Wavelength, interplanar spacing and Bragg angle of a reflection",
            relation: "wavelength = 2 * d_spacing * sin(bragg_angle)",
            category: Category::Diffraction,
            roles: vec![Role::Wavelength, Role::DSpacing, Role::BraggAngle],
            solvers: vec![
                Solver::new(Role::Wavelength, |k| {
                    Some(bragg_wavelength(k.get(Role::DSpacing)?, k.get(Role::BraggAngle)?))
                }),
                Solver::new(Role::DSpacing, |k| {
                    bragg_d_spacing(k.get(Role::Wavelength)?, k.get(Role::BraggAngle)?)
                }),
                Solver::new(Role::BraggAngle, |k| bragg_angle(k.get(Role::Wavelength)?, k.get(Role::DSpacing)?)),
            ],
            assumptions: vec!["First diffraction order", "Bragg angle within [0, 90] degrees"],
        },
        Formula {
            name: "scattering_vector",
            title: "Scattering Vector",
            description: "Magnitude of the scattering vector at a given Bragg angle",
            relation: "scattering_vector = 4 * pi * sin(bragg_angle) / wavelength",
            category: Category::Diffraction,
            roles: vec![Role::ScatteringVector, Role::BraggAngle, Role::Wavelength],
            solvers: vec![
                Solver::new(Role::ScatteringVector, |k| {
                    scattering_vector(k.get(Role::BraggAngle)?, k.get(Role::Wavelength)?)
                }),
                Solver::new(Role::BraggAngle, |k| {
                    arcsin(k.get(Role::ScatteringVector)? * k.get(Role::Wavelength)? / (4.0 * PI))
                }),
                Solver::new(Role::Wavelength, |k| {
                    divide(4.0 * PI * k.get(Role::BraggAngle)?.sin(), k.get(Role::ScatteringVector)?)
                }),
            ],
            assumptions: vec!["Elastic scattering"],
        },
        Formula {
            name: "d_spacing",
            title: "Interplanar Spacing",
            description: "Interplanar spacing probed at a given scattering vector",
            relation: "d_spacing = 2 * pi / scattering_vector",
            category: Category::Diffraction,
            roles: vec![Role::DSpacing, Role::ScatteringVector],
            solvers: vec![
                Solver::new(Role::DSpacing, |k| d_spacing_from_q(k.get(Role::ScatteringVector)?)),
                Solver::new(Role::ScatteringVector, |k| d_spacing_from_q(k.get(Role::DSpacing)?)),
            ],
            assumptions: vec![],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEV: f64 = 1.602_176_634e-16;

    #[test]
    fn test_photon_energy() {
        // 10 keV -> 1.2398 Å
        let wavelength = wavelength_from_energy(10.0 * KEV).unwrap();
        assert!((wavelength / 1e-10 - 1.239_842).abs() < 1e-6);
        let energy = energy_from_wavelength(wavelength).unwrap();
        assert!((energy / KEV - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_wavelength() {
        assert_eq!(energy_from_wavelength(0.0), None);
    }

    #[test]
    fn test_bragg_law() {
        let theta = bragg_angle(1.0e-10, 2.0e-10).unwrap();
        assert!((theta.to_degrees() - 14.477_512).abs() < 1e-6);
        assert!((bragg_wavelength(2.0e-10, theta) - 1.0e-10).abs() < 1e-22);
        assert!((bragg_d_spacing(1.0e-10, theta).unwrap() - 2.0e-10).abs() < 1e-22);
    }

    #[test]
    fn test_bragg_angle_out_of_range() {
        assert_eq!(bragg_angle(5.0e-10, 2.0e-10), None);
    }

    #[test]
    fn test_q_and_d_agree_with_bragg() {
        // At the Bragg condition q = 2π/d
        let d = 2.0e-10;
        let wavelength = 1.5e-10;
        let theta = bragg_angle(wavelength, d).unwrap();
        let q = scattering_vector(theta, wavelength).unwrap();
        assert!((d_spacing_from_q(q).unwrap() - d).abs() < 1e-20);
    }
}
