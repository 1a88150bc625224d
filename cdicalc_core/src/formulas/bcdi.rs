//! # Bragg CDI Formulas
//!
//! Sampling conditions for Bragg coherent diffraction imaging. The detector
//! must sample each interference fringe with enough pixels, and the rocking
//! curve must sample each fringe along the rocking direction with enough
//! angular steps.
//!
//! ## Notation
//!
//! - `λ` = X-ray wavelength
//! - `a` = Crystal size
//! - `D` = Sample to detector distance
//! - `p` = Detector pixel size
//! - `n_f` = Pixels per fringe on the detector
//! - `Δω` = Rocking curve angular step
//! - `n_ω` = Rocking steps per fringe

use std::f64::consts::FRAC_PI_2;

use super::registry::{Category, Formula, Solver};
use super::roles::Role;
use super::{arcsin, divide};

// =============================================================================
// FRINGE SPACING (small-angle approximation)
// =============================================================================

/// Fringe period on the detector: Δf = λ·D / a
#[inline]
pub fn fringe_spacing(wavelength: f64, detector_distance: f64, crystal_size: f64) -> Option<f64> {
    divide(wavelength * detector_distance, crystal_size)
}

// =============================================================================
// DETECTOR SAMPLING (exact)
// =============================================================================

/// Keep a half-angle on the principal branch of asin, |x| <= 90°.
///
/// The forward relations go through asin, so an inversion landing outside
/// this range would not reproduce its inputs.
#[inline]
fn on_asin_branch(half_angle: f64) -> Option<f64> {
    (half_angle.abs() <= FRAC_PI_2).then_some(half_angle)
}

/// Half of the angle subtended by one fringe: n_f·p / (2D)
#[inline]
fn half_fringe_angle(fringe_sampling: f64, pixel_size: f64, detector_distance: f64) -> Option<f64> {
    on_asin_branch(divide(fringe_sampling * pixel_size, 2.0 * detector_distance)?)
}

/// Fringe half-angle covered by the rocking scan: n_ω·Δω
#[inline]
fn rocking_half_angle(angular_sampling: f64, rocking_angle: f64) -> Option<f64> {
    on_asin_branch(angular_sampling * rocking_angle)
}

/// Half-angle of the fringe for a crystal of size a: asin(λ / 2a)
#[inline]
fn fringe_half_angle_for_size(wavelength: f64, crystal_size: f64) -> Option<f64> {
    arcsin(divide(wavelength, 2.0 * crystal_size)?)
}

/// Largest crystal whose fringes are still sampled by `fringe_sampling` pixels.
///
/// The angle between fringes is 2θ_f = n_f·p/D, the corresponding change of
/// scattering vector is Δq = 4π sin(θ_f)/λ and the crystal size is a = 2π/Δq:
///
/// ```text
/// a = λ / (2 sin(n_f·p / 2D))
/// ```
pub fn crystal_size_from_sampling(
    wavelength: f64,
    detector_distance: f64,
    pixel_size: f64,
    fringe_sampling: f64,
) -> Option<f64> {
    let half_angle = half_fringe_angle(fringe_sampling, pixel_size, detector_distance)?;
    divide(wavelength, 2.0 * half_angle.sin())
}

/// Minimum detector distance to sample the fringes of a crystal of size `a`
/// with `fringe_sampling` pixels: D = n_f·p / (2 asin(λ/2a))
pub fn min_detector_distance(
    wavelength: f64,
    crystal_size: f64,
    pixel_size: f64,
    fringe_sampling: f64,
) -> Option<f64> {
    let half_angle = fringe_half_angle_for_size(wavelength, crystal_size)?;
    divide(fringe_sampling * pixel_size, 2.0 * half_angle)
}

/// Pixels per fringe: n_f = 2D·asin(λ/2a) / p
pub fn fringe_sampling(wavelength: f64, crystal_size: f64, detector_distance: f64, pixel_size: f64) -> Option<f64> {
    let half_angle = fringe_half_angle_for_size(wavelength, crystal_size)?;
    divide(2.0 * detector_distance * half_angle, pixel_size)
}

// =============================================================================
// ANGULAR SAMPLING
// =============================================================================

/// Rocking steps per fringe: n_ω = asin(λ/2a) / Δω
pub fn angular_sampling(wavelength: f64, crystal_size: f64, rocking_angle: f64) -> Option<f64> {
    divide(fringe_half_angle_for_size(wavelength, crystal_size)?, rocking_angle)
}

/// Largest rocking step giving `angular_sampling` steps per fringe: Δω = asin(λ/2a) / n_ω
pub fn max_rocking_angle(wavelength: f64, crystal_size: f64, angular_sampling: f64) -> Option<f64> {
    divide(fringe_half_angle_for_size(wavelength, crystal_size)?, angular_sampling)
}

pub(crate) fn formulas() -> Vec<Formula> {
    vec![
        Formula {
            name: "fringe_spacing",
            title: "Fringe Spacing",
            description: "Period of the interference fringes of a finite crystal on the detector",
            relation: "fringe_spacing = wavelength * detector_distance / crystal_size",
            category: Category::Bcdi,
            roles: vec![Role::FringeSpacing, Role::Wavelength, Role::DetectorDistance, Role::CrystalSize],
            solvers: vec![
                Solver::new(Role::FringeSpacing, |k| {
                    fringe_spacing(k.get(Role::Wavelength)?, k.get(Role::DetectorDistance)?, k.get(Role::CrystalSize)?)
                }),
                Solver::new(Role::Wavelength, |k| {
                    divide(k.get(Role::FringeSpacing)? * k.get(Role::CrystalSize)?, k.get(Role::DetectorDistance)?)
                }),
                Solver::new(Role::DetectorDistance, |k| {
                    divide(k.get(Role::FringeSpacing)? * k.get(Role::CrystalSize)?, k.get(Role::Wavelength)?)
                }),
                Solver::new(Role::CrystalSize, |k| {
                    divide(k.get(Role::Wavelength)? * k.get(Role::DetectorDistance)?, k.get(Role::FringeSpacing)?)
                }),
            ],
            assumptions: vec!["Small-angle approximation", "Far-field (Fraunhofer) diffraction"],
        },
        Formula {
            name: "detector_sampling",
            title: "Detector Sampling",
            description: "Crystal size resolvable with a given number of detector pixels per fringe; \
                          solved for the distance it gives the minimum detector distance",
            relation: "crystal_size = wavelength / (2 * sin(fringe_sampling * detector_pixelsize / (2 * detector_distance)))",
            category: Category::Bcdi,
            roles: vec![
                Role::CrystalSize,
                Role::Wavelength,
                Role::DetectorDistance,
                Role::DetectorPixelsize,
                Role::FringeSampling,
            ],
            solvers: vec![
                Solver::new(Role::CrystalSize, |k| {
                    crystal_size_from_sampling(
                        k.get(Role::Wavelength)?,
                        k.get(Role::DetectorDistance)?,
                        k.get(Role::DetectorPixelsize)?,
                        k.get(Role::FringeSampling)?,
                    )
                }),
                Solver::new(Role::Wavelength, |k| {
                    let half_angle = half_fringe_angle(
                        k.get(Role::FringeSampling)?,
                        k.get(Role::DetectorPixelsize)?,
                        k.get(Role::DetectorDistance)?,
                    )?;
                    Some(2.0 * k.get(Role::CrystalSize)? * half_angle.sin())
                }),
                Solver::new(Role::DetectorDistance, |k| {
                    min_detector_distance(
                        k.get(Role::Wavelength)?,
                        k.get(Role::CrystalSize)?,
                        k.get(Role::DetectorPixelsize)?,
                        k.get(Role::FringeSampling)?,
                    )
                }),
                Solver::new(Role::DetectorPixelsize, |k| {
                    let half_angle = fringe_half_angle_for_size(k.get(Role::Wavelength)?, k.get(Role::CrystalSize)?)?;
                    divide(2.0 * k.get(Role::DetectorDistance)? * half_angle, k.get(Role::FringeSampling)?)
                }),
                Solver::new(Role::FringeSampling, |k| {
                    fringe_sampling(
                        k.get(Role::Wavelength)?,
                        k.get(Role::CrystalSize)?,
                        k.get(Role::DetectorDistance)?,
                        k.get(Role::DetectorPixelsize)?,
                    )
                }),
            ],
            assumptions: vec![
                "Fringe angle measured from the sample position",
                "Fringe half-angle below 90 degrees",
            ],
        },
        Formula {
            name: "angular_sampling",
            title: "Angular Sampling",
            description: "Rocking curve steps per fringe; solved for the step it gives the maximum rocking angle step",
            relation: "angular_sampling = asin(wavelength / (2 * crystal_size)) / rocking_angle",
            category: Category::Bcdi,
            roles: vec![Role::AngularSampling, Role::Wavelength, Role::CrystalSize, Role::RockingAngle],
            solvers: vec![
                Solver::new(Role::AngularSampling, |k| {
                    angular_sampling(k.get(Role::Wavelength)?, k.get(Role::CrystalSize)?, k.get(Role::RockingAngle)?)
                }),
                Solver::new(Role::RockingAngle, |k| {
                    max_rocking_angle(k.get(Role::Wavelength)?, k.get(Role::CrystalSize)?, k.get(Role::AngularSampling)?)
                }),
                Solver::new(Role::CrystalSize, |k| {
                    let half_angle = rocking_half_angle(k.get(Role::AngularSampling)?, k.get(Role::RockingAngle)?)?;
                    divide(k.get(Role::Wavelength)?, 2.0 * half_angle.sin())
                }),
                Solver::new(Role::Wavelength, |k| {
                    let half_angle = rocking_half_angle(k.get(Role::AngularSampling)?, k.get(Role::RockingAngle)?)?;
                    Some(2.0 * k.get(Role::CrystalSize)? * half_angle.sin())
                }),
            ],
            assumptions: vec!["Symmetric rocking curve around the Bragg peak"],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulas::Knowns;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs(),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_fringe_spacing() {
        // 1 Å, 1 m, 100 nm -> 1 mm
        assert_close(fringe_spacing(1e-10, 1.0, 100e-9).unwrap(), 1e-3);
        assert_eq!(fringe_spacing(1e-10, 1.0, 0.0), None);
    }

    #[test]
    fn test_crystal_size_matches_small_angle_limit() {
        // For small angles a ≈ λD/(n_f·p)
        let a = crystal_size_from_sampling(1.5e-10, 1.5, 55e-6, 5.0).unwrap();
        let approx = 1.5e-10 * 1.5 / (5.0 * 55e-6);
        assert!((a - approx).abs() / approx < 1e-6);
    }

    #[test]
    fn test_min_detector_distance_inverts_crystal_size() {
        let a = crystal_size_from_sampling(1.5e-10, 1.5, 55e-6, 5.0).unwrap();
        assert_close(min_detector_distance(1.5e-10, a, 55e-6, 5.0).unwrap(), 1.5);
        assert_close(fringe_sampling(1.5e-10, a, 1.5, 55e-6).unwrap(), 5.0);
    }

    #[test]
    fn test_min_detector_distance_typical_setup() {
        // 250 nm crystal at 1.5 Å with 55 µm pixels and 3 pixels per fringe
        let distance = min_detector_distance(1.5e-10, 250e-9, 55e-6, 3.0).unwrap();
        let expected = 3.0 * 55e-6 / (2.0 * (1.5e-10_f64 / (2.0 * 250e-9)).asin());
        assert_close(distance, expected);
        assert!(distance > 0.27 && distance < 0.28);
    }

    #[test]
    fn test_crystal_too_small_has_no_solution() {
        // λ/2a > 1
        assert_eq!(min_detector_distance(1.5e-10, 0.5e-10, 55e-6, 3.0), None);
        assert_eq!(angular_sampling(1.5e-10, 0.5e-10, 1e-4), None);
    }

    #[test]
    fn test_angular_sampling_and_max_rocking_angle() {
        let step = 0.01_f64.to_radians();
        let sampling = angular_sampling(1.5e-10, 250e-9, step).unwrap();
        assert_close(max_rocking_angle(1.5e-10, 250e-9, sampling).unwrap(), step);
    }

    #[test]
    fn test_inversions_stay_on_the_asin_branch() {
        let angular = formulas().into_iter().find(|f| f.name == "angular_sampling").unwrap();
        // 3 steps of 40° cover 120° of fringe half-angle, which asin cannot return
        let knowns = Knowns::new()
            .with(Role::Wavelength, 1e-10)
            .with(Role::RockingAngle, 40.0_f64.to_radians())
            .with(Role::AngularSampling, 3.0);
        for target in [Role::CrystalSize, Role::Wavelength] {
            let solver = angular.solvers.iter().find(|s| s.target == target).unwrap();
            let knowns = if target == Role::Wavelength {
                knowns.clone().with(Role::CrystalSize, 1e-9)
            } else {
                knowns.clone()
            };
            assert_eq!(solver.solve(&knowns), None, "{target}");
        }

        // n_f·p/2D above 90°
        assert_eq!(crystal_size_from_sampling(1e-10, 1e-4, 55e-6, 6.0), None);

        // Right at the edge the inversion still round-trips
        let size = crystal_size_from_sampling(1e-10, 1.0, 1.0, 2.0 * FRAC_PI_2).unwrap();
        assert_close(fringe_sampling(1e-10, size, 1.0, 1.0).unwrap(), 2.0 * FRAC_PI_2);
    }

    #[test]
    fn test_solvers_read_knowns() {
        let formula = formulas().into_iter().find(|f| f.name == "fringe_spacing").unwrap();
        let knowns = Knowns::new()
            .with(Role::Wavelength, 1e-10)
            .with(Role::DetectorDistance, 1.0)
            .with(Role::FringeSpacing, 1e-3);
        let solver = formula.solvers.iter().find(|s| s.target == Role::CrystalSize).unwrap();
        assert_close(solver.solve(&knowns).unwrap(), 100e-9);

        let incomplete = Knowns::new().with(Role::Wavelength, 1e-10);
        assert_eq!(solver.solve(&incomplete), None);
    }
}
