//! # Roles
//!
//! A [`Role`] is a named variable slot shared across formulas. Each role has a
//! single fixed [`Dimension`], so the same slot (e.g. `wavelength`) can feed
//! any formula that uses it, and a default display unit taken from the
//! conventions beamline scientists type into the calculator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CalcError;
use crate::units::Dimension;

/// Variable slot in a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// X-ray wavelength
    #[serde(alias = "xray_wavelength")]
    Wavelength,
    /// X-ray photon energy
    XrayEnergy,
    /// Size of the crystal or object along the probed direction
    CrystalSize,
    /// Sample to detector distance
    DetectorDistance,
    /// Detector pixel size
    #[serde(alias = "pixel_size")]
    DetectorPixelsize,
    /// Period of the interference fringes on the detector
    FringeSpacing,
    /// Number of detector pixels per fringe
    FringeSampling,
    /// Angular step of the rocking curve
    RockingAngle,
    /// Number of rocking steps per fringe
    AngularSampling,
    /// Beam size at the sample
    BeamSize,
    /// Speckle size on the detector
    SpeckleSize,
    /// Interplanar spacing of the reflection
    DSpacing,
    /// Bragg angle (half the scattering angle)
    BraggAngle,
    /// Magnitude of the scattering vector q
    ScatteringVector,
    /// Source size (FWHM)
    SourceSize,
    /// Distance from the source
    SourceDistance,
    /// Angular divergence seen from the sample
    Divergence,
    /// Transverse coherence length
    CoherenceLength,
    /// Distance from the secondary source (slits) to the sample
    SecondarySourceDistance,
    /// Opening of the secondary source slits
    SlitOpening,
}

impl Role {
    pub const ALL: [Role; 20] = [
        Role::Wavelength,
        Role::XrayEnergy,
        Role::CrystalSize,
        Role::DetectorDistance,
        Role::DetectorPixelsize,
        Role::FringeSpacing,
        Role::FringeSampling,
        Role::RockingAngle,
        Role::AngularSampling,
        Role::BeamSize,
        Role::SpeckleSize,
        Role::DSpacing,
        Role::BraggAngle,
        Role::ScatteringVector,
        Role::SourceSize,
        Role::SourceDistance,
        Role::Divergence,
        Role::CoherenceLength,
        Role::SecondarySourceDistance,
        Role::SlitOpening,
    ];

    /// Wire name (snake_case)
    pub fn name(&self) -> &'static str {
        match self {
            Role::Wavelength => "wavelength",
            Role::XrayEnergy => "xray_energy",
            Role::CrystalSize => "crystal_size",
            Role::DetectorDistance => "detector_distance",
            Role::DetectorPixelsize => "detector_pixelsize",
            Role::FringeSpacing => "fringe_spacing",
            Role::FringeSampling => "fringe_sampling",
            Role::RockingAngle => "rocking_angle",
            Role::AngularSampling => "angular_sampling",
            Role::BeamSize => "beam_size",
            Role::SpeckleSize => "speckle_size",
            Role::DSpacing => "d_spacing",
            Role::BraggAngle => "bragg_angle",
            Role::ScatteringVector => "scattering_vector",
            Role::SourceSize => "source_size",
            Role::SourceDistance => "source_distance",
            Role::Divergence => "divergence",
            Role::CoherenceLength => "coherence_length",
            Role::SecondarySourceDistance => "secondary_source_distance",
            Role::SlitOpening => "slit_opening",
        }
    }

    /// Math symbol used in relations and the formula reference
    pub fn symbol(&self) -> &'static str {
        match self {
            Role::Wavelength => "λ",
            Role::XrayEnergy => "E",
            Role::CrystalSize => "a",
            Role::DetectorDistance => "D",
            Role::DetectorPixelsize => "p",
            Role::FringeSpacing => "Δf",
            Role::FringeSampling => "n_f",
            Role::RockingAngle => "Δω",
            Role::AngularSampling => "n_ω",
            Role::BeamSize => "b",
            Role::SpeckleSize => "s",
            Role::DSpacing => "d",
            Role::BraggAngle => "θ",
            Role::ScatteringVector => "q",
            Role::SourceSize => "σ",
            Role::SourceDistance => "L",
            Role::Divergence => "δ",
            Role::CoherenceLength => "ξ",
            Role::SecondarySourceDistance => "L_s",
            Role::SlitOpening => "w",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Wavelength => "X-ray wavelength",
            Role::XrayEnergy => "X-ray photon energy",
            Role::CrystalSize => "Crystal size along the probed direction",
            Role::DetectorDistance => "Sample to detector distance",
            Role::DetectorPixelsize => "Detector pixel size",
            Role::FringeSpacing => "Fringe period on the detector",
            Role::FringeSampling => "Detector pixels per fringe",
            Role::RockingAngle => "Rocking curve angular step",
            Role::AngularSampling => "Rocking steps per fringe",
            Role::BeamSize => "Beam size at the sample",
            Role::SpeckleSize => "Speckle size on the detector",
            Role::DSpacing => "Interplanar spacing",
            Role::BraggAngle => "Bragg angle",
            Role::ScatteringVector => "Scattering vector magnitude",
            Role::SourceSize => "Source size",
            Role::SourceDistance => "Source to sample distance",
            Role::Divergence => "Beam divergence",
            Role::CoherenceLength => "Transverse coherence length",
            Role::SecondarySourceDistance => "Secondary source to sample distance",
            Role::SlitOpening => "Secondary slit opening",
        }
    }

    /// The dimension every quantity in this slot must have
    pub fn dimension(&self) -> Dimension {
        match self {
            Role::XrayEnergy => Dimension::Energy,
            Role::RockingAngle | Role::BraggAngle | Role::Divergence => Dimension::Angle,
            Role::FringeSampling | Role::AngularSampling => Dimension::Dimensionless,
            Role::ScatteringVector => Dimension::InverseLength,
            Role::Wavelength
            | Role::CrystalSize
            | Role::DetectorDistance
            | Role::DetectorPixelsize
            | Role::FringeSpacing
            | Role::BeamSize
            | Role::SpeckleSize
            | Role::DSpacing
            | Role::SourceSize
            | Role::SourceDistance
            | Role::CoherenceLength
            | Role::SecondarySourceDistance
            | Role::SlitOpening => Dimension::Length,
        }
    }

    /// Default display unit and number of decimals
    pub fn default_display(&self) -> (&'static str, usize) {
        match self {
            Role::Wavelength => ("angstrom", 4),
            Role::XrayEnergy => ("keV", 2),
            Role::CrystalSize => ("nm", 0),
            Role::DetectorDistance => ("m", 2),
            Role::DetectorPixelsize => ("um", 0),
            Role::FringeSpacing => ("mm", 3),
            Role::FringeSampling => ("1", 1),
            Role::RockingAngle => ("deg", 4),
            Role::AngularSampling => ("1", 1),
            Role::BeamSize => ("um", 1),
            Role::SpeckleSize => ("um", 0),
            Role::DSpacing => ("angstrom", 4),
            Role::BraggAngle => ("deg", 4),
            Role::ScatteringVector => ("1/angstrom", 4),
            Role::SourceSize => ("um", 1),
            Role::SourceDistance => ("m", 2),
            Role::Divergence => ("urad", 2),
            Role::CoherenceLength => ("um", 1),
            Role::SecondarySourceDistance => ("m", 2),
            Role::SlitOpening => ("um", 0),
        }
    }

    /// Default display unit symbol
    pub fn default_unit(&self) -> &'static str {
        self.default_display().0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "xray_wavelength" => return Ok(Role::Wavelength),
            "pixel_size" => return Ok(Role::DetectorPixelsize),
            _ => {}
        }
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.name() == normalized)
            .ok_or_else(|| CalcError::parse_error(s, "unknown role"))
    }
}
