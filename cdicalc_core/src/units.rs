//! # Quantities and Units
//!
//! A [`Quantity`] is a magnitude tagged with a [`Unit`] from the process-wide
//! [`UNIT_CATALOG`]. Every unit belongs to exactly one [`Dimension`] and knows
//! its scale relative to the canonical unit of that dimension, so conversion is
//! always "normalize to canonical, then scale to target".
//!
//! ## Canonical Units
//!
//! | Dimension | Canonical | Other units |
//! |-----------|-----------|-------------|
//! | Length | m | km, cm, mm, um, nm, angstrom, pm |
//! | Inverse length | 1/m | 1/nm, 1/angstrom |
//! | Angle | rad | mrad, urad, deg, mdeg |
//! | Energy | J | eV, meV, keV, MeV |
//! | Dimensionless | 1 | % |
//!
//! Multiplying two quantities is deliberately not supported: products of
//! dimensions only appear inside formulas, which work on canonical magnitudes.
//!
//! ## Example
//!
//! ```rust
//! use cdicalc_core::units::Quantity;
//!
//! let wavelength = Quantity::new(1.5, "angstrom").unwrap();
//! let in_nm = wavelength.convert("nm").unwrap();
//! assert!((in_nm.magnitude() - 0.15).abs() < 1e-12);
//!
//! let typed = Quantity::parse("55 um").unwrap();
//! assert_eq!(typed.unit().symbol(), "um");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

// ============================================================================
// Dimensions
// ============================================================================

/// Physical category of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Length,
    InverseLength,
    Angle,
    Energy,
    Dimensionless,
}

impl Dimension {
    /// All dimensions, in catalog order
    pub const ALL: [Dimension; 5] = [
        Dimension::Length,
        Dimension::InverseLength,
        Dimension::Angle,
        Dimension::Energy,
        Dimension::Dimensionless,
    ];

    /// Display name used in messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::InverseLength => "inverse length",
            Dimension::Angle => "angle",
            Dimension::Energy => "energy",
            Dimension::Dimensionless => "dimensionless",
        }
    }

    /// Symbol of the conversion pivot for this dimension
    pub fn canonical_symbol(&self) -> &'static str {
        match self {
            Dimension::Length => "m",
            Dimension::InverseLength => "1/m",
            Dimension::Angle => "rad",
            Dimension::Energy => "J",
            Dimension::Dimensionless => "1",
        }
    }

    /// The canonical unit of this dimension
    pub fn canonical_unit(&self) -> Unit {
        // Every canonical symbol is a catalog entry; the unit tests walk all of them.
        UNIT_CATALOG
            .lookup(self.canonical_symbol())
            .unwrap_or(Unit(&UNIT_DEFS[0]))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Dimension {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "length" => Ok(Dimension::Length),
            "inverse_length" => Ok(Dimension::InverseLength),
            "angle" => Ok(Dimension::Angle),
            "energy" => Ok(Dimension::Energy),
            "dimensionless" => Ok(Dimension::Dimensionless),
            _ => Err(CalcError::parse_error(s, "unknown dimension")),
        }
    }
}

// ============================================================================
// Unit Catalog
// ============================================================================

/// Static definition of a unit.
#[derive(Debug, PartialEq)]
pub struct UnitDef {
    /// Primary symbol (e.g., "nm")
    pub symbol: &'static str,
    /// Human-readable name
    pub name: &'static str,
    pub dimension: Dimension,
    /// Multiply a magnitude in this unit by `scale` to get the canonical magnitude
    pub scale: f64,
    /// Alternative spellings accepted on input
    pub aliases: &'static [&'static str],
}

/// Most decimals [`Quantity::format_with_precision`] will print. An `f64`
/// carries no more than 17 significant digits.
pub const MAX_PRECISION: usize = 17;

const DEG: f64 = std::f64::consts::PI / 180.0;
const ELECTRON_VOLT: f64 = 1.602_176_634e-19;

/// Every unit the engine understands, grouped by dimension, canonical first.
pub static UNIT_DEFS: &[UnitDef] = &[
    // Length
    UnitDef { symbol: "m", name: "meter", dimension: Dimension::Length, scale: 1.0, aliases: &["meter"] },
    UnitDef { symbol: "km", name: "kilometer", dimension: Dimension::Length, scale: 1e3, aliases: &[] },
    UnitDef { symbol: "cm", name: "centimeter", dimension: Dimension::Length, scale: 1e-2, aliases: &[] },
    UnitDef { symbol: "mm", name: "millimeter", dimension: Dimension::Length, scale: 1e-3, aliases: &[] },
    UnitDef { symbol: "um", name: "micrometer", dimension: Dimension::Length, scale: 1e-6, aliases: &["µm", "μm", "micron"] },
    UnitDef { symbol: "nm", name: "nanometer", dimension: Dimension::Length, scale: 1e-9, aliases: &[] },
    UnitDef { symbol: "angstrom", name: "angstrom", dimension: Dimension::Length, scale: 1e-10, aliases: &["Å", "Angstrom"] },
    UnitDef { symbol: "pm", name: "picometer", dimension: Dimension::Length, scale: 1e-12, aliases: &[] },
    // Inverse length
    UnitDef { symbol: "1/m", name: "inverse meter", dimension: Dimension::InverseLength, scale: 1.0, aliases: &["m^-1"] },
    UnitDef { symbol: "1/nm", name: "inverse nanometer", dimension: Dimension::InverseLength, scale: 1e9, aliases: &["nm^-1"] },
    UnitDef { symbol: "1/angstrom", name: "inverse angstrom", dimension: Dimension::InverseLength, scale: 1e10, aliases: &["1/Å", "angstrom^-1"] },
    // Angle
    UnitDef { symbol: "rad", name: "radian", dimension: Dimension::Angle, scale: 1.0, aliases: &["radian"] },
    UnitDef { symbol: "mrad", name: "milliradian", dimension: Dimension::Angle, scale: 1e-3, aliases: &[] },
    UnitDef { symbol: "urad", name: "microradian", dimension: Dimension::Angle, scale: 1e-6, aliases: &["µrad", "μrad"] },
    UnitDef { symbol: "deg", name: "degree", dimension: Dimension::Angle, scale: DEG, aliases: &["°", "degree"] },
    UnitDef { symbol: "mdeg", name: "millidegree", dimension: Dimension::Angle, scale: DEG * 1e-3, aliases: &[] },
    // Energy
    UnitDef { symbol: "J", name: "joule", dimension: Dimension::Energy, scale: 1.0, aliases: &["joule"] },
    UnitDef { symbol: "eV", name: "electronvolt", dimension: Dimension::Energy, scale: ELECTRON_VOLT, aliases: &[] },
    UnitDef { symbol: "meV", name: "millielectronvolt", dimension: Dimension::Energy, scale: ELECTRON_VOLT * 1e-3, aliases: &[] },
    UnitDef { symbol: "keV", name: "kiloelectronvolt", dimension: Dimension::Energy, scale: ELECTRON_VOLT * 1e3, aliases: &[] },
    UnitDef { symbol: "MeV", name: "megaelectronvolt", dimension: Dimension::Energy, scale: ELECTRON_VOLT * 1e6, aliases: &[] },
    // Dimensionless
    UnitDef { symbol: "1", name: "dimensionless", dimension: Dimension::Dimensionless, scale: 1.0, aliases: &["", "dimensionless"] },
    UnitDef { symbol: "%", name: "percent", dimension: Dimension::Dimensionless, scale: 1e-2, aliases: &["percent"] },
];

/// Read-only symbol index over [`UNIT_DEFS`].
pub struct UnitCatalog {
    index: HashMap<&'static str, Unit>,
}

/// Process-wide unit catalog, built on first use.
pub static UNIT_CATALOG: Lazy<UnitCatalog> = Lazy::new(UnitCatalog::build);

impl UnitCatalog {
    fn build() -> Self {
        let mut index = HashMap::with_capacity(UNIT_DEFS.len() * 2);
        for def in UNIT_DEFS {
            index.insert(def.symbol, Unit(def));
            for alias in def.aliases {
                index.insert(*alias, Unit(def));
            }
        }
        tracing::trace!(units = UNIT_DEFS.len(), symbols = index.len(), "unit catalog initialized");
        UnitCatalog { index }
    }

    /// Resolve a symbol or alias.
    pub fn lookup(&self, symbol: &str) -> CalcResult<Unit> {
        self.index
            .get(symbol.trim())
            .copied()
            .ok_or_else(|| CalcError::invalid_unit(symbol))
    }

    /// Primary symbols of a dimension, canonical unit first.
    pub fn list_units(&self, dimension: Dimension) -> Vec<&'static str> {
        UNIT_DEFS
            .iter()
            .filter(|def| def.dimension == dimension)
            .map(|def| def.symbol)
            .collect()
    }

    /// Number of distinct units (aliases excluded)
    pub fn len(&self) -> usize {
        UNIT_DEFS.len()
    }

    pub fn is_empty(&self) -> bool {
        UNIT_DEFS.is_empty()
    }
}

/// List the unit symbols available for a dimension.
pub fn list_units(dimension: Dimension) -> Vec<&'static str> {
    UNIT_CATALOG.list_units(dimension)
}

// ============================================================================
// Unit
// ============================================================================

/// Handle to a catalog unit. Serializes as its primary symbol.
#[derive(Clone, Copy, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit(&'static UnitDef);

impl Unit {
    /// Look up a unit by symbol or alias.
    pub fn from_symbol(symbol: &str) -> CalcResult<Self> {
        UNIT_CATALOG.lookup(symbol)
    }

    pub fn symbol(&self) -> &'static str {
        self.0.symbol
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn dimension(&self) -> Dimension {
        self.0.dimension
    }

    /// Factor to the canonical unit of the dimension
    pub fn scale(&self) -> f64 {
        self.0.scale
    }

    pub fn is_canonical(&self) -> bool {
        self.0.scale == 1.0
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit({})", self.0.symbol)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.symbol)
    }
}

impl TryFrom<String> for Unit {
    type Error = CalcError;

    fn try_from(symbol: String) -> Result<Self, Self::Error> {
        Unit::from_symbol(&symbol)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_string()
    }
}

impl FromStr for Unit {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::from_symbol(s)
    }
}

// ============================================================================
// Quantity
// ============================================================================

/// A magnitude with a unit. Immutable: every operation returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    /// Create a quantity from a magnitude and a unit symbol.
    ///
    /// Fails with `InvalidUnit` for unknown symbols and `InvalidInput` for
    /// NaN or infinite magnitudes.
    pub fn new(magnitude: f64, symbol: &str) -> CalcResult<Self> {
        let unit = Unit::from_symbol(symbol)?;
        Self::with_unit(magnitude, unit)
    }

    /// Create a quantity from an already resolved unit.
    pub fn with_unit(magnitude: f64, unit: Unit) -> CalcResult<Self> {
        if !magnitude.is_finite() {
            return Err(CalcError::invalid_input(
                "magnitude",
                magnitude.to_string(),
                "Magnitude must be a finite number",
            ));
        }
        Ok(Quantity { magnitude, unit })
    }

    /// Create a quantity in the canonical unit of `dimension`.
    pub fn canonical(magnitude: f64, dimension: Dimension) -> CalcResult<Self> {
        Self::with_unit(magnitude, dimension.canonical_unit())
    }

    /// Parse text such as `"1.5 angstrom"`, `"10keV"` or `"3"`.
    ///
    /// A bare number is dimensionless.
    pub fn parse(text: &str) -> CalcResult<Self> {
        Self::parse_with_default(text, Dimension::Dimensionless.canonical_symbol())
    }

    /// Parse text, interpreting a bare number in `default_unit`.
    pub fn parse_with_default(text: &str, default_unit: &str) -> CalcResult<Self> {
        let (magnitude, unit_text) = split_number(text)?;
        let unit = if unit_text.is_empty() {
            Unit::from_symbol(default_unit)?
        } else {
            Unit::from_symbol(unit_text)?
        };
        Self::with_unit(magnitude, unit).map_err(|_| CalcError::parse_error(text, "magnitude is not finite"))
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Magnitude expressed in the canonical unit of the dimension
    pub fn canonical_magnitude(&self) -> f64 {
        self.magnitude * self.unit.scale()
    }

    /// This quantity expressed in the canonical unit
    pub fn to_canonical(&self) -> Quantity {
        Quantity {
            magnitude: self.canonical_magnitude(),
            unit: self.dimension().canonical_unit(),
        }
    }

    /// Convert to another unit of the same dimension.
    pub fn convert(&self, target: &str) -> CalcResult<Quantity> {
        self.convert_to(Unit::from_symbol(target)?)
    }

    /// Convert to an already resolved unit.
    pub fn convert_to(&self, target: Unit) -> CalcResult<Quantity> {
        if target.dimension() != self.dimension() {
            return Err(CalcError::incompatible_dimension(self.dimension(), target.dimension()));
        }
        if target == self.unit {
            return Ok(*self);
        }
        Ok(Quantity {
            magnitude: self.canonical_magnitude() / target.scale(),
            unit: target,
        })
    }

    /// Sum in the left operand's unit.
    pub fn checked_add(&self, rhs: &Quantity) -> CalcResult<Quantity> {
        let rhs = rhs.convert_to(self.unit)?;
        Self::with_unit(self.magnitude + rhs.magnitude, self.unit)
    }

    /// Difference in the left operand's unit.
    pub fn checked_sub(&self, rhs: &Quantity) -> CalcResult<Quantity> {
        let rhs = rhs.convert_to(self.unit)?;
        Self::with_unit(self.magnitude - rhs.magnitude, self.unit)
    }

    /// Dimensionless ratio of two quantities of the same dimension.
    pub fn ratio(&self, rhs: &Quantity) -> CalcResult<f64> {
        if rhs.dimension() != self.dimension() {
            return Err(CalcError::incompatible_dimension(rhs.dimension(), self.dimension()));
        }
        Ok(self.canonical_magnitude() / rhs.canonical_magnitude())
    }

    /// Format with a fixed number of decimals, e.g. `"1.5000 angstrom"`.
    /// Precision is capped at [`MAX_PRECISION`].
    pub fn format_with_precision(&self, precision: usize) -> String {
        let precision = precision.min(MAX_PRECISION);
        if self.dimension() == Dimension::Dimensionless && self.unit.is_canonical() {
            format!("{:.*}", precision, self.magnitude)
        } else {
            format!("{:.*} {}", precision, self.magnitude, self.unit)
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dimension() == Dimension::Dimensionless && self.unit.is_canonical() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}

impl FromStr for Quantity {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

/// Split `"<number> <unit>"` at the longest numeric prefix.
fn split_number(text: &str) -> CalcResult<(f64, &str)> {
    let trimmed = text.trim();
    let boundaries = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(trimmed.len()));
    let mut best = None;
    for end in boundaries {
        if let Ok(value) = trimmed[..end].trim_end().parse::<f64>() {
            best = Some((value, end));
        }
    }
    match best {
        Some((value, _)) if !value.is_finite() => Err(CalcError::parse_error(text, "magnitude is not finite")),
        Some((value, end)) => Ok((value, trimmed[end..].trim())),
        None => Err(CalcError::parse_error(text, "expected a number optionally followed by a unit")),
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Add for Quantity {
    type Output = CalcResult<Quantity>;
    fn add(self, rhs: Self) -> Self::Output {
        self.checked_add(&rhs)
    }
}

impl Sub for Quantity {
    type Output = CalcResult<Quantity>;
    fn sub(self, rhs: Self) -> Self::Output {
        self.checked_sub(&rhs)
    }
}

/// Scaling fails when the product is not finite.
impl Mul<f64> for Quantity {
    type Output = CalcResult<Quantity>;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::with_unit(self.magnitude * rhs, self.unit)
    }
}

/// Division by zero is an error rather than an infinite quantity.
impl Div<f64> for Quantity {
    type Output = CalcResult<Quantity>;
    fn div(self, rhs: f64) -> Self::Output {
        Self::with_unit(self.magnitude / rhs, self.unit)
    }
}

impl Neg for Quantity {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Quantity {
            magnitude: -self.magnitude,
            unit: self.unit,
        }
    }
}
