//! # Display Preferences
//!
//! Per-role display unit and precision overrides, stored as a small TOML
//! file. Roles without an override use their built-in default
//! ([`Role::default_display`]).
//!
//! ## File Format
//!
//! ```toml
//! version = "0.1.0"
//! modified = "2026-10-15T09:30:00Z"
//!
//! [display.crystal_size]
//! unit = "um"
//! precision = 3
//! ```
//!
//! Saves are atomic: the file is written to `<path>.tmp`, synced, then
//! renamed over the destination.
//!
//! ## Example
//!
//! ```rust
//! use cdicalc_core::config::Preferences;
//! use cdicalc_core::formulas::Role;
//! use cdicalc_core::units::Quantity;
//!
//! let mut prefs = Preferences::default();
//! prefs.set(Role::DetectorDistance, "mm", 0).unwrap();
//!
//! let distance = Quantity::new(1.5, "m").unwrap();
//! assert_eq!(prefs.format(Role::DetectorDistance, &distance).unwrap(), "1500 mm");
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::formulas::Role;
use crate::units::{Quantity, Unit, MAX_PRECISION};

/// Current preferences file schema version
pub const PREFERENCES_VERSION: &str = "0.1.0";

/// Preferred unit and number of decimals for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUnit {
    /// Unit symbol from the unit catalog
    pub unit: String,
    /// Decimals shown after the point
    pub precision: usize,
}

/// Display preferences, keyed by role wire name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Schema version (for migration compatibility)
    pub version: String,
    /// When the preferences were last changed
    pub modified: DateTime<Utc>,
    /// Overrides on top of the role defaults
    #[serde(default)]
    pub display: BTreeMap<String, DisplayUnit>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            version: PREFERENCES_VERSION.to_string(),
            modified: Utc::now(),
            display: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Override the display unit of a role.
    ///
    /// Fails with `InvalidUnit` for unknown symbols and `DimensionMismatch`
    /// when the unit does not measure the role's dimension.
    pub fn set(&mut self, role: Role, unit: &str, precision: usize) -> CalcResult<()> {
        let resolved = check_unit(role, unit)?;
        check_precision(role, precision)?;
        self.display.insert(
            role.name().to_string(),
            DisplayUnit {
                unit: resolved.symbol().to_string(),
                precision,
            },
        );
        self.touch();
        Ok(())
    }

    /// Drop the override of a role. Returns whether one existed.
    pub fn reset(&mut self, role: Role) -> bool {
        let removed = self.display.remove(role.name()).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Unit and precision used to show values of `role`.
    pub fn display_for(&self, role: Role) -> (Unit, usize) {
        let (default_unit, default_precision) = role.default_display();
        let (symbol, precision) = match self.display.get(role.name()) {
            Some(display) => (display.unit.as_str(), display.precision),
            None => (default_unit, default_precision),
        };
        let unit = Unit::from_symbol(symbol)
            .ok()
            .filter(|unit| unit.dimension() == role.dimension())
            .unwrap_or_else(|| role.dimension().canonical_unit());
        (unit, precision)
    }

    /// `quantity` expressed in the preferred unit of `role`.
    pub fn present(&self, role: Role, quantity: &Quantity) -> CalcResult<Quantity> {
        let (unit, _) = self.display_for(role);
        quantity.convert_to(unit)
    }

    /// Render `quantity` in the preferred unit and precision of `role`.
    pub fn format(&self, role: Role, quantity: &Quantity) -> CalcResult<String> {
        let (unit, precision) = self.display_for(role);
        Ok(quantity.convert_to(unit)?.format_with_precision(precision))
    }

    /// Check the schema version and every override.
    pub fn validate(&self) -> CalcResult<()> {
        validate_version(&self.version)?;
        for (name, display) in &self.display {
            let role: Role = name.parse()?;
            check_unit(role, &display.unit)?;
            check_precision(role, display.precision)?;
        }
        Ok(())
    }
}

fn check_unit(role: Role, symbol: &str) -> CalcResult<Unit> {
    let unit = Unit::from_symbol(symbol)?;
    if unit.dimension() != role.dimension() {
        return Err(CalcError::dimension_mismatch(role, role.dimension(), unit.dimension()));
    }
    Ok(unit)
}

fn check_precision(role: Role, precision: usize) -> CalcResult<()> {
    if precision > MAX_PRECISION {
        return Err(CalcError::invalid_input(
            format!("display.{}.precision", role.name()),
            precision.to_string(),
            format!("at most {MAX_PRECISION} decimals"),
        ));
    }
    Ok(())
}

/// Save preferences to a TOML file with atomic write semantics.
///
/// ```rust,no_run
/// use cdicalc_core::config::{save_preferences, Preferences};
/// use std::path::Path;
///
/// save_preferences(&Preferences::default(), Path::new("cdicalc.toml"))?;
/// # Ok::<(), cdicalc_core::errors::CalcError>(())
/// ```
pub fn save_preferences(preferences: &Preferences, path: &Path) -> CalcResult<()> {
    preferences.validate()?;

    let text = toml::to_string_pretty(preferences).map_err(|e| CalcError::serialization(e.to_string()))?;

    let tmp_path = path.with_extension("toml.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(text.as_bytes()).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::debug!(path = %path.display(), overrides = preferences.display.len(), "saved preferences");
    Ok(())
}

/// Load preferences from a TOML file.
///
/// A missing file is not an error: it yields the defaults.
///
/// # Returns
///
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid TOML
/// * `Err(CalcError::InvalidUnit)` / `Err(CalcError::DimensionMismatch)` - Bad override unit
/// * `Err(CalcError::InvalidInput)` - Override precision above `MAX_PRECISION`
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_preferences(path: &Path) -> CalcResult<Preferences> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no preferences file, using defaults");
        return Ok(Preferences::default());
    }

    let mut file = File::open(path).map_err(|e| {
        CalcError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        CalcError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    let preferences: Preferences = toml::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid TOML in {}: {}", path.display(), e)))?;

    preferences.validate()?;

    tracing::debug!(path = %path.display(), overrides = preferences.display.len(), "loaded preferences");
    Ok(preferences)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: PREFERENCES_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = PREFERENCES_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x, a newer minor version may carry fields we do not understand
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
