//! # cdicalc_core - Experiment Setup Calculation Engine
//!
//! `cdicalc_core` is the computational heart of CDICALC. It solves the
//! relations used to plan coherent X-ray diffraction imaging experiments
//! (BCDI, forward CDI, diffraction geometry, beam coherence) with every value
//! carried as a unit-checked [`Quantity`].
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Evaluations are pure functions of their inputs
//! - **Unit-safe**: A value of the wrong dimension never reaches a formula
//! - **JSON-First**: Requests, results, descriptors and errors implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//! - **Quiet**: The library emits `tracing` events but never installs a subscriber
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use cdicalc_core::{evaluate, list_formulas, Category, Quantity, Role};
//!
//! // What does the BCDI tab offer?
//! let bcdi = list_formulas(Some(Category::Bcdi));
//! assert!(bcdi.iter().any(|f| f.name == "fringe_spacing"));
//!
//! // 1 Å, 1 m, 100 nm -> 1 mm fringes
//! let mut known = BTreeMap::new();
//! known.insert(Role::Wavelength, Quantity::new(1.0, "angstrom").unwrap());
//! known.insert(Role::DetectorDistance, Quantity::new(1.0, "m").unwrap());
//! known.insert(Role::CrystalSize, Quantity::new(100.0, "nm").unwrap());
//!
//! let result = evaluate("fringe_spacing", Role::FringeSpacing, &known).unwrap();
//! let mm = result.value.convert("mm").unwrap();
//! assert!((mm.magnitude() - 1.0).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Dimensions, the unit catalog and [`Quantity`]
//! - [`formulas`] - Roles, the formula registry and the per-category relations
//! - [`session`] - Request evaluation and propagation
//! - [`config`] - Display unit preferences with atomic TOML saves
//! - [`errors`] - Structured error types

pub mod config;
pub mod errors;
pub mod formulas;
pub mod session;
pub mod units;

use std::collections::BTreeMap;

// Re-export commonly used types at crate root for convenience
pub use config::{load_preferences, save_preferences, DisplayUnit, Preferences};
pub use errors::{CalcError, CalcResult};
pub use formulas::{Category, Formula, FormulaDescriptor, FormulaRegistry, Role, REGISTRY};
pub use session::{CalculationRequest, CalculationResult, CalculationSession, Propagation};
pub use units::{Dimension, Quantity, Unit};

/// Formula descriptors of a category, or of every formula when `None`.
pub fn list_formulas(category: Option<Category>) -> Vec<FormulaDescriptor> {
    REGISTRY.list_formulas(category)
}

/// Unit symbols accepted for a dimension, canonical unit first.
///
/// ```rust
/// use cdicalc_core::{list_units, Dimension};
///
/// assert_eq!(list_units(Dimension::Energy), vec!["J", "eV", "meV", "keV", "MeV"]);
/// ```
pub fn list_units(dimension: Dimension) -> Vec<&'static str> {
    units::list_units(dimension)
}

/// Solve `target` of the named formula. The value is returned in the
/// canonical unit of the target's dimension.
pub fn evaluate(
    formula_name: &str,
    target: Role,
    known: &BTreeMap<Role, Quantity>,
) -> CalcResult<CalculationResult> {
    let request = CalculationRequest {
        formula: Some(formula_name.to_string()),
        target,
        known: known.clone(),
    };
    CalculationSession::new().evaluate(&request)
}
