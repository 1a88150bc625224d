//! # Calculation Session
//!
//! Turns a user action into a formula evaluation. A [`CalculationRequest`]
//! names the role to solve and the quantities the user filled in; the
//! session picks the formula whose role set is exactly those roles (or the
//! formula the caller named), solves it, and hands back the value in the
//! preferred display unit.
//!
//! [`CalculationSession::propagate`] derives everything reachable from a set
//! of known quantities by repeatedly solving formulas with a single unknown,
//! the way a calculator tab recomputes its dependent fields.
//!
//! ## Example
//!
//! ```rust
//! use cdicalc_core::formulas::Role;
//! use cdicalc_core::session::{CalculationRequest, CalculationSession};
//! use cdicalc_core::units::Quantity;
//!
//! let session = CalculationSession::new();
//! let request = CalculationRequest::new(Role::FringeSpacing)
//!     .with_known(Role::Wavelength, Quantity::new(1.0, "angstrom").unwrap())
//!     .with_known(Role::DetectorDistance, Quantity::new(1.0, "m").unwrap())
//!     .with_known(Role::CrystalSize, Quantity::new(100.0, "nm").unwrap());
//!
//! let result = session.evaluate(&request).unwrap();
//! assert_eq!(result.formula, "fringe_spacing");
//! assert!((result.value.canonical_magnitude() - 1e-3).abs() < 1e-15);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::Preferences;
use crate::errors::{CalcError, CalcResult};
use crate::formulas::{Category, Formula, FormulaDescriptor, FormulaRegistry, Role, REGISTRY};
use crate::units::{self, Dimension, Quantity};

/// One evaluation asked for by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Formula to use; `None` selects by role set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Role to solve for
    pub target: Role,
    /// Supplied values for the other roles
    #[serde(default)]
    pub known: BTreeMap<Role, Quantity>,
}

impl CalculationRequest {
    pub fn new(target: Role) -> Self {
        CalculationRequest {
            formula: None,
            target,
            known: BTreeMap::new(),
        }
    }

    /// Use the named formula instead of role-set matching
    pub fn with_formula(mut self, name: impl Into<String>) -> Self {
        self.formula = Some(name.into());
        self
    }

    pub fn with_known(mut self, role: Role, quantity: Quantity) -> Self {
        self.known.insert(role, quantity);
        self
    }

    /// Supplied roles plus the target
    pub fn role_set(&self) -> BTreeSet<Role> {
        self.known.keys().copied().chain(std::iter::once(self.target)).collect()
    }
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Name of the formula used
    pub formula: String,
    pub target: Role,
    pub value: Quantity,
}

/// A formula that could not be solved during propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationFailure {
    pub formula: String,
    pub target: Role,
    pub error: CalcError,
}

/// Everything derived from a set of known quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    /// Supplied and derived values
    pub values: BTreeMap<Role, Quantity>,
    /// Derived values, in derivation order
    pub derived: Vec<CalculationResult>,
    pub failures: Vec<PropagationFailure>,
}

impl Propagation {
    /// Whether `role` was derived (as opposed to supplied or unknown)
    pub fn was_derived(&self, role: Role) -> bool {
        self.derived.iter().any(|r| r.target == role)
    }
}

/// Evaluates requests against a read-only formula registry.
#[derive(Debug, Clone)]
pub struct CalculationSession<'r> {
    registry: &'r FormulaRegistry,
    preferences: Option<Preferences>,
}

impl Default for CalculationSession<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculationSession<'static> {
    /// Session over the built-in registry, returning canonical units.
    pub fn new() -> Self {
        CalculationSession::with_registry(&REGISTRY)
    }
}

impl<'r> CalculationSession<'r> {
    pub fn with_registry(registry: &'r FormulaRegistry) -> Self {
        CalculationSession {
            registry,
            preferences: None,
        }
    }

    /// Express results in the preferred display units.
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_ref()
    }

    pub fn registry(&self) -> &'r FormulaRegistry {
        self.registry
    }

    /// Formula descriptors for a category, or all of them
    pub fn list_formulas(&self, category: Option<Category>) -> Vec<FormulaDescriptor> {
        self.registry.list_formulas(category)
    }

    /// Unit symbols of a dimension
    pub fn list_units(&self, dimension: Dimension) -> Vec<&'static str> {
        units::list_units(dimension)
    }

    /// Solve one request.
    ///
    /// # Errors
    ///
    /// * `NoMatchingFormula` - no formula has this role set, or the named formula does not exist
    /// * `MissingInput`, `DimensionMismatch`, `UnexpectedInput`, `OutOfDomain` - from the formula
    pub fn evaluate(&self, request: &CalculationRequest) -> CalcResult<CalculationResult> {
        let formula = self.select(request)?;
        let canonical = formula.solve(request.target, &request.known)?;
        let value = self.present(request.target, &canonical)?;

        tracing::debug!(
            formula = formula.name,
            target = %request.target,
            value = %value,
            "evaluated"
        );

        Ok(CalculationResult {
            formula: formula.name.to_string(),
            target: request.target,
            value,
        })
    }

    fn select(&self, request: &CalculationRequest) -> CalcResult<&'r Formula> {
        if let Some(name) = &request.formula {
            return self
                .registry
                .get(name)
                .ok_or_else(|| CalcError::no_matching_formula(format!("no formula named '{name}'")));
        }

        let roles = request.role_set();
        self.registry.find_by_roles(&roles).ok_or_else(|| {
            let names: Vec<&str> = roles.iter().map(|r| r.name()).collect();
            CalcError::no_matching_formula(format!(
                "no formula relates exactly {{{}}} (solving for {})",
                names.join(", "),
                request.target
            ))
        })
    }

    fn present(&self, role: Role, quantity: &Quantity) -> CalcResult<Quantity> {
        match &self.preferences {
            Some(preferences) => preferences.present(role, quantity),
            None => Ok(*quantity),
        }
    }

    /// Derive every role reachable from `known`.
    ///
    /// Formulas are visited in registry order; a formula with exactly one
    /// unknown role is solved and its result becomes known for the next
    /// formulas. Passes repeat until nothing new is derived. Supplied values
    /// are never overwritten, and a formula that fails is reported once and
    /// not retried.
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use cdicalc_core::formulas::Role;
    /// use cdicalc_core::session::CalculationSession;
    /// use cdicalc_core::units::Quantity;
    ///
    /// let mut known = BTreeMap::new();
    /// known.insert(Role::XrayEnergy, Quantity::new(8.0, "keV").unwrap());
    /// known.insert(Role::DSpacing, Quantity::new(2.0, "angstrom").unwrap());
    ///
    /// let result = CalculationSession::new().propagate(&known);
    /// assert!(result.was_derived(Role::Wavelength));
    /// assert!(result.was_derived(Role::BraggAngle));
    /// assert!(result.was_derived(Role::ScatteringVector));
    /// ```
    pub fn propagate(&self, known: &BTreeMap<Role, Quantity>) -> Propagation {
        let mut propagation = Propagation {
            values: known.clone(),
            ..Propagation::default()
        };
        let mut failed: BTreeSet<&str> = BTreeSet::new();

        let mut pass = 0;
        loop {
            pass += 1;
            let mut progress = false;

            for formula in self.registry.formulas() {
                if failed.contains(formula.name) {
                    continue;
                }
                let mut unknown = formula.roles.iter().filter(|r| !propagation.values.contains_key(*r));
                let target = match (unknown.next(), unknown.next()) {
                    (Some(target), None) => *target,
                    _ => continue,
                };

                let inputs: BTreeMap<Role, Quantity> = formula
                    .roles
                    .iter()
                    .filter(|r| **r != target)
                    .filter_map(|r| propagation.values.get(r).map(|q| (*r, *q)))
                    .collect();

                match formula
                    .solve(target, &inputs)
                    .and_then(|canonical| self.present(target, &canonical))
                {
                    Ok(value) => {
                        tracing::trace!(pass, formula = formula.name, target = %target, "derived");
                        propagation.values.insert(target, value);
                        propagation.derived.push(CalculationResult {
                            formula: formula.name.to_string(),
                            target,
                            value,
                        });
                        progress = true;
                    }
                    Err(error) => {
                        tracing::debug!(formula = formula.name, target = %target, error = %error, "could not derive");
                        failed.insert(formula.name);
                        propagation.failures.push(PropagationFailure {
                            formula: formula.name.to_string(),
                            target,
                            error,
                        });
                    }
                }
            }

            if !progress {
                break;
            }
        }

        tracing::debug!(
            passes = pass,
            derived = propagation.derived.len(),
            failures = propagation.failures.len(),
            "propagation finished"
        );
        propagation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: f64, unit: &str) -> Quantity {
        Quantity::new(value, unit).unwrap()
    }

    fn fringe_request() -> CalculationRequest {
        CalculationRequest::new(Role::FringeSpacing)
            .with_known(Role::Wavelength, q(1.0, "angstrom"))
            .with_known(Role::DetectorDistance, q(1.0, "m"))
            .with_known(Role::CrystalSize, q(100.0, "nm"))
    }

    #[test]
    fn test_evaluate_by_role_set() {
        let result = CalculationSession::new().evaluate(&fringe_request()).unwrap();
        assert_eq!(result.formula, "fringe_spacing");
        assert_eq!(result.target, Role::FringeSpacing);
        assert_eq!(result.value.unit().symbol(), "m");
        assert!((result.value.magnitude() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_evaluate_with_preferences() {
        let session = CalculationSession::new().with_preferences(Preferences::default());
        let result = session.evaluate(&fringe_request()).unwrap();
        assert_eq!(result.value.unit().symbol(), "mm");
        assert!((result.value.magnitude() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let session = CalculationSession::new();
        let request = fringe_request();
        let first = session.evaluate(&request).unwrap();
        let second = session.evaluate(&request).unwrap();
        assert_eq!(first, second);

        let bad = CalculationRequest::new(Role::FringeSpacing).with_known(Role::Wavelength, q(1.0, "angstrom"));
        assert_eq!(session.evaluate(&bad).unwrap_err(), session.evaluate(&bad).unwrap_err());
    }

    #[test]
    fn test_evaluate_no_matching_formula() {
        let request = CalculationRequest::new(Role::FringeSpacing).with_known(Role::Wavelength, q(1.0, "angstrom"));
        let err = CalculationSession::new().evaluate(&request).unwrap_err();
        assert_eq!(err.error_code(), "NO_MATCHING_FORMULA");
        assert!(err.to_string().contains("fringe_spacing"));
    }

    #[test]
    fn test_evaluate_named_formula() {
        let request = fringe_request().with_formula("fringe_spacing");
        let result = CalculationSession::new().evaluate(&request).unwrap();
        assert_eq!(result.formula, "fringe_spacing");

        let err = CalculationSession::new()
            .evaluate(&fringe_request().with_formula("nope"))
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_MATCHING_FORMULA");

        // Named formula with too few inputs reports the missing role
        let request = CalculationRequest::new(Role::FringeSpacing)
            .with_formula("fringe_spacing")
            .with_known(Role::Wavelength, q(1.0, "angstrom"))
            .with_known(Role::DetectorDistance, q(1.0, "m"));
        let err = CalculationSession::new().evaluate(&request).unwrap_err();
        assert_eq!(err, CalcError::missing_input("fringe_spacing", Role::CrystalSize));
    }

    #[test]
    fn test_evaluate_dimension_mismatch() {
        let request = CalculationRequest::new(Role::FringeSpacing)
            .with_known(Role::Wavelength, q(1.0, "angstrom"))
            .with_known(Role::DetectorDistance, q(1.0, "m"))
            .with_known(Role::CrystalSize, q(8.0, "keV"));
        let err = CalculationSession::new().evaluate(&request).unwrap_err();
        assert_eq!(err.error_code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&fringe_request()).unwrap();
        assert!(json.contains("\"target\":\"fringe_spacing\""));
        assert!(json.contains("\"crystal_size\":{\"magnitude\":100.0,\"unit\":\"nm\"}"));
        let back: CalculationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fringe_request());
    }

    #[test]
    fn test_propagate_chain() {
        let mut known = BTreeMap::new();
        known.insert(Role::XrayEnergy, q(9.0, "keV"));
        known.insert(Role::DetectorDistance, q(1.5, "m"));
        known.insert(Role::CrystalSize, q(250.0, "nm"));
        known.insert(Role::SourceSize, q(900.0, "um"));
        known.insert(Role::SourceDistance, q(31.5, "m"));

        let result = CalculationSession::new().propagate(&known);
        for role in [
            Role::Wavelength,
            Role::FringeSpacing,
            Role::Divergence,
            Role::CoherenceLength,
        ] {
            assert!(result.was_derived(role), "{role} not derived");
        }
        assert!(result.failures.is_empty(), "{:?}", result.failures);

        // Supplied values are untouched
        for (role, value) in &known {
            assert_eq!(result.values[role], *value);
        }
    }

    #[test]
    fn test_propagate_is_idempotent() {
        let mut known = BTreeMap::new();
        known.insert(Role::Wavelength, q(1.5, "angstrom"));
        known.insert(Role::DSpacing, q(2.0, "angstrom"));

        let session = CalculationSession::new();
        let first = session.propagate(&known);
        assert_eq!(first, session.propagate(&known));

        let again = session.propagate(&first.values);
        assert!(again.derived.is_empty());
        assert_eq!(again.values, first.values);
    }

    #[test]
    fn test_propagate_collects_failures() {
        let mut known = BTreeMap::new();
        // No Bragg reflection: λ > 2d
        known.insert(Role::Wavelength, q(5.0, "angstrom"));
        known.insert(Role::DSpacing, q(2.0, "angstrom"));

        let result = CalculationSession::new().propagate(&known);
        let failure = result.failures.iter().find(|f| f.formula == "bragg_law").unwrap();
        assert_eq!(failure.target, Role::BraggAngle);
        assert_eq!(failure.error.error_code(), "OUT_OF_DOMAIN");
        assert_eq!(result.failures.iter().filter(|f| f.formula == "bragg_law").count(), 1);

        // Other relations still derive
        assert!(result.was_derived(Role::XrayEnergy));
        assert!(result.was_derived(Role::ScatteringVector));
    }

    #[test]
    fn test_list_passthrough() {
        let session = CalculationSession::new();
        assert_eq!(session.list_formulas(Some(Category::Cdi)).len(), 1);
        assert_eq!(session.list_units(Dimension::Angle)[0], "rad");
    }
}
