//! # Formula Registry
//!
//! Central registry of every physical relation the calculator can solve.
//!
//! ## Architecture
//!
//! A [`Formula`] declares its [`Role`]s and carries one closed-form solver per
//! role, so any role can be computed from the others. Solvers work on
//! canonical magnitudes (m, rad, J, 1/m); the registry takes care of unit
//! normalization and validation before a solver is called.
//!
//! The built-in registry is read-only after initialization and shared through
//! [`REGISTRY`].
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use cdicalc_core::formulas::{Role, REGISTRY};
//! use cdicalc_core::units::Quantity;
//!
//! let mut known = BTreeMap::new();
//! known.insert(Role::Wavelength, Quantity::new(1.0, "angstrom").unwrap());
//! known.insert(Role::DetectorDistance, Quantity::new(1.0, "m").unwrap());
//! known.insert(Role::CrystalSize, Quantity::new(100.0, "nm").unwrap());
//!
//! let spacing = REGISTRY.solve("fringe_spacing", Role::FringeSpacing, &known).unwrap();
//! let mm = spacing.convert("mm").unwrap();
//! assert!((mm.magnitude() - 1.0).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::roles::Role;
use super::{bcdi, cdi, coherence, diffraction};
use crate::errors::{CalcError, CalcResult};
use crate::units::{Dimension, Quantity};

// ============================================================================
// Categories
// ============================================================================

/// Calculator tab a formula belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Bragg coherent diffraction imaging
    Bcdi,
    /// Forward coherent diffraction imaging
    Cdi,
    /// General diffraction geometry
    Diffraction,
    /// Source and beam coherence
    Coherence,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Bcdi,
        Category::Cdi,
        Category::Diffraction,
        Category::Coherence,
    ];

    /// Display name for the category
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Bcdi => "BCDI",
            Category::Cdi => "CDI",
            Category::Diffraction => "Diffraction",
            Category::Coherence => "Coherence",
        }
    }

    /// Sort order for listings (lower = earlier)
    pub fn sort_order(&self) -> u8 {
        match self {
            Category::Bcdi => 1,
            Category::Cdi => 2,
            Category::Diffraction => 3,
            Category::Coherence => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Category {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcdi" => Ok(Category::Bcdi),
            "cdi" => Ok(Category::Cdi),
            "diffraction" => Ok(Category::Diffraction),
            "coherence" => Ok(Category::Coherence),
            _ => Err(CalcError::parse_error(s, "unknown category")),
        }
    }
}

// ============================================================================
// Formula Definition
// ============================================================================

/// Canonical magnitudes handed to a solver, keyed by role.
#[derive(Debug, Clone, Default)]
pub struct Knowns {
    values: BTreeMap<Role, f64>,
}

impl Knowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, canonical: f64) -> Self {
        self.values.insert(role, canonical);
        self
    }

    pub fn insert(&mut self, role: Role, canonical: f64) {
        self.values.insert(role, canonical);
    }

    /// Canonical magnitude of a role, if supplied
    pub fn get(&self, role: Role) -> Option<f64> {
        self.values.get(&role).copied()
    }
}

/// Closed-form solver: `None` means no real solution for these inputs.
pub type SolveFn = fn(&Knowns) -> Option<f64>;

/// Solver for one role of a formula.
#[derive(Clone, Copy)]
pub struct Solver {
    pub target: Role,
    solve: SolveFn,
}

impl Solver {
    pub fn new(target: Role, solve: SolveFn) -> Self {
        Self { target, solve }
    }

    pub fn solve(&self, knowns: &Knowns) -> Option<f64> {
        (self.solve)(knowns)
    }
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver").field("target", &self.target).finish()
    }
}

/// A physical relation among a set of roles.
#[derive(Debug, Clone)]
pub struct Formula {
    /// Registry key (e.g., "fringe_spacing")
    pub name: &'static str,
    /// Human-readable name
    pub title: &'static str,
    /// What the relation is used for
    pub description: &'static str,
    /// The relation in plain text
    pub relation: &'static str,
    pub category: Category,
    /// Declared roles; the first one is the primary output
    pub roles: Vec<Role>,
    /// One solver per role
    pub solvers: Vec<Solver>,
    /// Assumptions or limitations
    pub assumptions: Vec<&'static str>,
}

impl Formula {
    /// Whether `role` is one of the declared roles
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// The declared roles as a set, for role-set matching
    pub fn role_set(&self) -> BTreeSet<Role> {
        self.roles.iter().copied().collect()
    }

    fn solver_for(&self, target: Role) -> Option<&Solver> {
        self.solvers.iter().find(|s| s.target == target)
    }

    /// Check the registration invariants that only involve this formula.
    fn validate(&self) -> CalcResult<()> {
        if self.roles.len() < 2 {
            return Err(CalcError::invalid_formula(self.name, "a relation needs at least two roles"));
        }
        let mut seen = BTreeSet::new();
        for role in &self.roles {
            if !seen.insert(*role) {
                return Err(CalcError::invalid_formula(self.name, format!("role '{role}' declared twice")));
            }
            let solvers = self.solvers.iter().filter(|s| s.target == *role).count();
            match solvers {
                0 => {
                    return Err(CalcError::invalid_formula(
                        self.name,
                        format!("role '{role}' cannot be solved from the others"),
                    ))
                }
                1 => {}
                _ => {
                    return Err(CalcError::invalid_formula(
                        self.name,
                        format!("role '{role}' has more than one solver"),
                    ))
                }
            }
        }
        if let Some(orphan) = self.solvers.iter().find(|s| !seen.contains(&s.target)) {
            return Err(CalcError::invalid_formula(
                self.name,
                format!("solver targets undeclared role '{}'", orphan.target),
            ));
        }
        Ok(())
    }

    /// Solve for `target` given every other role.
    ///
    /// The supplied quantities may use any unit of the right dimension; the
    /// result is expressed in the canonical unit of the target's dimension.
    pub fn solve(&self, target: Role, known: &BTreeMap<Role, Quantity>) -> CalcResult<Quantity> {
        if !self.has_role(target) {
            return Err(CalcError::unexpected_input(
                self.name,
                target,
                "requested target is not a role of this formula",
            ));
        }

        let mut knowns = Knowns::new();
        for role in self.roles.iter().copied().filter(|r| *r != target) {
            let quantity = known
                .get(&role)
                .ok_or_else(|| CalcError::missing_input(self.name, role))?;
            if quantity.dimension() != role.dimension() {
                return Err(CalcError::dimension_mismatch(role, role.dimension(), quantity.dimension()));
            }
            knowns.insert(role, quantity.canonical_magnitude());
        }

        for role in known.keys() {
            if *role == target {
                return Err(CalcError::unexpected_input(self.name, *role, "value supplied for the requested target"));
            }
            if !self.has_role(*role) {
                return Err(CalcError::unexpected_input(self.name, *role, "not a role of this formula"));
            }
        }

        let solver = self
            .solver_for(target)
            .ok_or_else(|| CalcError::invalid_formula(self.name, format!("no solver for '{target}'")))?;

        let value = solver.solve(&knowns).ok_or_else(|| {
            CalcError::out_of_domain(
                self.name,
                target,
                "no real solution (division by zero or arcsine argument outside [-1, 1])",
            )
        })?;
        if !value.is_finite() {
            return Err(CalcError::out_of_domain(self.name, target, "result is not a finite number"));
        }

        tracing::trace!(formula = self.name, target = %target, value, "solved");
        Quantity::canonical(value, target.dimension())
    }

    /// Serializable description for listings
    pub fn descriptor(&self) -> FormulaDescriptor {
        FormulaDescriptor {
            name: self.name.to_string(),
            title: self.title.to_string(),
            category: self.category,
            relation: self.relation.to_string(),
            roles: self
                .roles
                .iter()
                .map(|role| RoleDescriptor {
                    role: *role,
                    dimension: role.dimension(),
                    default_unit: role.default_unit().to_string(),
                })
                .collect(),
        }
    }
}

/// One role as listed in a [`FormulaDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub role: Role,
    pub dimension: Dimension,
    pub default_unit: String,
}

/// Public, serializable view of a registered formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDescriptor {
    pub name: String,
    pub title: String,
    pub category: Category,
    pub relation: String,
    pub roles: Vec<RoleDescriptor>,
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered collection of formulas with unique names and unique role sets.
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    formulas: Vec<Formula>,
}

/// The built-in registry, initialized on first use and never mutated.
pub static REGISTRY: Lazy<FormulaRegistry> = Lazy::new(FormulaRegistry::builtin);

impl FormulaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in formula, in category order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let definitions = bcdi::formulas()
            .into_iter()
            .chain(cdi::formulas())
            .chain(diffraction::formulas())
            .chain(coherence::formulas());
        for formula in definitions {
            let name = formula.name;
            if let Err(e) = registry.register(formula) {
                tracing::error!(formula = name, error = %e, "skipping built-in formula");
            }
        }
        tracing::debug!(count = registry.len(), "formula registry initialized");
        registry
    }

    /// Add a formula after checking that every role is solvable, the name is
    /// new, and no registered formula has the same role set.
    pub fn register(&mut self, formula: Formula) -> CalcResult<()> {
        formula.validate()?;
        if self.get(formula.name).is_some() {
            return Err(CalcError::invalid_formula(formula.name, "name already registered"));
        }
        let roles = formula.role_set();
        if let Some(existing) = self.formulas.iter().find(|f| f.role_set() == roles) {
            return Err(CalcError::invalid_formula(
                formula.name,
                format!("same role set as '{}'", existing.name),
            ));
        }
        self.formulas.push(formula);
        Ok(())
    }

    /// Look up a formula by name
    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.name == name)
    }

    /// All formulas in registration order
    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Formulas of one category, in registration order
    pub fn in_category(&self, category: Category) -> Vec<&Formula> {
        self.formulas.iter().filter(|f| f.category == category).collect()
    }

    /// Descriptors for a category, or for every formula when `None`
    pub fn list_formulas(&self, category: Option<Category>) -> Vec<FormulaDescriptor> {
        self.formulas
            .iter()
            .filter(|f| category.map_or(true, |c| f.category == c))
            .map(Formula::descriptor)
            .collect()
    }

    /// The formula whose declared roles are exactly `roles`
    pub fn find_by_roles(&self, roles: &BTreeSet<Role>) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.role_set() == *roles)
    }

    /// Solve `target` of the named formula from the supplied quantities.
    pub fn solve(&self, name: &str, target: Role, known: &BTreeMap<Role, Quantity>) -> CalcResult<Quantity> {
        let formula = self
            .get(name)
            .ok_or_else(|| CalcError::no_matching_formula(format!("no formula named '{name}'")))?;
        formula.solve(target, known)
    }
}

// ============================================================================
// Markdown Reference
// ============================================================================

/// Generate a Markdown reference of every formula in `registry`.
///
/// ```rust
/// use cdicalc_core::formulas::{generate_formulas_markdown, REGISTRY};
///
/// let markdown = generate_formulas_markdown(&REGISTRY);
/// assert!(markdown.contains("# CDICALC Formula Reference"));
/// assert!(markdown.contains("## BCDI"));
/// ```
pub fn generate_formulas_markdown(registry: &FormulaRegistry) -> String {
    let mut output = String::with_capacity(16_000);

    output.push_str(
        r#"# CDICALC Formula Reference

> **Auto-generated from source code. Do not edit manually.**
>
> Regenerate with: `cargo run --bin gen-formulas`

Every relation below can be solved for any one of its roles given the others.
Solvers work in canonical units (m, rad, J, 1/m); inputs may use any unit of the
right dimension.

---

"#,
    );

    let mut categories = Category::ALL.to_vec();
    categories.sort_by_key(|c| c.sort_order());

    for category in &categories {
        let formulas = registry.in_category(*category);
        if formulas.is_empty() {
            continue;
        }

        output.push_str(&format!("## {}\n\n", category.display_name()));

        for formula in formulas {
            output.push_str(&format!("### {} (`{}`)\n\n", formula.title, formula.name));
            output.push_str(&format!("{}\n\n", formula.description));
            output.push_str(&format!("**Relation:** `{}`\n\n", formula.relation));

            output.push_str("| Symbol | Role | Description | Dimension | Default unit |\n");
            output.push_str("|--------|------|-------------|-----------|--------------|\n");
            for role in &formula.roles {
                output.push_str(&format!(
                    "| {} | `{}` | {} | {} | {} |\n",
                    role.symbol(),
                    role.name(),
                    role.description(),
                    role.dimension(),
                    role.default_unit()
                ));
            }
            output.push('\n');

            if !formula.assumptions.is_empty() {
                output.push_str("**Assumptions:**\n");
                for assumption in &formula.assumptions {
                    output.push_str(&format!("- {}\n", assumption));
                }
                output.push('\n');
            }

            output.push_str("---\n\n");
        }
    }

    output.push_str(&format!(
        "## Statistics\n\n- **Total Formulas:** {}\n- **Categories:** {}\n",
        registry.len(),
        categories
            .iter()
            .filter(|c| !registry.in_category(**c).is_empty())
            .count()
    ));

    output
}

// ============================================================================
// Tests
// ============================================================================
