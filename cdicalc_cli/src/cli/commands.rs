use std::fmt::Write as _;
use std::path::Path;

use cdicalc_core::formulas::generate_formulas_markdown;
use cdicalc_core::{list_formulas, list_units, CalculationRequest, Category, Dimension, Role, REGISTRY};

use super::helpers::*;
use super::CliError;

#[derive(clap::Args)]
pub(super) struct FormulasArgs {
    /// Only formulas of this category
    #[arg(long)]
    category: Option<String>,

    /// Print descriptors as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct UnitsArgs {
    /// Only units of this dimension (length, inverse_length, angle, energy, dimensionless)
    #[arg(long)]
    dimension: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct SolveArgs {
    /// Role to solve for
    #[arg(long)]
    target: String,

    /// Formula to use instead of matching on the supplied roles
    #[arg(long)]
    formula: Option<String>,

    /// Known value, e.g. `wavelength=1.5angstrom` (bare numbers use the role's display unit)
    #[arg(long = "set", value_name = "ROLE=VALUE")]
    set: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct DeriveArgs {
    /// Known value, e.g. `xray_energy=8keV`
    #[arg(long = "set", value_name = "ROLE=VALUE", required = true)]
    set: Vec<String>,

    /// Print the propagation as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_formulas_command(args: FormulasArgs) -> Result<String, CliError> {
    let category: Option<Category> = args
        .category
        .as_deref()
        .map(|text| parse_arg("--category", text))
        .transpose()?;
    let descriptors = list_formulas(category);

    if args.json {
        return to_json(&descriptors);
    }

    let mut output = String::new();
    for descriptor in &descriptors {
        let _ = writeln!(output, "{} [{}]", descriptor.name, descriptor.category);
        let _ = writeln!(output, "    {}", descriptor.relation);
        for role in &descriptor.roles {
            let _ = writeln!(output, "    - {} ({}, default {})", role.role, role.dimension, role.default_unit);
        }
    }
    Ok(output)
}

pub(super) fn run_units_command(args: UnitsArgs) -> Result<String, CliError> {
    match args.dimension.as_deref() {
        Some(text) => {
            let dimension: Dimension = parse_arg("--dimension", text)?;
            Ok(format!("{}\n", list_units(dimension).join(", ")))
        }
        None => {
            let mut output = String::new();
            for dimension in Dimension::ALL {
                let _ = writeln!(output, "{}: {}", dimension, list_units(dimension).join(", "));
            }
            Ok(output)
        }
    }
}

pub(super) fn run_solve_command(args: SolveArgs, config: Option<&Path>) -> Result<String, CliError> {
    let target: Role = parse_arg("--target", &args.target)?;
    let preferences = load_cli_preferences(config)?;
    let known = parse_assignments(&args.set, &preferences)?;

    let request = CalculationRequest {
        formula: args.formula,
        target,
        known,
    };
    let session = build_session(preferences);
    let result = session.evaluate(&request)?;

    if args.json {
        return to_json(&result);
    }

    let shown = match session.preferences() {
        Some(preferences) => preferences.format(result.target, &result.value)?,
        None => result.value.to_string(),
    };
    Ok(format!("{} = {}  ({})\n", result.target, shown, result.formula))
}

pub(super) fn run_derive_command(args: DeriveArgs, config: Option<&Path>) -> Result<String, CliError> {
    let preferences = load_cli_preferences(config)?;
    let known = parse_assignments(&args.set, &preferences)?;
    let session = build_session(preferences.clone());
    let propagation = session.propagate(&known);

    if args.json {
        return to_json(&propagation);
    }

    let mut output = String::new();
    for (role, value) in &propagation.values {
        let shown = preferences
            .format(*role, value)
            .unwrap_or_else(|_| value.to_string());
        match propagation.derived.iter().find(|r| r.target == *role) {
            Some(derived) => {
                let _ = writeln!(output, "{role} = {shown}  <- {}", derived.formula);
            }
            None => {
                let _ = writeln!(output, "{role} = {shown}");
            }
        }
    }
    for failure in &propagation.failures {
        let _ = writeln!(output, "! {} ({}): {}", failure.target, failure.formula, failure.error);
    }
    Ok(output)
}

pub(super) fn run_reference_command() -> String {
    generate_formulas_markdown(&REGISTRY)
}
