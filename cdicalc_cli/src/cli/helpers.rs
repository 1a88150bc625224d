use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use cdicalc_core::{load_preferences, CalculationSession, Preferences, Quantity, Role};
use serde::Serialize;

use super::CliError;

/// Parse an identifier argument (role, category, dimension), reporting failures as usage errors.
pub(super) fn parse_arg<T>(flag: &str, text: &str) -> Result<T, CliError>
where
    T: FromStr<Err = cdicalc_core::CalcError>,
{
    text.parse()
        .map_err(|e: cdicalc_core::CalcError| CliError::Usage(format!("invalid value for {flag}: {e}")))
}

/// Preferences from `--config`, or the role defaults when none was given.
pub(super) fn load_cli_preferences(config: Option<&Path>) -> Result<Preferences, CliError> {
    match config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading preferences");
            Ok(load_preferences(path)?)
        }
        None => Ok(Preferences::default()),
    }
}

pub(super) fn build_session(preferences: Preferences) -> CalculationSession<'static> {
    CalculationSession::new().with_preferences(preferences)
}

/// Parse `role=value`. A bare number takes the role's display unit.
pub(super) fn parse_assignment(text: &str, preferences: &Preferences) -> Result<(Role, Quantity), CliError> {
    let (role_text, value_text) = text
        .split_once('=')
        .ok_or_else(|| CliError::Usage(format!("expected ROLE=VALUE, got '{text}'")))?;
    let role: Role = parse_arg("--set", role_text)?;
    let (unit, _) = preferences.display_for(role);
    let quantity = Quantity::parse_with_default(value_text, unit.symbol())?;
    Ok((role, quantity))
}

/// Parse every `--set`; a role given twice is a usage error.
pub(super) fn parse_assignments(
    assignments: &[String],
    preferences: &Preferences,
) -> Result<BTreeMap<Role, Quantity>, CliError> {
    let mut known = BTreeMap::new();
    for text in assignments {
        let (role, quantity) = parse_assignment(text, preferences)?;
        if known.insert(role, quantity).is_some() {
            return Err(CliError::Usage(format!("'{role}' given more than once")));
        }
    }
    Ok(known)
}

pub(super) fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    let mut json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment_default_unit() {
        let prefs = Preferences::default();
        let (role, quantity) = parse_assignment("crystal_size=250", &prefs).unwrap();
        assert_eq!(role, Role::CrystalSize);
        assert_eq!(quantity.unit().symbol(), "nm");
        assert_eq!(quantity.magnitude(), 250.0);
    }

    #[test]
    fn test_parse_assignment_explicit_unit() {
        let prefs = Preferences::default();
        let (role, quantity) = parse_assignment("pixel_size=0.055 mm", &prefs).unwrap();
        assert_eq!(role, Role::DetectorPixelsize);
        assert_eq!(quantity.unit().symbol(), "mm");
    }

    #[test]
    fn test_parse_assignment_uses_preferences() {
        let mut prefs = Preferences::default();
        prefs.set(Role::XrayEnergy, "eV", 0).unwrap();
        let (_, quantity) = parse_assignment("xray_energy=9000", &prefs).unwrap();
        assert_eq!(quantity.unit().symbol(), "eV");
    }

    #[test]
    fn test_parse_assignment_errors() {
        let prefs = Preferences::default();
        assert!(matches!(parse_assignment("wavelength", &prefs), Err(CliError::Usage(_))));
        assert!(matches!(parse_assignment("colour=1", &prefs), Err(CliError::Usage(_))));
        assert!(matches!(parse_assignment("wavelength=1 furlong", &prefs), Err(CliError::Calc(_))));
        assert!(matches!(parse_assignment("wavelength=abc", &prefs), Err(CliError::Calc(_))));
    }

    #[test]
    fn test_duplicate_assignment() {
        let prefs = Preferences::default();
        let args = vec!["wavelength=1".to_string(), "xray_wavelength=2".to_string()];
        assert!(matches!(parse_assignments(&args, &prefs), Err(CliError::Usage(_))));
    }
}
