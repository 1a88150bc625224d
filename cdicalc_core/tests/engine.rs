//! End-to-end checks of the public engine API.

use std::collections::BTreeMap;

use cdicalc_core::units::UNIT_DEFS;
use cdicalc_core::{
    evaluate, list_formulas, list_units, save_preferences, load_preferences, CalcError, CalculationRequest,
    CalculationSession, Category, Dimension, Preferences, Quantity, Role, REGISTRY,
};
use tempfile::TempDir;

fn q(value: f64, unit: &str) -> Quantity {
    Quantity::new(value, unit).unwrap()
}

#[test]
fn unit_round_trip_law() {
    for from in UNIT_DEFS {
        for to in UNIT_DEFS.iter().filter(|u| u.dimension == from.dimension) {
            let original = q(123.456, from.symbol);
            let back = original.convert(to.symbol).unwrap().convert(from.symbol).unwrap();
            assert!(
                (back.magnitude() - original.magnitude()).abs() <= 1e-12 * original.magnitude(),
                "{} -> {} -> {}",
                from.symbol,
                to.symbol,
                from.symbol
            );
        }
    }
}

#[test]
fn unknown_unit_and_incompatible_conversion() {
    assert_eq!(
        Quantity::new(1.0, "parsec").unwrap_err(),
        CalcError::invalid_unit("parsec")
    );
    assert_eq!(
        q(1.0, "nm").convert("keV").unwrap_err(),
        CalcError::incompatible_dimension(Dimension::Length, Dimension::Energy)
    );
}

#[test]
fn fringe_spacing_example() {
    let mut known = BTreeMap::new();
    known.insert(Role::Wavelength, q(1.0, "angstrom"));
    known.insert(Role::DetectorDistance, q(1.0, "m"));
    known.insert(Role::CrystalSize, q(100.0, "nm"));

    let result = evaluate("fringe_spacing", Role::FringeSpacing, &known).unwrap();
    assert_eq!(result.formula, "fringe_spacing");
    let mm = result.value.convert("mm").unwrap();
    assert!((mm.magnitude() - 1.0).abs() < 1e-9);
}

#[test]
fn energy_for_length_role_is_dimension_mismatch() {
    let mut known = BTreeMap::new();
    known.insert(Role::Wavelength, q(1.0, "angstrom"));
    known.insert(Role::DetectorDistance, q(1.0, "m"));
    known.insert(Role::CrystalSize, q(9.0, "keV"));

    let err = evaluate("fringe_spacing", Role::FringeSpacing, &known).unwrap_err();
    assert_eq!(
        err,
        CalcError::DimensionMismatch {
            role: Role::CrystalSize,
            expected: Dimension::Length,
            found: Dimension::Energy,
        }
    );
}

#[test]
fn bcdi_listing_includes_fringe_and_angular_relations() {
    let bcdi = list_formulas(Some(Category::Bcdi));
    let fringe = bcdi.iter().find(|f| f.name == "fringe_spacing").unwrap();
    let roles: Vec<Role> = fringe.roles.iter().map(|r| r.role).collect();
    assert!(roles.contains(&Role::CrystalSize));
    assert!(roles.contains(&Role::FringeSpacing));

    let angular = bcdi.iter().find(|f| f.name == "angular_sampling").unwrap();
    assert!(angular
        .roles
        .iter()
        .any(|r| r.role == Role::RockingAngle && r.dimension == Dimension::Angle));

    assert!(bcdi.iter().all(|f| f.category == Category::Bcdi));
}

#[test]
fn unit_listing_per_dimension() {
    assert_eq!(list_units(Dimension::Angle), vec!["rad", "mrad", "urad", "deg", "mdeg"]);
    for dimension in Dimension::ALL {
        assert_eq!(list_units(dimension)[0], dimension.canonical_symbol());
    }
}

#[test]
fn every_role_is_used_by_some_formula() {
    for role in Role::ALL {
        assert!(
            REGISTRY.formulas().iter().any(|f| f.has_role(role)),
            "{role} is not used by any formula"
        );
    }
}

#[test]
fn session_matches_role_sets() {
    let session = CalculationSession::new();
    let request = CalculationRequest::new(Role::DetectorDistance)
        .with_known(Role::Wavelength, q(1.5, "angstrom"))
        .with_known(Role::CrystalSize, q(250.0, "nm"))
        .with_known(Role::DetectorPixelsize, q(55.0, "um"))
        .with_known(Role::FringeSampling, q(3.0, "1"));
    let result = session.evaluate(&request).unwrap();
    assert_eq!(result.formula, "detector_sampling");
    assert!(result.value.magnitude() > 0.27 && result.value.magnitude() < 0.28);
}

#[test]
fn maximum_rocking_step() {
    let request = CalculationRequest::new(Role::RockingAngle)
        .with_known(Role::Wavelength, q(1.5, "angstrom"))
        .with_known(Role::CrystalSize, q(250.0, "nm"))
        .with_known(Role::AngularSampling, q(3.0, "1"));
    let session = CalculationSession::new().with_preferences(Preferences::default());
    let result = session.evaluate(&request).unwrap();
    assert_eq!(result.value.unit().symbol(), "deg");
    let expected = (1.5e-10_f64 / 500e-9).asin().to_degrees() / 3.0;
    assert!((result.value.magnitude() - expected).abs() < 1e-12);
}

#[test]
fn rocking_scan_wider_than_a_quarter_turn_has_no_crystal_size() {
    let mut known = BTreeMap::new();
    known.insert(Role::Wavelength, q(1.0, "angstrom"));
    known.insert(Role::RockingAngle, q(40.0, "deg"));
    known.insert(Role::AngularSampling, q(3.0, "1"));

    let err = evaluate("angular_sampling", Role::CrystalSize, &known).unwrap_err();
    assert_eq!(err.error_code(), "OUT_OF_DOMAIN");

    // Within the quarter turn the solved size reproduces the sampling
    known.insert(Role::RockingAngle, q(20.0, "deg"));
    let size = evaluate("angular_sampling", Role::CrystalSize, &known).unwrap().value;
    let mut back = BTreeMap::new();
    back.insert(Role::Wavelength, q(1.0, "angstrom"));
    back.insert(Role::RockingAngle, q(20.0, "deg"));
    back.insert(Role::CrystalSize, size);
    let sampling = evaluate("angular_sampling", Role::AngularSampling, &back).unwrap().value;
    assert!((sampling.magnitude() - 3.0).abs() < 1e-9);
}

#[test]
fn propagation_follows_a_beamline_setup() {
    let mut known = BTreeMap::new();
    known.insert(Role::XrayEnergy, q(9.0, "keV"));
    known.insert(Role::DetectorDistance, q(1.5, "m"));
    known.insert(Role::DetectorPixelsize, q(55.0, "um"));
    known.insert(Role::FringeSampling, q(3.0, "1"));
    known.insert(Role::SourceSize, q(900.0, "um"));
    known.insert(Role::SourceDistance, q(31.5, "m"));
    known.insert(Role::SecondarySourceDistance, q(1.5, "m"));

    let propagation = CalculationSession::new().propagate(&known);
    assert!(propagation.failures.is_empty(), "{:?}", propagation.failures);

    // energy -> wavelength -> crystal size -> fringe spacing
    assert!(propagation.was_derived(Role::Wavelength));
    assert!(propagation.was_derived(Role::CrystalSize));
    assert!(propagation.was_derived(Role::FringeSpacing));
    // source -> divergence -> coherence length -> slits
    assert!(propagation.was_derived(Role::CoherenceLength));
    assert!(propagation.was_derived(Role::SlitOpening));

    // The slits reproduce the coherence length of the source at the sample
    let slit = propagation.values[&Role::SlitOpening].canonical_magnitude();
    let expected = 1.5 * 900e-6 / 31.5;
    assert!((slit - expected).abs() <= 1e-12 * expected);
}

#[test]
fn horizontal_and_vertical_coherence_from_two_propagations() {
    let plane = |source_size: Quantity| {
        let mut known = BTreeMap::new();
        known.insert(Role::Wavelength, q(1.5, "angstrom"));
        known.insert(Role::SourceDistance, q(31.5, "m"));
        known.insert(Role::SecondarySourceDistance, q(1.5, "m"));
        known.insert(Role::SourceSize, source_size);
        CalculationSession::new().propagate(&known)
    };
    let horizontal = plane(q(900.0, "um"));
    let vertical = plane(q(20.0, "um"));

    let xi_h = horizontal.values[&Role::CoherenceLength].canonical_magnitude();
    let xi_v = vertical.values[&Role::CoherenceLength].canonical_magnitude();
    assert!((xi_h - 1.5e-10 * 31.5 / 900e-6).abs() <= 1e-12 * xi_h);
    assert!((xi_v - 1.5e-10 * 31.5 / 20e-6).abs() <= 1e-12 * xi_v);

    // Slits reproduce each plane's source size scaled to the secondary distance
    let slit_h = horizontal.values[&Role::SlitOpening].canonical_magnitude();
    let slit_v = vertical.values[&Role::SlitOpening].canonical_magnitude();
    assert!((slit_h / slit_v - 45.0).abs() < 1e-9);
}

#[test]
fn preferences_survive_a_save_load_cycle() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("prefs.toml");

    let mut prefs = Preferences::default();
    prefs.set(Role::ScatteringVector, "1/nm", 3).unwrap();
    save_preferences(&prefs, &path).unwrap();

    let loaded = load_preferences(&path).unwrap();
    let q_value = q(3.0, "1/angstrom");
    assert_eq!(loaded.format(Role::ScatteringVector, &q_value).unwrap(), "30.000 1/nm");
}

#[test]
fn errors_serialize_with_type_tag() {
    let err = CalcError::missing_input("fringe_spacing", Role::CrystalSize);
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["type"], "MissingInput");
    assert_eq!(json["details"]["role"], "crystal_size");
}
