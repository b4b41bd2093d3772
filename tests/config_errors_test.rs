//! Invalid adaptive-stepper configurations are rejected at construction.

use imex_ts::{
    AdaptiveImexConfig, AdaptiveImexStepper, ConfigError, SchemeKind, TableKind,
    create_timestep_scheme,
};

fn rejected(config: AdaptiveImexConfig) -> ConfigError {
    AdaptiveImexStepper::new(config).expect_err("configuration must be rejected")
}

#[test]
fn test_negative_table_ids() {
    assert!(matches!(
        rejected(AdaptiveImexConfig::default().with_butcher_table(-1)),
        ConfigError::InvalidTable { id: -1, .. }
    ));
    assert_eq!(
        rejected(AdaptiveImexConfig::default().with_user_table(-3)),
        ConfigError::InvalidUserTable { id: -3 }
    );
}

#[test]
fn test_both_modes_requested() {
    let config = AdaptiveImexConfig {
        fully_explicit: true,
        fully_implicit: true,
        ..AdaptiveImexConfig::default()
    };
    assert_eq!(rejected(config), ConfigError::ConflictingModes);
}

#[test]
fn test_non_positive_tolerances() {
    let err = rejected(AdaptiveImexConfig::default().with_tolerances(1e-4, 0.0));
    assert_eq!(
        err,
        ConfigError::InvalidTolerance {
            name: "atol",
            value: 0.0
        }
    );
    assert!(err.to_string().contains("atol"));

    assert!(matches!(
        rejected(AdaptiveImexConfig::default().with_tolerances(-1.0, 1e-6)),
        ConfigError::InvalidTolerance { name: "rtol", .. }
    ));
}

#[test]
fn test_dirk_table_in_explicit_mode() {
    let err = rejected(
        AdaptiveImexConfig::default()
            .fully_explicit()
            .with_butcher_table(14),
    );
    assert!(matches!(
        err,
        ConfigError::TableModeMismatch {
            id: 14,
            kind: TableKind::DiagonallyImplicit,
            ..
        }
    ));
}

#[test]
fn test_anderson_depth_without_fixed_point() {
    let config = AdaptiveImexConfig {
        anderson_vectors: 4,
        ..AdaptiveImexConfig::default()
    };
    assert_eq!(rejected(config), ConfigError::AccelerationWithoutFixedPoint(4));
}

#[test]
fn test_vector_budget_too_small() {
    assert!(matches!(
        rejected(AdaptiveImexConfig::default().with_nvectors(5)),
        ConfigError::InsufficientVectors { available: 5, .. }
    ));
    // Explicit methods need no nonlinear solver workspace
    assert!(
        AdaptiveImexStepper::new(
            AdaptiveImexConfig::default()
                .fully_explicit()
                .with_nvectors(10)
        )
        .is_ok()
    );
}

#[test]
fn test_scheme_factory_reports_config_errors() {
    let kind = SchemeKind::AdaptiveImex(AdaptiveImexConfig::default().with_butcher_table(42));
    assert!(matches!(
        create_timestep_scheme(kind).err(),
        Some(ConfigError::InvalidTable { id: 42, .. })
    ));
    assert!(create_timestep_scheme(SchemeKind::Ars343).is_ok());
}
