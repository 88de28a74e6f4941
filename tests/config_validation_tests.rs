//! Config Validation Tests
//!
//! Typo detection and range validation of the pipeline configuration,
//! exercised through the public config API and on-disk TOML files.

use completion_bounds::config::validation::{
    known_config_keys, suggest_correction, validate_unknown_keys,
};
use completion_bounds::config::{defaults, BoundsConfig, ConfigError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_toml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_outlier_alpha_warns_with_suggestion() {
    let toml_str = r#"
[outliers]
alpah = 0.05
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("alpah"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("outliers.alpha"));
}

#[test]
fn typo_in_section_name_warns() {
    let toml_str = r#"
[treshold]
min_bins = 12
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "treshold"
        && w.suggestion.as_deref() == Some("threshold")));
}

#[test]
fn valid_config_has_no_warnings() {
    let toml_str = BoundsConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&toml_str).is_empty());
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert!(suggest_correction("completely_unrelated_setting", &known).is_none());
}

#[test]
fn unknown_keys_do_not_fail_loading() {
    let config = BoundsConfig::from_toml_str(
        r#"
[guards]
min_window_row = 50
"#,
    )
    .unwrap();
    assert_eq!(config.guards.min_window_rows, defaults::MIN_WINDOW_ROWS);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn inverted_r2_anchors_rejected() {
    let err = BoundsConfig::from_toml_str(
        r#"
[threshold]
r2_floor = 0.95
r2_ceiling = 0.80
"#,
    )
    .unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("threshold.r2")), "{errors:?}");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn all_range_errors_are_collected() {
    let mut config = BoundsConfig::default();
    config.outliers.alpha = 1.5;
    config.guards.min_window_rows = 0;
    config.lateral.min_ft = 25_000.0;

    match config.validate() {
        Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
        other => panic!("expected 3 validation errors, got {other:?}"),
    }
}

#[test]
fn support_fraction_must_be_a_fraction() {
    let mut config = BoundsConfig::default();
    config.outliers.support_fraction = Some(0.75);
    assert!(config.validate().is_ok());
    config.outliers.support_fraction = Some(1.2);
    assert!(config.validate().is_err());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn load_from_file_applies_overrides() {
    let file = write_toml(
        r#"
[year_window]
similarity_p_value = 0.05

[outliers]
seed = 7
mcd_trials = 40
"#,
    );
    let config = BoundsConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.year_window.similarity_p_value, 0.05);
    assert_eq!(config.outliers.seed, 7);
    assert_eq!(config.outliers.mcd_trials, 40);
    assert_eq!(config.threshold.max_bins, defaults::MAX_HISTOGRAM_BINS);
}

#[test]
fn parse_error_names_the_file() {
    let file = write_toml("[outliers\nalpha = 0.1\n");
    let err = BoundsConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn missing_file_is_io_error() {
    let err =
        BoundsConfig::load_from_file(std::path::Path::new("/nonexistent/bounds.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = BoundsConfig::default();
    config.outliers.support_fraction = Some(0.6);
    config.lateral.max_floor_ft = 22_000.0;

    let text = config.to_toml().unwrap();
    assert_eq!(BoundsConfig::from_toml_str(&text).unwrap(), config);
}
