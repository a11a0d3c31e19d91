//! Unit tests for common-config crate

use common_config::{OptimizerConfig, RuleSetConfig};

#[test]
fn test_optimizer_config_default() {
    let config = OptimizerConfig::default();

    assert_eq!(config.max_iterations, 100);
    assert!(!config.enable_trace);
    assert_eq!(config.rules, RuleSetConfig::all());
}

#[test]
fn test_rule_set_default_enables_everything() {
    let rules = RuleSetConfig::default();

    assert!(rules.boolean_simplification);
    assert!(rules.self_join_elimination);
    assert!(rules.foreign_key_elimination);
    assert!(rules.left_to_inner_join);
}

#[test]
fn test_rule_set_none() {
    let rules = RuleSetConfig::none();

    assert!(!rules.boolean_simplification);
    assert!(!rules.self_join_elimination);
    assert!(!rules.foreign_key_elimination);
    assert!(!rules.left_to_inner_join);
}

#[test]
fn test_builder_methods() {
    let config = OptimizerConfig::default()
        .with_max_iterations(7)
        .with_trace(true)
        .with_rules(RuleSetConfig {
            left_to_inner_join: false,
            ..RuleSetConfig::all()
        });

    assert_eq!(config.max_iterations, 7);
    assert!(config.enable_trace);
    assert!(!config.rules.left_to_inner_join);
    assert!(config.rules.self_join_elimination);
}

#[test]
fn test_optimizer_config_serialization() {
    let config = OptimizerConfig::default()
        .with_max_iterations(12)
        .with_trace(true);

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("12"));

    let deserialized: OptimizerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, config);
}

#[test]
fn test_config_partial_json() {
    let config = OptimizerConfig::from_json(r#"{"enable_trace": true}"#).unwrap();

    assert!(config.enable_trace);
    assert_eq!(config.max_iterations, 100);
    assert_eq!(config.rules, RuleSetConfig::all());
}

#[test]
fn test_config_partial_rules_json() {
    let config =
        OptimizerConfig::from_json(r#"{"rules": {"foreign_key_elimination": false}}"#).unwrap();

    assert!(!config.rules.foreign_key_elimination);
    assert!(config.rules.self_join_elimination);
}

#[test]
fn test_config_invalid_json() {
    let result = OptimizerConfig::from_json("{not json");
    assert!(result.is_err());
}

#[test]
fn test_config_debug_format() {
    let config = OptimizerConfig::default();
    let debug_str = format!("{:?}", config);
    assert!(debug_str.contains("OptimizerConfig"));
    assert!(debug_str.contains("RuleSetConfig"));
}
