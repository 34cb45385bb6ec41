//! Layering YAML files with command-line overrides.

use layerconf::{ConfigError, Value, merge};
use layerconf_yaml::{YamlError, dump, from_dotlist, load_str};

const DEFAULTS: &str = "\
app:
  name: demo
  port: 80
  tags: [a, b]
db:
  user: ???
  url: postgres://${db.user}@localhost/${app.name}
";

const PRODUCTION: &str = "\
app:
  port: 443
  tags: [prod]
";

#[test]
fn test_files_and_overrides_compose() {
    let defaults = load_str(DEFAULTS).unwrap();
    let production = load_str(PRODUCTION).unwrap();
    let cli = from_dotlist(["db.user=admin", "app.debug=false"]).unwrap();
    let cfg = merge([&defaults, &production, &cli]).unwrap();

    assert_eq!(cfg.select("app.port").unwrap(), Some(Value::from(443)));
    assert_eq!(cfg.select("app.debug").unwrap(), Some(Value::from(false)));
    assert_eq!(cfg.select_node("app.tags").unwrap().len(), 1);
    assert_eq!(
        cfg.select("db.url").unwrap(),
        Some(Value::from("postgres://admin@localhost/demo"))
    );
}

#[test]
fn test_missing_value_reported_with_full_key() {
    let cfg = load_str(DEFAULTS).unwrap();
    let err = cfg.select("db.url").unwrap_err();
    assert!(matches!(err, ConfigError::MissingMandatoryValue { .. }));
    assert_eq!(err.full_key(), Some("db.user"));
}

#[test]
fn test_dump_of_merged_tree_reloads() {
    let cfg = merge([load_str(DEFAULTS).unwrap(), load_str(PRODUCTION).unwrap()]).unwrap();
    let reloaded = load_str(&dump(&cfg, false).unwrap()).unwrap();
    assert_eq!(
        reloaded.to_container(false).unwrap(),
        cfg.to_container(false).unwrap()
    );
}

#[test]
fn test_load_error_wraps_config_error() {
    let err = load_str("servers:\n  - {1: x}\n").unwrap_err();
    assert!(matches!(
        err,
        YamlError::Config(ConfigError::UnsupportedKeyType { .. })
    ));
    insta::assert_snapshot!(err.to_string(), @"Map keys must be str, got int '1' at 'servers[0]'");
}
