use dayahead::config::{Config, Currency, Region};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("dayahead.yaml");

    let mut cfg = Config::default();
    cfg.region = Region::Kristiansand;
    cfg.currency = Currency::Nok;
    cfg.feed.fetch_time = "13:05".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.region, Region::Kristiansand);
    assert_eq!(loaded.currency, Currency::Nok);
    assert_eq!(loaded.feed.fetch_time, "13:05");
    assert_eq!(loaded.logging.file, cfg.logging.file);

    let yaml = fs::read_to_string(&path).unwrap();
    assert!(yaml.contains("region: Kr.sand"));
}

#[test]
fn partial_yaml_fills_defaults() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("partial.yaml");
    fs::write(&path, "region: DK1\ncurrency: DKK\n").unwrap();

    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.region, Region::Dk1);
    assert_eq!(cfg.currency, Currency::Dkk);
    assert_eq!(cfg.feed.retry_delay_seconds, 300);
    assert!(cfg.validate().is_ok());
}

#[test]
fn unknown_region_is_rejected() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("bad.yaml");
    fs::write(&path, "region: Atlantis\n").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn missing_file_is_io_error() {
    let err = Config::from_file("/nonexistent/dayahead.yaml").unwrap_err();
    assert!(matches!(err, dayahead::DayAheadError::Io { .. }));
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.feed.endpoint.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.feed.fetch_time = "noon".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.feed.retry_delay_seconds = 86_401;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    cfg.web.enabled = false;
    assert!(cfg.validate().is_ok());
}
