//! Integration tests for the file configuration adapter.

use std::path::PathBuf;

use chrono::NaiveTime;
use envmon::adapters::file_config::FileConfig;
use envmon::app::ports::{ConfigError, ConfigPort};
use envmon::evaluator::BoundDirection;
use envmon::sensors::{Metric, SensorModel};

/// Write `body` to a unique temp file with the given extension.
fn temp_config(name: &str, ext: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("envmon-{}-{}.{}", name, std::process::id(), ext));
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn sample_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml");
    let config = FileConfig::new(path).load().unwrap();

    assert_eq!(
        config.sensors,
        vec![SensorModel::Bh1750fvi, SensorModel::Sht31, SensorModel::Co2mini]
    );

    let alert = config.alert.as_ref().unwrap();
    assert_eq!(alert.skip_interval_minutes, 60);
    assert_eq!(alert.filters.len(), 3);
    assert_eq!(alert.filters[1].metric, Metric::Humidity);
    assert_eq!(alert.filters[1].direction, BoundDirection::Lower);

    let relay = config.relay.as_ref().unwrap();
    assert_eq!(relay.turn_on_minutes, 5);
    let window = relay.schedule.as_ref().unwrap();
    assert_eq!(window.weekdays.len(), 3);
    assert_eq!(
        window.instants,
        vec![
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        ]
    );
    assert_eq!(relay.conditions.as_ref().unwrap().skip_interval_minutes, 30);

    let camera = config.camera.as_ref().unwrap();
    assert_eq!(camera.settings["resolution"], "1280x720");
    assert_eq!(config.summary.as_ref().unwrap().from_days, 7);
}

#[test]
fn omitted_sections_take_defaults() {
    let path = temp_config("defaults", "yaml", "mail:\n  to_address: a@b.c\n");
    let config = FileConfig::new(&path).load().unwrap();
    std::fs::remove_file(&path).ok();

    assert!(config.sensors.is_empty());
    assert!(config.alert.is_none());
    assert!(config.summary.is_none());
    assert!(config.relay.is_none());
    assert!(config.camera.is_none());
    assert_eq!(config.mail.to_address, "a@b.c");
}

#[test]
fn json_documents_are_accepted() {
    let path = temp_config(
        "json",
        "json",
        r#"{ "mail": { "alert": { "use": true, "filters": [
              { "name": "light", "limit": "lower", "threshold": 50 } ] } } }"#,
    );
    let config = FileConfig::new(&path).load().unwrap();
    std::fs::remove_file(&path).ok();

    let alert = config.alert.unwrap();
    assert_eq!(alert.filters[0].metric, Metric::Light);
    assert_eq!(alert.filters[0].threshold, 50.0);
}

#[test]
fn missing_file_is_unreadable() {
    let err = FileConfig::new("/nonexistent/envmon.yaml").load().unwrap_err();
    assert!(matches!(err, ConfigError::Unreadable(_)));
}

#[test]
fn unknown_metric_rejects_whole_document() {
    let path = temp_config(
        "badmetric",
        "yaml",
        "mail:\n  alert:\n    use: true\n    filters:\n      - name: pressure\n        limit: upper\n        threshold: 1\n",
    );
    let err = FileConfig::new(&path).load().unwrap_err();
    std::fs::remove_file(&path).ok();
    assert_eq!(err, ConfigError::UnknownMetric("pressure".into()));
}

#[test]
fn malformed_time_rejects_whole_document() {
    let path = temp_config(
        "badtime",
        "yaml",
        "module:\n  web_camera_module:\n    use: true\n    scheduler:\n      day_of_week: [monday]\n      at_time: \"25:99\"\n",
    );
    let err = FileConfig::new(&path).load().unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::MalformedTime { .. }));
}
