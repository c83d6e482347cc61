//! Node configuration loading from disk.

use std::{io::Write, time::Duration};

use meshforge_core::{ConfigError, NodeConfig};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_human_readable_durations() {
    let file = write_config(
        r#"
        node_id = "node-a"
        peers = ["node-b", "node-c"]
        election_timeout = "300ms"
        heartbeat_interval = "75ms"
        algorithm = "paxos"

        [settings]
        max_batch = 64
        "#,
    );

    let config = NodeConfig::from_file(file.path()).expect("valid config");

    assert_eq!(config.node_id, "node-a");
    assert_eq!(config.peers, vec!["node-b", "node-c"]);
    assert_eq!(config.election_timeout, Duration::from_millis(300));
    assert_eq!(config.heartbeat_interval, Duration::from_millis(75));
    assert_eq!(config.algorithm, "paxos");
    assert_eq!(config.settings.get("max_batch").and_then(toml::Value::as_integer), Some(64));
    // Unspecified fields keep their defaults
    assert_eq!(config.listen_addr, ":8080");
}

#[test]
fn missing_file_is_io_error() {
    let result = NodeConfig::from_file("/nonexistent/meshforge/node.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn malformed_duration_is_parse_error() {
    let file = write_config(r#"election_timeout = "soon""#);

    let result = NodeConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn inconsistent_values_are_rejected_on_load() {
    let file = write_config(
        r#"
        election_timeout = "10ms"
        heartbeat_interval = "20ms"
        "#,
    );

    let result = NodeConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}
