//! CONTEXT: Integration tests for the msgq CLI
//! OWNERS: @runtime
//! STATUS: Functional
//! TEST_COVERAGE: 4 integration tests
//!
//! TEST_SCOPE:
//!   - Default limits output
//!   - Loading limits from a TOML file
//!   - Rejecting invalid configuration
//!
//! TEST_SCENARIOS:
//!   - default_limits(): no arguments prints built-in limits
//!   - config_file_overrides(): --config applies a partial [limits] table
//!   - invalid_config_reported(): bad segment size surfaces as an error line
//!   - dump_lists_every_slot(): dump reports one entry per table slot

use std::io::Write;

use tempfile::NamedTempFile;

fn config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn default_limits() {
    let out = nexus_msgq::execute(&[]);
    assert!(out.contains("\"segment_size\": 8"));
}

#[test]
fn config_file_overrides() {
    let file = config("[limits]\nsegment_size = 16\nmax_queues = 4\n");
    let path = file.path().to_str().unwrap();
    let out = nexus_msgq::execute(&["--config", path, "limits"]);
    assert!(out.contains("\"segment_size\": 16"), "{out}");
    assert!(out.contains("\"max_queues\": 4"), "{out}");
    assert!(out.contains("\"max_message_bytes\": 32768"), "{out}");
    assert_eq!(nexus_msgq::execute(&["--config", path, "selftest"]), "selftest ok");
}

#[test]
fn invalid_config_reported() {
    let file = config("[limits]\nsegment_size = 12\n");
    let out = nexus_msgq::execute(&["--config", file.path().to_str().unwrap()]);
    assert!(out.starts_with("error:"), "{out}");
    assert!(out.contains("segment_size 12"), "{out}");
}

#[test]
fn dump_lists_every_slot() {
    let file = config("[limits]\nmax_queues = 3\n");
    let out = nexus_msgq::execute(&["--config", file.path().to_str().unwrap(), "dump"]);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["queues"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["pools"]["free_headers"], 40);
}
