//! Config file + environment-override layering, grounded on
//! `octofhir-server`'s `config_parsing.rs` integration test.

use std::fs;

use dial_server::config::loader::load_config;

#[test]
fn toml_file_is_loaded_and_env_overrides_take_precedence() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dial-server.toml");

    let toml_content = r#"
[server]
public_port = 9100
local_port = 9101

[worker]
queue_capacity = 10

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write config");

    // SAFETY: no other thread in this process reads/writes DIAL__WORKER__QUEUE_CAPACITY.
    unsafe {
        std::env::set_var("DIAL__WORKER__QUEUE_CAPACITY", "7");
    }

    let config = load_config(Some(path.to_str().unwrap())).expect("load config");

    assert_eq!(config.server.public_port, 9100);
    assert_eq!(config.server.local_port, 9101);
    // Env override wins over the file value.
    assert_eq!(config.worker.queue_capacity, 7);
    assert_eq!(config.logging.level, "debug");

    unsafe {
        std::env::remove_var("DIAL__WORKER__QUEUE_CAPACITY");
    }
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = load_config(Some("/nonexistent/dial-server.toml")).expect("load config");
    assert_eq!(config.server.public_port, 8008);
    assert_eq!(config.server.local_port, 8009);
}

#[test]
fn invalid_values_fail_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dial-server.toml");
    fs::write(&path, "[server]\npublic_port = 8008\nlocal_port = 8008\n").expect("write config");

    let err = load_config(Some(path.to_str().unwrap())).unwrap_err();
    assert!(err.contains("must differ"));
}
