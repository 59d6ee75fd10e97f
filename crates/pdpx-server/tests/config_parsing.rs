use std::{env, fs};

use pdpx_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("pdpx.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 2048

[logging]
level = "debug"

[decision]
timeout_ms = 250

[policies]
deploy = ["policies/naming.json", "policies/guard.json"]
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.body_limit_bytes, 2048);
    assert_eq!(cfg.decision.timeout_ms, 250);
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");
    assert_eq!(cfg.policies.deploy.len(), 2);

    // 2) Env override should win over file
    unsafe {
        env::set_var("PDPX__DECISION__TIMEOUT_MS", "900");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.decision.timeout_ms, 900);
    unsafe {
        env::remove_var("PDPX__DECISION__TIMEOUT_MS");
    }

    // 3) Invalid config (zero timeout) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[decision]
timeout_ms = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("decision.timeout_ms must be > 0"));

    // 4) Missing file falls back to defaults
    let missing = dir.path().join("absent.toml");
    let cfg = load_config(missing.to_str()).expect("defaults should load");
    assert_eq!(cfg.server.port, 6969);
    assert!(cfg.policies.deploy.is_empty());
}
