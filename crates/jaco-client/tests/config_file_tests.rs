//! 配置文件加载

mod common;

use common::*;
use jaco_client::ConfigError;
use jaco_client::prelude::*;
use tempfile::tempdir;

#[test]
fn test_load_config_file_and_build_arm() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arm.toml");
    std::fs::write(
        &path,
        r#"
        [limits]
        safety_factor = 0.5

        [finger_controller]
        max_speed = 1500.0

        [state]
        arm_name = "jaco"
        "#,
    )
    .unwrap();

    let config = ArmConfig::load(&path).unwrap();
    assert_eq!(config.limits.safety_factor, 0.5);
    assert_eq!(config.finger_controller.max_speed, 1500.0);
    // 未出现的字段取默认值
    assert_eq!(config.velocity_controller.kp, 5.0);

    let (arm, _sim) = arm_with(config);
    let state = arm.sample_joint_state();
    assert_eq!(state.names[0], "jaco_joint_1");
    assert_eq!(state.names[7], "jaco_joint_finger_2");
}

#[test]
fn test_written_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arm.toml");

    let mut config = ArmConfig::default();
    config.velocity_controller.control_rate_hz = 50.0;
    config.home.timeout_ms = 12_000;
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    assert_eq!(ArmConfig::load(&path).unwrap(), config);
}

#[test]
fn test_bad_config_files_rejected() {
    let dir = tempdir().unwrap();

    let syntax = dir.path().join("syntax.toml");
    std::fs::write(&syntax, "[limits\nsafety_factor = 0.5").unwrap();
    assert!(matches!(ArmConfig::load(&syntax), Err(ConfigError::Parse(_))));

    let out_of_range = dir.path().join("range.toml");
    std::fs::write(&out_of_range, "[limits]\nsafety_factor = 1.5\n").unwrap();
    assert!(matches!(
        ArmConfig::load(&out_of_range),
        Err(ConfigError::Invalid { field: "limits.safety_factor", .. })
    ));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(ArmConfig::load(&missing), Err(ConfigError::Io { .. })));
}
