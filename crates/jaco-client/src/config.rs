//! 机械臂配置
//!
//! 所有控制参数集中在 [`ArmConfig`]，可以从 TOML 加载。缺省的字段使用默认值，
//! 因此一个空文件也是合法配置。
//!
//! # 示例
//!
//! ```rust
//! use jaco_client::config::ArmConfig;
//!
//! let config = ArmConfig::from_toml_str(r#"
//!     [limits]
//!     safety_factor = 0.5
//!
//!     [velocity_controller]
//!     control_rate_hz = 50.0
//! "#).unwrap();
//! assert_eq!(config.limits.safety_factor, 0.5);
//! assert_eq!(config.finger_controller.kp, 7.5);
//! ```

use crate::types::{ActuatorClass, Joint};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {}", value)))
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be non-negative, got {}", value)))
    }
}

/// 运动限制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 大执行器（关节 1-3）额定最大速度（rad/s）
    pub large_actuator_velocity: f64,
    /// 小执行器（关节 4-6）额定最大速度（rad/s）
    pub small_actuator_velocity: f64,
    /// 速度安全系数，(0, 1]
    pub safety_factor: f64,
    /// 轨迹时间放大系数，≥ 1
    pub time_scaling_factor: f64,
    /// 拐角混合段的最大角加速度（rad/s²）
    pub max_curvature: f64,
    /// 单条轨迹允许的最长时长（含时间戳和拉伸）
    pub max_trajectory_duration_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            large_actuator_velocity: 0.8378,
            small_actuator_velocity: 1.0472,
            safety_factor: 0.8,
            time_scaling_factor: 1.5,
            max_curvature: 20.0,
            max_trajectory_duration_ms: 600_000,
        }
    }
}

impl LimitsConfig {
    /// 某类执行器的实际速度上限（额定值 × 安全系数）
    pub fn class_limit(&self, class: ActuatorClass) -> f64 {
        let rated = match class {
            ActuatorClass::Large => self.large_actuator_velocity,
            ActuatorClass::Small => self.small_actuator_velocity,
        };
        rated * self.safety_factor
    }

    pub fn joint_limit(&self, joint: Joint) -> f64 {
        self.class_limit(joint.actuator_class())
    }

    pub fn max_trajectory_duration(&self) -> Duration {
        Duration::from_millis(self.max_trajectory_duration_ms)
    }
}

/// 关节速度控制器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityControllerConfig {
    /// 比例增益（1/s）
    pub kp: f64,
    /// 微分增益（s）
    pub kv: f64,
    /// 终点处所有关节误差绝对值之和的收敛阈值（rad）
    pub error_threshold: f64,
    /// 单关节误差低于此值时提前前进到下一个插值点（rad）
    pub segment_tolerance: f64,
    pub control_rate_hz: f64,
    /// dt 超过周期的多少倍视为时间跳变
    pub dt_clamp_multiplier: f64,
    /// 超时 = 轨迹时长 × timeout_scale + timeout_margin
    pub timeout_scale: f64,
    pub timeout_margin_ms: u64,
}

impl Default for VelocityControllerConfig {
    fn default() -> Self {
        Self {
            kp: 5.0,
            kv: 0.05,
            error_threshold: 0.03,
            segment_tolerance: 0.02,
            control_rate_hz: 100.0,
            dt_clamp_multiplier: 2.0,
            timeout_scale: 1.5,
            timeout_margin_ms: 3000,
        }
    }
}

impl VelocityControllerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.control_rate_hz)
    }
}

/// 手指 PID 参数（原始手指单位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerControllerConfig {
    pub kp: f64,
    pub ki: f64,
    pub kv: f64,
    /// 每个手指的收敛阈值（原始单位）
    pub error_threshold: f64,
    /// 最大手指速度（原始单位/秒）
    pub max_speed: f64,
    /// 完全闭合时的原始位置
    pub closed_position: f64,
    /// 积分项上限（原始单位·秒）
    pub integral_limit: f64,
    pub control_rate_hz: f64,
    pub timeout_ms: u64,
}

impl Default for FingerControllerConfig {
    fn default() -> Self {
        Self {
            kp: 7.5,
            ki: 0.1,
            kv: 0.05,
            error_threshold: 1.0,
            max_speed: 3000.0,
            closed_position: 6400.0,
            integral_limit: 500.0,
            control_rate_hz: 100.0,
            timeout_ms: 10_000,
        }
    }
}

/// 笛卡尔模式参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartesianConfig {
    /// 终点位置容差（米）
    pub position_tolerance: f64,
    /// 终点姿态容差（弧度）
    pub orientation_tolerance: f64,
    /// 相邻下发航点的最小间距（米）
    pub min_step: f64,
    pub poll_rate_hz: f64,
    /// 估算轨迹时长用的末端速度（米/秒）
    pub linear_speed_estimate: f64,
    pub timeout_margin_ms: u64,
}

impl Default for CartesianConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 0.005,
            orientation_tolerance: 0.05,
            min_step: 0.01,
            poll_rate_hz: 50.0,
            linear_speed_estimate: 0.05,
            timeout_margin_ms: 5000,
        }
    }
}

/// 角度位置模式参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    pub poll_rate_hz: f64,
    /// 估算时长用的关节速度占速度上限的比例
    pub speed_estimate_ratio: f64,
    pub timeout_margin_ms: u64,
}

impl Default for AngularConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: 50.0,
            speed_estimate_ratio: 0.5,
            timeout_margin_ms: 5000,
        }
    }
}

/// 状态发布参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub arm_name: String,
    pub publish_rate_hz: f64,
    /// 手指原始单位到发布单位的比例
    pub finger_scale: f64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            arm_name: "mico".to_string(),
            publish_rate_hz: 100.0,
            finger_scale: 1.0 / 120.0,
        }
    }
}

/// 硬件闸门参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSection {
    pub command_queue_capacity: usize,
    pub reply_timeout_ms: u64,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            command_queue_capacity: 10,
            reply_timeout_ms: 1000,
        }
    }
}

/// 回零参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub timeout_ms: u64,
    pub poll_rate_hz: f64,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            poll_rate_hz: 20.0,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub limits: LimitsConfig,
    pub velocity_controller: VelocityControllerConfig,
    pub finger_controller: FingerControllerConfig,
    pub cartesian: CartesianConfig,
    pub angular: AngularConfig,
    pub state: StateConfig,
    pub gate: GateSection,
    pub home: HomeConfig,
}

impl ArmConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ArmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验所有参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.limits;
        require_positive("limits.large_actuator_velocity", l.large_actuator_velocity)?;
        require_positive("limits.small_actuator_velocity", l.small_actuator_velocity)?;
        if !(l.safety_factor > 0.0 && l.safety_factor <= 1.0) {
            return Err(invalid(
                "limits.safety_factor",
                format!("must be in (0, 1], got {}", l.safety_factor),
            ));
        }
        if !(l.time_scaling_factor.is_finite() && l.time_scaling_factor >= 1.0) {
            return Err(invalid(
                "limits.time_scaling_factor",
                format!("must be >= 1, got {}", l.time_scaling_factor),
            ));
        }
        require_positive("limits.max_curvature", l.max_curvature)?;
        if l.max_trajectory_duration_ms == 0 {
            return Err(invalid("limits.max_trajectory_duration_ms", "must be at least 1"));
        }

        let v = &self.velocity_controller;
        require_positive("velocity_controller.kp", v.kp)?;
        require_non_negative("velocity_controller.kv", v.kv)?;
        require_positive("velocity_controller.error_threshold", v.error_threshold)?;
        require_non_negative("velocity_controller.segment_tolerance", v.segment_tolerance)?;
        require_positive("velocity_controller.control_rate_hz", v.control_rate_hz)?;
        if !(v.dt_clamp_multiplier.is_finite() && v.dt_clamp_multiplier >= 1.0) {
            return Err(invalid(
                "velocity_controller.dt_clamp_multiplier",
                format!("must be >= 1, got {}", v.dt_clamp_multiplier),
            ));
        }
        if !(v.timeout_scale.is_finite() && v.timeout_scale >= 1.0) {
            return Err(invalid(
                "velocity_controller.timeout_scale",
                format!("must be >= 1, got {}", v.timeout_scale),
            ));
        }

        let f = &self.finger_controller;
        require_positive("finger_controller.kp", f.kp)?;
        require_non_negative("finger_controller.ki", f.ki)?;
        require_non_negative("finger_controller.kv", f.kv)?;
        require_positive("finger_controller.error_threshold", f.error_threshold)?;
        require_positive("finger_controller.max_speed", f.max_speed)?;
        require_positive("finger_controller.closed_position", f.closed_position)?;
        require_non_negative("finger_controller.integral_limit", f.integral_limit)?;
        require_positive("finger_controller.control_rate_hz", f.control_rate_hz)?;

        let c = &self.cartesian;
        require_positive("cartesian.position_tolerance", c.position_tolerance)?;
        require_positive("cartesian.orientation_tolerance", c.orientation_tolerance)?;
        require_non_negative("cartesian.min_step", c.min_step)?;
        require_positive("cartesian.poll_rate_hz", c.poll_rate_hz)?;
        require_positive("cartesian.linear_speed_estimate", c.linear_speed_estimate)?;

        let a = &self.angular;
        require_positive("angular.poll_rate_hz", a.poll_rate_hz)?;
        if !(a.speed_estimate_ratio > 0.0 && a.speed_estimate_ratio <= 1.0) {
            return Err(invalid(
                "angular.speed_estimate_ratio",
                format!("must be in (0, 1], got {}", a.speed_estimate_ratio),
            ));
        }

        require_positive("state.publish_rate_hz", self.state.publish_rate_hz)?;
        require_positive("state.finger_scale", self.state.finger_scale)?;
        if self.state.arm_name.is_empty() {
            return Err(invalid("state.arm_name", "must not be empty"));
        }

        if self.gate.command_queue_capacity == 0 {
            return Err(invalid("gate.command_queue_capacity", "must be at least 1"));
        }
        if self.gate.reply_timeout_ms == 0 {
            return Err(invalid("gate.reply_timeout_ms", "must be at least 1"));
        }

        require_positive("home.poll_rate_hz", self.home.poll_rate_hz)?;
        Ok(())
    }

    /// 转为驱动层的闸门配置
    pub fn gate_config(&self) -> jaco_driver::GateConfig {
        jaco_driver::GateConfig {
            queue_capacity: self.gate.command_queue_capacity,
            reply_timeout: Duration::from_millis(self.gate.reply_timeout_ms),
        }
    }

    /// 转为驱动层的采样配置
    pub fn sampler_config(&self) -> jaco_driver::SamplerConfig {
        jaco_driver::SamplerConfig {
            arm_name: self.state.arm_name.clone(),
            finger_scale: self.state.finger_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ArmConfig::default();
        config.validate().unwrap();
        assert!((config.limits.class_limit(ActuatorClass::Large) - 0.8378 * 0.8).abs() < 1e-12);
        assert!((config.limits.joint_limit(Joint::J5) - 1.0472 * 0.8).abs() < 1e-12);
        assert_eq!(config.velocity_controller.period(), Duration::from_millis(10));
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(ArmConfig::from_toml_str("").unwrap(), ArmConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ArmConfig::from_toml_str(
            r#"
            [finger_controller]
            max_speed = 1500.0

            [state]
            arm_name = "jaco"
            "#,
        )
        .unwrap();
        assert_eq!(config.finger_controller.max_speed, 1500.0);
        assert_eq!(config.finger_controller.kp, 7.5);
        assert_eq!(config.sampler_config().arm_name, "jaco");
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = ArmConfig::default();
        config.limits.safety_factor = 0.6;
        let text = config.to_toml_string().unwrap();
        assert_eq!(ArmConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        let err = ArmConfig::from_toml_str("[limits]\nsafety_factor = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "limits.safety_factor",
                ..
            }
        ));

        let err = ArmConfig::from_toml_str("[limits]\ntime_scaling_factor = 0.9").unwrap_err();
        assert!(err.to_string().contains("time_scaling_factor"));

        let err = ArmConfig::from_toml_str("[velocity_controller]\ncontrol_rate_hz = 0.0")
            .unwrap_err();
        assert!(err.to_string().contains("control_rate_hz"));

        let err = ArmConfig::from_toml_str("[limits]\nmax_trajectory_duration_ms = 0").unwrap_err();
        assert!(err.to_string().contains("max_trajectory_duration_ms"));

        assert!(matches!(
            ArmConfig::from_toml_str("[limits\n").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ArmConfig::load("/nonexistent/jaco.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
