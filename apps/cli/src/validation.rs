//! 输入验证模块
//!
//! 解析逗号分隔的数值列表，并检查关节角和位姿的范围。

use anyhow::{Context, Result};
use jaco_client::{CartesianPose, JointArray, Rad};

/// 解析逗号分隔的数值，要求恰好 `expected` 个有限值
pub fn parse_values(input: &str, expected: usize, what: &str) -> Result<Vec<f64>> {
    let values: Vec<f64> = input
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse {} '{}'", what, input))?;

    if values.len() != expected {
        anyhow::bail!("{} needs {} values, got {}", what, expected, values.len());
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        anyhow::bail!("{} value #{} is not finite", what, i + 1);
    }
    Ok(values)
}

/// 关节位置验证器
pub struct JointValidator {
    /// 最小角度（弧度）
    min_angle: f64,
    /// 最大角度（弧度）
    max_angle: f64,
}

impl JointValidator {
    pub fn new(min_angle: f64, max_angle: f64) -> Self {
        Self {
            min_angle,
            max_angle,
        }
    }

    /// [-π, π]：目标会按最短路径展开，更大的角度没有意义
    pub fn default_range() -> Self {
        Self::new(-std::f64::consts::PI, std::f64::consts::PI)
    }

    pub fn validate_joint(&self, index: usize, position: f64) -> Result<()> {
        if position < self.min_angle || position > self.max_angle {
            anyhow::bail!(
                "joint J{} position {:.3} rad is outside [{:.3}, {:.3}]",
                index + 1,
                position,
                self.min_angle,
                self.max_angle
            );
        }
        Ok(())
    }

    /// 解析并验证 6 个关节角
    pub fn parse_joints(&self, input: &str) -> Result<JointArray<Rad>> {
        let values = parse_values(input, 6, "joints")?;
        for (i, &pos) in values.iter().enumerate() {
            self.validate_joint(i, pos)?;
        }
        let mut joints = [Rad(0.0); 6];
        for (slot, value) in joints.iter_mut().zip(values) {
            *slot = Rad(value);
        }
        Ok(JointArray::new(joints))
    }
}

/// 解析 `x,y,z,θx,θy,θz`（米、弧度）
pub fn parse_pose(input: &str) -> Result<CartesianPose> {
    let values = parse_values(input, 6, "pose")?;
    let mut array = [0.0; 6];
    array.copy_from_slice(&values);
    Ok(CartesianPose::from_array(array))
}

/// 夹爪目标必须在 [0, 1]
pub fn validate_gripper_position(position: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&position) {
        anyhow::bail!("gripper position {} is outside [0, 1]", position);
    }
    Ok(())
}
