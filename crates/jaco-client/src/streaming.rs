//! 单点流式命令
//!
//! 绕过目标状态机，直接经硬件闸门下发一个角度或笛卡尔点。急停时闸门照常拒绝。
//!
//! # 单位
//!
//! - 角度位置输入为弧度，下发前换算为厂商使用的度
//! - 角速度输入为弧度/秒，先按执行器等级限速再换算为度/秒
//! - 笛卡尔输入原样下发（米、弧度）
//! - 手指为原始单位；手指速度钳位到 `max_speed`

use crate::config::ArmConfig;
use crate::types::{CartesianPose, GoalError, Joint, JointArray, Rad};
use jaco_driver::{HardwareCommand, HardwareGate, PositionType};
use tracing::debug;

/// 位置还是速度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    #[default]
    Position,
    Velocity,
}

/// 流式角度命令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularCommand {
    pub kind: CommandKind,
    /// 手臂关节（rad 或 rad/s）
    pub arm: Option<JointArray<Rad>>,
    /// 手指（原始单位或原始单位/秒）
    pub fingers: Option<[f64; 2]>,
    /// 先清空硬件队列
    pub replace_queued: bool,
}

impl AngularCommand {
    pub fn position(arm: JointArray<Rad>) -> Self {
        Self {
            kind: CommandKind::Position,
            arm: Some(arm),
            ..Self::default()
        }
    }

    pub fn velocity(arm: JointArray<Rad>) -> Self {
        Self {
            kind: CommandKind::Velocity,
            arm: Some(arm),
            ..Self::default()
        }
    }

    pub fn with_fingers(mut self, fingers: [f64; 2]) -> Self {
        self.fingers = Some(fingers);
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace_queued = true;
        self
    }

    /// 换算为硬件命令
    ///
    /// # 错误
    ///
    /// 没有任何部分或含非有限值时返回 `InvalidGoal`。
    pub fn to_hardware(&self, config: &ArmConfig) -> Result<HardwareCommand, GoalError> {
        if self.arm.is_none() && self.fingers.is_none() {
            return Err(GoalError::invalid("angular command has neither arm nor finger part"));
        }
        if let Some(arm) = &self.arm
            && !arm.iter().all(|r| r.is_finite())
        {
            return Err(GoalError::invalid("angular command contains non-finite joint values"));
        }
        check_fingers(self.fingers)?;

        let arm = self.arm.map(|arm| match self.kind {
            CommandKind::Position => arm.map(|r| r.to_deg().value()).into_array(),
            CommandKind::Velocity => arm
                .map_with_joint(|joint, r| clamp_velocity(config, joint, r.value()).to_degrees())
                .into_array(),
        });
        let fingers = self.fingers.map(|f| match self.kind {
            CommandKind::Position => f,
            CommandKind::Velocity => clamp_fingers(config, f),
        });

        let position_type = match self.kind {
            CommandKind::Position => PositionType::AngularPosition,
            CommandKind::Velocity => PositionType::AngularVelocity,
        };
        Ok(HardwareCommand {
            position_type,
            arm,
            fingers,
        })
    }
}

/// 流式笛卡尔命令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianCommand {
    pub kind: CommandKind,
    /// 位姿（位置模式）或扭转 `[vx, vy, vz, ωx, ωy, ωz]`（速度模式）
    pub arm: Option<CartesianPose>,
    pub fingers: Option<[f64; 2]>,
    pub replace_queued: bool,
}

impl CartesianCommand {
    pub fn position(pose: CartesianPose) -> Self {
        Self {
            kind: CommandKind::Position,
            arm: Some(pose),
            ..Self::default()
        }
    }

    pub fn velocity(twist: CartesianPose) -> Self {
        Self {
            kind: CommandKind::Velocity,
            arm: Some(twist),
            ..Self::default()
        }
    }

    pub fn with_fingers(mut self, fingers: [f64; 2]) -> Self {
        self.fingers = Some(fingers);
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace_queued = true;
        self
    }

    pub fn to_hardware(&self, config: &ArmConfig) -> Result<HardwareCommand, GoalError> {
        if self.arm.is_none() && self.fingers.is_none() {
            return Err(GoalError::invalid("Cartesian command has neither arm nor finger part"));
        }
        if let Some(arm) = &self.arm
            && !arm.is_finite()
        {
            return Err(GoalError::invalid("Cartesian command contains non-finite values"));
        }
        check_fingers(self.fingers)?;

        let position_type = match self.kind {
            CommandKind::Position => PositionType::CartesianPosition,
            CommandKind::Velocity => PositionType::CartesianVelocity,
        };
        let fingers = self.fingers.map(|f| match self.kind {
            CommandKind::Position => f,
            CommandKind::Velocity => clamp_fingers(config, f),
        });
        Ok(HardwareCommand {
            position_type,
            arm: self.arm.map(|pose| pose.to_array()),
            fingers,
        })
    }
}

fn check_fingers(fingers: Option<[f64; 2]>) -> Result<(), GoalError> {
    match fingers {
        Some(f) if !f.iter().all(|v| v.is_finite()) => {
            Err(GoalError::invalid("finger values must be finite"))
        },
        _ => Ok(()),
    }
}

fn clamp_velocity(config: &ArmConfig, joint: Joint, rad_per_sec: f64) -> f64 {
    let limit = config.limits.joint_limit(joint);
    rad_per_sec.clamp(-limit, limit)
}

fn clamp_fingers(config: &ArmConfig, fingers: [f64; 2]) -> [f64; 2] {
    let max = config.finger_controller.max_speed;
    fingers.map(|v| v.clamp(-max, max))
}

/// 经闸门下发一个已换算的命令
pub(crate) fn dispatch(
    gate: &HardwareGate,
    command: HardwareCommand,
    replace_queued: bool,
) -> Result<(), GoalError> {
    debug!(
        "Streaming {:?} command (replace queued: {})",
        command.position_type, replace_queued
    );
    if replace_queued {
        gate.send_replacing(command)?;
    } else {
        gate.send(command)?;
    }
    Ok(())
}
