//! 硬件命令类型
//!
//! 与厂商 `TrajectoryPoint` 对应的最小命令模型：位置类型 + 可选的手臂部分 + 可选的手指部分。
//! 角度单位为厂商原生单位（度、度/秒），手指为原始单位。

/// 厂商控制模式（同一时刻只有一个生效）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Angular,
    Cartesian,
}

impl ControlMode {
    /// 厂商 API 中的模式编号
    pub fn vendor_id(self) -> i32 {
        match self {
            ControlMode::Angular => 1,
            ControlMode::Cartesian => 2,
        }
    }
}

/// 命令的位置类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionType {
    AngularPosition,
    AngularVelocity,
    CartesianPosition,
    CartesianVelocity,
}

impl PositionType {
    /// 执行该命令所需的控制模式
    pub fn control_mode(self) -> ControlMode {
        match self {
            PositionType::AngularPosition | PositionType::AngularVelocity => ControlMode::Angular,
            PositionType::CartesianPosition | PositionType::CartesianVelocity => {
                ControlMode::Cartesian
            },
        }
    }

    pub fn is_velocity(self) -> bool {
        matches!(
            self,
            PositionType::AngularVelocity | PositionType::CartesianVelocity
        )
    }
}

/// 发送给硬件的单点命令
///
/// - 角度位置/速度：`arm` 为 6 个关节（度 / 度每秒）
/// - 笛卡尔位置/速度：`arm` 为 `[x, y, z, θx, θy, θz]`（米 / 弧度）
/// - `fingers` 为两个手指（原始单位 / 原始单位每秒）
///
/// `None` 表示该部分不受此命令影响。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardwareCommand {
    pub position_type: PositionType,
    pub arm: Option<[f64; 6]>,
    pub fingers: Option<[f64; 2]>,
}

impl HardwareCommand {
    /// 6 关节角速度命令（度/秒）
    pub fn angular_velocity(deg_per_sec: [f64; 6]) -> Self {
        Self {
            position_type: PositionType::AngularVelocity,
            arm: Some(deg_per_sec),
            fingers: None,
        }
    }

    /// 只驱动手指的速度命令
    pub fn finger_velocity(raw_per_sec: [f64; 2]) -> Self {
        Self {
            position_type: PositionType::AngularVelocity,
            arm: None,
            fingers: Some(raw_per_sec),
        }
    }

    /// 6 关节角度位置命令（度）
    pub fn angular_position(deg: [f64; 6]) -> Self {
        Self {
            position_type: PositionType::AngularPosition,
            arm: Some(deg),
            fingers: None,
        }
    }

    /// 笛卡尔位姿命令
    pub fn cartesian_position(pose: [f64; 6]) -> Self {
        Self {
            position_type: PositionType::CartesianPosition,
            arm: Some(pose),
            fingers: None,
        }
    }

    /// 笛卡尔速度命令
    pub fn cartesian_velocity(twist: [f64; 6]) -> Self {
        Self {
            position_type: PositionType::CartesianVelocity,
            arm: Some(twist),
            fingers: None,
        }
    }

    /// 全零速度（手臂 + 手指）
    pub fn zero_velocity() -> Self {
        Self {
            position_type: PositionType::AngularVelocity,
            arm: Some([0.0; 6]),
            fingers: Some([0.0; 2]),
        }
    }

    /// 替换手指部分
    pub fn with_fingers(mut self, fingers: [f64; 2]) -> Self {
        self.fingers = Some(fingers);
        self
    }

    /// 是否为不会产生运动的命令
    ///
    /// 只有所有分量都为零的速度命令才算；任何位置命令都会产生运动。
    pub fn is_zero_motion(&self) -> bool {
        if !self.position_type.is_velocity() {
            return false;
        }
        let arm_zero = self.arm.is_none_or(|a| a.iter().all(|v| *v == 0.0));
        let fingers_zero = self.fingers.is_none_or(|f| f.iter().all(|v| *v == 0.0));
        arm_zero && fingers_zero
    }

    /// 所有分量均为有限值
    pub fn is_finite(&self) -> bool {
        self.arm.is_none_or(|a| a.iter().all(|v| v.is_finite()))
            && self.fingers.is_none_or(|f| f.iter().all(|v| v.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_type_mode() {
        assert_eq!(
            PositionType::AngularVelocity.control_mode(),
            ControlMode::Angular
        );
        assert_eq!(
            PositionType::CartesianPosition.control_mode(),
            ControlMode::Cartesian
        );
        assert!(PositionType::CartesianVelocity.is_velocity());
        assert!(!PositionType::AngularPosition.is_velocity());
        assert_eq!(ControlMode::Cartesian.vendor_id(), 2);
    }

    #[test]
    fn test_zero_motion() {
        assert!(HardwareCommand::zero_velocity().is_zero_motion());
        assert!(HardwareCommand::finger_velocity([0.0, 0.0]).is_zero_motion());
        assert!(!HardwareCommand::finger_velocity([0.0, 5.0]).is_zero_motion());
        assert!(!HardwareCommand::angular_velocity([0.0, 0.0, 1.0, 0.0, 0.0, 0.0]).is_zero_motion());
        // 位置命令永远视为运动
        assert!(!HardwareCommand::angular_position([0.0; 6]).is_zero_motion());
    }

    #[test]
    fn test_is_finite() {
        assert!(HardwareCommand::zero_velocity().is_finite());
        assert!(!HardwareCommand::angular_velocity([f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0]).is_finite());
        assert!(
            !HardwareCommand::zero_velocity()
                .with_fingers([f64::INFINITY, 0.0])
                .is_finite()
        );
    }
}
