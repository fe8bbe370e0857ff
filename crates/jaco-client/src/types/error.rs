//! 目标执行错误类型
//!
//! 区分两类错误：
//! - 拒绝（Rejection）：目标在接触硬件之前就被拒绝（`InvalidGoal`、`Estopped`）
//! - 致命（Fatal）：执行中硬件失效（`HardwareFault`、驱动通道断开）
//!
//! `Preempted` 在大多数接口上是结果而不是错误；只有夹爪接口（只能报告成功或中止）
//! 用它作为中止原因。

use jaco_driver::{DriverError, VendorCode};
use thiserror::Error;

/// 运动学服务错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KinematicsError {
    /// 服务不可用
    #[error("Kinematics service unavailable: {0}")]
    Unavailable(String),

    /// 求解失败
    #[error("Forward kinematics failed: {0}")]
    Failed(String),
}

/// 目标执行错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GoalError {
    /// 目标无效（空轨迹、时间戳倒序、非有限值等）
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// 厂商 API 返回非成功码
    #[error("Hardware fault during {operation}: {code}")]
    HardwareFault {
        operation: &'static str,
        code: VendorCode,
    },

    /// 在时间上限内未收敛
    #[error("Goal timed out after {elapsed_ms}ms (final error: {final_error:.4})")]
    Timeout { elapsed_ms: u64, final_error: f64 },

    /// 急停激活
    #[error("Emergency stop is engaged")]
    Estopped,

    /// 轨迹被清空
    #[error("Trajectories erased")]
    Erased,

    /// 被新目标抢占（仅夹爪接口）
    #[error("Goal preempted")]
    Preempted,

    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    /// 其他驱动错误（通道关闭、超时等）
    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl From<DriverError> for GoalError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::HardwareFault { operation, code } => {
                GoalError::HardwareFault { operation, code }
            },
            DriverError::Estopped => GoalError::Estopped,
            DriverError::InvalidInput(msg) => GoalError::InvalidGoal(msg),
            other => GoalError::Driver(other),
        }
    }
}

impl GoalError {
    /// 目标在执行前被拒绝
    pub fn is_rejection(&self) -> bool {
        matches!(self, GoalError::InvalidGoal(_) | GoalError::Estopped)
    }

    /// 硬件层面不可恢复
    pub fn is_fatal(&self) -> bool {
        match self {
            GoalError::HardwareFault { .. } => true,
            GoalError::Driver(e) => e.is_disconnected(),
            _ => false,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        GoalError::InvalidGoal(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_error() {
        let fault: GoalError = DriverError::HardwareFault {
            operation: "move_home",
            code: VendorCode(9),
        }
        .into();
        assert!(fault.is_fatal());
        assert!(matches!(fault, GoalError::HardwareFault { code: VendorCode(9), .. }));

        let estop: GoalError = DriverError::Estopped.into();
        assert_eq!(estop, GoalError::Estopped);
        assert!(estop.is_rejection());

        let closed: GoalError = DriverError::ChannelClosed.into();
        assert!(closed.is_fatal());
        let timeout: GoalError = DriverError::Timeout.into();
        assert!(!timeout.is_fatal());
    }

    #[test]
    fn test_display() {
        let err = GoalError::Timeout {
            elapsed_ms: 1500,
            final_error: 0.12345,
        };
        assert_eq!(
            err.to_string(),
            "Goal timed out after 1500ms (final error: 0.1235)"
        );
        assert_eq!(
            GoalError::invalid("empty trajectory").to_string(),
            "Invalid goal: empty trajectory"
        );
        let kin: GoalError = KinematicsError::Failed("singular".into()).into();
        assert_eq!(kin.to_string(), "Forward kinematics failed: singular");
    }
}
