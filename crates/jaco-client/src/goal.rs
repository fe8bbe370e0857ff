//! 目标、结果与目标上下文
//!
//! 一个目标从被接受到产生终态结果之间的全部状态都在 [`GoalContext`] 中：
//! 取消令牌、在硬件闸门中的登记、开始时间、进度和累计误差。
//! 上下文被丢弃时自动从闸门注销。

use crate::control::JointWaypoint;
use crate::types::{CartesianPose, GoalError, JointArray};
use crossbeam_channel::Sender;
use jaco_driver::{CancelReason, CancelToken, GoalRegistration, HardwareGate};
use std::time::{Duration, Instant};

/// 目标航点
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoints {
    /// 关节空间航点（rad）
    Joint(Vec<JointWaypoint>),
    /// 笛卡尔位姿
    Cartesian(Vec<CartesianPose>),
}

impl Waypoints {
    pub fn len(&self) -> usize {
        match self {
            Waypoints::Joint(points) => points.len(),
            Waypoints::Cartesian(poses) => poses.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 单个目标的容差覆盖
///
/// 未设置的字段使用配置中的默认值。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GoalTolerance {
    /// 终点综合误差阈值（关节模式为 rad，夹爪为原始单位）
    pub error_threshold: Option<f64>,
    /// 超时余量，替换配置中的 `timeout_margin_ms`
    pub time_tolerance: Option<Duration>,
}

/// 轨迹目标
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryGoal {
    pub waypoints: Waypoints,
    pub tolerance: GoalTolerance,
}

impl TrajectoryGoal {
    pub fn joints(points: Vec<JointWaypoint>) -> Self {
        Self {
            waypoints: Waypoints::Joint(points),
            tolerance: GoalTolerance::default(),
        }
    }

    pub fn cartesian(poses: Vec<CartesianPose>) -> Self {
        Self {
            waypoints: Waypoints::Cartesian(poses),
            tolerance: GoalTolerance::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: GoalTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// 夹爪目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperGoal {
    /// 闭合比例：0 = 完全张开，1 = 完全闭合
    pub position: f64,
    /// 最大夹持力（仅记录，不做力闭环）
    pub max_effort: Option<f64>,
}

impl GripperGoal {
    pub fn new(position: f64) -> Self {
        Self {
            position,
            max_effort: None,
        }
    }

    pub fn open() -> Self {
        Self::new(0.0)
    }

    pub fn close() -> Self {
        Self::new(1.0)
    }

    pub fn validate(&self) -> Result<(), GoalError> {
        if !(0.0..=1.0).contains(&self.position) {
            return Err(GoalError::invalid(format!(
                "gripper position {} is outside [0, 1]",
                self.position
            )));
        }
        if let Some(effort) = self.max_effort
            && !(effort.is_finite() && effort >= 0.0)
        {
            return Err(GoalError::invalid(format!("invalid max_effort {}", effort)));
        }
        Ok(())
    }
}

/// 目标终态
#[derive(Debug, Clone, PartialEq)]
pub enum GoalOutcome {
    Succeeded { final_error: f64 },
    /// 被同一接口上的新目标或显式取消替代
    Preempted { final_error: f64 },
    Aborted { reason: GoalError, final_error: f64 },
}

impl GoalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GoalOutcome::Succeeded { .. })
    }

    pub fn final_error(&self) -> f64 {
        match self {
            GoalOutcome::Succeeded { final_error }
            | GoalOutcome::Preempted { final_error }
            | GoalOutcome::Aborted { final_error, .. } => *final_error,
        }
    }

    pub fn abort_reason(&self) -> Option<&GoalError> {
        match self {
            GoalOutcome::Aborted { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// 由取消原因得到终态
    pub fn from_cancel(reason: CancelReason, final_error: f64) -> Self {
        match reason {
            CancelReason::Preempted => GoalOutcome::Preempted { final_error },
            CancelReason::Estopped => GoalOutcome::Aborted {
                reason: GoalError::Estopped,
                final_error,
            },
            CancelReason::Erased => GoalOutcome::Aborted {
                reason: GoalError::Erased,
                final_error,
            },
        }
    }
}

/// 执行过程中的反馈
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalFeedback {
    /// 0.0 ~ 1.0
    pub progress: f64,
    /// 综合误差（关节模式为 L1 rad，夹爪为最大手指误差）
    pub combined_error: f64,
    /// 关节模式下每个关节的误差
    pub joint_error: Option<JointArray<f64>>,
    pub elapsed: Duration,
}

/// 单个已接受目标的运行状态
pub struct GoalContext {
    token: CancelToken,
    _registration: GoalRegistration,
    feedback: Option<Sender<GoalFeedback>>,
    started_at: Instant,
    /// 当前跟踪的轨迹点序号
    pub index: usize,
    /// 每个周期综合误差的累计值
    pub cumulative_error: f64,
}

impl GoalContext {
    /// 在闸门登记，急停和清空轨迹会通过令牌取消本目标
    pub fn new(gate: &HardwareGate, token: CancelToken) -> Self {
        let registration = gate.register_goal(token.clone());
        Self {
            token,
            _registration: registration,
            feedback: None,
            started_at: Instant::now(),
            index: 0,
            cumulative_error: 0.0,
        }
    }

    pub fn with_feedback(mut self, feedback: Sender<GoalFeedback>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.token.reason()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 重新计时（轨迹规划完成、开始运动时调用）
    pub fn restart_clock(&mut self) {
        self.started_at = Instant::now();
    }

    /// 发布反馈；通道已满或已关闭时丢弃
    pub fn publish(&mut self, progress: f64, combined_error: f64, joint_error: Option<JointArray<f64>>) {
        self.cumulative_error += combined_error;
        if let Some(tx) = &self.feedback {
            let _ = tx.try_send(GoalFeedback {
                progress: progress.clamp(0.0, 1.0),
                combined_error,
                joint_error,
                elapsed: self.elapsed(),
            });
        }
    }
}

impl std::fmt::Debug for GoalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalContext")
            .field("cancelled", &self.token.reason())
            .field("index", &self.index)
            .field("cumulative_error", &self.cumulative_error)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gripper_goal_validation() {
        assert!(GripperGoal::new(0.5).validate().is_ok());
        assert!(GripperGoal::new(1.2).validate().is_err());
        assert!(GripperGoal::new(f64::NAN).validate().is_err());
        let goal = GripperGoal {
            position: 0.5,
            max_effort: Some(-1.0),
        };
        assert!(goal.validate().is_err());
    }

    #[test]
    fn test_outcome_from_cancel_reason() {
        assert_eq!(
            GoalOutcome::from_cancel(CancelReason::Preempted, 0.1),
            GoalOutcome::Preempted { final_error: 0.1 }
        );
        let aborted = GoalOutcome::from_cancel(CancelReason::Estopped, 0.2);
        assert_eq!(aborted.abort_reason(), Some(&GoalError::Estopped));
        assert_eq!(aborted.final_error(), 0.2);
        assert!(!aborted.is_success());
        let erased = GoalOutcome::from_cancel(CancelReason::Erased, 0.0);
        assert_eq!(erased.abort_reason(), Some(&GoalError::Erased));
    }

    #[test]
    fn test_waypoints_len() {
        assert!(Waypoints::Joint(Vec::new()).is_empty());
        assert_eq!(Waypoints::Cartesian(vec![CartesianPose::default(); 3]).len(), 3);
    }
}
