//! JACO/MICO 机械臂客户端
//!
//! 本 crate 在 [`jaco_driver`] 之上提供目标执行：
//! - 强类型单位（[`Rad`]、[`Deg`]）和关节数组（[`JointArray`]）
//! - 航点插值、PD 关节速度控制、手指 PID 控制
//! - 五种目标接口（关节速度、原始角度、笛卡尔、夹爪、回零），同接口新目标抢占旧目标
//! - 单点流式命令
//! - [`JacoArm`] 门面：组装闸门、采样、广播和各接口
//!
//! # 示例
//!
//! ```rust,ignore
//! use jaco_client::prelude::*;
//!
//! let arm = JacoArmBuilder::new().build(api)?;
//! let mut target = JointArray::splat(Rad::ZERO);
//! target[Joint::J1] = Rad(0.5);
//! let goal = TrajectoryGoal::joints(vec![JointWaypoint::new(target)]);
//! let outcome = arm.execute_trajectory(TrajectoryMode::JointVelocity, &goal)?;
//! ```

pub mod arm;
pub mod config;
pub mod control;
pub mod executor;
pub mod goal;
pub mod kinematics;
pub mod streaming;
pub mod types;

pub use arm::{ArmError, JacoArm, JacoArmBuilder, TrajectoryMode};
pub use config::{ArmConfig, ConfigError};
pub use executor::MotionMode;
pub use goal::{GoalFeedback, GoalOutcome, GoalTolerance, GripperGoal, TrajectoryGoal, Waypoints};
pub use kinematics::{DhChain, DhLink, ForwardKinematics};
pub use streaming::{AngularCommand, CartesianCommand, CommandKind};
pub use types::*;

/// 常用类型
pub mod prelude {
    pub use crate::arm::{JacoArm, JacoArmBuilder, TrajectoryMode};
    pub use crate::config::ArmConfig;
    pub use crate::control::JointWaypoint;
    pub use crate::executor::MotionMode;
    pub use crate::goal::{GoalOutcome, GoalTolerance, GripperGoal, TrajectoryGoal};
    pub use crate::streaming::{AngularCommand, CartesianCommand};
    pub use crate::types::{CartesianPose, GoalError, Joint, JointArray, Rad};
}
