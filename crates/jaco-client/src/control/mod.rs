//! 控制算法
//!
//! - [`PdVelocityController`]: 关节速度 PD 控制
//! - [`FingerController`]: 手指位置 PID 控制
//! - [`TrajectoryInterpolator`]: 航点插值
//! - [`TickTimer`]: 固定频率控制循环定时

pub mod controller;
pub mod finger;
pub mod loop_runner;
pub mod trajectory;
pub mod velocity;

pub use controller::Controller;
pub use finger::FingerController;
pub use loop_runner::{LoopConfig, Tick, TickTimer};
pub use trajectory::{
    JointWaypoint, Trajectory, TrajectoryInterpolator, TrajectoryPoint, cartesian_waypoints,
    validate_waypoints,
};
pub use velocity::PdVelocityController;
