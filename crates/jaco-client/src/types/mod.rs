//! 核心类型

mod cartesian;
mod error;
mod joint;
mod units;

pub use cartesian::{CartesianPose, EulerAngles, Position3D};
pub use error::{GoalError, KinematicsError};
pub use joint::{ActuatorClass, Joint, JointArray};
pub use units::{Deg, Rad};

/// 目标执行结果
pub type Result<T> = std::result::Result<T, GoalError>;
