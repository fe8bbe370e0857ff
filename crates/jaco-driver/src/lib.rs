//! JACO/MICO 机械臂驱动层
//!
//! 本 crate 负责所有与硬件直接相关的部分：
//! - [`ArmApi`]：厂商 SDK 接缝
//! - [`HardwareGate`]：独占硬件的线程，串行化所有硬件调用并持有急停状态
//! - [`CancelToken`] / [`GoalRegistry`]：在途目标的取消
//! - [`JointStateSampler`] / [`StateBroadcaster`]：关节状态读取与广播
//! - [`mock::SimulatedArm`]：模拟机械臂（`mock` feature）
//!
//! 轨迹插值、控制器和目标执行在 `jaco-client` 中。

pub mod api;
pub mod broadcast;
pub mod cancel;
pub mod command;
mod error;
pub mod gate;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod state;

pub use api::{ArmApi, CartesianReading, RawJointReading};
pub use broadcast::StateBroadcaster;
pub use cancel::{CancelReason, CancelToken, GoalRegistration, GoalRegistry};
pub use command::{ControlMode, HardwareCommand, PositionType};
pub use error::{DriverError, VendorCode};
pub use gate::{GateConfig, HardwareGate, RawJointSnapshot};
pub use metrics::{GateMetrics, GateMetricsSnapshot};
pub use state::{
    ARM_JOINTS, FINGERS, JointState, JointStateSampler, STATE_JOINTS, SamplerConfig,
    normalize_angle,
};
