//! 厂商 API 抽象
//!
//! [`ArmApi`] 是驱动层与厂商 SDK 之间的唯一接缝。真实实现包装厂商动态库，
//! 测试使用 [`SimulatedArm`](crate::mock::SimulatedArm)。
//!
//! 所有方法都返回厂商原生单位：
//! - 关节角度：度；关节速度：度/秒
//! - 手指：原始编码器单位
//! - 笛卡尔位置：米；姿态：弧度（欧拉角）
//!
//! 实现者不需要线程安全，因为 [`HardwareGate`](crate::HardwareGate) 的硬件线程独占它。

use crate::command::{ControlMode, HardwareCommand};
use crate::error::VendorCode;

/// 一次关节读取（6 个手臂关节 + 2 个手指）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawJointReading {
    pub arm: [f64; 6],
    pub fingers: [f64; 2],
}

/// 厂商笛卡尔位姿读数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianReading {
    /// `[x, y, z]`（米）
    pub position: [f64; 3],
    /// `[θx, θy, θz]`（弧度）
    pub orientation: [f64; 3],
}

impl CartesianReading {
    /// 展平为 `[x, y, z, θx, θy, θz]`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.position[0],
            self.position[1],
            self.position[2],
            self.orientation[0],
            self.orientation[1],
            self.orientation[2],
        ]
    }
}

/// 厂商 SDK 接口
pub trait ArmApi: Send {
    fn start_control_api(&mut self) -> Result<(), VendorCode>;

    fn stop_control_api(&mut self) -> Result<(), VendorCode>;

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), VendorCode>;

    /// 关节角度（度）与手指位置（原始单位）
    fn angular_position(&mut self) -> Result<RawJointReading, VendorCode>;

    /// 关节角速度（度/秒）
    fn angular_velocity(&mut self) -> Result<RawJointReading, VendorCode>;

    /// 关节力矩 / 手指电流
    fn angular_force(&mut self) -> Result<RawJointReading, VendorCode>;

    fn cartesian_position(&mut self) -> Result<CartesianReading, VendorCode>;

    /// 把一个点追加到硬件轨迹队列
    fn send_basic_trajectory(&mut self, command: &HardwareCommand) -> Result<(), VendorCode>;

    /// 清空硬件轨迹队列
    fn erase_all_trajectories(&mut self) -> Result<(), VendorCode>;

    /// 启动厂商回零动作（非阻塞）
    fn move_home(&mut self) -> Result<(), VendorCode>;

    /// 厂商回零动作是否已完成
    fn is_home_reached(&mut self) -> Result<bool, VendorCode>;
}

impl<T: ArmApi + ?Sized> ArmApi for Box<T> {
    fn start_control_api(&mut self) -> Result<(), VendorCode> {
        (**self).start_control_api()
    }

    fn stop_control_api(&mut self) -> Result<(), VendorCode> {
        (**self).stop_control_api()
    }

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), VendorCode> {
        (**self).set_control_mode(mode)
    }

    fn angular_position(&mut self) -> Result<RawJointReading, VendorCode> {
        (**self).angular_position()
    }

    fn angular_velocity(&mut self) -> Result<RawJointReading, VendorCode> {
        (**self).angular_velocity()
    }

    fn angular_force(&mut self) -> Result<RawJointReading, VendorCode> {
        (**self).angular_force()
    }

    fn cartesian_position(&mut self) -> Result<CartesianReading, VendorCode> {
        (**self).cartesian_position()
    }

    fn send_basic_trajectory(&mut self, command: &HardwareCommand) -> Result<(), VendorCode> {
        (**self).send_basic_trajectory(command)
    }

    fn erase_all_trajectories(&mut self) -> Result<(), VendorCode> {
        (**self).erase_all_trajectories()
    }

    fn move_home(&mut self) -> Result<(), VendorCode> {
        (**self).move_home()
    }

    fn is_home_reached(&mut self) -> Result<bool, VendorCode> {
        (**self).is_home_reached()
    }
}
