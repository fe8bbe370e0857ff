//! 驱动层错误类型定义

use thiserror::Error;

/// 厂商 API 返回码
///
/// 厂商 SDK 的每个调用都返回一个整数状态码，`1`（`NO_ERROR`）是唯一的成功值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VendorCode(pub i32);

impl VendorCode {
    /// 成功返回码
    pub const NO_ERROR: VendorCode = VendorCode(1);

    /// 把厂商原始返回值转为 `Result`
    pub fn check(raw: i32) -> Result<(), VendorCode> {
        if raw == Self::NO_ERROR.0 {
            Ok(())
        } else {
            Err(VendorCode(raw))
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::NO_ERROR
    }
}

impl std::fmt::Display for VendorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vendor code {}", self.0)
    }
}

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 厂商 API 返回非成功码（不会自动重试）
    #[error("Hardware fault during {operation}: {code}")]
    HardwareFault {
        operation: &'static str,
        code: VendorCode,
    },

    /// 急停已激活，拒绝运动命令
    #[error("Emergency stop is engaged")]
    Estopped,

    /// 命令通道已关闭（硬件线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 命令通道已满
    #[error("Command channel full (capacity: {0})")]
    ChannelFull(usize),

    /// 等待硬件线程应答超时
    #[error("Operation timeout")]
    Timeout,

    /// 无效输入（如 NaN 指令）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DriverError {
    /// 是否为硬件故障
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, DriverError::HardwareFault { .. })
    }

    /// 硬件线程是否已经不可用
    pub fn is_disconnected(&self) -> bool {
        matches!(self, DriverError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_code_check() {
        assert!(VendorCode::check(1).is_ok());
        assert_eq!(VendorCode::check(0), Err(VendorCode(0)));
        assert_eq!(VendorCode::check(-2), Err(VendorCode(-2)));
        assert!(VendorCode::NO_ERROR.is_success());
        assert!(!VendorCode(1015).is_success());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::HardwareFault {
            operation: "send_basic_trajectory",
            code: VendorCode(1015),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("send_basic_trajectory") && msg.contains("1015"));
        assert!(err.is_hardware_fault());

        assert_eq!(format!("{}", DriverError::Estopped), "Emergency stop is engaged");
        assert_eq!(format!("{}", DriverError::ChannelClosed), "Command channel closed");
        assert!(DriverError::ChannelClosed.is_disconnected());
        assert!(format!("{}", DriverError::ChannelFull(10)).contains("10"));
        assert_eq!(format!("{}", DriverError::Timeout), "Operation timeout");
    }
}
