//! Controller trait - 控制器通用接口
//!
//! 控制器只负责计算，循环、读状态、下发命令都由执行器完成。
//! `dt` 显式传入，便于单元测试。
//!
//! # 时间跳变处理
//!
//! 检测到异常大的 `dt`（线程调度延迟、硬件读取卡顿）时，执行器先调用
//! `on_time_jump()`，再用钳位后的 `dt` 调用 `tick()`。
//!
//! - ✅ 必须重置微分项，否则会算出巨大的导数
//! - ❌ 不要清零积分项，积分只在新目标开始时通过 `reset()` 清零

use std::time::Duration;

/// 控制器通用接口
pub trait Controller {
    /// 测量值
    type Input;
    /// 命令（速度）
    type Output;

    /// 计算一步控制输出
    ///
    /// `dt` 为零时必须输出零命令。输出已经钳位到执行器限速。
    fn tick(&mut self, current: &Self::Input, dt: Duration) -> Self::Output;

    /// 时间跳变回调，默认不做任何事
    fn on_time_jump(&mut self, _real_dt: Duration) {}

    /// 回到初始状态（清除积分与微分历史）
    fn reset(&mut self);
}
