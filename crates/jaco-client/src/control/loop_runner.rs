//! 控制循环定时
//!
//! [`TickTimer`] 用绝对时间锚点驱动固定频率循环：
//! - 每个周期的睡眠时长自动扣除本周期内的耗时，不会累积漂移
//! - 实际 dt 超过 `dt_clamp_multiplier` 倍周期时报告时间跳变并钳位 dt
//! - 超时（overrun）时不睡眠，重置锚点追赶

use crate::types::GoalError;
use std::time::{Duration, Instant};
use tracing::warn;

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,
    /// dt 钳位倍数
    pub dt_clamp_multiplier: f64,
    /// 最大迭代次数（None 表示无限循环）
    pub max_iterations: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 100.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    pub fn with_frequency(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            ..Self::default()
        }
    }
}

/// 一次 tick 的时间信息
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// 钳位后的 dt
    pub dt: Duration,
    /// 发生时间跳变时的真实 dt
    pub time_jump: Option<Duration>,
    pub iteration: usize,
}

/// 固定频率循环定时器
#[derive(Debug)]
pub struct TickTimer {
    period: Duration,
    max_dt: Duration,
    max_iterations: Option<usize>,
    next_tick: Instant,
    last_time: Instant,
    iteration: usize,
}

impl TickTimer {
    pub fn new(config: &LoopConfig) -> Result<Self, GoalError> {
        if !(config.frequency_hz.is_finite() && config.frequency_hz > 0.0) {
            return Err(GoalError::invalid(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                config.frequency_hz
            )));
        }
        if config.dt_clamp_multiplier <= 0.0 {
            return Err(GoalError::invalid(format!(
                "Invalid dt_clamp_multiplier: {} (must be > 0)",
                config.dt_clamp_multiplier
            )));
        }
        let period = Duration::from_secs_f64(1.0 / config.frequency_hz);
        let now = Instant::now();
        Ok(Self {
            period,
            max_dt: period.mul_f64(config.dt_clamp_multiplier),
            max_iterations: config.max_iterations,
            next_tick: now,
            // 第一个 tick 的 dt 为一个标称周期
            last_time: now.checked_sub(period).unwrap_or(now),
            iteration: 0,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 开始新的一个周期
    ///
    /// 达到 `max_iterations` 后返回 `None`。
    pub fn tick(&mut self) -> Option<Tick> {
        if let Some(max_iter) = self.max_iterations
            && self.iteration >= max_iter
        {
            return None;
        }

        let now = Instant::now();
        let real_dt = now.saturating_duration_since(self.last_time);
        self.last_time = now;
        self.next_tick += self.period;

        let (dt, time_jump) = if real_dt > self.max_dt {
            (self.max_dt, Some(real_dt))
        } else {
            (real_dt, None)
        };

        let tick = Tick {
            dt,
            time_jump,
            iteration: self.iteration,
        };
        self.iteration += 1;
        Some(tick)
    }

    /// 睡眠到下一个锚点
    pub fn sleep_until_next(&mut self) {
        let now = Instant::now();
        if self.next_tick > now {
            spin_sleep::sleep(self.next_tick - now);
        } else {
            warn!(
                "Control loop overrun: behind schedule by {:?} (period {:?})",
                now.duration_since(self.next_tick),
                self.period
            );
            self.next_tick = now;
        }
    }
}
