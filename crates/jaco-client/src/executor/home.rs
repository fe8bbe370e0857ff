//! 回零：一次厂商 home 调用，然后等待厂商报告完成

use super::{ExecutorContext, GoalExecutor, MotionMode, aborted};
use crate::control::{LoopConfig, TickTimer};
use crate::goal::{GoalContext, GoalOutcome};
use crate::types::GoalError;
use std::time::Duration;
use tracing::error;

/// 回零执行器
///
/// 厂商只报告是否到达，因此成功时 `final_error` 为 0。
#[derive(Debug)]
pub struct HomeExecutor {
    ctx: ExecutorContext,
}

impl HomeExecutor {
    pub fn new(ctx: ExecutorContext) -> Self {
        Self { ctx }
    }
}

impl GoalExecutor for HomeExecutor {
    type Goal = ();

    fn mode(&self) -> MotionMode {
        MotionMode::Home
    }

    fn validate(&self, _goal: &()) -> Result<(), GoalError> {
        Ok(())
    }

    fn execute(&self, _goal: &(), ctx: &mut GoalContext) -> GoalOutcome {
        let config = &self.ctx.config.home;
        if let Err(e) = self.ctx.gate.home() {
            error!("Home request failed: {}", e);
            return aborted(e.into(), 0.0);
        }

        let mut timer = match TickTimer::new(&LoopConfig::with_frequency(config.poll_rate_hz)) {
            Ok(timer) => timer,
            Err(e) => {
                self.ctx.flush();
                return aborted(e, 0.0);
            },
        };
        let timeout = Duration::from_millis(config.timeout_ms);

        ctx.restart_clock();
        while timer.tick().is_some() {
            if let Some(reason) = ctx.cancel_reason() {
                self.ctx.flush();
                return GoalOutcome::from_cancel(reason, 0.0);
            }
            match self.ctx.gate.is_homed() {
                Ok(true) => return GoalOutcome::Succeeded { final_error: 0.0 },
                Ok(false) => {},
                Err(e) => {
                    self.ctx.flush();
                    return aborted(e.into(), 0.0);
                },
            }

            let elapsed = ctx.elapsed();
            ctx.publish(0.0, 0.0, None);
            if elapsed > timeout {
                self.ctx.flush();
                return aborted(
                    GoalError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        final_error: 0.0,
                    },
                    0.0,
                );
            }
            timer.sleep_until_next();
        }

        self.ctx.flush();
        aborted(
            GoalError::Timeout {
                elapsed_ms: ctx.elapsed().as_millis() as u64,
                final_error: 0.0,
            },
            0.0,
        )
    }
}
