//! 夹爪模式：手指位置 PID
//!
//! 夹爪接口只报告成功或中止，所以被新目标抢占时以
//! `Aborted(GoalError::Preempted)` 结束。

use super::{ExecutorContext, GoalExecutor, MotionMode, aborted};
use crate::control::{Controller, FingerController, LoopConfig, TickTimer};
use crate::goal::{GoalContext, GoalOutcome, GripperGoal};
use crate::types::GoalError;
use jaco_driver::{CancelReason, HardwareCommand};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

/// 夹爪执行器
#[derive(Debug)]
pub struct GripperExecutor {
    ctx: ExecutorContext,
    controller: Mutex<FingerController>,
}

impl GripperExecutor {
    pub fn new(ctx: ExecutorContext) -> Self {
        let controller = FingerController::new(&ctx.config.finger_controller);
        Self {
            ctx,
            controller: Mutex::new(controller),
        }
    }

    fn stop_fingers(&self) {
        if let Err(e) = self.ctx.gate.send(HardwareCommand::finger_velocity([0.0; 2])) {
            warn!("Failed to command zero finger velocity: {}", e);
        }
    }

    fn cancelled(&self, reason: CancelReason, final_error: f64) -> GoalOutcome {
        self.stop_fingers();
        match reason {
            CancelReason::Preempted => aborted(GoalError::Preempted, final_error),
            other => GoalOutcome::from_cancel(other, final_error),
        }
    }
}

fn max_error(error: [f64; 2]) -> f64 {
    error[0].abs().max(error[1].abs())
}

impl GoalExecutor for GripperExecutor {
    type Goal = GripperGoal;

    fn mode(&self) -> MotionMode {
        MotionMode::Gripper
    }

    fn validate(&self, goal: &GripperGoal) -> Result<(), GoalError> {
        goal.validate()
    }

    fn execute(&self, goal: &GripperGoal, ctx: &mut GoalContext) -> GoalOutcome {
        let config = &self.ctx.config.finger_controller;
        if let Some(effort) = goal.max_effort {
            debug!("Gripper max_effort {} is recorded but not enforced", effort);
        }

        let target = goal.position * config.closed_position;
        let mut controller = self.controller.lock();
        // 每个新目标都从零积分开始
        controller.reset();
        controller.set_target([target, target]);

        let loop_config = LoopConfig {
            frequency_hz: config.control_rate_hz,
            dt_clamp_multiplier: self.ctx.config.velocity_controller.dt_clamp_multiplier,
            max_iterations: None,
        };
        let mut timer = match TickTimer::new(&loop_config) {
            Ok(timer) => timer,
            Err(e) => return aborted(e, 0.0),
        };
        let timeout = Duration::from_millis(config.timeout_ms);

        ctx.restart_clock();
        let initial = max_error(controller.error(&self.ctx.sampler.latest().finger_raw));
        let mut final_error = initial;
        while let Some(tick) = timer.tick() {
            if let Some(reason) = ctx.cancel_reason() {
                return self.cancelled(reason, final_error);
            }

            let fingers = self.ctx.sampler.sample().finger_raw;
            final_error = max_error(controller.error(&fingers));
            ctx.publish(1.0 - final_error / initial.max(f64::EPSILON), final_error, None);

            if final_error < config.error_threshold {
                self.stop_fingers();
                return GoalOutcome::Succeeded { final_error };
            }
            let elapsed = ctx.elapsed();
            if elapsed > timeout {
                self.stop_fingers();
                return aborted(
                    GoalError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        final_error,
                    },
                    final_error,
                );
            }

            if let Some(real_dt) = tick.time_jump {
                warn!("Gripper loop time jump: {:?}", real_dt);
                controller.on_time_jump(real_dt);
            }
            let velocity = controller.tick(&fingers, tick.dt);
            if let Err(e) =
                self.ctx
                    .gate
                    .send_for_goal(ctx.token(), HardwareCommand::finger_velocity(velocity), false)
            {
                error!("Finger velocity command failed: {}", e);
                self.stop_fingers();
                return aborted(e.into(), final_error);
            }

            timer.sleep_until_next();
        }

        self.stop_fingers();
        aborted(
            GoalError::Timeout {
                elapsed_ms: ctx.elapsed().as_millis() as u64,
                final_error,
            },
            final_error,
        )
    }
}
