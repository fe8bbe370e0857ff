//! 关节速度模式：本地插值 + PD 速度闭环
//!
//! 每个周期：
//! 1. 读取关节状态
//! 2. 按时间推进轨迹点；若提前进入段容差，额外推进一个点
//! 3. 误差 = 目标 - 当前（最短角距离），PD 计算速度并钳位
//! 4. 以目标名义下发速度命令（deg/s）
//!
//! 跟踪到最后一个点且综合误差（L1）低于阈值时成功。

use super::{ExecutorContext, GoalExecutor, MotionMode, aborted, goal_timeout, joint_error};
use crate::control::{
    Controller, JointWaypoint, LoopConfig, PdVelocityController, TickTimer,
    TrajectoryInterpolator, validate_waypoints,
};
use crate::goal::{GoalContext, GoalOutcome, TrajectoryGoal, Waypoints};
use crate::types::GoalError;
use jaco_driver::HardwareCommand;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// 关节速度执行器
#[derive(Debug)]
pub struct JointVelocityExecutor {
    ctx: ExecutorContext,
    interpolator: TrajectoryInterpolator,
}

impl JointVelocityExecutor {
    pub fn new(ctx: ExecutorContext) -> Self {
        let interpolator = TrajectoryInterpolator::from_config(&ctx.config);
        Self { ctx, interpolator }
    }

    pub fn interpolator(&self) -> &TrajectoryInterpolator {
        &self.interpolator
    }
}

fn joint_waypoints(goal: &TrajectoryGoal) -> Result<&[JointWaypoint], GoalError> {
    match &goal.waypoints {
        Waypoints::Joint(points) => Ok(points),
        Waypoints::Cartesian(_) => Err(GoalError::invalid(
            "joint velocity mode requires joint waypoints",
        )),
    }
}

impl GoalExecutor for JointVelocityExecutor {
    type Goal = TrajectoryGoal;

    fn mode(&self) -> MotionMode {
        MotionMode::JointVelocity
    }

    fn validate(&self, goal: &TrajectoryGoal) -> Result<(), GoalError> {
        validate_waypoints(
            joint_waypoints(goal)?,
            self.ctx.config.limits.max_trajectory_duration(),
        )?;
        if let Some(threshold) = goal.tolerance.error_threshold
            && !(threshold.is_finite() && threshold > 0.0)
        {
            return Err(GoalError::invalid(format!(
                "error threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(())
    }

    fn execute(&self, goal: &TrajectoryGoal, ctx: &mut GoalContext) -> GoalOutcome {
        let config = &self.ctx.config.velocity_controller;
        let waypoints = match joint_waypoints(goal) {
            Ok(points) => points,
            Err(e) => return aborted(e, 0.0),
        };

        let start = self.ctx.current_joints();
        let trajectory = match self.interpolator.interpolate(start, waypoints) {
            Ok(trajectory) => trajectory,
            Err(e) => return aborted(e, 0.0),
        };
        let points = trajectory.points();
        let last = points.len() - 1;

        let threshold = goal.tolerance.error_threshold.unwrap_or(config.error_threshold);
        let margin = goal
            .tolerance
            .time_tolerance
            .unwrap_or(Duration::from_millis(config.timeout_margin_ms));
        let timeout = goal_timeout(trajectory.duration().as_secs_f64() * config.timeout_scale, margin);

        let loop_config = LoopConfig {
            frequency_hz: config.control_rate_hz,
            dt_clamp_multiplier: config.dt_clamp_multiplier,
            max_iterations: None,
        };
        let mut timer = match TickTimer::new(&loop_config) {
            Ok(timer) => timer,
            Err(e) => return aborted(e, 0.0),
        };
        let mut controller = PdVelocityController::from_config(&self.ctx.config);

        debug!(
            "Joint velocity trajectory: {} points over {:?} (stretch {:.2}, timeout {:?})",
            points.len(),
            trajectory.duration(),
            trajectory.stretch(),
            timeout
        );

        ctx.restart_clock();
        let mut final_error = joint_error(&start, &points[last].positions).l1_norm();

        while let Some(tick) = timer.tick() {
            if let Some(reason) = ctx.cancel_reason() {
                self.ctx.stop_arm();
                return GoalOutcome::from_cancel(reason, final_error);
            }

            let current = self.ctx.current_joints();
            let elapsed = ctx.elapsed();

            while ctx.index < last && points[ctx.index].time_from_start <= elapsed {
                ctx.index += 1;
            }
            if ctx.index < last
                && joint_error(&current, &points[ctx.index].positions).max_abs()
                    < config.segment_tolerance
            {
                ctx.index += 1;
            }

            controller.set_target(points[ctx.index].positions);
            let error = controller.error(&current);
            final_error = error.l1_norm();
            let progress = if last == 0 {
                1.0
            } else {
                ctx.index as f64 / last as f64
            };
            ctx.publish(progress, final_error, Some(error));
            trace!(
                "tick {}: point {}/{}, error {:.4}",
                tick.iteration, ctx.index, last, final_error
            );

            if ctx.index == last && final_error < threshold {
                self.ctx.stop_arm();
                return GoalOutcome::Succeeded { final_error };
            }
            if elapsed > timeout {
                self.ctx.stop_arm();
                return aborted(
                    GoalError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        final_error,
                    },
                    final_error,
                );
            }

            if let Some(real_dt) = tick.time_jump {
                warn!(
                    "Control loop time jump: {:?} (clamped to {:?})",
                    real_dt, tick.dt
                );
                controller.on_time_jump(real_dt);
            }

            let velocity = controller.tick(&current, tick.dt);
            let command = HardwareCommand::angular_velocity(velocity.map(f64::to_degrees).into_array());
            match self.ctx.gate.send_for_goal(ctx.token(), command, false) {
                // 命令被丢弃说明目标已取消，下个周期开头处理
                Ok(_) => {},
                Err(e) => {
                    error!("Joint velocity command failed: {}", e);
                    self.ctx.stop_arm();
                    return aborted(e.into(), final_error);
                },
            }

            timer.sleep_until_next();
        }

        self.ctx.stop_arm();
        aborted(
            GoalError::Timeout {
                elapsed_ms: ctx.elapsed().as_millis() as u64,
                final_error,
            },
            final_error,
        )
    }
}
