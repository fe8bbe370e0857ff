//! 笛卡尔（平滑）模式
//!
//! 关节航点先经正运动学换算成位姿，再抽稀后写入控制器板的笛卡尔队列，
//! 细插值由控制器板完成。完成条件只有一个：厂商报告的末端位姿进入最后一个
//! 位姿的容差范围，这里不再独立校验中间路径。

use super::{ExecutorContext, GoalExecutor, MotionMode, aborted, goal_timeout};
use crate::control::{LoopConfig, TickTimer, cartesian_waypoints, validate_waypoints};
use crate::goal::{GoalContext, GoalOutcome, TrajectoryGoal, Waypoints};
use crate::types::{CartesianPose, GoalError};
use jaco_driver::{CancelReason, HardwareCommand};
use std::time::Duration;
use tracing::{debug, error};

/// 笛卡尔执行器
#[derive(Debug)]
pub struct CartesianExecutor {
    ctx: ExecutorContext,
}

impl CartesianExecutor {
    pub fn new(ctx: ExecutorContext) -> Self {
        Self { ctx }
    }

    fn target_poses(&self, goal: &TrajectoryGoal) -> Result<Vec<CartesianPose>, GoalError> {
        match &goal.waypoints {
            Waypoints::Joint(points) => points
                .iter()
                .map(|point| {
                    self.ctx
                        .kinematics
                        .forward(&point.positions)
                        .map_err(GoalError::from)
                })
                .collect(),
            Waypoints::Cartesian(poses) => Ok(poses.clone()),
        }
    }

    fn read_pose(&self) -> Result<CartesianPose, GoalError> {
        let reading = self.ctx.gate.read_cartesian()?;
        Ok(CartesianPose::from_array(reading.to_array()))
    }
}

impl GoalExecutor for CartesianExecutor {
    type Goal = TrajectoryGoal;

    fn mode(&self) -> MotionMode {
        MotionMode::Cartesian
    }

    fn validate(&self, goal: &TrajectoryGoal) -> Result<(), GoalError> {
        match &goal.waypoints {
            Waypoints::Joint(points) => {
                validate_waypoints(points, self.ctx.config.limits.max_trajectory_duration())
            },
            Waypoints::Cartesian(poses) => {
                if poses.is_empty() {
                    return Err(GoalError::invalid("trajectory has no points"));
                }
                match poses.iter().position(|pose| !pose.is_finite()) {
                    Some(i) => Err(GoalError::invalid(format!("pose {} is not finite", i))),
                    None => Ok(()),
                }
            },
        }
    }

    fn execute(&self, goal: &TrajectoryGoal, ctx: &mut GoalContext) -> GoalOutcome {
        let config = &self.ctx.config.cartesian;

        let poses = match self.target_poses(goal) {
            Ok(poses) => poses,
            Err(e) => return aborted(e, 0.0),
        };
        let current = match self.read_pose() {
            Ok(pose) => pose,
            Err(e) => return aborted(e, 0.0),
        };
        let queued = cartesian_waypoints(&current, &poses, config.min_step, config.orientation_tolerance);
        let Some(&final_pose) = queued.last() else {
            return aborted(GoalError::invalid("trajectory has no points"), 0.0);
        };
        let mut final_error = current.position.distance(&final_pose.position);

        for (i, pose) in queued.iter().enumerate() {
            match self.ctx.gate.send_for_goal(
                ctx.token(),
                HardwareCommand::cartesian_position(pose.to_array()),
                i == 0,
            ) {
                Ok(true) => {},
                Ok(false) => {
                    self.ctx.flush();
                    let reason = ctx.cancel_reason().unwrap_or(CancelReason::Preempted);
                    return GoalOutcome::from_cancel(reason, final_error);
                },
                Err(e) => {
                    error!("Failed to queue Cartesian point {}: {}", i, e);
                    self.ctx.flush();
                    return aborted(e.into(), final_error);
                },
            }
        }

        let path_length: f64 = std::iter::once(&current)
            .chain(queued.iter())
            .zip(queued.iter())
            .map(|(a, b)| a.position.distance(&b.position))
            .sum();
        let margin = goal
            .tolerance
            .time_tolerance
            .unwrap_or(Duration::from_millis(config.timeout_margin_ms));
        let timeout = goal_timeout(path_length / config.linear_speed_estimate, margin);
        let position_tolerance = goal.tolerance.error_threshold.unwrap_or(config.position_tolerance);
        debug!(
            "Queued {} of {} Cartesian pose(s), path {:.3} m, timeout {:?}",
            queued.len(),
            poses.len(),
            path_length,
            timeout
        );

        let mut timer = match TickTimer::new(&LoopConfig::with_frequency(config.poll_rate_hz)) {
            Ok(timer) => timer,
            Err(e) => {
                self.ctx.flush();
                return aborted(e, final_error);
            },
        };

        ctx.restart_clock();
        ctx.index = queued.len() - 1;
        let initial_error = final_error.max(f64::EPSILON);
        while timer.tick().is_some() {
            if let Some(reason) = ctx.cancel_reason() {
                self.ctx.flush();
                return GoalOutcome::from_cancel(reason, final_error);
            }

            let pose = match self.read_pose() {
                Ok(pose) => pose,
                Err(e) => {
                    self.ctx.flush();
                    return aborted(e, final_error);
                },
            };
            final_error = pose.position.distance(&final_pose.position);
            ctx.publish(1.0 - final_error / initial_error, final_error, None);

            if pose.within(&final_pose, position_tolerance, config.orientation_tolerance) {
                return GoalOutcome::Succeeded { final_error };
            }
            let elapsed = ctx.elapsed();
            if elapsed > timeout {
                self.ctx.flush();
                return aborted(
                    GoalError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        final_error,
                    },
                    final_error,
                );
            }
            timer.sleep_until_next();
        }

        self.ctx.flush();
        aborted(
            GoalError::Timeout {
                elapsed_ms: ctx.elapsed().as_millis() as u64,
                final_error,
            },
            final_error,
        )
    }
}
