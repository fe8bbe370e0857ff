//! 原始角度模式
//!
//! 航点展开为最短路径后直接以角度位置（deg）写入控制器板的轨迹队列，
//! 第一个点先清空队列。之后只轮询关节状态，等待到达最后一个航点。

use super::{ExecutorContext, GoalExecutor, MotionMode, aborted, goal_timeout, joint_error};
use crate::control::{JointWaypoint, LoopConfig, TickTimer, validate_waypoints};
use crate::goal::{GoalContext, GoalOutcome, TrajectoryGoal, Waypoints};
use crate::types::{GoalError, Joint, JointArray, Rad};
use jaco_driver::{CancelReason, HardwareCommand};
use std::time::Duration;
use tracing::{debug, error};

/// 原始角度执行器
#[derive(Debug)]
pub struct AngularExecutor {
    ctx: ExecutorContext,
}

impl AngularExecutor {
    pub fn new(ctx: ExecutorContext) -> Self {
        Self { ctx }
    }

    /// 按保守速度估计的运动时长（秒）
    fn estimate_seconds(&self, start: JointArray<Rad>, targets: &[JointArray<Rad>]) -> f64 {
        let limits = &self.ctx.config.limits;
        let ratio = self.ctx.config.angular.speed_estimate_ratio;
        let mut previous = start;
        let mut seconds = 0.0;
        for target in targets {
            let segment = Joint::ALL
                .iter()
                .map(|&joint| {
                    let distance = (target[joint] - previous[joint]).abs().value();
                    distance / (limits.joint_limit(joint) * ratio)
                })
                .fold(0.0_f64, f64::max);
            seconds += segment;
            previous = *target;
        }
        seconds
    }
}

fn joint_waypoints(goal: &TrajectoryGoal) -> Result<&[JointWaypoint], GoalError> {
    match &goal.waypoints {
        Waypoints::Joint(points) => Ok(points),
        Waypoints::Cartesian(_) => Err(GoalError::invalid(
            "angular mode requires joint waypoints",
        )),
    }
}

impl GoalExecutor for AngularExecutor {
    type Goal = TrajectoryGoal;

    fn mode(&self) -> MotionMode {
        MotionMode::Angular
    }

    fn validate(&self, goal: &TrajectoryGoal) -> Result<(), GoalError> {
        validate_waypoints(
            joint_waypoints(goal)?,
            self.ctx.config.limits.max_trajectory_duration(),
        )
    }

    fn execute(&self, goal: &TrajectoryGoal, ctx: &mut GoalContext) -> GoalOutcome {
        let config = &self.ctx.config;
        let waypoints = match joint_waypoints(goal) {
            Ok(points) => points,
            Err(e) => return aborted(e, 0.0),
        };

        let start = self.ctx.current_joints();
        let mut previous = start;
        let targets: Vec<JointArray<Rad>> = waypoints
            .iter()
            .map(|waypoint| {
                let unwrapped = waypoint
                    .positions
                    .map_with(previous, |target, reference| target.nearest_equivalent(reference));
                previous = unwrapped;
                unwrapped
            })
            .collect();
        let Some(&goal_position) = targets.last() else {
            return aborted(GoalError::invalid("trajectory has no points"), 0.0);
        };
        let mut final_error = joint_error(&start, &goal_position).l1_norm();

        for (i, target) in targets.iter().enumerate() {
            let degrees = target.map(|r| r.to_deg().value()).into_array();
            match self.ctx.gate.send_for_goal(
                ctx.token(),
                HardwareCommand::angular_position(degrees),
                i == 0,
            ) {
                Ok(true) => {},
                Ok(false) => {
                    self.ctx.flush();
                    let reason = ctx.cancel_reason().unwrap_or(CancelReason::Preempted);
                    return GoalOutcome::from_cancel(reason, final_error);
                },
                Err(e) => {
                    error!("Failed to queue angular point {}: {}", i, e);
                    self.ctx.flush();
                    return aborted(e.into(), final_error);
                },
            }
        }

        let threshold = goal
            .tolerance
            .error_threshold
            .unwrap_or(config.velocity_controller.error_threshold);
        let margin = goal
            .tolerance
            .time_tolerance
            .unwrap_or(Duration::from_millis(config.angular.timeout_margin_ms));
        let timeout = goal_timeout(self.estimate_seconds(start, &targets), margin);
        debug!("Queued {} angular point(s), timeout {:?}", targets.len(), timeout);

        let mut timer = match TickTimer::new(&LoopConfig::with_frequency(config.angular.poll_rate_hz)) {
            Ok(timer) => timer,
            Err(e) => {
                self.ctx.flush();
                return aborted(e, final_error);
            },
        };

        ctx.restart_clock();
        ctx.index = targets.len() - 1;
        let initial_error = final_error.max(f64::EPSILON);
        while timer.tick().is_some() {
            if let Some(reason) = ctx.cancel_reason() {
                self.ctx.flush();
                return GoalOutcome::from_cancel(reason, final_error);
            }

            let current = self.ctx.current_joints();
            let error = joint_error(&current, &goal_position);
            final_error = error.l1_norm();
            ctx.publish(1.0 - final_error / initial_error, final_error, Some(error));

            if final_error < threshold {
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
