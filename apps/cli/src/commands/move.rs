//! 移动命令
//!
//! 把一个关节目标或位姿目标作为轨迹目标执行，可选打印执行反馈。

use crate::session::{Session, report_outcome};
use crate::validation::{JointValidator, parse_pose};
use anyhow::Result;
use clap::{Args, ValueEnum};
use crossbeam_channel::unbounded;
use jaco_client::control::JointWaypoint;
use jaco_client::{GoalFeedback, TrajectoryGoal, TrajectoryMode};
use std::thread;
use std::time::Duration;

/// 执行接口
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveMode {
    /// 闭环关节速度控制
    JointVelocity,
    /// 原始角度位置（控制器板载插值）
    Angular,
    /// 平滑笛卡尔位姿
    Cartesian,
}

impl From<MoveMode> for TrajectoryMode {
    fn from(mode: MoveMode) -> Self {
        match mode {
            MoveMode::JointVelocity => TrajectoryMode::JointVelocity,
            MoveMode::Angular => TrajectoryMode::Angular,
            MoveMode::Cartesian => TrajectoryMode::Cartesian,
        }
    }
}

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标关节位置（弧度），6 个值逗号分隔
    /// 例如：0.1,0.2,0.3,0.4,0.5,0.6
    #[arg(short, long, allow_hyphen_values = true, conflicts_with = "pose")]
    pub joints: Option<String>,

    /// 目标位姿 x,y,z,θx,θy,θz（米、弧度），仅笛卡尔模式
    #[arg(short, long, allow_hyphen_values = true)]
    pub pose: Option<String>,

    /// 执行接口
    #[arg(short, long, value_enum, default_value_t = MoveMode::JointVelocity)]
    pub mode: MoveMode,

    /// 期望到达时间（毫秒），仅关节航点
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// 打印执行反馈
    #[arg(long)]
    pub feedback: bool,
}

impl MoveCommand {
    /// 由参数构造轨迹目标
    pub fn goal(&self) -> Result<TrajectoryGoal> {
        match (&self.joints, &self.pose) {
            (Some(joints), None) => {
                let positions = JointValidator::default_range().parse_joints(joints)?;
                let waypoint = match self.duration_ms {
                    Some(ms) => JointWaypoint::at(positions, Duration::from_millis(ms)),
                    None => JointWaypoint::new(positions),
                };
                Ok(TrajectoryGoal::joints(vec![waypoint]))
            },
            (None, Some(pose)) => {
                if self.mode != MoveMode::Cartesian {
                    anyhow::bail!("--pose requires --mode cartesian");
                }
                Ok(TrajectoryGoal::cartesian(vec![parse_pose(pose)?]))
            },
            _ => anyhow::bail!("specify exactly one of --joints or --pose"),
        }
    }

    pub fn execute(&self, session: &Session) -> Result<()> {
        let goal = self.goal()?;
        let mode = TrajectoryMode::from(self.mode);
        println!("⏳ 执行 {:?} 目标...", mode);

        let outcome = if self.feedback {
            let (tx, rx) = unbounded::<GoalFeedback>();
            let printer = thread::spawn(move || {
                for (i, fb) in rx.iter().enumerate() {
                    if i % 10 == 0 {
                        println!(
                            "  {:>5.1}%  误差 {:.4}  {:>6} ms",
                            fb.progress * 100.0,
                            fb.combined_error,
                            fb.elapsed.as_millis()
                        );
                    }
                }
            });
            let outcome = session
                .arm
                .execute_trajectory_with_feedback(mode, &goal, tx)?;
            // 发送端随目标结束而释放，打印线程随之退出
            let _ = printer.join();
            outcome
        } else {
            session.arm.execute_trajectory(mode, &goal)?
        };

        report_outcome(&outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jaco_client::Waypoints;

    fn command(joints: Option<&str>, pose: Option<&str>, mode: MoveMode) -> MoveCommand {
        MoveCommand {
            joints: joints.map(str::to_string),
            pose: pose.map(str::to_string),
            mode,
            duration_ms: None,
            feedback: false,
        }
    }

    #[test]
    fn test_joint_goal() {
        let mut cmd = command(Some("0.1,0.2,0.3,0,0,0"), None, MoveMode::JointVelocity);
        cmd.duration_ms = Some(1500);
        let goal = cmd.goal().unwrap();
        match goal.waypoints {
            Waypoints::Joint(points) => {
                assert_eq!(points.len(), 1);
                assert_eq!(points[0].time_from_start, Some(Duration::from_millis(1500)));
            },
            other => panic!("unexpected waypoints {:?}", other),
        }
    }

    #[test]
    fn test_pose_goal_requires_cartesian_mode() {
        let pose = Some("0.2,-0.25,0.5,1.57,0,0");
        assert!(command(None, pose, MoveMode::Angular).goal().is_err());
        assert!(matches!(
            command(None, pose, MoveMode::Cartesian).goal().unwrap().waypoints,
            Waypoints::Cartesian(_)
        ));
    }

    #[test]
    fn test_missing_target_rejected() {
        assert!(command(None, None, MoveMode::JointVelocity).goal().is_err());
    }
}
