//! 轨迹目标集成测试
//!
//! 在实时积分的模拟臂上运行三种轨迹接口：
//! 1. 关节速度模式：收敛、限速、最短路径、反馈
//! 2. 原始角度模式：位置队列
//! 3. 笛卡尔模式：位姿目标与关节航点（经正运动学）

mod common;

use common::*;
use crossbeam_channel::unbounded;
use jaco_client::prelude::*;
use jaco_client::{KinematicsError, Waypoints};
use jaco_driver::PositionType;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[test]
#[serial]
fn test_joint_velocity_single_point_converges() {
    let mut config = ArmConfig::default();
    config.velocity_controller.control_rate_hz = 50.0;
    let (arm, sim) = arm_with(config);

    let goal = single_point_goal(j1_target(0.5));
    let outcome = arm
        .execute_trajectory(TrajectoryMode::JointVelocity, &goal)
        .unwrap();

    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);
    assert!(outcome.final_error() < 0.03);

    // 只有 J1 收到过非零速度
    let commands = arm_velocity_commands(&sim.commands());
    assert!(!commands.is_empty());
    assert!(commands.iter().any(|v| v[0] > 0.0));
    for v in &commands {
        assert!(v[1..].iter().all(|x| *x == 0.0), "unexpected command {:?}", v);
    }
    // 结束时下发零速度
    assert_eq!(commands.last(), Some(&[0.0; 6]));

    let j1 = sim.joints()[0].to_radians();
    assert!((j1 - 0.5).abs() < 0.03, "J1 ended at {}", j1);
}

#[test]
#[serial]
fn test_joint_velocity_commands_respect_class_limits() {
    let (arm, sim) = default_arm();
    let mut target = JointArray::splat(Rad(0.6));
    target[Joint::J1] = Rad(-0.6);
    let outcome = arm
        .execute_trajectory(TrajectoryMode::JointVelocity, &single_point_goal(target))
        .unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);

    let config = arm.config();
    for v in arm_velocity_commands(&sim.commands()) {
        for joint in Joint::ALL {
            let limit = config.limits.joint_limit(joint).to_degrees();
            assert!(
                v[joint.index()].abs() <= limit + 1e-9,
                "{} commanded {} deg/s (limit {})",
                joint,
                v[joint.index()],
                limit
            );
        }
    }
}

#[test]
#[serial]
fn test_joint_velocity_takes_shortest_path_across_pi() {
    let (arm, sim) = default_arm();
    sim.set_joints([170.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    arm.sample_joint_state();

    let outcome = arm
        .execute_trajectory(
            TrajectoryMode::JointVelocity,
            &single_point_goal(j1_target((-170.0_f64).to_radians())),
        )
        .unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);

    // 170° → -170° 经过 180°，J1 只向正方向转动
    let commands = arm_velocity_commands(&sim.commands());
    assert!(commands.iter().all(|v| v[0] >= 0.0));
    let j1 = jaco_driver::normalize_angle(sim.joints()[0].to_radians());
    assert!((j1 - (-170.0_f64).to_radians()).abs() < 0.03);
}

#[test]
#[serial]
fn test_joint_velocity_multi_waypoint_with_stamps() {
    let (arm, sim) = default_arm();
    let goal = TrajectoryGoal::joints(vec![
        JointWaypoint::at(j1_target(0.2), Duration::from_millis(500)),
        JointWaypoint::at(j1_target(0.4), Duration::from_millis(1000)),
        JointWaypoint::at(j1_target(0.1), Duration::from_millis(1500)),
    ]);
    let outcome = arm
        .execute_trajectory(TrajectoryMode::JointVelocity, &goal)
        .unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);

    // 先正向再反向
    let commands = arm_velocity_commands(&sim.commands());
    let first_positive = commands.iter().position(|v| v[0] > 0.0).unwrap();
    let first_negative = commands.iter().position(|v| v[0] < 0.0).unwrap();
    assert!(first_positive < first_negative);
    assert!((sim.joints()[0].to_radians() - 0.1).abs() < 0.03);
}

#[test]
#[serial]
fn test_feedback_reports_progress() {
    let (arm, _sim) = default_arm();
    let (tx, rx) = unbounded();
    let outcome = arm
        .execute_trajectory_with_feedback(
            TrajectoryMode::JointVelocity,
            &single_point_goal(j1_target(0.3)),
            tx,
        )
        .unwrap();
    assert!(outcome.is_success());

    let feedback: Vec<_> = rx.try_iter().collect();
    assert!(feedback.len() > 2);
    for pair in feedback.windows(2) {
        assert!(pair[1].progress >= pair[0].progress);
        assert!(pair[1].elapsed >= pair[0].elapsed);
    }
    let last = &feedback[feedback.len() - 1];
    assert!(last.combined_error < 0.03);
    assert!((last.progress - 1.0).abs() < 1e-9);
    assert!(last.joint_error.is_some());
}

#[test]
fn test_invalid_goals_are_rejected_before_motion() {
    let (arm, sim) = default_arm();

    let empty = TrajectoryGoal::joints(Vec::new());
    for mode in [
        TrajectoryMode::JointVelocity,
        TrajectoryMode::Angular,
        TrajectoryMode::Cartesian,
    ] {
        assert!(matches!(
            arm.execute_trajectory(mode, &empty),
            Err(GoalError::InvalidGoal(_))
        ));
    }

    let reversed = TrajectoryGoal::joints(vec![
        JointWaypoint::at(j1_target(0.2), Duration::from_secs(2)),
        JointWaypoint::at(j1_target(0.4), Duration::from_secs(1)),
    ]);
    assert!(matches!(
        arm.execute_trajectory(TrajectoryMode::JointVelocity, &reversed),
        Err(GoalError::InvalidGoal(_))
    ));

    let endless = TrajectoryGoal::joints(vec![JointWaypoint::at(j1_target(0.2), Duration::MAX)]);
    for mode in [
        TrajectoryMode::JointVelocity,
        TrajectoryMode::Angular,
        TrajectoryMode::Cartesian,
    ] {
        assert!(matches!(
            arm.execute_trajectory(mode, &endless),
            Err(GoalError::InvalidGoal(_))
        ));
    }

    let poses = TrajectoryGoal::cartesian(vec![CartesianPose::default()]);
    assert!(matches!(
        arm.execute_trajectory(TrajectoryMode::Angular, &poses),
        Err(GoalError::InvalidGoal(_))
    ));

    let tolerance = GoalTolerance {
        error_threshold: Some(-1.0),
        time_tolerance: None,
    };
    let negative = single_point_goal(j1_target(0.1)).with_tolerance(tolerance);
    assert!(matches!(
        arm.execute_trajectory(TrajectoryMode::JointVelocity, &negative),
        Err(GoalError::InvalidGoal(_))
    ));

    assert!(sim.commands().is_empty());
}

#[test]
#[serial]
fn test_timeout_when_target_cannot_be_reached() {
    let mut config = ArmConfig::default();
    config.velocity_controller.timeout_margin_ms = 0;
    config.velocity_controller.timeout_scale = 1.0;
    let (arm, sim) = arm_with(config);

    // 阈值极小，在轨迹时长内不可能满足
    let goal = single_point_goal(j1_target(0.3)).with_tolerance(GoalTolerance {
        error_threshold: Some(1e-12),
        time_tolerance: Some(Duration::from_millis(100)),
    });
    let outcome = arm
        .execute_trajectory(TrajectoryMode::JointVelocity, &goal)
        .unwrap();

    assert!(matches!(
        outcome.abort_reason(),
        Some(GoalError::Timeout { .. })
    ));
    assert_eq!(arm_velocity_commands(&sim.commands()).last(), Some(&[0.0; 6]));
}

#[test]
#[serial]
fn test_angular_mode_queues_positions_in_degrees() {
    let (arm, sim) = default_arm();
    let goal = TrajectoryGoal::joints(vec![
        JointWaypoint::new(j1_target(0.25)),
        JointWaypoint::new(j1_target(0.5)),
    ]);
    let outcome = arm.execute_trajectory(TrajectoryMode::Angular, &goal).unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);

    let positions: Vec<[f64; 6]> = sim
        .commands()
        .iter()
        .filter(|c| c.command.position_type == PositionType::AngularPosition)
        .filter_map(|c| c.command.arm)
        .collect();
    assert_eq!(positions.len(), 2);
    assert!((positions[0][0] - 0.25_f64.to_degrees()).abs() < 1e-9);
    assert!((positions[1][0] - 0.5_f64.to_degrees()).abs() < 1e-9);
    assert!((sim.joints()[0].to_radians() - 0.5).abs() < 0.03);
}

#[test]
#[serial]
fn test_cartesian_mode_reaches_pose() {
    let (arm, sim) = default_arm();
    let start = CartesianPose::from_array(sim.pose());
    let mut target = start;
    target.position.x += 0.05;
    target.position.z -= 0.05;

    let outcome = arm
        .execute_trajectory(TrajectoryMode::Cartesian, &TrajectoryGoal::cartesian(vec![target]))
        .unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);
    assert!(outcome.final_error() < arm.config().cartesian.position_tolerance);

    let reached = CartesianPose::from_array(sim.pose());
    assert!(reached.within(&target, 0.005, 0.05));
    assert!(
        sim.commands()
            .iter()
            .all(|c| c.command.position_type != PositionType::AngularVelocity
                || c.command.arm == Some([0.0; 6]))
    );
}

#[test]
#[serial]
fn test_cartesian_mode_converts_joint_waypoints() {
    let sim = jaco_driver::mock::SimulatedArm::new();
    let start = sim.pose();
    // 测试用求解器：J1 沿 x 平移
    let kinematics = move |joints: &JointArray<Rad>| -> Result<CartesianPose, KinematicsError> {
        let mut pose = CartesianPose::from_array(start);
        pose.position.x += joints[Joint::J1].value() * 0.1;
        Ok(pose)
    };
    let arm = JacoArmBuilder::new()
        .kinematics(Arc::new(kinematics))
        .build(sim.clone())
        .unwrap();

    let goal = TrajectoryGoal::joints(vec![JointWaypoint::new(j1_target(0.4))]);
    assert!(matches!(goal.waypoints, Waypoints::Joint(_)));
    let outcome = arm.execute_trajectory(TrajectoryMode::Cartesian, &goal).unwrap();
    assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);
    assert!((sim.pose()[0] - (start[0] + 0.04)).abs() < 0.005);
}

#[test]
#[serial]
fn test_cartesian_mode_kinematics_failure_aborts() {
    let sim = jaco_driver::mock::SimulatedArm::new();
    let kinematics = |_: &JointArray<Rad>| -> Result<CartesianPose, KinematicsError> {
        Err(KinematicsError::Unavailable("solver offline".to_string()))
    };
    let arm = JacoArmBuilder::new()
        .kinematics(Arc::new(kinematics))
        .build(sim.clone())
        .unwrap();

    let goal = TrajectoryGoal::joints(vec![JointWaypoint::new(j1_target(0.4))]);
    let outcome = arm.execute_trajectory(TrajectoryMode::Cartesian, &goal).unwrap();
    assert!(matches!(
        outcome.abort_reason(),
        Some(GoalError::Kinematics(KinematicsError::Unavailable(_)))
    ));
    assert!(arm.cartesian_pose().is_err());
}
