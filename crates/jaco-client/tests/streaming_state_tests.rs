//! 流式命令、状态查询与状态广播

mod common;

use common::*;
use jaco_client::prelude::*;
use jaco_driver::PositionType;
use jaco_driver::mock::VendorCall;
use serial_test::serial;
use std::f64::consts::PI;
use std::time::Duration;

#[test]
#[serial]
fn test_streaming_angular_velocity_moves_and_expires() {
    let (arm, sim) = default_arm();
    arm.send_angular(&AngularCommand::velocity(j1_target(0.5)))
        .unwrap();
    assert!(wait_until(Duration::from_millis(500), || sim.joints()[0] > 0.5));

    // 速度命令需要持续刷新，否则停止
    std::thread::sleep(Duration::from_millis(150));
    let settled = sim.joints()[0];
    std::thread::sleep(Duration::from_millis(100));
    assert!((sim.joints()[0] - settled).abs() < 1e-6);
}

#[test]
#[serial]
fn test_streaming_angular_position_replacing_erases_queue() {
    let (arm, sim) = default_arm();
    arm.send_angular(&AngularCommand::position(j1_target(1.5)))
        .unwrap();
    arm.send_angular(&AngularCommand::position(j1_target(-1.5)))
        .unwrap();
    assert_eq!(sim.queued_points(), 2);

    arm.send_angular(&AngularCommand::position(j1_target(0.1)).replacing())
        .unwrap();
    assert_eq!(sim.queued_points(), 1);
    assert!(wait_until(Duration::from_secs(2), || sim.queued_points() == 0));
    assert!((sim.joints()[0] - 0.1_f64.to_degrees()).abs() < 1e-6);

    let calls = sim.vendor_calls();
    let erase = calls
        .iter()
        .rposition(|c| *c == VendorCall::EraseAllTrajectories)
        .unwrap();
    let send = calls
        .iter()
        .rposition(|c| *c == VendorCall::SendBasicTrajectory)
        .unwrap();
    assert!(erase < send);
}

#[test]
#[serial]
fn test_streaming_cartesian_switches_control_mode() {
    let (arm, sim) = default_arm();
    let mut pose = CartesianPose::from_array(sim.pose());
    pose.position.y += 0.02;

    arm.send_cartesian(&CartesianCommand::position(pose)).unwrap();
    assert_eq!(sim.control_mode(), jaco_driver::ControlMode::Cartesian);
    assert!(wait_until(Duration::from_secs(1), || {
        CartesianPose::from_array(sim.pose()).within(&pose, 1e-6, 1e-6)
    }));

    let pose_now = arm.vendor_cartesian_pose().unwrap();
    assert!(pose_now.within(&pose, 1e-6, 1e-6));

    // 角度命令把模式切回来
    arm.send_angular(&AngularCommand::velocity(JointArray::splat(Rad::ZERO)))
        .unwrap();
    assert_eq!(sim.control_mode(), jaco_driver::ControlMode::Angular);
    let last = sim.commands().last().unwrap().command;
    assert_eq!(last.position_type, PositionType::AngularVelocity);
}

#[test]
fn test_streaming_rejects_bad_commands() {
    let (arm, sim) = default_arm();
    assert!(matches!(
        arm.send_angular(&AngularCommand::default()),
        Err(GoalError::InvalidGoal(_))
    ));
    assert!(matches!(
        arm.send_cartesian(&CartesianCommand::velocity(CartesianPose::from_array([
            f64::INFINITY,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0
        ]))),
        Err(GoalError::InvalidGoal(_))
    ));
    assert!(sim.commands().is_empty());
}

#[test]
#[serial]
fn test_joint_state_reports_eight_normalized_joints() {
    let (arm, sim) = default_arm();
    sim.set_joints([270.0, -200.0, 45.0, 0.0, 360.0, 90.0]);
    sim.set_fingers([1200.0, 2400.0]);

    let state = arm.sample_joint_state();
    assert_eq!(state.names.len(), 8);
    assert_eq!(state.names[0], "mico_joint_1");
    assert_eq!(state.names[6], "mico_joint_finger_1");
    for p in &state.position[..6] {
        assert!((-PI..=PI).contains(p));
    }
    assert!((state.position[0] + PI / 2.0).abs() < 1e-9);
    assert!((state.position[1] - 160.0_f64.to_radians()).abs() < 1e-9);
    assert!((state.position[6] - 10.0).abs() < 1e-9);
    assert!((state.position[7] - 20.0).abs() < 1e-9);
    assert_eq!(arm.joint_state().sequence, state.sequence);
}

#[test]
#[serial]
fn test_state_broadcast_reaches_subscribers() {
    let (arm, sim) = default_arm();
    sim.set_joints([45.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let rx = arm.subscribe_state();

    let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(second.sequence > first.sequence);
    assert!((second.position[0] - PI / 4.0).abs() < 1e-9);
}

#[test]
#[serial]
fn test_cartesian_pose_from_forward_kinematics() {
    let (arm, _sim) = default_arm();
    let pose = arm.cartesian_pose().unwrap();
    assert!(pose.is_finite());
    let reach = (pose.position.x.powi(2) + pose.position.y.powi(2) + pose.position.z.powi(2)).sqrt();
    assert!(reach > 0.1 && reach < 1.2, "reach {}", reach);
}
