//! 夹爪与回零目标

mod common;

use common::*;
use jaco_client::prelude::*;
use jaco_driver::PositionType;
use jaco_driver::mock::VendorCall;
use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn finger_commands(sim: &jaco_driver::mock::SimulatedArm) -> Vec<[f64; 2]> {
    sim.commands()
        .iter()
        .filter(|c| c.command.position_type == PositionType::AngularVelocity && c.command.arm.is_none())
        .filter_map(|c| c.command.fingers)
        .collect()
}

#[test]
#[serial]
fn test_sequential_gripper_goals_both_succeed() {
    let (arm, sim) = default_arm();

    let half = arm.gripper(&GripperGoal::new(0.5)).unwrap();
    assert!(half.is_success(), "{:?}", half);
    assert!(half.final_error() < 1.0);
    let fingers = sim.fingers();
    assert!((fingers[0] - 3200.0).abs() < 5.0, "fingers at {:?}", fingers);
    assert!((fingers[1] - 3200.0).abs() < 5.0, "fingers at {:?}", fingers);
    let first_goal_commands = finger_commands(&sim).len();

    let open = arm.gripper(&GripperGoal::open()).unwrap();
    assert!(open.is_success(), "{:?}", open);
    assert!(sim.fingers()[0] < 5.0);

    // 第一个目标以零速度结束，第二个目标以最大速度张开
    let commands = finger_commands(&sim);
    assert_eq!(commands[first_goal_commands - 1], [0.0, 0.0]);
    assert_eq!(commands[first_goal_commands], [-3000.0, -3000.0]);
    assert_eq!(commands.last(), Some(&[0.0, 0.0]));

    let state = arm.sample_joint_state();
    assert!(state.position[6] < 5.0 / 120.0);
}

#[test]
#[serial]
fn test_each_gripper_goal_starts_with_zero_integral() {
    // 积分项占主导且不会被钳位
    let mut config = ArmConfig::default();
    config.finger_controller.kp = 1.0;
    config.finger_controller.ki = 10.0;
    config.finger_controller.kv = 0.0;
    config.finger_controller.max_speed = 100_000.0;
    config.finger_controller.integral_limit = 1e6;
    config.finger_controller.timeout_ms = 300;
    let (arm, sim) = arm_with(config.clone());

    // 第一个目标在中途超时，留下很大的正向积分
    let closing = arm.gripper(&GripperGoal::close()).unwrap();
    assert!(
        matches!(closing.abort_reason(), Some(GoalError::Timeout { .. })),
        "{:?}",
        closing
    );
    let p = sim.fingers();
    assert!(p[0] > 500.0 && p[0] < 6000.0, "fingers at {:?}", p);
    let first_goal_commands = finger_commands(&sim).len();

    let _ = arm.gripper(&GripperGoal::open()).unwrap();

    // 张开目标的第一个命令只含本目标的 P 和 I 项：-(kp + ki·dt)·p
    let f = &config.finger_controller;
    let max_dt = config.velocity_controller.dt_clamp_multiplier / f.control_rate_hz;
    let first = finger_commands(&sim)[first_goal_commands];
    for i in 0..2 {
        assert!(first[i] < 0.0, "first opening command {:?}", first);
        assert!(first[i] <= -f.kp * p[i] + 1e-6, "first opening command {:?}", first);
        assert!(
            first[i] >= -(f.kp + f.ki * max_dt) * p[i] - 1e-6,
            "first opening command {:?}",
            first
        );
    }
}

#[test]
#[serial]
fn test_finger_velocity_never_exceeds_max_speed() {
    let (arm, sim) = default_arm();
    let outcome = arm.gripper(&GripperGoal::close()).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome);
    let max_speed = arm.config().finger_controller.max_speed;
    for f in finger_commands(&sim) {
        assert!(f.iter().all(|v| v.abs() <= max_speed));
    }
    assert!((sim.fingers()[0] - 6400.0).abs() < 5.0);
}

#[test]
#[serial]
fn test_preempted_gripper_goal_is_aborted() {
    let (arm, sim) = default_arm();
    let handle = {
        let arm = Arc::clone(&arm);
        thread::spawn(move || arm.gripper(&GripperGoal::close()))
    };
    assert!(wait_until(Duration::from_secs(2), || sim.fingers()[0] > 500.0));

    let second = arm.gripper(&GripperGoal::open()).unwrap();
    let first = handle.join().unwrap().unwrap();

    assert_eq!(first.abort_reason(), Some(&GoalError::Preempted));
    assert!(second.is_success(), "{:?}", second);
}

#[test]
fn test_invalid_gripper_goal_rejected() {
    let (arm, sim) = default_arm();
    assert!(matches!(
        arm.gripper(&GripperGoal::new(1.5)),
        Err(GoalError::InvalidGoal(_))
    ));
    let goal = GripperGoal {
        position: 0.5,
        max_effort: Some(f64::NAN),
    };
    assert!(matches!(arm.gripper(&goal), Err(GoalError::InvalidGoal(_))));
    assert!(sim.commands().is_empty());
}

#[test]
#[serial]
fn test_home_waits_for_vendor_completion() {
    let (arm, sim) = default_arm();
    sim.set_joints([30.0, -20.0, 10.0, 0.0, 0.0, 0.0]);

    let outcome = arm.home().unwrap();
    assert_eq!(outcome, GoalOutcome::Succeeded { final_error: 0.0 });
    assert!(sim.joints().iter().all(|j| j.abs() < 1e-6));

    let calls = sim.vendor_calls();
    let home = calls.iter().position(|c| *c == VendorCall::MoveHome).unwrap();
    assert!(calls[home..].contains(&VendorCall::IsHomeReached));
}

#[test]
#[serial]
fn test_home_cancel_stops_motion() {
    let (arm, sim) = default_arm();
    sim.set_joints([90.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let handle = {
        let arm = Arc::clone(&arm);
        thread::spawn(move || arm.home())
    };
    assert!(wait_until(Duration::from_secs(2), || sim.joints()[0] < 80.0));

    assert!(arm.cancel(MotionMode::Home));
    let outcome = handle.join().unwrap().unwrap();
    assert!(matches!(outcome, GoalOutcome::Preempted { .. }), "{:?}", outcome);

    let stopped_at = sim.joints()[0];
    assert!(stopped_at > 1.0);
    thread::sleep(Duration::from_millis(100));
    assert!((sim.joints()[0] - stopped_at).abs() < 1e-6);
}

#[test]
#[serial]
fn test_home_vendor_fault_aborts() {
    let (arm, sim) = default_arm();
    sim.set_joints([30.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    // 状态广播也在读取，多注入几次保证回零请求一定失败
    sim.fail_next_calls(50, 1015);

    let outcome = arm.home().unwrap();
    assert!(matches!(
        outcome.abort_reason(),
        Some(GoalError::HardwareFault { .. })
    ));
}
