//! 集成测试共用的辅助函数

#![allow(dead_code)]

use jaco_client::prelude::*;
use jaco_driver::PositionType;
use jaco_driver::mock::{RecordedCommand, SimulatedArm};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 在模拟臂上组装一台 JacoArm，返回两者（模拟臂句柄用于检查）
pub fn arm_with(config: ArmConfig) -> (Arc<JacoArm>, SimulatedArm) {
    let sim = SimulatedArm::new();
    let arm = JacoArmBuilder::new()
        .config(config)
        .build(sim.clone())
        .expect("failed to build arm");
    (Arc::new(arm), sim)
}

pub fn default_arm() -> (Arc<JacoArm>, SimulatedArm) {
    arm_with(ArmConfig::default())
}

/// 只有 J1 不为零的关节目标
pub fn j1_target(rad: f64) -> JointArray<Rad> {
    let mut target = JointArray::splat(Rad::ZERO);
    target[Joint::J1] = Rad(rad);
    target
}

pub fn single_point_goal(target: JointArray<Rad>) -> TrajectoryGoal {
    TrajectoryGoal::joints(vec![JointWaypoint::new(target)])
}

/// 所有手臂角速度命令（度/秒）
pub fn arm_velocity_commands(commands: &[RecordedCommand]) -> Vec<[f64; 6]> {
    commands
        .iter()
        .filter(|c| c.command.position_type == PositionType::AngularVelocity)
        .filter_map(|c| c.command.arm)
        .collect()
}

/// 轮询直到条件满足或超时
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
