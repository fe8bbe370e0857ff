//! 状态查询命令

use crate::session::Session;
use anyhow::{Context, Result};
use clap::Args;
use jaco_driver::{ARM_JOINTS, JointState};
use std::time::Duration;

/// 状态查询参数
#[derive(Args, Debug)]
pub struct StateCommand {
    /// 打印的状态条数（>1 时订阅周期广播）
    #[arg(short, long, default_value_t = 1)]
    pub samples: usize,

    /// 同时显示末端位姿
    #[arg(long)]
    pub pose: bool,
}

impl StateCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let arm = &session.arm;
        if self.samples <= 1 {
            print_state(&arm.sample_joint_state());
        } else {
            let rx = arm.subscribe_state();
            for _ in 0..self.samples {
                let state = rx
                    .recv_timeout(Duration::from_secs(1))
                    .context("state broadcast stopped")?;
                print_state(&state);
            }
        }

        if self.pose {
            let pose = arm.cartesian_pose()?;
            println!("末端位姿（正运动学）: {}", format_pose(&pose.to_array()));
            let vendor = arm.vendor_cartesian_pose()?;
            println!("末端位姿（控制器）:   {}", format_pose(&vendor.to_array()));
        }
        Ok(())
    }
}

fn print_state(state: &JointState) {
    println!("状态 #{}", state.sequence);
    for (i, name) in state.names.iter().enumerate() {
        if i < ARM_JOINTS {
            println!(
                "  {:<24} {:>8.4} rad ({:>7.2}°)  {:>7.4} rad/s  {:>7.3}",
                name,
                state.position[i],
                state.position[i].to_degrees(),
                state.velocity[i],
                state.effort[i]
            );
        } else {
            println!("  {:<24} {:>8.4}", name, state.position[i]);
        }
    }
}

fn format_pose(pose: &[f64; 6]) -> String {
    format!(
        "x={:.4} y={:.4} z={:.4} θx={:.4} θy={:.4} θz={:.4}",
        pose[0], pose[1], pose[2], pose[3], pose[4], pose[5]
    )
}
