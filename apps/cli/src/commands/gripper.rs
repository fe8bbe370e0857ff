//! 夹爪命令

use crate::session::{Session, report_outcome};
use crate::validation::validate_gripper_position;
use anyhow::Result;
use clap::Args;
use jaco_client::GripperGoal;

/// 夹爪命令参数
#[derive(Args, Debug)]
pub struct GripperCommand {
    /// 目标位置：0 完全张开，1 完全闭合
    #[arg(required_unless_present_any = ["open", "close"])]
    pub position: Option<f64>,

    /// 完全张开
    #[arg(long, conflicts_with_all = ["position", "close"])]
    pub open: bool,

    /// 完全闭合
    #[arg(long, conflicts_with = "position")]
    pub close: bool,
}

impl GripperCommand {
    pub fn goal(&self) -> Result<GripperGoal> {
        if self.open {
            return Ok(GripperGoal::open());
        }
        if self.close {
            return Ok(GripperGoal::close());
        }
        let position = self
            .position
            .ok_or_else(|| anyhow::anyhow!("gripper position is required"))?;
        validate_gripper_position(position)?;
        Ok(GripperGoal::new(position))
    }

    pub fn execute(&self, session: &Session) -> Result<()> {
        let goal = self.goal()?;
        println!("⏳ 夹爪移动到 {:.0}%...", goal.position * 100.0);
        let outcome = session.arm.gripper(&goal)?;
        let fingers = session.sim.fingers();
        println!("  手指: {:.0} / {:.0}", fingers[0], fingers[1]);
        report_outcome(&outcome)
    }
}
