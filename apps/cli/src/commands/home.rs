//! 回零命令

use crate::session::{Session, report_outcome};
use anyhow::Result;

pub fn execute(session: &Session) -> Result<()> {
    println!("🏠 回到零位...");
    let outcome = session.arm.home()?;
    report_outcome(&outcome)
}
