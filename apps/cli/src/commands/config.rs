//! 配置管理命令
//!
//! 查看、检查和生成机械臂配置文件（TOML）。

use crate::session::{load_config, resolve_config_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use jaco_client::ArmConfig;
use std::fs;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置
    Show,

    /// 加载并校验配置文件
    Check,

    /// 写入默认配置
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(explicit),
            ConfigCommand::Check => Self::check_(explicit),
            ConfigCommand::Init { force } => Self::init_(explicit, force),
        }
    }

    fn show_(explicit: Option<&Path>) -> Result<()> {
        let config = load_config(explicit)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(explicit: Option<&Path>) -> Result<()> {
        let path = resolve_config_path(explicit)?;
        println!("配置文件: {}", path.display());
        if !path.exists() {
            println!("  (不存在，使用默认配置)");
        }
        let config = load_config(explicit)?;
        println!("✅ 配置有效");
        println!(
            "  关节速度上限: 大 {:.3} rad/s, 小 {:.3} rad/s",
            config.limits.class_limit(jaco_client::ActuatorClass::Large),
            config.limits.class_limit(jaco_client::ActuatorClass::Small)
        );
        println!(
            "  控制频率: 关节 {} Hz, 手指 {} Hz",
            config.velocity_controller.control_rate_hz, config.finger_controller.control_rate_hz
        );
        Ok(())
    }

    fn init_(explicit: Option<&Path>, force: bool) -> Result<()> {
        let path = resolve_config_path(explicit)?;
        write_default_config(&path, force)?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}

/// 写入默认配置；文件已存在且未指定 `force` 时报错
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let content = ArmConfig::default().to_toml_string()?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
