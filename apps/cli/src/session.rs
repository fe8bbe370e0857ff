//! 会话
//!
//! 解析配置文件路径，在模拟臂上组装 [`JacoArm`]，并把 Ctrl-C 接到急停上。

use anyhow::{Context, Result};
use jaco_client::{ArmConfig, GoalOutcome, JacoArm, JacoArmBuilder};
use jaco_driver::mock::SimulatedArm;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const CONFIG_DIR: &str = "jaco";
const CONFIG_FILE: &str = "arm.toml";

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("cannot determine the user config directory")?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

/// 命令行指定的路径优先，否则使用默认路径
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认路径不存在时使用默认配置。
pub fn load_config(explicit: Option<&Path>) -> Result<ArmConfig> {
    let path = resolve_config_path(explicit)?;
    if explicit.is_none() && !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(ArmConfig::default());
    }
    let config = ArmConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// 一次命令执行期间的机械臂
pub struct Session {
    pub arm: Arc<JacoArm>,
    /// 模拟臂句柄（用于显示模拟状态）
    pub sim: SimulatedArm,
}

impl Session {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        Self::with_config(config)
    }

    pub fn with_config(config: ArmConfig) -> Result<Self> {
        let sim = SimulatedArm::new();
        let arm = JacoArmBuilder::new()
            .config(config)
            .build(sim.clone())
            .context("failed to start the arm")?;
        let arm = Arc::new(arm);
        install_estop_handler(&arm)?;
        info!("Arm ready (simulated backend)");
        Ok(Self { arm, sim })
    }
}

fn install_estop_handler(arm: &Arc<JacoArm>) -> Result<()> {
    let arm = Arc::downgrade(arm);
    ctrlc::set_handler(move || {
        let Some(arm) = arm.upgrade() else {
            std::process::exit(130);
        };
        if arm.is_estopped() {
            // 第二次 Ctrl-C 直接退出
            std::process::exit(130);
        }
        warn!("Ctrl-C received, engaging e-stop");
        if let Err(e) = arm.set_estop(true) {
            error!("Failed to engage e-stop: {}", e);
        }
    })
    .context("failed to install Ctrl-C handler")
}

/// 打印目标终态；中止的目标作为错误返回
pub fn report_outcome(outcome: &GoalOutcome) -> Result<()> {
    match outcome {
        GoalOutcome::Succeeded { final_error } => {
            println!("✅ 目标完成（最终误差 {:.4}）", final_error);
            Ok(())
        },
        GoalOutcome::Preempted { final_error } => {
            println!("⚠️  目标被取消（最终误差 {:.4}）", final_error);
            Ok(())
        },
        GoalOutcome::Aborted {
            reason,
            final_error,
        } => {
            anyhow::bail!("goal aborted: {} (final error {:.4})", reason, final_error)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arm.toml");
        std::fs::write(&path, "[home]\ntimeout_ms = 5000\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.home.timeout_ms, 5000);
    }

    #[test]
    fn test_aborted_outcome_is_error() {
        let outcome = GoalOutcome::Aborted {
            reason: jaco_client::GoalError::Estopped,
            final_error: 0.1,
        };
        assert!(report_outcome(&outcome).is_err());
        assert!(report_outcome(&GoalOutcome::Succeeded { final_error: 0.0 }).is_ok());
    }
}
