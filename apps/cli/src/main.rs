//! # JACO CLI
//!
//! JACO/MICO 机械臂命令行工具。每条命令独立执行：加载配置 → 组装机械臂 → 执行 → 退出。
//! 当前后端为模拟臂，硬件 SDK 接入后只需替换 [`session::Session::open`] 中的 `ArmApi`。
//!
//! ```bash
//! # 生成默认配置
//! jaco-cli config init
//!
//! # 关节速度模式移动（弧度）
//! jaco-cli move --joints 0.5,0,0,0,0,0
//!
//! # 夹爪半闭合
//! jaco-cli gripper 0.5
//! ```
//!
//! 每条命令都在自己的进程里组装机械臂，所以急停没有单独的子命令：
//! 运行中按 Ctrl-C 会激活急停，在途目标以 `Estopped` 中止。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod session;
mod validation;

use commands::{ConfigCommand, GripperCommand, MoveCommand, StateCommand};

const DEFAULT_LOG_FILTER: &str = "jaco_cli=info,jaco_client=info,jaco_driver=info";

/// JACO CLI - 机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "jaco-cli")]
#[command(about = "Command-line interface for JACO/MICO arm control", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/jaco/arm.toml，不存在时使用默认值）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查询关节状态与末端位姿
    State {
        #[command(flatten)]
        args: StateCommand,
    },

    /// 执行轨迹目标
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 夹爪目标
    Gripper {
        #[command(flatten)]
        args: GripperCommand,
    },

    /// 回到零位
    Home,
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config_path.as_deref()),

        Commands::State { args } => {
            let session = session::Session::open(config_path.as_deref())?;
            args.execute(&session)
        },

        Commands::Move { args } => {
            let session = session::Session::open(config_path.as_deref())?;
            args.execute(&session)
        },

        Commands::Gripper { args } => {
            let session = session::Session::open(config_path.as_deref())?;
            args.execute(&session)
        },

        Commands::Home => {
            let session = session::Session::open(config_path.as_deref())?;
            commands::home::execute(&session)
        },
    }
}
