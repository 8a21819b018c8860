//! # Robots CLI
//!
//! Command-line interface for the grid robot task scheduler.
//!
//! ```bash
//! # 执行一条指令序列并跟踪到结束
//! robots-cli run "N N E E"
//!
//! # 只做预校验
//! robots-cli validate "N N W"
//!
//! # 随机游走演示（Ctrl+C 提前结束）
//! robots-cli --tick-ms 100 demo --tasks 5 --length 8 --seed 42
//!
//! # 查看生效配置
//! robots-cli config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::config::CliConfig;
use commands::{ConfigCommand, DemoCommand, RunCommand, ValidateCommand};

/// Robots CLI - 网格机器人任务调度命令行工具
#[derive(Parser, Debug)]
#[command(name = "robots-cli")]
#[command(about = "Command-line interface for the grid robot task scheduler", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/robots/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖每条指令的模拟延迟（毫秒）
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 提交指令序列并跟踪到结束
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 预校验指令序列（不执行）
    Validate {
        #[command(flatten)]
        args: ValidateCommand,
    },

    /// 随机游走演示
    Demo {
        #[command(flatten)]
        args: DemoCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，stdout 留给命令结果）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("robots_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(tick_ms) = cli.tick_ms {
        config.scheduler.tick_latency_ms = tick_ms;
    }

    match cli.command {
        Commands::Run { args } => args.execute(&config),
        Commands::Validate { args } => args.execute(&config),
        Commands::Demo { args } => args.execute(&config),
        Commands::Config(cmd) => cmd.execute(&config, cli.config.as_deref()),
    }
}
