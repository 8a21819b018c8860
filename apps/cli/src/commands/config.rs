//! 配置管理命令
//!
//! CLI 配置（调度参数、机器人列表）保存在 TOML 文件中；文件不存在时使用默认值。

use anyhow::{Context, Result};
use clap::Subcommand;
use robots_client::Warehouse;
use robots_driver::{RobotBuilder, SchedulerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 配置文件路径
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("robots");
    Ok(path)
}

fn default_config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// 显式路径优先，否则使用默认路径
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_file(),
    }
}

/// 配置文件错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// CLI 配置
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 调度参数
    pub scheduler: SchedulerConfig,

    /// 机器人名称（为空时启动单个 `robot-0`）
    pub robots: Vec<String>,
}

impl CliConfig {
    /// 加载配置
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_file(explicit)?;

        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Ok(Self::from_file(&path)?)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }

    /// 按配置启动所有机器人
    pub fn warehouse(&self) -> Result<Warehouse> {
        if self.robots.is_empty() {
            return Ok(Warehouse::single(self.scheduler.clone())?);
        }

        let mut warehouse = Warehouse::new();
        for id in &self.robots {
            warehouse
                .spawn(id.clone(), RobotBuilder::new().config(self.scheduler.clone()))
                .with_context(|| format!("启动机器人 {} 失败", id))?;
        }
        Ok(warehouse)
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效配置（TOML）
    Show,

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, config: &CliConfig, explicit: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                print!("{}", config.to_toml()?);
            },

            ConfigCommand::Path => {
                let path = resolve_config_file(explicit)?;
                let marker = if path.exists() { "" } else { " (未创建)" };
                println!("{}{}", path.display(), marker);
            },
        }

        Ok(())
    }
}
