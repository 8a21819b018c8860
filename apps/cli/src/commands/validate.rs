//! validate 命令
//!
//! 从机器人当前位置模拟整条序列，不执行

use anyhow::Result;
use clap::Args;
use robots_client::validate_commands;

use super::config::CliConfig;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// 指令序列（空格分隔）
    pub commands: String,

    /// 目标机器人（默认第一个）
    #[arg(short, long)]
    pub robot: Option<String>,
}

impl ValidateCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let warehouse = config.warehouse()?;
        let robot = warehouse.resolve(self.robot.as_deref())?;

        let end = validate_commands(
            robot.current_state(),
            &self.commands,
            config.scheduler.bounds,
        )?;
        println!("✅ 校验通过，预计终点: ({}, {})", end.x, end.y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_command() {
        let ok = ValidateCommand {
            commands: "N N E".to_string(),
            robot: None,
        };
        assert!(ok.execute(&CliConfig::default()).is_ok());

        let bad = ValidateCommand {
            commands: "W".to_string(),
            robot: None,
        };
        assert!(bad.execute(&CliConfig::default()).is_err());
    }
}
