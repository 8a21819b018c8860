//! run 命令
//!
//! 提交一条指令序列并跟踪到任务端点关闭

use anyhow::{Result, bail};
use clap::Args;
use robots_client::{Dispatcher, SubmitOptions, TaskStatus};
use robots_driver::RobotState;
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::config::CliConfig;

/// `--json` 输出
#[derive(Serialize)]
struct RunReport<'a> {
    task: &'a str,
    #[serde(flatten)]
    outcome: &'a TaskStatus,
    last_update: Option<RobotState>,
    state: RobotState,
}

/// run 命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 指令序列（空格分隔，如 "N N E E"）
    pub commands: String,

    /// 入队前预校验
    #[arg(long)]
    pub validate: bool,

    /// 目标机器人（默认第一个）
    #[arg(short, long)]
    pub robot: Option<String>,

    /// 提交后经过指定毫秒数取消任务
    #[arg(long)]
    pub cancel_after_ms: Option<u64>,

    /// 以 JSON 输出最终状态
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let warehouse = config.warehouse()?;
        let robot = warehouse.resolve(self.robot.as_deref())?;
        let dispatcher = Dispatcher::new();

        let submission = dispatcher.submit(
            &robot,
            &self.commands,
            SubmitOptions {
                validate: self.validate,
            },
        )?;
        let id = submission.id().clone();
        println!("📋 任务 {} 已提交", id);

        let canceller = self.cancel_after_ms.map(|delay_ms| {
            let robot = robot.clone();
            let dispatcher = dispatcher.clone();
            let id = id.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(delay_ms));
                if let Err(e) = dispatcher.cancel(&robot, &id) {
                    // 任务可能已经结束
                    warn!("Cancel after {}ms failed: {}", delay_ms, e);
                }
            })
        });

        let (status, last_state) = submission.wait_with_state();
        if let Some(handle) = canceller
            && handle.join().is_err()
        {
            warn!("Cancel thread panicked");
        }
        // 取消线程可能在端点关闭后才被确认，以看板为准
        let status = dispatcher.status(&id).unwrap_or(status);
        let state = robot.current_state();
        info!("Task {} finished: {}", id, status);

        if self.json {
            let report = RunReport {
                task: id.as_str(),
                outcome: &status,
                last_update: last_state,
                state,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("📊 状态: {}", status);
            println!("📍 位置: ({}, {})", state.x, state.y);
        }

        if let TaskStatus::Failed(err) = status {
            bail!("task {} failed: {}", id, err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CliConfig {
        let mut config = CliConfig::default();
        config.scheduler.tick_latency_ms = 1;
        config.scheduler.idle_poll_ms = 1;
        config
    }

    #[test]
    fn test_run_command_completes() {
        let cmd = RunCommand {
            commands: "N E".to_string(),
            validate: true,
            robot: None,
            cancel_after_ms: None,
            json: false,
        };
        assert!(cmd.execute(&fast_config()).is_ok());
    }

    #[test]
    fn test_run_command_fails_out_of_bounds() {
        let cmd = RunCommand {
            commands: "S".to_string(),
            validate: false,
            robot: None,
            cancel_after_ms: None,
            json: true,
        };
        assert!(cmd.execute(&fast_config()).is_err());
    }

    #[test]
    fn test_run_command_unknown_robot() {
        let cmd = RunCommand {
            commands: "N".to_string(),
            validate: false,
            robot: Some("nope".to_string()),
            cancel_after_ms: None,
            json: false,
        };
        assert!(cmd.execute(&fast_config()).is_err());
    }
}
