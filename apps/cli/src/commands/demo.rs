//! demo 命令
//!
//! 向机器人连续提交随机游走任务，展示 FIFO 执行、失败退役与取消。
//! Ctrl+C 取消所有尚未结束的任务。

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use robots_client::{Dispatcher, SubmitOptions, TaskStatus};
use robots_driver::Direction;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::config::CliConfig;

/// demo 命令参数
#[derive(Args, Debug)]
pub struct DemoCommand {
    /// 任务数量
    #[arg(short, long, default_value_t = 5)]
    pub tasks: usize,

    /// 每个任务的指令数
    #[arg(short, long, default_value_t = 6)]
    pub length: usize,

    /// 随机种子（不指定则使用系统熵）
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// 目标机器人（默认第一个）
    #[arg(short, long)]
    pub robot: Option<String>,
}

/// 生成长度为 `length` 的随机指令序列
fn random_walk(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| Direction::ALL[rng.gen_range(0..Direction::ALL.len())].as_char())
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}

impl DemoCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let warehouse = config.warehouse()?;
        let robot = warehouse.resolve(self.robot.as_deref())?;
        let dispatcher = Dispatcher::new();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Cancelling remaining tasks...");
            flag.store(true, Ordering::SeqCst);
        })
        .context("设置信号处理失败")?;

        let mut submissions = Vec::with_capacity(self.tasks);
        for _ in 0..self.tasks {
            let commands = random_walk(&mut rng, self.length.max(1));
            let submission = dispatcher.submit(&robot, &commands, SubmitOptions::default())?;
            println!("📋 {} <- {}", submission.id(), commands);
            submissions.push(submission);
        }

        // 等待全部结束；收到中断时取消尚未结束的任务
        while submissions
            .iter()
            .any(|s| !s.status().is_terminal())
        {
            if interrupted.swap(false, Ordering::SeqCst) {
                for s in submissions.iter().filter(|s| !s.status().is_terminal()) {
                    if let Err(e) = dispatcher.cancel(&robot, s.id()) {
                        warn!("Cancel of {} failed: {}", s.id(), e);
                    }
                }
            }
            thread::sleep(Duration::from_millis(20));
        }

        let (mut completed, mut failed, mut cancelled) = (0, 0, 0);
        for submission in submissions {
            let id = submission.id().clone();
            let status = submission.wait();
            match &status {
                TaskStatus::Completed => completed += 1,
                TaskStatus::Failed(_) => failed += 1,
                TaskStatus::Cancelled => cancelled += 1,
                TaskStatus::Queued | TaskStatus::Running => {},
            }
            println!("  {}: {}", id, status);
        }

        let state = robot.current_state();
        let metrics = robot.get_metrics();
        info!(
            "Demo done: {} completed, {} failed, {} cancelled",
            completed, failed, cancelled
        );
        println!();
        println!("📊 执行结果:");
        println!("  完成: {}", completed);
        println!("  失败: {}", failed);
        println!("  取消: {}", cancelled);
        println!("  已执行指令: {}", metrics.commands_executed);
        println!("  丢弃的通知: {}", metrics.notifications_dropped);
        println!("📍 最终位置: ({}, {})", state.x, state.y);
        Ok(())
    }
}
