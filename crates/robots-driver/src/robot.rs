//! Robot API 模块
//!
//! 提供对外的 `Robot` 结构体，封装调度线程和状态同步细节。

use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, SchedulerMetrics};
use crate::mode::{AtomicSchedulerMode, SchedulerMode};
use crate::pipeline::{AdminEvent, SchedulerConfig, deadline_after, scheduler_loop};
use crate::state::{RobotContext, RobotState};
use crate::task::{Task, TaskHandle, TaskId};
use crossbeam_channel::{RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // Watchdog thread joins the target thread
        thread::spawn(move || {
            let result = self.join();
            // Receiver may have timed out already
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(RecvTimeoutError::Timeout) => {
                // Watchdog keeps running; the OS reclaims it on process exit
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "Thread join timeout",
                )))
            },
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 网格机器人（对外 API）
///
/// 持有一个后台调度线程。`Robot` 是 `Send + Sync`，可以通过 `Arc` 在多个
/// 生产者线程间共享：
/// - `enqueue_task()` 只向管理队列追加事件，永不阻塞
/// - `current_state()` 无锁读取已提交快照
/// - `cancel_task()` 跨越串行化边界，等待调度线程受理（有超时上限）
pub struct Robot {
    /// 管理队列发送端（接纳 + 取消）
    ///
    /// Drop 时必须在 join 调度线程之前释放，否则调度线程收不到 `Disconnected`。
    admin_tx: Option<Sender<AdminEvent>>,
    /// 共享状态上下文
    ctx: Arc<RobotContext>,
    /// 调度模式
    mode: Arc<AtomicSchedulerMode>,
    /// 性能指标（原子计数器）
    metrics: Arc<SchedulerMetrics>,
    /// 运行标志
    is_running: Arc<AtomicBool>,
    /// 调度线程句柄（Drop 时 join）
    scheduler_thread: Option<JoinHandle<()>>,
    /// 调度配置
    config: SchedulerConfig,
}

impl Robot {
    /// 使用给定配置创建并启动机器人（初始位置 (0,0)，Running 模式）
    ///
    /// 需要更多选项时使用 [`RobotBuilder`](crate::RobotBuilder)。
    pub fn new(config: SchedulerConfig) -> Result<Self, DriverError> {
        Self::spawn(config, RobotState::default(), SchedulerMode::Running)
    }

    /// 启动调度线程（内部方法，由 Builder 调用）
    pub(crate) fn spawn(
        config: SchedulerConfig,
        initial_state: RobotState,
        mode: SchedulerMode,
    ) -> Result<Self, DriverError> {
        config.validate()?;

        let (admin_tx, admin_rx) = crossbeam_channel::bounded(config.admin_queue_capacity);
        let ctx = Arc::new(RobotContext::new(initial_state));
        let mode = Arc::new(AtomicSchedulerMode::new(mode));
        let metrics = Arc::new(SchedulerMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));

        let ctx_clone = ctx.clone();
        let mode_clone = mode.clone();
        let metrics_clone = metrics.clone();
        let is_running_clone = is_running.clone();
        let config_clone = config.clone();

        let scheduler_thread = thread::Builder::new()
            .name("robot-scheduler".to_string())
            .spawn(move || {
                scheduler_loop(
                    admin_rx,
                    ctx_clone,
                    mode_clone,
                    metrics_clone,
                    is_running_clone,
                    config_clone,
                );
            })?;

        Ok(Self {
            admin_tx: Some(admin_tx),
            ctx,
            mode,
            metrics,
            is_running,
            scheduler_thread: Some(scheduler_thread),
            config,
        })
    }

    /// 只有管理队列、没有调度线程的实例（测试用：队列不会被消费）
    #[cfg(test)]
    pub(crate) fn detached(
        config: SchedulerConfig,
    ) -> (Self, crossbeam_channel::Receiver<AdminEvent>) {
        let (admin_tx, admin_rx) = crossbeam_channel::bounded(config.admin_queue_capacity);
        let robot = Self {
            admin_tx: Some(admin_tx),
            ctx: Arc::new(RobotContext::default()),
            mode: Arc::new(AtomicSchedulerMode::default()),
            metrics: Arc::new(SchedulerMetrics::new()),
            is_running: Arc::new(AtomicBool::new(true)),
            scheduler_thread: None,
            config,
        };
        (robot, admin_rx)
    }

    /// 提交一串指令
    ///
    /// 按空白拆分指令，生成新任务 ID，立即返回任务句柄（在任何指令执行之前）。
    /// 指令串本身不做校验：无效或越界的指令在执行时通过错误端点报告。
    ///
    /// # 错误
    /// - `DriverError::QueueFull`: 管理队列已满（非阻塞）
    /// - `DriverError::ChannelClosed`: 调度线程已退出
    pub fn enqueue_task(&self, commands: &str) -> Result<TaskHandle, DriverError> {
        let admin_tx = self.admin_tx.as_ref().ok_or(DriverError::ChannelClosed)?;
        let (task, handle) = Task::new(TaskId::generate(), commands);

        match admin_tx.try_send(AdminEvent::Admit(task)) {
            Ok(()) => {
                debug!(task_id = %handle.id, "Task enqueued");
                Ok(handle)
            },
            Err(TrySendError::Full(_)) => Err(DriverError::QueueFull {
                capacity: self.config.admin_queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }

    /// 取消任务
    ///
    /// 返回 `Ok(())` 表示调度线程已受理并移除任务（端点已关闭，不发送最终状态）。
    /// 正在执行的指令不会被打断：取消只在指令之间生效。
    ///
    /// # 错误
    /// - `DriverError::NotFound`: 任务不存在（已完成、已取消或从未提交）
    /// - `DriverError::Timeout`: 调度线程未在 `cancel_timeout_ms` 内受理
    /// - `DriverError::ChannelClosed`: 调度线程已退出
    pub fn cancel_task(&self, id: &TaskId) -> Result<(), DriverError> {
        let admin_tx = self.admin_tx.as_ref().ok_or(DriverError::ChannelClosed)?;
        let deadline = deadline_after(self.config.cancel_timeout());
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);

        let event = AdminEvent::Cancel {
            id: id.clone(),
            ack: ack_tx,
        };
        match admin_tx.send_deadline(event, deadline) {
            Ok(()) => {},
            Err(SendTimeoutError::Timeout(_)) => return Err(DriverError::Timeout),
            Err(SendTimeoutError::Disconnected(_)) => return Err(DriverError::ChannelClosed),
        }

        match ack_rx.recv_deadline(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    /// 获取最新已提交的机器人状态（无锁）
    pub fn current_state(&self) -> RobotState {
        self.ctx.snapshot()
    }

    /// 获取当前调度模式
    pub fn mode(&self) -> SchedulerMode {
        self.mode.get()
    }

    /// 切换调度模式
    ///
    /// 暂停在下一个 tick 边界生效，正在执行的指令不受影响。
    pub fn set_mode(&self, mode: SchedulerMode) {
        self.mode.set(mode);
        debug!(?mode, "Scheduler mode changed");
    }

    /// 获取性能指标快照
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 调度配置
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 调度线程是否存活
    pub fn is_healthy(&self) -> bool {
        self.scheduler_thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        // Release: 调度线程看到 false 时能看到之前的所有写入
        self.is_running.store(false, Ordering::Release);

        // 关闭管理队列（唤醒阻塞在 recv 上的调度线程）
        drop(self.admin_tx.take());

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.scheduler_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Scheduler thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            tick_latency_ms: 5,
            idle_poll_ms: 5,
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn test_robot_new() {
        let robot = Robot::new(fast_config()).unwrap();
        assert!(robot.is_healthy());
        assert_eq!(robot.current_state(), RobotState::default());
        assert_eq!(robot.mode(), SchedulerMode::Running);
    }

    #[test]
    fn test_robot_new_rejects_invalid_config() {
        let config = SchedulerConfig {
            admin_queue_capacity: 0,
            ..fast_config()
        };
        assert!(matches!(Robot::new(config), Err(DriverError::InvalidConfig(_))));
    }

    #[test]
    fn test_robot_drop_joins_scheduler() {
        let robot = Robot::new(fast_config()).unwrap();
        let start = Instant::now();
        drop(robot);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drop_closes_pending_task_endpoints() {
        let robot = Robot::spawn(fast_config(), RobotState::default(), SchedulerMode::Paused)
            .unwrap();
        let handle = robot.enqueue_task("N N").unwrap();
        drop(robot);
        assert_eq!(handle.states.recv(), None);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_enqueue_queue_full() {
        let config = SchedulerConfig {
            admin_queue_capacity: 3,
            ..fast_config()
        };
        let (robot, _admin_rx) = Robot::detached(config);

        let handles: Vec<_> = (0..3).map(|_| robot.enqueue_task("N").unwrap()).collect();
        assert_eq!(handles.len(), 3);
        assert!(matches!(
            robot.enqueue_task("N"),
            Err(DriverError::QueueFull { capacity: 3 })
        ));
    }

    #[test]
    fn test_cancel_times_out_without_ack() {
        let config = SchedulerConfig {
            cancel_timeout_ms: 50,
            ..fast_config()
        };
        let (robot, admin_rx) = Robot::detached(config);
        let handle = robot.enqueue_task("N").unwrap();

        // 事件进入队列，但没有调度线程回复
        let start = Instant::now();
        assert!(matches!(
            robot.cancel_task(&handle.id),
            Err(DriverError::Timeout)
        ));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "{:?}", elapsed);
        assert_eq!(admin_rx.len(), 2);
    }

    #[test]
    fn test_cancel_times_out_on_full_queue() {
        let config = SchedulerConfig {
            admin_queue_capacity: 1,
            cancel_timeout_ms: 30,
            ..fast_config()
        };
        let (robot, _admin_rx) = Robot::detached(config);
        let handle = robot.enqueue_task("N").unwrap();

        assert!(matches!(
            robot.cancel_task(&handle.id),
            Err(DriverError::Timeout)
        ));
    }

    #[test]
    fn test_detached_channel_closed() {
        let (robot, admin_rx) = Robot::detached(fast_config());
        drop(admin_rx);
        assert!(!robot.is_healthy());
        assert!(matches!(
            robot.enqueue_task("N"),
            Err(DriverError::ChannelClosed)
        ));
        assert!(matches!(
            robot.cancel_task(&TaskId::generate()),
            Err(DriverError::ChannelClosed)
        ));
    }

    #[test]
    fn test_set_mode() {
        let robot = Robot::new(fast_config()).unwrap();
        robot.set_mode(SchedulerMode::Paused);
        assert_eq!(robot.mode(), SchedulerMode::Paused);
    }
}
