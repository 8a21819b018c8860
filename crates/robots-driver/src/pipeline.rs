//! 调度循环模块
//!
//! 单线程调度循环是 `RobotState` 与任务注册表的唯一写者。每个 tick：
//!
//! 1. 非阻塞地排空管理队列（接纳、取消，按到达顺序处理）
//! 2. 推进队首任务一条指令，成功后进入模拟延迟
//!
//! 延迟期间调度线程阻塞在管理队列上（`recv_deadline`），
//! 取消请求一到达就被处理，保证在任何任务的下一条指令之前生效。
//! 指令本身是原子的：已执行的指令照常发送状态通知，取消只在指令之间生效。

use crate::error::DriverError;
use crate::metrics::SchedulerMetrics;
use crate::mode::AtomicSchedulerMode;
use crate::registry::Registry;
use crate::state::{GridBounds, RobotContext, RobotState};
use crate::task::{Task, TaskId, TaskOutcome};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 调度配置
///
/// # Example
///
/// ```
/// use robots_driver::SchedulerConfig;
///
/// // 默认配置（每条指令 1s 延迟，0..=10 网格）
/// let config = SchedulerConfig::default();
///
/// // 测试用的快速配置
/// let config = SchedulerConfig {
///     tick_latency_ms: 5,
///     ..SchedulerConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// 每条成功指令后的模拟延迟（毫秒）
    pub tick_latency_ms: u64,
    /// 空闲（无任务或暂停）时等待管理队列的间隔（毫秒）
    pub idle_poll_ms: u64,
    /// `cancel_task` 等待调度线程接受请求的上限（毫秒）
    pub cancel_timeout_ms: u64,
    /// 管理队列容量
    pub admin_queue_capacity: usize,
    /// 网格边界
    pub bounds: GridBounds,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_latency_ms: 1000,
            idle_poll_ms: 50,
            cancel_timeout_ms: 1000,
            admin_queue_capacity: 64,
            bounds: GridBounds::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_latency(&self) -> Duration {
        Duration::from_millis(self.tick_latency_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_timeout_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.admin_queue_capacity == 0 {
            return Err(DriverError::InvalidConfig(
                "admin_queue_capacity must be > 0".to_string(),
            ));
        }
        if self.cancel_timeout_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "cancel_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.idle_poll_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "idle_poll_ms must be > 0".to_string(),
            ));
        }
        if self.bounds.max_x < 0 || self.bounds.max_y < 0 {
            return Err(DriverError::InvalidConfig(format!(
                "grid bounds must be non-negative, got {:?}",
                self.bounds
            )));
        }
        Ok(())
    }
}

/// 管理队列事件
///
/// 接纳和取消共用一个 FIFO 队列：`enqueue_task` 返回后发出的取消请求
/// 一定排在对应的接纳事件之后，不会误报 NotFound。
pub(crate) enum AdminEvent {
    /// 接纳新任务（追加到执行队尾）
    Admit(Task),
    /// 取消任务；处理结果通过 `ack` 回传
    Cancel {
        id: TaskId,
        ack: Sender<Result<(), DriverError>>,
    },
}

/// 单个 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// 没有可推进的任务
    Idle,
    /// 成功执行了一条指令
    Executed,
    /// 队首任务到达终态并被移出
    Retired(TaskOutcome),
}

/// 调度器状态（只存在于调度线程内）
pub(crate) struct Scheduler {
    registry: Registry,
    state: RobotState,
    bounds: GridBounds,
    ctx: Arc<RobotContext>,
    metrics: Arc<SchedulerMetrics>,
}

impl Scheduler {
    pub(crate) fn new(
        ctx: Arc<RobotContext>,
        metrics: Arc<SchedulerMetrics>,
        bounds: GridBounds,
    ) -> Self {
        Self {
            registry: Registry::new(),
            state: ctx.snapshot(),
            bounds,
            ctx,
            metrics,
        }
    }

    /// 处理一个管理事件
    pub(crate) fn handle_admin(&mut self, event: AdminEvent) {
        match event {
            AdminEvent::Admit(task) => {
                let id = task.id().clone();
                let commands = task.remaining();
                match self.registry.admit(task) {
                    Ok(()) => {
                        SchedulerMetrics::incr(&self.metrics.tasks_admitted);
                        debug!(
                            task_id = %id,
                            commands,
                            queued = self.registry.len(),
                            "Task admitted"
                        );
                    },
                    Err(rejected) => {
                        // 丢弃即关闭端点
                        warn!(task_id = %rejected.id(), "Duplicate task id, rejecting task");
                    },
                }
            },
            AdminEvent::Cancel { id, ack } => {
                let result = self.cancel(id);
                // 调用方可能已超时放弃等待
                let _ = ack.send(result);
            },
        }
    }

    fn cancel(&mut self, id: TaskId) -> Result<(), DriverError> {
        match self.registry.remove(&id) {
            Some(task) => {
                // 取消不是完成：不发送最终状态，直接释放端点
                drop(task);
                SchedulerMetrics::incr(&self.metrics.tasks_cancelled);
                info!(task_id = %id, "Task cancelled");
                Ok(())
            },
            None => {
                SchedulerMetrics::incr(&self.metrics.cancel_not_found);
                debug!(
                    task_id = %id,
                    "Task not found for cancellation; task might be already completed or cancelled"
                );
                Err(DriverError::NotFound(id))
            },
        }
    }

    /// 排空管理队列
    ///
    /// 每次最多处理 `limit` 个事件（= 队列容量），保证 tick 开始时已在队列中的
    /// 事件全部被处理，同时避免持续涌入的生产者饿死执行。
    ///
    /// 返回 `false` 表示队列已断开（Robot 被 Drop）。
    pub(crate) fn drain_admin(&mut self, admin_rx: &Receiver<AdminEvent>, limit: usize) -> bool {
        for _ in 0..limit {
            match admin_rx.try_recv() {
                Ok(event) => self.handle_admin(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        true
    }

    /// 推进队首任务一条指令
    pub(crate) fn advance(&mut self) -> Tick {
        let Some(task) = self.registry.head_mut() else {
            return Tick::Idle;
        };

        let Some(token) = task.next_command() else {
            // 指令耗尽：正常完成
            task.notify_state(self.state, &self.metrics);
            self.retire_head(TaskOutcome::Completed);
            return Tick::Retired(TaskOutcome::Completed);
        };

        match self.state.apply_token(&token, &self.bounds) {
            Ok(()) => {
                self.ctx.commit(self.state);
                SchedulerMetrics::incr(&self.metrics.commands_executed);
                trace!(
                    task_id = %task.id(),
                    command = %token,
                    x = self.state.x,
                    y = self.state.y,
                    "Command executed"
                );
                task.notify_state(self.state, &self.metrics);
                Tick::Executed
            },
            Err(err) => {
                let abandoned = task.abandon_remaining();
                warn!(
                    task_id = %task.id(),
                    command = %token,
                    error = %err,
                    abandoned,
                    "Error executing command, retiring task"
                );
                task.notify_error(err, &self.metrics);
                task.notify_state(self.state, &self.metrics);
                self.retire_head(TaskOutcome::Failed);
                Tick::Retired(TaskOutcome::Failed)
            },
        }
    }

    fn retire_head(&mut self, outcome: TaskOutcome) {
        let Some(task) = self.registry.retire_head() else {
            return;
        };
        let counter = match outcome {
            TaskOutcome::Completed => &self.metrics.tasks_completed,
            TaskOutcome::Failed => &self.metrics.tasks_failed,
            TaskOutcome::Cancelled => &self.metrics.tasks_cancelled,
        };
        SchedulerMetrics::incr(counter);
        info!(
            task_id = %task.id(),
            outcome = %outcome,
            x = self.state.x,
            y = self.state.y,
            "Task finished"
        );
        // task 在此 Drop，端点关闭
    }

    pub(crate) fn has_work(&self) -> bool {
        !self.registry.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> Vec<TaskId> {
        self.registry.order().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &TaskId) -> bool {
        self.registry.contains(id)
    }

    /// 关机：释放所有剩余任务
    pub(crate) fn shutdown(&mut self) {
        let released = self.registry.drain();
        if released > 0 {
            info!(released, "Scheduler shutting down, released pending tasks");
        }
    }
}

/// `now + timeout`，溢出时取一个足够远的时刻
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// 调度线程主循环
///
/// # 参数
/// - `admin_rx`: 管理队列接收端（接纳 + 取消）
/// - `ctx`: 共享状态上下文（发布已提交的 `RobotState`）
/// - `mode`: 调度模式（Running / Paused）
/// - `metrics`: 指标
/// - `is_running`: 运行标志（Robot Drop 时置为 false）
/// - `config`: 调度配置
pub(crate) fn scheduler_loop(
    admin_rx: Receiver<AdminEvent>,
    ctx: Arc<RobotContext>,
    mode: Arc<AtomicSchedulerMode>,
    metrics: Arc<SchedulerMetrics>,
    is_running: Arc<AtomicBool>,
    config: SchedulerConfig,
) {
    let mut scheduler = Scheduler::new(ctx, metrics, config.bounds);
    let latency = config.tick_latency();
    let idle = config.idle_poll();
    let drain_limit = config.admin_queue_capacity;

    'outer: loop {
        // Acquire: 看到 false 时必须能看到 Drop 之前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Scheduler: is_running flag is false, exiting");
            break;
        }

        // ============================================================
        // 1. 管理事件优先（取消先于任何执行）
        // ============================================================
        if !scheduler.drain_admin(&admin_rx, drain_limit) {
            break;
        }

        // ============================================================
        // 2. 空闲：阻塞等待下一个管理事件
        // ============================================================
        if mode.get().is_paused() || !scheduler.has_work() {
            match admin_rx.recv_timeout(idle) {
                Ok(event) => scheduler.handle_admin(event),
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => break,
            }
            continue;
        }

        // ============================================================
        // 3. 推进队首任务一条指令
        // ============================================================
        if scheduler.advance() != Tick::Executed {
            continue;
        }

        // ============================================================
        // 4. 模拟延迟；期间到达的管理事件立即处理
        // ============================================================
        let deadline = deadline_after(latency);
        loop {
            match admin_rx.recv_deadline(deadline) {
                Ok(event) => scheduler.handle_admin(event),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break 'outer,
            }
        }
    }

    scheduler.shutdown();
}
