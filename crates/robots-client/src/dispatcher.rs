//! 任务提交门面与状态看板
//!
//! 驱动层只负责执行和通知，任务结束后不保留任何记录。`Dispatcher` 在其上补充：
//! - 提交前拒绝空序列，可选预校验
//! - 每个任务一个后台 watcher 线程，读取两个通知端点并记录日志
//! - `StatusBoard` 记录每个任务的最终状态，供事后查询
//!
//! watcher 从不向调度线程回写任何东西，所以它是否及时读取只影响日志，
//! 不影响执行。
//!
//! 驱动层的取消不发送任何通知，端点关闭时与正常完成无法区分。
//! 看板只对经由 [`Dispatcher::cancel`] 发出的取消可信；直接调用
//! `Robot::cancel_task` 取消的任务会被记录为 `Completed`。

use crate::error::ClientError;
use crate::validation::validate_commands;
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use parking_lot::RwLock;
use robots_driver::command::split_commands;
use robots_driver::{DriverError, Mailbox, MoveError, Robot, RobotState, TaskId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// watcher 轮询错误端点的间隔
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 任务状态
///
/// 开启 `serde` 特性时序列化为 `{"status": "failed", "error": {...}}`。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "status", content = "error", rename_all = "lowercase")
)]
pub enum TaskStatus {
    /// 已入队，尚未观察到任何进度
    Queued,
    /// 至少执行了一条指令
    Running,
    /// 全部指令执行完毕
    Completed,
    /// 某条指令失败，剩余指令被放弃
    Failed(MoveError),
    /// 被取消
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed(err) => write!(f, "failed ({})", err),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 任务状态看板（线程安全）
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: RwLock<HashMap<TaskId, TaskStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskStatus> {
        self.statuses.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.statuses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.read().is_empty()
    }

    /// 所有任务的状态快照
    pub fn snapshot(&self) -> Vec<(TaskId, TaskStatus)> {
        self.statuses
            .read()
            .iter()
            .map(|(id, status)| (id.clone(), status.clone()))
            .collect()
    }

    fn insert(&self, id: TaskId, status: TaskStatus) {
        self.statuses.write().insert(id, status);
    }

    /// Queued -> Running
    fn mark_running(&self, id: &TaskId) {
        if let Some(status) = self.statuses.write().get_mut(id)
            && *status == TaskStatus::Queued
        {
            *status = TaskStatus::Running;
        }
    }

    /// watcher 观察到端点关闭时写入；不覆盖已记录的取消
    fn finish(&self, id: &TaskId, outcome: TaskStatus) {
        let mut statuses = self.statuses.write();
        match statuses.get(id) {
            Some(TaskStatus::Cancelled) => {},
            _ => {
                statuses.insert(id.clone(), outcome);
            },
        }
    }

    /// 取消被调度线程确认：任务在完成前被移除，覆盖 watcher 可能先写入的结果
    fn mark_cancelled(&self, id: &TaskId) {
        self.statuses.write().insert(id.clone(), TaskStatus::Cancelled);
    }
}

/// 提交选项
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// 入队前按机器人当前状态预校验整个序列
    pub validate: bool,
}

/// 一次提交（持有 watcher 线程）
pub struct Submission {
    id: TaskId,
    board: Arc<StatusBoard>,
    watcher: Option<JoinHandle<Option<RobotState>>>,
    last_state: Option<RobotState>,
}

impl Submission {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// 当前状态（可能尚未结束）
    pub fn status(&self) -> TaskStatus {
        self.board.get(&self.id).unwrap_or(TaskStatus::Queued)
    }

    /// 等待端点关闭，返回最终状态
    pub fn wait(mut self) -> TaskStatus {
        self.join();
        self.status()
    }

    /// 等待端点关闭，返回最终状态和最后观察到的机器人状态
    pub fn wait_with_state(mut self) -> (TaskStatus, Option<RobotState>) {
        self.join();
        (self.status(), self.last_state)
    }

    fn join(&mut self) {
        if let Some(handle) = self.watcher.take() {
            match handle.join() {
                Ok(last) => self.last_state = last,
                Err(_) => error!("Watcher thread for task {} panicked", self.id),
            }
        }
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// 任务提交门面
#[derive(Debug, Default, Clone)]
pub struct Dispatcher {
    board: Arc<StatusBoard>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.board.get(id)
    }

    /// 提交指令序列
    ///
    /// # Errors
    /// - `ClientError::EmptyCommands`: 序列为空
    /// - `ClientError::Validation`: 开启预校验且序列不合法
    /// - `ClientError::Driver`: 入队失败（队列满或调度线程已退出）
    pub fn submit(
        &self,
        robot: &Robot,
        commands: &str,
        options: SubmitOptions,
    ) -> Result<Submission, ClientError> {
        if split_commands(commands).next().is_none() {
            return Err(ClientError::EmptyCommands);
        }
        if options.validate {
            let predicted =
                validate_commands(robot.current_state(), commands, robot.config().bounds)?;
            debug!("Commands {:?} validated, predicted end {:?}", commands, predicted);
        }

        let handle = robot.enqueue_task(commands)?;
        let (id, states, errors) = handle.into_parts();
        self.board.insert(id.clone(), TaskStatus::Queued);
        info!("Task {} submitted: {:?}", id, commands);

        let board = self.board.clone();
        let watcher_id = id.clone();
        let watcher = thread::Builder::new()
            .name(format!("task-watch-{}", short_id(&id)))
            .spawn(move || watch(watcher_id, states, errors, &board))
            .map_err(DriverError::Spawn)?;

        Ok(Submission {
            id,
            board: self.board.clone(),
            watcher: Some(watcher),
            last_state: None,
        })
    }

    /// 取消任务，成功时记录为 `Cancelled`
    ///
    /// 要让看板区分取消和完成，取消必须经过这里而不是 `Robot::cancel_task`。
    pub fn cancel(&self, robot: &Robot, id: &TaskId) -> Result<(), ClientError> {
        match robot.cancel_task(id) {
            Ok(()) => {
                self.board.mark_cancelled(id);
                info!("Task {} cancelled", id);
                Ok(())
            },
            Err(e) => {
                warn!("Cancel of task {} failed: {}", id, e);
                Err(e.into())
            },
        }
    }
}

fn short_id(id: &TaskId) -> &str {
    let s = id.as_str();
    s.get(..8).unwrap_or(s)
}

/// 读取两个端点直到状态端点关闭，记录最终状态
///
/// 没有收到错误就记为 `Completed`；取消由 [`Dispatcher::cancel`] 另行标记。
fn watch(
    id: TaskId,
    states: Mailbox<RobotState>,
    errors: Mailbox<MoveError>,
    board: &StatusBoard,
) -> Option<RobotState> {
    let mut last_state = None;
    let mut failure = None;

    loop {
        match states.recv_timeout(WATCH_POLL_INTERVAL) {
            Ok(state) => {
                board.mark_running(&id);
                info!("Task {} at ({}, {})", id, state.x, state.y);
                last_state = Some(state);
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => break,
        }
        match errors.try_recv() {
            Ok(err) => {
                error!("Task {} failed: {}", id, err);
                failure = Some(err);
            },
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {},
        }
    }

    // 两个端点同时关闭，错误端点可能还留有最后一个值
    if let Ok(err) = errors.try_recv() {
        error!("Task {} failed: {}", id, err);
        failure = Some(err);
    }

    let outcome = match failure {
        Some(err) => TaskStatus::Failed(err),
        None => TaskStatus::Completed,
    };
    board.finish(&id, outcome);
    debug!("Task {} endpoints closed", id);
    last_state
}
