//! 任务模型
//!
//! 一个任务 = 一串待执行的方向指令 + 两个私有通知端点（状态 / 错误）。
//! 任务只能由调度线程持有；任务被 Drop 时两个端点随之关闭，
//! 因此无论哪条退出路径（完成、失败、取消、关机），端点都恰好释放一次。

use crate::command::split_commands;
use crate::error::MoveError;
use crate::mailbox::{self, Mailbox, MailboxSender};
use crate::metrics::SchedulerMetrics;
use crate::notifier::{self, Channel};
use crate::state::RobotState;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 任务 ID（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// 生成新的唯一 ID（UUID v4）
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = Infallible;

    /// 任意字符串都可以作为 ID 查询；不存在的 ID 由 `cancel_task` 报告 NotFound
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 任务终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 指令全部执行完毕
    Completed,
    /// 某条指令失败，剩余指令被丢弃
    Failed,
    /// 被取消（不发送最终状态）
    Cancelled,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 调度线程内部的任务
pub(crate) struct Task {
    id: TaskId,
    commands: VecDeque<String>,
    state_tx: MailboxSender<RobotState>,
    error_tx: MailboxSender<MoveError>,
}

impl Task {
    /// 创建任务及其对外句柄
    pub(crate) fn new(id: TaskId, commands: &str) -> (Self, TaskHandle) {
        let (state_tx, states) = mailbox::channel();
        let (error_tx, errors) = mailbox::channel();
        let task = Self {
            id: id.clone(),
            commands: split_commands(commands).map(str::to_string).collect(),
            state_tx,
            error_tx,
        };
        (task, TaskHandle { id, states, errors })
    }

    pub(crate) fn id(&self) -> &TaskId {
        &self.id
    }

    /// 剩余指令数
    pub(crate) fn remaining(&self) -> usize {
        self.commands.len()
    }

    /// 从队首取出下一条指令
    pub(crate) fn next_command(&mut self) -> Option<String> {
        self.commands.pop_front()
    }

    /// 丢弃剩余指令，返回丢弃数量
    pub(crate) fn abandon_remaining(&mut self) -> usize {
        let n = self.commands.len();
        self.commands.clear();
        n
    }

    pub(crate) fn notify_state(&self, state: RobotState, metrics: &SchedulerMetrics) {
        notifier::deliver(&self.state_tx, state, Channel::State, &self.id, metrics);
    }

    pub(crate) fn notify_error(&self, error: MoveError, metrics: &SchedulerMetrics) {
        notifier::deliver(&self.error_tx, error, Channel::Error, &self.id, metrics);
    }
}

/// 任务离开注册表的每条路径（完成、失败、取消、关机）都经过这里。
///
/// 错误端点先关，状态端点后关：状态流结束时两个端点都已关闭。
impl Drop for Task {
    fn drop(&mut self) {
        self.error_tx.close();
        self.state_tx.close();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("remaining", &self.commands)
            .finish()
    }
}

/// 提交方持有的任务句柄
///
/// `states` / `errors` 是只读通知流；调度线程释放任务时关闭。
#[derive(Debug)]
pub struct TaskHandle {
    pub id: TaskId,
    pub states: Mailbox<RobotState>,
    pub errors: Mailbox<MoveError>,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// 两个端点是否都已关闭
    pub fn is_finished(&self) -> bool {
        self.states.is_closed() && self.errors.is_closed()
    }

    pub fn into_parts(self) -> (TaskId, Mailbox<RobotState>, Mailbox<MoveError>) {
        (self.id, self.states, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_task_id_parse() {
        let id: TaskId = "abc".parse().unwrap();
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_task_consumes_commands_in_order() {
        let (mut task, _handle) = Task::new(TaskId::generate(), "N E S");
        assert_eq!(task.remaining(), 3);
        assert_eq!(task.next_command().as_deref(), Some("N"));
        assert_eq!(task.next_command().as_deref(), Some("E"));
        assert_eq!(task.abandon_remaining(), 1);
        assert_eq!(task.next_command(), None);
    }

    #[test]
    fn test_drop_closes_both_endpoints() {
        let (task, handle) = Task::new(TaskId::generate(), "N");
        assert!(!handle.is_finished());
        drop(task);
        assert!(handle.is_finished());
        assert_eq!(handle.states.recv(), None);
        assert_eq!(handle.errors.recv(), None);
    }

    #[test]
    fn test_errors_closed_when_states_end() {
        // 消费者在另一个线程读完状态流后，错误端点必须已关闭
        for _ in 0..200 {
            let (task, handle) = Task::new(TaskId::generate(), "N");
            let reader = std::thread::spawn(move || {
                let _: Vec<_> = handle.states.iter().collect();
                handle.errors.is_closed()
            });
            drop(task);
            assert!(reader.join().unwrap(), "error endpoint still open");
        }
    }

    #[test]
    fn test_notifications_reach_handle() {
        let metrics = SchedulerMetrics::new();
        let (task, handle) = Task::new(TaskId::generate(), "W");
        task.notify_state(RobotState::new(1, 0, false), &metrics);
        task.notify_error(
            MoveError::InvalidDirective {
                token: "Q".to_string(),
            },
            &metrics,
        );
        drop(task);

        assert_eq!(handle.states.recv(), Some(RobotState::new(1, 0, false)));
        assert!(matches!(
            handle.errors.recv(),
            Some(MoveError::InvalidDirective { .. })
        ));
    }
}
