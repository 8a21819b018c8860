//! 驱动层错误类型定义

use crate::command::Direction;
use crate::task::TaskId;
use thiserror::Error;

/// 单条指令执行失败
///
/// 通过任务的错误端点（error endpoint）投递给提交方，需要 `Clone`。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveError {
    /// 无法识别的指令（不是 N/S/E/W 之一）
    #[error("invalid command: {token}")]
    InvalidDirective { token: String },

    /// 移动会越出网格边界
    #[error("invalid command: {direction}, out of bounds at ({x}, {y})")]
    OutOfBounds { direction: Direction, x: i32, y: i32 },
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 任务不存在（已完成、已取消或从未提交）
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// 操作超时（调度线程未在时限内接受取消请求）
    #[error("Operation timeout")]
    Timeout,

    /// 管理队列已关闭（调度线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 管理队列已满
    #[error("Admin queue full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// 配置无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 调度线程启动失败
    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}
