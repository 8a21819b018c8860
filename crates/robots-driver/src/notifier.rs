//! 通知投递（Best-effort, Non-blocking）
//!
//! 调度线程通过这里向任务端点投递状态/错误更新。投递永远不阻塞指令执行：
//! 没有消费者就绪时更新会被覆盖或丢弃，并记录诊断日志和 `notifications_dropped`。
//! 需要权威终态的消费者应查询外部状态表，而不是只依赖通知流。

use crate::mailbox::{Delivery, MailboxSender};
use crate::metrics::SchedulerMetrics;
use crate::task::TaskId;
use tracing::trace;

/// 通知通道种类（仅用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    State,
    Error,
}

impl Channel {
    fn as_str(self) -> &'static str {
        match self {
            Channel::State => "state",
            Channel::Error => "error",
        }
    }
}

/// 投递一个更新到任务端点
pub fn deliver<T>(
    sender: &MailboxSender<T>,
    value: T,
    channel: Channel,
    task_id: &TaskId,
    metrics: &SchedulerMetrics,
) -> Delivery {
    let delivery = sender.offer(value);
    match delivery {
        Delivery::Delivered => {
            SchedulerMetrics::incr(&metrics.notifications_sent);
        },
        Delivery::Overwrote => {
            // 槽内旧值未被读取，被新值覆盖
            SchedulerMetrics::incr(&metrics.notifications_sent);
            SchedulerMetrics::incr(&metrics.notifications_dropped);
            trace!(
                task_id = %task_id,
                channel = channel.as_str(),
                "Skipped {} update, no listener ready (overwrote unread value)",
                channel.as_str()
            );
        },
        Delivery::Disconnected => {
            SchedulerMetrics::incr(&metrics.notifications_dropped);
            trace!(
                task_id = %task_id,
                channel = channel.as_str(),
                "Skipped {} update, no listener available",
                channel.as_str()
            );
        },
    }
    delivery
}
