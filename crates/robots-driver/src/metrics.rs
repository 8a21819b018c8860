//! 调度器性能指标
//!
//! 原子计数器，调度线程写入（Relaxed），任意线程通过 `snapshot()` 读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 调度器指标（原子计数器）
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// 已接纳的任务数
    pub tasks_admitted: AtomicU64,
    /// 正常完成的任务数
    pub tasks_completed: AtomicU64,
    /// 因指令错误退役的任务数
    pub tasks_failed: AtomicU64,
    /// 被取消的任务数
    pub tasks_cancelled: AtomicU64,
    /// 成功执行的指令数
    pub commands_executed: AtomicU64,
    /// 取消请求命中未知任务的次数（正常竞争结果，不算故障）
    pub cancel_not_found: AtomicU64,
    /// 写入空槽的通知数
    pub notifications_sent: AtomicU64,
    /// 被覆盖或因无接收端而丢弃的通知数
    pub notifications_dropped: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取所有计数器的快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_admitted: self.tasks_admitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            cancel_not_found: self.cancel_not_found.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（普通值，可随意复制）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tasks_admitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_cancelled: u64,
    pub commands_executed: u64,
    pub cancel_not_found: u64,
    pub notifications_sent: u64,
    pub notifications_dropped: u64,
}

impl MetricsSnapshot {
    /// 已到达终态的任务数
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_completed + self.tasks_failed + self.tasks_cancelled
    }

    /// 仍在注册表中的任务数（按计数器推算）
    pub fn tasks_live(&self) -> u64 {
        self.tasks_admitted.saturating_sub(self.tasks_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = SchedulerMetrics::new();
        SchedulerMetrics::incr(&metrics.tasks_admitted);
        SchedulerMetrics::incr(&metrics.tasks_admitted);
        SchedulerMetrics::incr(&metrics.tasks_completed);
        SchedulerMetrics::incr(&metrics.notifications_dropped);

        let snap = metrics.snapshot();
        assert_eq!(snap.tasks_admitted, 2);
        assert_eq!(snap.tasks_completed, 1);
        assert_eq!(snap.notifications_dropped, 1);
        assert_eq!(snap.tasks_finished(), 1);
        assert_eq!(snap.tasks_live(), 1);
    }
}
