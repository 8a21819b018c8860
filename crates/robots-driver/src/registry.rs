//! 任务注册表
//!
//! `HashMap<TaskId, Task>` + FIFO 执行顺序。只由调度线程修改（单一写者，无锁）。
//!
//! 不变量：FIFO 中的每个 ID 在 map 中都有对应任务，反之亦然；
//! FIFO 队首就是当前被推进的任务。

use crate::task::{Task, TaskId};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub(crate) struct Registry {
    tasks: HashMap<TaskId, Task>,
    order: VecDeque<TaskId>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 追加任务到队尾
    ///
    /// ID 重复时返回被拒绝的任务（UUID 冲突，实际不会发生）。
    pub(crate) fn admit(&mut self, task: Task) -> Result<(), Task> {
        if self.tasks.contains_key(task.id()) {
            return Err(task);
        }
        self.order.push_back(task.id().clone());
        self.tasks.insert(task.id().clone(), task);
        Ok(())
    }

    /// 按 ID 移除任务（可能在队列任意位置）
    pub(crate) fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let task = self.tasks.remove(id)?;
        if let Some(pos) = self.order.iter().position(|queued| queued == id) {
            self.order.remove(pos);
        }
        Some(task)
    }

    /// 队首任务（可变借用）
    pub(crate) fn head_mut(&mut self) -> Option<&mut Task> {
        let id = self.order.front()?;
        self.tasks.get_mut(id)
    }

    /// 移除队首任务
    pub(crate) fn retire_head(&mut self) -> Option<Task> {
        let id = self.order.pop_front()?;
        self.tasks.remove(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 当前执行顺序
    #[cfg(test)]
    pub(crate) fn order(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    /// 清空注册表（关机时），返回被释放的任务数
    pub(crate) fn drain(&mut self) -> usize {
        let n = self.order.len();
        self.order.clear();
        // Drop 每个任务即关闭其端点
        self.tasks.clear();
        n
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        self.order.len() == self.tasks.len()
            && self.order.iter().all(|id| self.tasks.contains_key(id))
    }
}
