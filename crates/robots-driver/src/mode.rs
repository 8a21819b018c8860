//! 调度模式定义
//!
//! 控制调度线程是否推进任务。

use std::sync::atomic::{AtomicU8, Ordering};

/// 调度模式
///
/// - **Running**: 正常模式，每个 tick 推进队首任务一条指令
/// - **Paused**: 暂停模式，只处理管理队列（接纳、取消），不执行任何指令
///
/// 暂停不会打断正在执行的指令：模式只在 tick 边界生效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SchedulerMode {
    /// 正常模式（默认）
    #[default]
    Running = 0,

    /// 暂停模式
    Paused = 1,
}

impl SchedulerMode {
    /// 从 u8 转换，无效值视为 Running
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Paused,
            _ => Self::Running,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_paused(self) -> bool {
        self == Self::Paused
    }
}

/// 调度模式（原子版本，用于线程间共享）
///
/// ```rust
/// use robots_driver::mode::{AtomicSchedulerMode, SchedulerMode};
///
/// let mode = AtomicSchedulerMode::new(SchedulerMode::Running);
/// mode.set(SchedulerMode::Paused);
/// assert!(mode.get().is_paused());
/// ```
#[derive(Debug)]
pub struct AtomicSchedulerMode {
    inner: AtomicU8,
}

impl AtomicSchedulerMode {
    pub fn new(mode: SchedulerMode) -> Self {
        Self {
            inner: AtomicU8::new(mode.as_u8()),
        }
    }

    /// 获取当前模式（Acquire，与 `set` 配对）
    pub fn get(&self) -> SchedulerMode {
        SchedulerMode::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: SchedulerMode) {
        self.inner.store(mode.as_u8(), Ordering::Release);
    }
}

impl Default for AtomicSchedulerMode {
    fn default() -> Self {
        Self::new(SchedulerMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_conversions() {
        assert_eq!(SchedulerMode::Running.as_u8(), 0);
        assert_eq!(SchedulerMode::Paused.as_u8(), 1);
        assert_eq!(SchedulerMode::from_u8(1), SchedulerMode::Paused);
        assert_eq!(SchedulerMode::from_u8(255), SchedulerMode::Running); // 无效值
        assert!(SchedulerMode::Paused.is_paused());
        assert!(!SchedulerMode::Running.is_paused());
    }

    #[test]
    fn test_atomic_mode() {
        let mode = AtomicSchedulerMode::default();
        assert_eq!(mode.get(), SchedulerMode::Running);
        mode.set(SchedulerMode::Paused);
        assert_eq!(mode.get(), SchedulerMode::Paused);
        mode.set(SchedulerMode::Running);
        assert_eq!(mode.get(), SchedulerMode::Running);
    }
}
