//! Builder 模式实现
//!
//! 提供链式构造 `Robot` 实例的便捷方式。

use crate::error::DriverError;
use crate::mode::SchedulerMode;
use crate::pipeline::SchedulerConfig;
use crate::robot::Robot;
use crate::state::{GridBounds, RobotState};
use std::time::Duration;

/// Robot Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use robots_driver::RobotBuilder;
/// use std::time::Duration;
///
/// // 使用默认配置
/// let robot = RobotBuilder::new().build().unwrap();
///
/// // 快速模拟 + 自定义网格
/// let robot = RobotBuilder::new()
///     .tick_latency(Duration::from_millis(10))
///     .bounds(20, 20)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RobotBuilder {
    /// 调度配置
    config: SchedulerConfig,
    /// 初始状态（默认原点）
    initial_state: RobotState,
    /// 启动时的调度模式
    mode: SchedulerMode,
}

/// `Duration` 转毫秒，超出 `u64` 时饱和
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换调度配置
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// 每条指令的模拟延迟
    pub fn tick_latency(mut self, latency: Duration) -> Self {
        self.config.tick_latency_ms = millis(latency);
        self
    }

    /// 空闲时等待管理队列的间隔
    pub fn idle_poll(mut self, interval: Duration) -> Self {
        self.config.idle_poll_ms = millis(interval);
        self
    }

    /// `cancel_task` 的等待上限
    pub fn cancel_timeout(mut self, timeout: Duration) -> Self {
        self.config.cancel_timeout_ms = millis(timeout);
        self
    }

    /// 管理队列容量
    pub fn admin_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.admin_queue_capacity = capacity;
        self
    }

    /// 网格上界（含），下界固定为 0
    pub fn bounds(mut self, max_x: i32, max_y: i32) -> Self {
        self.config.bounds = GridBounds::new(max_x, max_y);
        self
    }

    /// 初始状态
    pub fn initial_state(mut self, state: RobotState) -> Self {
        self.initial_state = state;
        self
    }

    /// 以暂停模式启动（只接纳/取消，不执行），用 `Robot::set_mode` 恢复
    pub fn start_paused(mut self) -> Self {
        self.mode = SchedulerMode::Paused;
        self
    }

    /// 构建并启动 Robot
    ///
    /// # Errors
    /// - `DriverError::InvalidConfig`: 配置无效或初始位置在网格外
    /// - `DriverError::Spawn`: 调度线程启动失败
    pub fn build(self) -> Result<Robot, DriverError> {
        self.config.validate()?;
        let bounds = self.config.bounds;
        if !bounds.contains(self.initial_state.x, self.initial_state.y) {
            return Err(DriverError::InvalidConfig(format!(
                "initial position ({}, {}) outside grid {:?}",
                self.initial_state.x, self.initial_state.y, bounds
            )));
        }
        Robot::spawn(self.config, self.initial_state, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = RobotBuilder::new();
        assert_eq!(builder.config, SchedulerConfig::default());
        assert_eq!(builder.initial_state, RobotState::default());
        assert_eq!(builder.mode, SchedulerMode::Running);
    }

    #[test]
    fn test_builder_chain() {
        let builder = RobotBuilder::new()
            .tick_latency(Duration::from_millis(7))
            .idle_poll(Duration::from_millis(3))
            .cancel_timeout(Duration::from_millis(250))
            .admin_queue_capacity(4)
            .bounds(5, 6)
            .initial_state(RobotState::new(1, 1, true))
            .start_paused();

        assert_eq!(builder.config.tick_latency_ms, 7);
        assert_eq!(builder.config.idle_poll_ms, 3);
        assert_eq!(builder.config.cancel_timeout_ms, 250);
        assert_eq!(builder.config.admin_queue_capacity, 4);
        assert_eq!(builder.config.bounds, GridBounds::new(5, 6));
        assert_eq!(builder.mode, SchedulerMode::Paused);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let builder = RobotBuilder::new()
            .tick_latency(Duration::MAX)
            .cancel_timeout(Duration::from_millis(1500));
        assert_eq!(builder.config.tick_latency_ms, u64::MAX);
        assert_eq!(builder.config.cancel_timeout_ms, 1500);
    }

    #[test]
    fn test_build_rejects_initial_state_outside_grid() {
        let result = RobotBuilder::new()
            .bounds(3, 3)
            .initial_state(RobotState::new(4, 0, false))
            .build();
        assert!(matches!(result, Err(DriverError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_paused_robot() {
        let robot = RobotBuilder::new()
            .tick_latency(Duration::from_millis(1))
            .initial_state(RobotState::new(2, 3, false))
            .start_paused()
            .build()
            .unwrap();
        assert!(robot.mode().is_paused());
        assert_eq!(robot.current_state(), RobotState::new(2, 3, false));
    }
}
