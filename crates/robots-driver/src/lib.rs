//! 驱动层模块
//!
//! 本模块提供网格机器人的任务调度功能，包括：
//! - 调度线程管理（单一写者，无锁注册表）
//! - 状态同步（ArcSwap 无锁读取）
//! - 单一管理队列（接纳 + 取消，取消优先于执行）
//! - 单槽通知端点（Best-effort，永不阻塞执行）
//!
//! # 快速开始
//!
//! ```no_run
//! use robots_driver::RobotBuilder;
//! use std::time::Duration;
//!
//! let robot = RobotBuilder::new()
//!     .tick_latency(Duration::from_millis(100))
//!     .build()
//!     .unwrap();
//!
//! let handle = robot.enqueue_task("N N E E").unwrap();
//! for state in handle.states.iter() {
//!     println!("({}, {})", state.x, state.y);
//! }
//! assert_eq!((robot.current_state().x, robot.current_state().y), (2, 2));
//! ```

mod builder;
pub mod command;
mod error;
pub mod mailbox;
pub mod metrics;
pub mod mode;
pub mod notifier;
pub mod pipeline;
mod registry;
mod robot;
pub mod state;
pub mod task;

pub use builder::RobotBuilder;
pub use command::Direction;
pub use error::{DriverError, MoveError};
pub use mailbox::{Delivery, Mailbox};
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use mode::{AtomicSchedulerMode, SchedulerMode};
pub use pipeline::SchedulerConfig;
pub use robot::Robot;
pub use state::{GridBounds, RobotContext, RobotState};
pub use task::{TaskHandle, TaskId, TaskOutcome};
