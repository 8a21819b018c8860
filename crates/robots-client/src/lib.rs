//! 客户端接口模块
//!
//! 本模块在驱动层之上提供用户友好的接口，包括：
//! - 指令序列的预校验（不触碰机器人）
//! - 多机器人仓库（按名称持有 `Robot`）
//! - 任务提交门面与状态看板（后台线程跟踪任务直到端点关闭）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。如果需要直接操作通知端点，
//! 可以使用 [`robots_driver`] 的 `Robot::enqueue_task`。
//!
//! ```rust,no_run
//! use robots_client::{Dispatcher, SubmitOptions, Warehouse};
//! use robots_driver::SchedulerConfig;
//!
//! # fn main() -> Result<(), robots_client::ClientError> {
//! let warehouse = Warehouse::single(SchedulerConfig::default())?;
//! let robot = warehouse.default_robot()?;
//!
//! let dispatcher = Dispatcher::new();
//! let submission = dispatcher.submit(&robot, "N E N E", SubmitOptions { validate: true })?;
//! let id = submission.id().clone();
//! println!("{} -> {}", id, submission.wait());
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
mod error;
pub mod validation;
pub mod warehouse;

pub use dispatcher::{Dispatcher, StatusBoard, SubmitOptions, Submission, TaskStatus};
pub use error::ClientError;
pub use validation::validate_commands;
pub use warehouse::Warehouse;
