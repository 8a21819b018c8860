//! 多机器人仓库
//!
//! 按名称持有 `Robot` 句柄。名称有序（`BTreeMap`），第一个即默认机器人。

use crate::error::ClientError;
use robots_driver::{Robot, RobotBuilder, SchedulerConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 默认机器人名称
pub const DEFAULT_ROBOT_ID: &str = "robot-0";

#[derive(Default)]
pub struct Warehouse {
    robots: BTreeMap<String, Arc<Robot>>,
}

impl Warehouse {
    /// 空仓库
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动单个机器人（名称 `robot-0`）
    pub fn single(config: SchedulerConfig) -> Result<Self, ClientError> {
        let mut warehouse = Self::new();
        warehouse.spawn(DEFAULT_ROBOT_ID, RobotBuilder::new().config(config))?;
        Ok(warehouse)
    }

    /// 用给定 builder 启动机器人并登记；同名机器人会被替换（旧实例 Drop 时停止）
    pub fn spawn(
        &mut self,
        id: impl Into<String>,
        builder: RobotBuilder,
    ) -> Result<Arc<Robot>, ClientError> {
        let id = id.into();
        let robot = Arc::new(builder.build()?);
        info!("Robot {} online", id);
        self.robots.insert(id, robot.clone());
        Ok(robot)
    }

    /// 所有机器人（按名称排序）
    pub fn robots(&self) -> impl Iterator<Item = (&str, &Arc<Robot>)> {
        self.robots.iter().map(|(id, robot)| (id.as_str(), robot))
    }

    pub fn robot(&self, id: &str) -> Result<Arc<Robot>, ClientError> {
        self.robots
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::RobotNotFound(id.to_string()))
    }

    /// 第一个机器人
    pub fn default_robot(&self) -> Result<Arc<Robot>, ClientError> {
        self.robots
            .values()
            .next()
            .cloned()
            .ok_or_else(|| ClientError::RobotNotFound(DEFAULT_ROBOT_ID.to_string()))
    }

    /// 指定名称时查找该机器人，否则使用默认机器人
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<Robot>, ClientError> {
        match id {
            Some(id) => self.robot(id),
            None => self.default_robot(),
        }
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robots_driver::RobotState;
    use std::time::Duration;

    fn fast() -> RobotBuilder {
        RobotBuilder::new().tick_latency(Duration::from_millis(1))
    }

    #[test]
    fn test_single_robot() {
        let warehouse = Warehouse::single(SchedulerConfig::default()).unwrap();
        assert_eq!(warehouse.len(), 1);
        assert!(warehouse.robot(DEFAULT_ROBOT_ID).is_ok());
        assert!(warehouse.default_robot().is_ok());
    }

    #[test]
    fn test_empty_warehouse_has_no_default() {
        let warehouse = Warehouse::new();
        assert!(warehouse.is_empty());
        assert!(matches!(
            warehouse.default_robot(),
            Err(ClientError::RobotNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_by_name() {
        let mut warehouse = Warehouse::new();
        warehouse.spawn("b", fast()).unwrap();
        warehouse
            .spawn("a", fast().initial_state(RobotState::new(3, 3, false)))
            .unwrap();

        let names: Vec<_> = warehouse.robots().map(|(id, _)| id).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            warehouse.resolve(None).unwrap().current_state(),
            RobotState::new(3, 3, false)
        );
        assert!(warehouse.resolve(Some("b")).is_ok());
        assert!(matches!(
            warehouse.resolve(Some("missing")),
            Err(ClientError::RobotNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_invalid_builder_propagates_driver_error() {
        let mut warehouse = Warehouse::new();
        let result = warehouse.spawn("bad", RobotBuilder::new().admin_queue_capacity(0));
        assert!(matches!(result, Err(ClientError::Driver(_))));
        assert!(warehouse.is_empty());
    }
}
