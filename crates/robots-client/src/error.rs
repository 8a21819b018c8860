//! 客户端错误类型定义

use robots_driver::{DriverError, MoveError};
use thiserror::Error;

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    /// 提交了空指令序列
    #[error("empty command sequence")]
    EmptyCommands,

    /// 预校验失败（第一条非法指令或越界步骤）
    #[error("command sequence {commands:?} rejected: {source}")]
    Validation {
        commands: String,
        #[source]
        source: MoveError,
    },

    /// 仓库中没有该机器人
    #[error("robot not found: {0}")]
    RobotNotFound(String),

    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_keeps_source() {
        use std::error::Error as _;

        let err = ClientError::Validation {
            commands: "N X".to_string(),
            source: MoveError::InvalidDirective {
                token: "X".to_string(),
            },
        };
        assert!(err.to_string().contains("invalid command: X"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_driver_error_converts() {
        let err: ClientError = DriverError::Timeout.into();
        assert!(matches!(err, ClientError::Driver(DriverError::Timeout)));
    }
}
