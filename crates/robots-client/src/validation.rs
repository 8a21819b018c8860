//! 指令序列预校验
//!
//! 在不触碰机器人的情况下模拟整个序列，提前发现非法 token 和越界步骤。
//! 预校验基于提交时刻的状态；排在前面的任务可能改变实际起点，
//! 所以通过校验不代表执行一定成功。

use crate::error::ClientError;
use robots_driver::command::split_commands;
use robots_driver::{GridBounds, RobotState};

/// 模拟执行 `commands`，返回预测的最终状态
///
/// # Errors
/// - `ClientError::EmptyCommands`: 序列为空（或只有空白）
/// - `ClientError::Validation`: 第一条非法指令或越界步骤
pub fn validate_commands(
    start: RobotState,
    commands: &str,
    bounds: GridBounds,
) -> Result<RobotState, ClientError> {
    let mut state = start;
    let mut steps = 0usize;

    for token in split_commands(commands) {
        state
            .apply_token(token, &bounds)
            .map_err(|source| ClientError::Validation {
                commands: commands.to_string(),
                source,
            })?;
        steps += 1;
    }

    if steps == 0 {
        return Err(ClientError::EmptyCommands);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robots_driver::{Direction, MoveError};

    #[test]
    fn test_predicts_final_state() {
        let end = validate_commands(RobotState::default(), "N N E E", GridBounds::default());
        assert_eq!(end.unwrap(), RobotState::new(2, 2, false));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            validate_commands(RobotState::default(), "   ", GridBounds::default()),
            Err(ClientError::EmptyCommands)
        ));
    }

    #[test]
    fn test_out_of_bounds_reports_first_violation() {
        let err = validate_commands(RobotState::new(9, 0, false), "E E E", GridBounds::default())
            .unwrap_err();
        match err {
            ClientError::Validation { source, .. } => assert_eq!(
                source,
                MoveError::OutOfBounds {
                    direction: Direction::East,
                    x: 10,
                    y: 0
                }
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_token_rejected() {
        let err = validate_commands(RobotState::default(), "N n", GridBounds::default());
        assert!(matches!(
            err,
            Err(ClientError::Validation {
                source: MoveError::InvalidDirective { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_overflow_reported_as_out_of_bounds() {
        let bounds = GridBounds::new(i32::MAX, 0);
        let err = validate_commands(RobotState::new(i32::MAX, 0, false), "E", bounds);
        assert!(matches!(
            err,
            Err(ClientError::Validation {
                source: MoveError::OutOfBounds { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_custom_bounds() {
        let bounds = GridBounds::new(1, 1);
        assert!(validate_commands(RobotState::default(), "N E", bounds).is_ok());
        assert!(validate_commands(RobotState::default(), "N N", bounds).is_err());
    }
}
