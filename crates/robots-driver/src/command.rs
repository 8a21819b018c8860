//! 指令类型定义模块
//!
//! 提供移动方向（Direction）及指令串拆分。

use crate::error::MoveError;
use std::fmt;

/// 移动方向（单字母指令）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// N: Y + 1
    North,
    /// S: Y - 1
    South,
    /// E: X + 1
    East,
    /// W: X - 1
    West,
}

impl Direction {
    /// 全部方向（测试和随机生成使用）
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// 解析单个指令 token
    ///
    /// 区分大小写，只接受 `N`/`S`/`E`/`W`。
    pub fn parse(token: &str) -> Result<Self, MoveError> {
        match token {
            "N" => Ok(Self::North),
            "S" => Ok(Self::South),
            "E" => Ok(Self::East),
            "W" => Ok(Self::West),
            other => Err(MoveError::InvalidDirective {
                token: other.to_string(),
            }),
        }
    }

    /// 单字母表示
    pub fn as_char(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
        }
    }

    /// 坐标增量 (dx, dy)
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 将指令串按空白拆分为 token
///
/// token 在这里不做校验：无效 token 会在执行到它时由调度线程
/// 通过错误端点报告（`MoveError::InvalidDirective`）。
pub fn split_commands(commands: &str) -> impl Iterator<Item = &str> {
    commands.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directions() {
        assert_eq!(Direction::parse("N").unwrap(), Direction::North);
        assert_eq!(Direction::parse("S").unwrap(), Direction::South);
        assert_eq!(Direction::parse("E").unwrap(), Direction::East);
        assert_eq!(Direction::parse("W").unwrap(), Direction::West);
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        for token in ["n", "X", "NE", ""] {
            match Direction::parse(token) {
                Err(MoveError::InvalidDirective { token: t }) => assert_eq!(t, token),
                other => panic!("Expected InvalidDirective for {:?}, got {:?}", token, other),
            }
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::parse(&dir.to_string()).unwrap(), dir);
        }
    }

    #[test]
    fn test_split_commands() {
        let tokens: Vec<_> = split_commands("N  N\tE E\n").collect();
        assert_eq!(tokens, vec!["N", "N", "E", "E"]);
        assert_eq!(split_commands("   ").count(), 0);
    }
}
