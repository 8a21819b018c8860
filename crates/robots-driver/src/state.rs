//! 机器人状态与网格运动学
//!
//! `RobotState` 是一个纯值类型，只由调度线程修改；外部读者通过
//! `ArcSwap` 读取已提交的快照（见 [`RobotContext`]）。

use crate::command::Direction;
use crate::error::MoveError;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// 网格边界（闭区间，下界固定为 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridBounds {
    /// X 轴上界（含）
    pub max_x: i32,
    /// Y 轴上界（含）
    pub max_y: i32,
}

impl GridBounds {
    /// 默认 0..=10 网格的上界
    pub const DEFAULT_MAX: i32 = 10;

    pub fn new(max_x: i32, max_y: i32) -> Self {
        Self { max_x, max_y }
    }

    /// 坐标是否在网格内
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..=self.max_x).contains(&x) && (0..=self.max_y).contains(&y)
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX, Self::DEFAULT_MAX)
    }
}

/// 机器人状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    #[cfg_attr(feature = "serde", serde(rename = "X"))]
    pub x: i32,
    #[cfg_attr(feature = "serde", serde(rename = "Y"))]
    pub y: i32,
    #[cfg_attr(feature = "serde", serde(rename = "HasCrate"))]
    pub has_crate: bool,
}

impl RobotState {
    pub fn new(x: i32, y: i32, has_crate: bool) -> Self {
        Self { x, y, has_crate }
    }

    /// 应用一条方向指令
    ///
    /// 越界时返回 `MoveError::OutOfBounds`，状态保持不变。
    pub fn apply(&mut self, direction: Direction, bounds: &GridBounds) -> Result<(), MoveError> {
        let (dx, dy) = direction.delta();
        let out_of_bounds = MoveError::OutOfBounds {
            direction,
            x: self.x,
            y: self.y,
        };
        // 溢出等同于越界
        let (Some(nx), Some(ny)) = (self.x.checked_add(dx), self.y.checked_add(dy)) else {
            return Err(out_of_bounds);
        };
        if !bounds.contains(nx, ny) {
            return Err(out_of_bounds);
        }
        self.x = nx;
        self.y = ny;
        Ok(())
    }

    /// 解析并应用一个指令 token（`move(direction)`）
    pub fn apply_token(&mut self, token: &str, bounds: &GridBounds) -> Result<(), MoveError> {
        let direction = Direction::parse(token)?;
        self.apply(direction, bounds)
    }
}

/// 共享状态上下文
///
/// 调度线程每次成功执行指令后 `store` 新快照；任意线程可无锁 `load`。
#[derive(Debug)]
pub struct RobotContext {
    /// 已提交的机器人状态
    pub state: ArcSwap<RobotState>,
}

impl RobotContext {
    pub fn new(initial: RobotState) -> Self {
        Self {
            state: ArcSwap::from_pointee(initial),
        }
    }

    /// 读取最新已提交快照（Wait-Free）
    #[inline]
    pub fn snapshot(&self) -> RobotState {
        **self.state.load()
    }

    /// 发布新快照（仅调度线程调用）
    #[inline]
    pub(crate) fn commit(&self, state: RobotState) {
        self.state.store(Arc::new(state));
    }
}

impl Default for RobotContext {
    fn default() -> Self {
        Self::new(RobotState::default())
    }
}
