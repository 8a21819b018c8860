//! 单槽邮箱（Mailbox）
//!
//! 任务的状态/错误通知端点。语义与实时命令插槽一致：**Last Write Wins**。
//!
//! - 发送端 `offer()` 从不等待消费者：槽内有未读值时直接覆盖（旧值计为丢弃），
//!   接收端已释放时直接丢弃
//! - 任意时刻每个端点最多只有一个未读值
//! - 发送端 Drop 即关闭端点，接收端读完剩余值后迭代结束
//!
//! # 使用示例
//!
//! ```rust
//! use robots_driver::mailbox::{self, Delivery};
//!
//! let (tx, rx) = mailbox::channel::<u32>();
//! assert_eq!(tx.offer(1), Delivery::Delivered);
//! assert_eq!(tx.offer(2), Delivery::Overwrote); // 1 被覆盖
//! drop(tx);
//!
//! let received: Vec<_> = rx.iter().collect();
//! assert_eq!(received, vec![2]);
//! ```

use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// 投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 写入空槽
    Delivered,
    /// 覆盖了一个未读值（旧值丢失）
    Overwrote,
    /// 接收端已释放，值被丢弃
    Disconnected,
}

impl Delivery {
    /// 本次投递是否导致某个更新丢失
    pub fn lost_update(self) -> bool {
        !matches!(self, Delivery::Delivered)
    }
}

struct Slot<T> {
    value: Option<T>,
    closed: bool,
    receiver_alive: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// 创建一对邮箱端点
pub fn channel<T>() -> (MailboxSender<T>, Mailbox<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            value: None,
            closed: false,
            receiver_alive: true,
        }),
        ready: Condvar::new(),
    });
    (
        MailboxSender {
            shared: shared.clone(),
        },
        Mailbox { shared },
    )
}

/// 发送端（只由调度线程持有，不可 Clone）
pub struct MailboxSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> MailboxSender<T> {
    /// 非阻塞投递
    ///
    /// 临界区只包含一次赋值，不会等待消费者。
    pub fn offer(&self, value: T) -> Delivery {
        let mut slot = self.shared.slot.lock();
        if !slot.receiver_alive {
            return Delivery::Disconnected;
        }
        let previous = slot.value.replace(value);
        drop(slot);
        self.shared.ready.notify_one();

        if previous.is_some() {
            Delivery::Overwrote
        } else {
            Delivery::Delivered
        }
    }

    /// 接收端是否仍然存活
    pub fn has_receiver(&self) -> bool {
        self.shared.slot.lock().receiver_alive
    }
}

impl<T> MailboxSender<T> {
    /// 关闭端点（幂等）；接收端读完剩余值后结束
    pub fn close(&self) {
        self.shared.slot.lock().closed = true;
        self.shared.ready.notify_all();
    }
}

impl<T> Drop for MailboxSender<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// 接收端（只读通知流）
pub struct Mailbox<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Mailbox<T> {
    /// 阻塞等待下一个值；端点关闭且槽为空时返回 `None`
    pub fn recv(&self) -> Option<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.take() {
                return Some(value);
            }
            if slot.closed {
                return None;
            }
            self.shared.ready.wait(&mut slot);
        }
    }

    /// 非阻塞读取
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut slot = self.shared.slot.lock();
        match slot.value.take() {
            Some(value) => Ok(value),
            None if slot.closed => Err(TryRecvError::Disconnected),
            None => Err(TryRecvError::Empty),
        }
    }

    /// 带超时的阻塞读取
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = crate::pipeline::deadline_after(timeout);
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.take() {
                return Ok(value);
            }
            if slot.closed {
                return Err(RecvTimeoutError::Disconnected);
            }
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                return match slot.value.take() {
                    Some(value) => Ok(value),
                    None if slot.closed => Err(RecvTimeoutError::Disconnected),
                    None => Err(RecvTimeoutError::Timeout),
                };
            }
        }
    }

    /// 是否有未读值
    pub fn has_pending(&self) -> bool {
        self.shared.slot.lock().value.is_some()
    }

    /// 发送端是否已关闭（可能仍有最后一个未读值）
    pub fn is_closed(&self) -> bool {
        self.shared.slot.lock().closed
    }

    /// 阻塞迭代，直到端点关闭且无剩余值
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}

/// 消费型迭代器（见 [`Mailbox::iter`]）
pub struct IntoIter<T>(Mailbox<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.recv()
    }
}

impl<T> IntoIterator for Mailbox<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self)
    }
}

impl<T> Drop for Mailbox<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.receiver_alive = false;
        slot.value = None;
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("Mailbox")
            .field("pending", &slot.value.is_some())
            .field("closed", &slot.closed)
            .finish()
    }
}
