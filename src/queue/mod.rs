//! 队列策略（Queue disciplines）
//!
//! 瓶颈链路使用有界 DropTail 队列；容量可以按包数或字节数给出（例如 `150p`、`1MB`）。
//! 容量字符串原样透传给这里解析，拓扑层不做额外校验。

use std::fmt;
use std::str::FromStr;

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

pub const DEFAULT_PKT_BYTES: u64 = 1500;

/// 队列容量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSize {
    Packets(u64),
    Bytes(u64),
}

impl QueueSize {
    /// 一个实际上不会溢出的容量（非瓶颈链路使用）。
    pub const UNBOUNDED: QueueSize = QueueSize::Bytes(u64::MAX);
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueSizeError {
    #[error("queue size is empty")]
    Empty,
    #[error("invalid queue size `{0}`: expected <number>[k|K|M|G|Ki|Mi|Gi](p|B), e.g. 100p or 1MB")]
    Invalid(String),
}

impl FromStr for QueueSize {
    type Err = QueueSizeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(QueueSizeError::Empty);
        }
        let invalid = || QueueSizeError::Invalid(raw.to_string());

        let digits_end = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }
        let value: u64 = s[..digits_end].parse().map_err(|_| invalid())?;
        let rest = &s[digits_end..];
        let (unit_at, _) = rest.char_indices().last().ok_or_else(invalid)?;
        let (prefix, unit) = rest.split_at(unit_at);

        let mult: u64 = match prefix {
            "" => 1,
            "k" | "K" => 1_000,
            "M" => 1_000_000,
            "G" => 1_000_000_000,
            "Ki" => 1 << 10,
            "Mi" => 1 << 20,
            "Gi" => 1 << 30,
            _ => return Err(invalid()),
        };
        let n = value.checked_mul(mult).ok_or_else(invalid)?;
        match unit {
            "p" => Ok(QueueSize::Packets(n)),
            "B" => Ok(QueueSize::Bytes(n)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for QueueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueSize::Packets(n) => write!(f, "{n}p"),
            QueueSize::Bytes(n) => write!(f, "{n}B"),
        }
    }
}

/// Packet 队列抽象
pub trait PacketQueue: fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn capacity(&self) -> QueueSize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
