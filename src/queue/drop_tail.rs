//! DropTail（尾丢弃）队列
//!
//! 当队列容量不足时，直接丢弃新到达的 packet。容量为 `0p` / `0B` 时所有入队都会失败。

use std::collections::VecDeque;

use crate::net::Packet;

use super::{PacketQueue, QueueSize};

#[derive(Debug)]
pub struct DropTailQueue {
    limit: QueueSize,
    cur_bytes: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(limit: QueueSize) -> Self {
        Self {
            limit,
            cur_bytes: 0,
            q: VecDeque::new(),
        }
    }

    fn admits(&self, pkt: &Packet) -> bool {
        match self.limit {
            QueueSize::Packets(max) => (self.q.len() as u64) < max,
            QueueSize::Bytes(max) => {
                max > 0
                    && self.cur_bytes.saturating_add(pkt.size_bytes as u64) <= max
            }
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        if !self.admits(&pkt) {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(pkt.size_bytes as u64);
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn capacity(&self) -> QueueSize {
        self.limit
    }
}
