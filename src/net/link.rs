//! 链路类型
//!
//! 单向点对点链路：出口队列 + 串行化时延 + 传播时延，
//! 可选地在接收端挂一个按包计的误码模型。

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::id::NodeId;
use crate::queue::{DropTailQueue, PacketQueue, QueueSize};
use crate::sim::SimTime;

/// 按包独立丢弃的误码模型。
#[derive(Debug)]
pub struct RateErrorModel {
    rate: f64,
    rng: ChaCha8Rng,
}

impl RateErrorModel {
    pub fn new(rate: f64, rng: ChaCha8Rng) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// 本次接收是否损坏
    pub fn corrupt(&mut self) -> bool {
        self.rate > 0.0 && self.rng.gen_bool(self.rate)
    }
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 是否有包正在串行化
    pub(crate) busy: bool,
    /// 串行化时等待的包；正在发送的包不占队列
    pub queue: Box<dyn PacketQueue>,
    /// 接收端误码
    pub rx_error: Option<RateErrorModel>,
    pub tx_pkts: u64,
    pub tx_bytes: u64,
}

impl Link {
    /// 创建新链路，默认出口队列不设上限
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy: false,
            queue: Box::new(DropTailQueue::new(QueueSize::UNBOUNDED)),
            rx_error: None,
            tx_pkts: 0,
            tx_bytes: 0,
        }
    }

    pub fn with_queue(mut self, size: QueueSize) -> Self {
        self.queue = Box::new(DropTailQueue::new(size));
        self
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
