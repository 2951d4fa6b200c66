//! 四节点链：sender ─ router1 ═ router2 ─ receiver
//!
//! 中间段为瓶颈；丢包率大于 0 时在 router2 的接收侧按包丢弃，模拟无线误码。
//! 地址 10.10.1.0/24、10.10.2.0/24、10.10.3.0/24。

use std::net::Ipv4Addr;

use super::builder::{
    DEFAULT_DEVICE_QUEUE, LinkClass, LinkProfile, NodeIndex, Side, Topology, TopologyBuilder,
    TopologyError,
};
use crate::net::{AddressAllocator, AddressError};
use crate::queue::QueueSize;

#[derive(Debug, Clone)]
pub struct ChainOpts {
    pub access: LinkProfile,
    pub bottleneck: LinkProfile,
    pub bottleneck_queue: QueueSize,
    /// 每包丢弃概率
    pub loss: f64,
}

impl ChainOpts {
    pub fn s3(queue: QueueSize, loss: f64) -> Self {
        Self {
            access: LinkProfile::mbps(100, 5),
            bottleneck: LinkProfile::mbps(40, 10),
            bottleneck_queue: queue,
            loss,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub topology: Topology,
    pub sender: NodeIndex,
    pub routers: (NodeIndex, NodeIndex),
    pub receiver: NodeIndex,
    /// 瓶颈链路段下标
    pub bottleneck: usize,
}

impl Chain {
    pub fn receiver_addr(&self) -> Option<Ipv4Addr> {
        self.topology.primary_addr(self.receiver)
    }
}

pub fn build_chain(name: &str, opts: &ChainOpts) -> Result<Chain, TopologyError> {
    let mut b = TopologyBuilder::new(name);
    let sender = b.host("sender");
    let r1 = b.router("router1");
    let r2 = b.router("router2");
    let receiver = b.host("receiver");

    // 每段各自设定基址
    let block = |third: u8| -> Result<AddressAllocator, AddressError> {
        AddressAllocator::new(Ipv4Addr::new(10, 10, third, 0), 24)
    };
    let q = DEFAULT_DEVICE_QUEUE;
    b.segment_from((sender, r1), LinkClass::Access, opts.access, q, &mut block(1)?)?;
    let bottleneck = b.segment_from(
        (r1, r2),
        LinkClass::Bottleneck,
        opts.bottleneck,
        opts.bottleneck_queue,
        &mut block(2)?,
    )?;
    b.segment_from((r2, receiver), LinkClass::Access, opts.access, q, &mut block(3)?)?;
    b.rx_loss(bottleneck, Side::B, opts.loss);

    Ok(Chain {
        topology: b.build(),
        sender,
        routers: (r1, r2),
        receiver,
        bottleneck,
    })
}
