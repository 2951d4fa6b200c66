//! 非对称 RTT 的 dumbbell
//!
//! 两个左侧主机经不同时延的接入链路（1ms / 60ms）汇聚到同一个瓶颈，
//! 用来观察 RTT 不公平性。地址从 10.1.1.0/24 起按 left0、left1、right0、right1、瓶颈 依次分块。

use std::net::Ipv4Addr;

use super::builder::{
    DEFAULT_DEVICE_QUEUE, LinkClass, LinkProfile, NodeIndex, Topology, TopologyBuilder,
    TopologyError,
};
use crate::net::AddressAllocator;
use crate::queue::QueueSize;

#[derive(Debug, Clone)]
pub struct AsymmetricOpts {
    pub fast_access: LinkProfile,
    pub slow_access: LinkProfile,
    pub right_access: LinkProfile,
    pub bottleneck: LinkProfile,
    pub bottleneck_queue: QueueSize,
}

impl AsymmetricOpts {
    pub fn s2(queue: QueueSize) -> Self {
        Self {
            fast_access: LinkProfile::mbps(100, 1),
            slow_access: LinkProfile::mbps(100, 60),
            right_access: LinkProfile::mbps(100, 1),
            bottleneck: LinkProfile::mbps(20, 15),
            bottleneck_queue: queue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Asymmetric {
    pub topology: Topology,
    pub left: [NodeIndex; 2],
    pub right: [NodeIndex; 2],
    pub routers: (NodeIndex, NodeIndex),
}

impl Asymmetric {
    pub fn addr(&self, node: NodeIndex) -> Option<Ipv4Addr> {
        self.topology.primary_addr(node)
    }
}

pub fn build_asymmetric(name: &str, opts: &AsymmetricOpts) -> Result<Asymmetric, TopologyError> {
    let mut b = TopologyBuilder::new(name);
    let left = [b.host("left0"), b.host("left1")];
    let right = [b.host("right0"), b.host("right1")];
    let rl = b.router("router-left");
    let rr = b.router("router-right");

    let mut ip = AddressAllocator::new(Ipv4Addr::new(10, 1, 1, 0), 24)?;
    let q = DEFAULT_DEVICE_QUEUE;
    b.segment_from((left[0], rl), LinkClass::Access, opts.fast_access, q, &mut ip)?;
    b.segment_from((left[1], rl), LinkClass::Access, opts.slow_access, q, &mut ip)?;
    b.segment_from((rr, right[0]), LinkClass::Access, opts.right_access, q, &mut ip)?;
    b.segment_from((rr, right[1]), LinkClass::Access, opts.right_access, q, &mut ip)?;
    b.segment_from(
        (rl, rr),
        LinkClass::Bottleneck,
        opts.bottleneck,
        opts.bottleneck_queue,
        &mut ip,
    )?;

    Ok(Asymmetric {
        topology: b.build(),
        left,
        right,
        routers: (rl, rr),
    })
}
