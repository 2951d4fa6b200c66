//! Dumbbell 拓扑构建
//!
//! 拓扑结构：
//! ```text
//! left0 ─┐                    ┌─ right0
//! left1 ─┤                    ├─ right1
//!  ...   ├─ rl ══════════ rr ─┤   ...
//! leftN ─┘    (bottleneck)    └─ rightN
//! ```
//! 地址：路由器间 10.3.1.0/24；左侧第 i 个叶子 10.1.(i+1).0/24，右侧 10.2.(i+1).0/24。
//! 叶子取块内 .1，路由器取 .2。

use std::net::Ipv4Addr;

use super::builder::{
    DEFAULT_DEVICE_QUEUE, LinkClass, LinkProfile, NodeIndex, Topology, TopologyBuilder,
    TopologyError,
};
use crate::net::AddressAllocator;
use crate::queue::QueueSize;

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    /// 每侧叶子数
    pub pairs: usize,
    pub access: LinkProfile,
    pub bottleneck: LinkProfile,
    pub bottleneck_queue: QueueSize,
}

impl DumbbellOpts {
    /// 两对主机，20Mbps/15ms 瓶颈
    pub fn s1(queue: QueueSize) -> Self {
        Self {
            pairs: 2,
            access: LinkProfile::mbps(100, 1),
            bottleneck: LinkProfile::mbps(20, 15),
            bottleneck_queue: queue,
        }
    }

    /// 八对主机，100Mbps/20ms 瓶颈
    pub fn s5(queue: QueueSize) -> Self {
        Self {
            pairs: 8,
            access: LinkProfile::mbps(100, 2),
            bottleneck: LinkProfile::mbps(100, 20),
            bottleneck_queue: queue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dumbbell {
    pub topology: Topology,
    pub left: Vec<NodeIndex>,
    pub right: Vec<NodeIndex>,
    pub routers: (NodeIndex, NodeIndex),
}

impl Dumbbell {
    pub fn left_addr(&self, i: usize) -> Option<Ipv4Addr> {
        self.topology.primary_addr(*self.left.get(i)?)
    }

    pub fn right_addr(&self, i: usize) -> Option<Ipv4Addr> {
        self.topology.primary_addr(*self.right.get(i)?)
    }
}

/// 构建 dumbbell 拓扑
pub fn build_dumbbell(name: &str, opts: &DumbbellOpts) -> Result<Dumbbell, TopologyError> {
    let mut b = TopologyBuilder::new(name);
    let rl = b.router("router-left");
    let rr = b.router("router-right");
    let left: Vec<NodeIndex> = (0..opts.pairs).map(|i| b.host(format!("left{i}"))).collect();
    let right: Vec<NodeIndex> = (0..opts.pairs).map(|i| b.host(format!("right{i}"))).collect();

    let mut router_ip = AddressAllocator::new(Ipv4Addr::new(10, 3, 1, 0), 24)?;
    let mut left_ip = AddressAllocator::new(Ipv4Addr::new(10, 1, 1, 0), 24)?;
    let mut right_ip = AddressAllocator::new(Ipv4Addr::new(10, 2, 1, 0), 24)?;

    b.segment_from(
        (rl, rr),
        LinkClass::Bottleneck,
        opts.bottleneck,
        opts.bottleneck_queue,
        &mut router_ip,
    )?;
    for &h in &left {
        b.segment_from((h, rl), LinkClass::Access, opts.access, DEFAULT_DEVICE_QUEUE, &mut left_ip)?;
    }
    for &h in &right {
        b.segment_from((h, rr), LinkClass::Access, opts.access, DEFAULT_DEVICE_QUEUE, &mut right_ip)?;
    }

    Ok(Dumbbell {
        topology: b.build(),
        left,
        right,
        routers: (rl, rr),
    })
}
