//! 拓扑描述
//!
//! 描述层是纯数据：节点、点对点链路段（速率/时延/队列/误码/地址块）、路由方式。
//! 构建时检查地址块互不重叠、接口地址落在各自的块内；真正写进仿真网络由 `install` 完成。

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::Serialize;

use crate::net::{AddressAllocator, AddressError, NetError, NodeKind, blocks_overlap};
use crate::queue::QueueSize;
use crate::sim::SimTime;

/// 拓扑描述内的节点下标（按添加顺序）
pub type NodeIndex = usize;

/// 设备默认出口队列（未显式配置的链路段使用）
pub const DEFAULT_DEVICE_QUEUE: QueueSize = QueueSize::Packets(100);

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("unknown node index {0}")]
    UnknownNode(NodeIndex),
    #[error("segment connects node `{0}` to itself")]
    SelfLoop(String),
    #[error("address {addr} is outside segment block {block}")]
    OutsideBlock { addr: Ipv4Addr, block: Ipv4Net },
    #[error("address {0} assigned twice")]
    DuplicateAddress(Ipv4Addr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkClass {
    Access,
    Bottleneck,
    Radio,
    Backhaul,
    Core,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkProfile {
    pub rate_bps: u64,
    pub delay: SimTime,
}

impl LinkProfile {
    pub const fn new(rate_bps: u64, delay: SimTime) -> Self {
        Self { rate_bps, delay }
    }

    pub fn mbps(mbps: u64, delay_ms: u64) -> Self {
        Self::new(mbps * 1_000_000, SimTime::from_millis(delay_ms))
    }
}

/// 链路段的一端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub a: NodeIndex,
    pub b: NodeIndex,
    pub class: LinkClass,
    pub profile: LinkProfile,
    /// 两个方向的出口队列
    pub queue: QueueSize,
    /// 在某一端的接收侧按包丢弃
    pub rx_loss: Option<(Side, f64)>,
    pub block: Ipv4Net,
    pub a_addr: Ipv4Addr,
    pub b_addr: Ipv4Addr,
}

impl SegmentSpec {
    pub fn addr_of(&self, node: NodeIndex) -> Option<Ipv4Addr> {
        if node == self.a {
            Some(self.a_addr)
        } else if node == self.b {
            Some(self.b_addr)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRouteSpec {
    pub node: NodeIndex,
    pub dest: Ipv4Net,
    /// 下一跳邻居
    pub via: NodeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// 全局最短路
    #[default]
    Global,
    Static(Vec<StaticRouteSpec>),
}

/// 构建完成的拓扑描述
#[derive(Debug, Clone)]
pub struct Topology {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub segments: Vec<SegmentSpec>,
    pub routing: RoutingMode,
}

impl Topology {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn segments_of(&self, class: LinkClass) -> impl Iterator<Item = &SegmentSpec> {
        self.segments.iter().filter(move |s| s.class == class)
    }

    /// 节点在第一个相连链路段上的地址
    pub fn primary_addr(&self, node: NodeIndex) -> Option<Ipv4Addr> {
        self.segments.iter().find_map(|s| s.addr_of(node))
    }
}

#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    name: String,
    nodes: Vec<NodeSpec>,
    segments: Vec<SegmentSpec>,
    routing: RoutingMode,
}

impl TopologyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            segments: Vec::new(),
            routing: RoutingMode::Global,
        }
    }

    pub fn node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeIndex {
        self.nodes.push(NodeSpec {
            name: name.into(),
            kind,
        });
        self.nodes.len() - 1
    }

    pub fn host(&mut self, name: impl Into<String>) -> NodeIndex {
        self.node(name, NodeKind::Host)
    }

    pub fn router(&mut self, name: impl Into<String>) -> NodeIndex {
        self.node(name, NodeKind::Router)
    }

    /// 以显式地址块与两端地址添加链路段。
    pub fn segment(
        &mut self,
        (a, b): (NodeIndex, NodeIndex),
        class: LinkClass,
        profile: LinkProfile,
        queue: QueueSize,
        block: Ipv4Net,
        (a_addr, b_addr): (Ipv4Addr, Ipv4Addr),
    ) -> Result<usize, TopologyError> {
        for n in [a, b] {
            if n >= self.nodes.len() {
                return Err(TopologyError::UnknownNode(n));
            }
        }
        if a == b {
            return Err(TopologyError::SelfLoop(self.nodes[a].name.clone()));
        }
        for addr in [a_addr, b_addr] {
            if !block.contains(&addr) {
                return Err(TopologyError::OutsideBlock { addr, block });
            }
        }
        if a_addr == b_addr {
            return Err(TopologyError::DuplicateAddress(a_addr));
        }
        if let Some(existing) = self
            .segments
            .iter()
            .map(|s| s.block)
            .find(|e| blocks_overlap(e, &block))
        {
            return Err(AddressError::Overlap {
                new: block,
                existing,
            }
            .into());
        }

        self.segments.push(SegmentSpec {
            a,
            b,
            class,
            profile,
            queue,
            rx_loss: None,
            block,
            a_addr,
            b_addr,
        });
        Ok(self.segments.len() - 1)
    }

    /// 从分配器当前块取两个地址添加链路段，随后把游标推进到下一个块。
    pub fn segment_from(
        &mut self,
        ends: (NodeIndex, NodeIndex),
        class: LinkClass,
        profile: LinkProfile,
        queue: QueueSize,
        alloc: &mut AddressAllocator,
    ) -> Result<usize, TopologyError> {
        let block = alloc.network();
        let a_addr = alloc.next_address()?;
        let b_addr = alloc.next_address()?;
        let idx = self.segment(ends, class, profile, queue, block, (a_addr, b_addr))?;
        alloc.new_network()?;
        Ok(idx)
    }

    /// 在链路段某一端的接收侧挂误码；`rate <= 0` 不挂。
    pub fn rx_loss(&mut self, segment: usize, side: Side, rate: f64) {
        if rate <= 0.0 {
            return;
        }
        if let Some(s) = self.segments.get_mut(segment) {
            s.rx_loss = Some((side, rate.min(1.0)));
        }
    }

    pub fn routing(&mut self, mode: RoutingMode) {
        self.routing = mode;
    }

    pub fn build(self) -> Topology {
        Topology {
            name: self.name,
            nodes: self.nodes,
            segments: self.segments,
            routing: self.routing,
        }
    }
}
