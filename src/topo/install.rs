//! 把拓扑描述写进仿真网络
//!
//! 顺序：建节点 → 每个节点安装一次协议栈 → 建双向链路并配置接口地址 → 挂误码 → 路由。

use tracing::{debug, info};

use super::builder::{NodeIndex, RoutingMode, Side, Topology, TopologyError};
use crate::net::{LinkId, Network, NodeId, RateErrorModel};
use crate::sim::rng::{RngStream, stream_rng};

/// 拓扑在网络中的落地结果
#[derive(Debug, Clone)]
pub struct InstalledTopology {
    /// 描述中的节点下标 → 网络节点
    pub nodes: Vec<NodeId>,
    /// 每个链路段的 (a→b, b→a)
    pub links: Vec<(LinkId, LinkId)>,
}

impl InstalledTopology {
    pub fn node(&self, idx: NodeIndex) -> Result<NodeId, TopologyError> {
        self.nodes
            .get(idx)
            .copied()
            .ok_or(TopologyError::UnknownNode(idx))
    }
}

/// 安装拓扑；`run` 决定误码模型的随机流。
#[tracing::instrument(skip(topo, net), fields(topology = %topo.name))]
pub fn install(topo: &Topology, net: &mut Network, run: u64) -> Result<InstalledTopology, TopologyError> {
    let nodes: Vec<NodeId> = topo
        .nodes
        .iter()
        .map(|n| net.add_node(n.name.clone(), n.kind))
        .collect();
    for &id in &nodes {
        net.install_stack(id)?;
    }
    let mut installed = InstalledTopology {
        nodes,
        links: Vec::with_capacity(topo.segments.len()),
    };

    for (i, seg) in topo.segments.iter().enumerate() {
        let a = installed.node(seg.a)?;
        let b = installed.node(seg.b)?;
        let (ab, ba) = net.connect_duplex(a, b, seg.profile.delay, seg.profile.rate_bps, seg.queue);
        net.add_interface(a, b, seg.a_addr, seg.block)?;
        net.add_interface(b, a, seg.b_addr, seg.block)?;

        if let Some((side, rate)) = seg.rx_loss {
            // 某一端“接收侧”即指向该端的那条单向链路
            let link = match side {
                Side::A => ba,
                Side::B => ab,
            };
            let rng = stream_rng(run, RngStream::RxError(i as u64));
            net.set_rx_error(link, RateErrorModel::new(rate, rng));
            debug!(segment = i, rate, "挂接收端误码模型");
        }
        installed.links.push((ab, ba));
    }

    match &topo.routing {
        RoutingMode::Global => net.populate_global_routes(),
        RoutingMode::Static(routes) => {
            for r in routes {
                let node = installed.node(r.node)?;
                let via = installed.node(r.via)?;
                net.add_static_route(node, r.dest, via)?;
            }
        }
    }

    info!(
        nodes = installed.nodes.len(),
        segments = installed.links.len(),
        "🔧 拓扑安装完成"
    );
    Ok(installed)
}
