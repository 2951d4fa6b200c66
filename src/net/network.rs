//! 网络拓扑管理
//!
//! 持有节点、单向链路、协议栈与观测设施，负责数据包的发出、逐跳转发、排队与交付。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::{debug, trace};

use super::addr::AddressError;
use super::deliver_packet::DeliverPacket;
use super::flow_monitor::{DropReason, FlowMonitor};
use super::id::{LinkId, NodeId};
use super::link::{Link, RateErrorModel};
use super::link_ready::LinkReady;
use super::node::{Interface, Node, NodeKind};
use super::packet::Packet;
use super::routing::{self, Route, RouteOrigin};
use super::stats::Stats;
use super::transport::Transport;
use crate::app::SinkTable;
use crate::proto::tcp::TcpStack;
use crate::queue::QueueSize;
use crate::sim::{SimTime, Simulator};

const EPHEMERAL_PORT_BASE: u16 = 49153;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("network stack already installed on node `{0}`")]
    DuplicateStack(String),
    #[error("node `{0}` has no network stack installed")]
    NoStack(String),
    #[error("no link from {from:?} to {to:?}")]
    NoLink { from: NodeId, to: NodeId },
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    next_pkt_id: u64,
    next_port: u16,
    pub stats: Stats,
    pub tcp: TcpStack,
    pub sinks: SinkTable,
    pub monitor: Option<FlowMonitor>,
}

impl Network {
    /// 添加节点（尚未安装协议栈）
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, kind));
        id
    }

    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Host)
    }

    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Router)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetError> {
        self.nodes.get_mut(id.0).ok_or(NetError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name() == name).map(|n| n.id())
    }

    /// 地址归属的节点
    pub fn owner_of(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.owns(addr)).map(|n| n.id())
    }

    /// 安装网络层协议栈；每个节点只能安装一次。
    pub fn install_stack(&mut self, id: NodeId) -> Result<(), NetError> {
        let node = self.node_mut(id)?;
        if node.has_stack() {
            return Err(NetError::DuplicateStack(node.name().to_string()));
        }
        node.mark_stack_installed();
        trace!(node = %node.name(), "安装协议栈");
        Ok(())
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        queue: QueueSize,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links
            .push(Link::new(from, to, latency, bandwidth_bps).with_queue(queue));
        self.edges.insert((from, to), id);
        id
    }

    /// 点对点双向连接：返回 (a→b, b→a)
    pub fn connect_duplex(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
        queue: QueueSize,
    ) -> (LinkId, LinkId) {
        let ab = self.connect(a, b, latency, bandwidth_bps, queue);
        let ba = self.connect(b, a, latency, bandwidth_bps, queue);
        (ab, ba)
    }

    /// 在链路接收端挂误码模型
    pub fn set_rx_error(&mut self, link: LinkId, model: RateErrorModel) {
        if let Some(l) = self.links.get_mut(link.0) {
            l.rx_error = Some(model);
        }
    }

    /// 为 `node` 在通往 `peer` 的接口上配置地址，同时写入直连路由。
    pub fn add_interface(
        &mut self,
        node: NodeId,
        peer: NodeId,
        addr: Ipv4Addr,
        net: Ipv4Net,
    ) -> Result<(), NetError> {
        let link_out = self
            .link_between(node, peer)
            .ok_or(NetError::NoLink { from: node, to: peer })?;
        let n = self.node_mut(node)?;
        if !n.has_stack() {
            return Err(NetError::NoStack(n.name().to_string()));
        }
        n.ifaces.push(Interface {
            addr,
            net,
            link_out,
            peer,
        });
        n.routes.add(Route {
            dest: net,
            next_hop: peer,
            link: link_out,
            origin: RouteOrigin::Connected,
        });
        Ok(())
    }

    /// 注入静态路由：`dest` 经由邻居 `next_hop`
    pub fn add_static_route(
        &mut self,
        node: NodeId,
        dest: Ipv4Net,
        next_hop: NodeId,
    ) -> Result<(), NetError> {
        let link = self.link_between(node, next_hop).ok_or(NetError::NoLink {
            from: node,
            to: next_hop,
        })?;
        self.node_mut(node)?.routes.add(Route {
            dest,
            next_hop,
            link,
            origin: RouteOrigin::Static,
        });
        Ok(())
    }

    /// 全局路由计算：为每个接口地址写入一条 /32 主机路由，下一跳取唯一的最短路邻居。
    pub fn populate_global_routes(&mut self) {
        let n = self.nodes.len();
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for l in &self.links {
            adj[l.from.0].push(l.to);
            rev_adj[l.to.0].push(l.from);
        }

        for node in &mut self.nodes {
            node.routes.clear_origin(RouteOrigin::Global);
        }

        let mut installed = 0usize;
        for dst_idx in 0..n {
            let dst = NodeId(dst_idx);
            let targets: Vec<Ipv4Addr> = self.nodes[dst_idx].ifaces.iter().map(|i| i.addr).collect();
            if targets.is_empty() {
                continue;
            }
            let next = routing::shortest_next_hops(&adj, &rev_adj, dst);
            for (from_idx, nh) in next.into_iter().enumerate() {
                let Some(nh) = nh else {
                    continue;
                };
                let Some(link) = self.edges.get(&(NodeId(from_idx), nh)).copied() else {
                    continue;
                };
                for addr in &targets {
                    self.nodes[from_idx].routes.add(Route {
                        dest: Ipv4Net::from(*addr),
                        next_hop: nh,
                        link,
                        origin: RouteOrigin::Global,
                    });
                    installed += 1;
                }
            }
        }
        debug!(routes = installed, "全局路由计算完成");
    }

    /// 分配一个临时端口
    pub fn alloc_ephemeral_port(&mut self) -> u16 {
        let port = EPHEMERAL_PORT_BASE.wrapping_add(self.next_port);
        self.next_port = self.next_port.wrapping_add(1) % (u16::MAX - EPHEMERAL_PORT_BASE);
        port
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        conn_id: u64,
        src: (Ipv4Addr, u16),
        dst: (Ipv4Addr, u16),
        size_bytes: u32,
        transport: Transport,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            conn_id,
            src: src.0,
            dst: dst.0,
            src_port: src.1,
            dst_port: dst.1,
            size_bytes,
            transport,
            sent_at: SimTime::ZERO,
            hops: 0,
        }
    }

    /// 从源节点发出一个新包（流统计在此计 tx）
    pub fn send_from(&mut self, node: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        pkt.sent_at = sim.now();
        self.stats.sent_pkts += 1;
        if let Some(m) = self.monitor.as_mut() {
            m.on_tx(&pkt, sim.now());
        }
        self.route_from(node, pkt, sim);
    }

    fn route_from(&mut self, node: NodeId, pkt: Packet, sim: &mut Simulator) {
        let route = self
            .nodes
            .get(node.0)
            .and_then(|n| n.routes.lookup(pkt.dst))
            .map(|r| r.link);
        match route {
            Some(link) => self.transmit(link, pkt, sim),
            None => {
                debug!(node = ?node, dst = %pkt.dst, "无路由，丢弃");
                self.stats.unroutable_pkts += 1;
                self.drop_packet(&pkt, DropReason::NoRoute);
            }
        }
    }

    fn drop_packet(&mut self, pkt: &Packet, reason: DropReason) {
        if let Some(m) = self.monitor.as_mut() {
            m.on_drop(pkt, reason);
        }
    }

    /// 交给链路：空闲则立即开始串行化，否则进出口队列（满则尾丢弃）。
    fn transmit(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        if !link.busy {
            self.start_tx(link_id, pkt, sim);
            return;
        }
        if let Err(pkt) = link.queue.enqueue(pkt) {
            trace!(link = ?link_id, pkt_id = pkt.id, "队列已满，尾丢弃");
            self.stats.dropped_pkts += 1;
            self.stats.dropped_bytes += pkt.size_bytes as u64;
            self.drop_packet(&pkt, DropReason::Queue);
        }
    }

    fn start_tx(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = true;
        link.tx_pkts += 1;
        link.tx_bytes += pkt.size_bytes as u64;
        let depart = sim.now().saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        let to = link.to;
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                via: link_id,
                pkt,
            },
        );
    }

    /// 链路完成一次串行化：取队首继续发送
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = false;
        if let Some(pkt) = link.queue.dequeue() {
            self.start_tx(link_id, pkt, sim);
        }
    }

    /// 包到达节点：误码判定 → 本地交付或继续转发
    pub(crate) fn deliver(&mut self, to: NodeId, via: LinkId, mut pkt: Packet, sim: &mut Simulator) {
        if let Some(em) = self.links[via.0].rx_error.as_mut() {
            if em.corrupt() {
                trace!(pkt_id = pkt.id, link = ?via, "接收端误码，丢弃");
                self.stats.corrupted_pkts += 1;
                self.drop_packet(&pkt, DropReason::RxError);
                return;
            }
        }

        let owns = self.nodes.get(to.0).is_some_and(|n| n.owns(pkt.dst));
        if !owns {
            pkt.hops += 1;
            self.stats.forwarded_pkts += 1;
            if let Some(m) = self.monitor.as_mut() {
                m.on_forward(&pkt);
            }
            self.route_from(to, pkt, sim);
            return;
        }

        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        if let Some(m) = self.monitor.as_mut() {
            m.on_rx(&pkt, sim.now());
        }

        match pkt.transport {
            Transport::Tcp(seg) => {
                let mut tcp = std::mem::take(&mut self.tcp);
                tcp.on_segment(to, &pkt, seg, sim, self);
                self.tcp = tcp;
            }
            Transport::Udp => {
                self.sinks
                    .on_datagram(to, pkt.dst_port, pkt.size_bytes as u64, sim.now());
            }
        }
    }
}
