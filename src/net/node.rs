//! 节点类型
//!
//! 主机、路由器、接入点与网关在转发行为上没有区别：目的地址属于自己就本地交付，
//! 否则查路由表转发。区分种类只用于拓扑统计与输出。

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::id::{LinkId, NodeId};
use super::routing::RoutingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    Router,
    AccessPoint,
    Gateway,
}

/// 节点上的一个网络接口（点对点链路的一端）
#[derive(Debug, Clone)]
pub struct Interface {
    pub addr: Ipv4Addr,
    pub net: Ipv4Net,
    /// 从本接口发出的单向链路
    pub link_out: LinkId,
    pub peer: NodeId,
}

#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    stack_installed: bool,
    pub(crate) ifaces: Vec<Interface>,
    pub(crate) routes: RoutingTable,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            stack_installed: false,
            ifaces: Vec::new(),
            routes: RoutingTable::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn has_stack(&self) -> bool {
        self.stack_installed
    }

    pub(crate) fn mark_stack_installed(&mut self) {
        self.stack_installed = true;
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.ifaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// 第一个接口地址（主机的“主地址”）
    pub fn primary_addr(&self) -> Option<Ipv4Addr> {
        self.ifaces.first().map(|i| i.addr)
    }

    pub fn owns(&self, addr: Ipv4Addr) -> bool {
        self.ifaces.iter().any(|i| i.addr == addr)
    }
}
