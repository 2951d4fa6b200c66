//! 蜂窝接入拓扑
//!
//! ```text
//! UE ~~radio~~ AP ── backhaul ── GW ══ core ══ remote
//! ```
//! 无线侧只用一条点对点“radio”链路近似（不建模信道与移动性）。
//! 地址：radio 段 7.0.0.0/8（AP 7.0.0.1 为 UE 默认网关，UE 7.0.0.2），backhaul 10.0.0.0/30，
//! core 1.0.0.0/8（GW 1.0.0.1，remote 1.0.0.2）。路由全部静态配置。

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::builder::{
    DEFAULT_DEVICE_QUEUE, LinkClass, LinkProfile, NodeIndex, RoutingMode, StaticRouteSpec,
    Topology, TopologyBuilder, TopologyError,
};
use crate::net::{AddressAllocator, AddressError, NodeKind};
use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct CellularOpts {
    pub radio: LinkProfile,
    pub backhaul: LinkProfile,
    pub core: LinkProfile,
}

impl Default for CellularOpts {
    fn default() -> Self {
        Self {
            radio: LinkProfile::mbps(75, 5),
            backhaul: LinkProfile::new(1_000_000_000, SimTime::from_millis(1)),
            core: LinkProfile::new(10_000_000_000, SimTime::from_millis(2)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cellular {
    pub topology: Topology,
    pub ue: NodeIndex,
    pub access_point: NodeIndex,
    pub gateway: NodeIndex,
    pub remote: NodeIndex,
}

impl Cellular {
    pub fn ue_addr(&self) -> Option<Ipv4Addr> {
        self.topology.primary_addr(self.ue)
    }

    pub fn remote_addr(&self) -> Option<Ipv4Addr> {
        self.topology.primary_addr(self.remote)
    }
}

fn net(addr: Ipv4Addr, prefix: u8) -> Result<Ipv4Net, AddressError> {
    Ipv4Net::new(addr, prefix).map_err(|_| AddressError::Prefix(prefix))
}

pub fn build_cellular(name: &str, opts: &CellularOpts) -> Result<Cellular, TopologyError> {
    let mut b = TopologyBuilder::new(name);
    let gateway = b.node("gateway", NodeKind::Gateway);
    let remote = b.host("remote");
    let access_point = b.node("access-point", NodeKind::AccessPoint);
    let ue = b.host("ue");

    let q = DEFAULT_DEVICE_QUEUE;
    let mut core_ip = AddressAllocator::new(Ipv4Addr::new(1, 0, 0, 0), 8)?;
    b.segment_from((gateway, remote), LinkClass::Core, opts.core, q, &mut core_ip)?;
    let mut backhaul_ip = AddressAllocator::new(Ipv4Addr::new(10, 0, 0, 0), 30)?;
    b.segment_from((access_point, gateway), LinkClass::Backhaul, opts.backhaul, q, &mut backhaul_ip)?;
    let mut ue_ip = AddressAllocator::new(Ipv4Addr::new(7, 0, 0, 0), 8)?;
    b.segment_from((access_point, ue), LinkClass::Radio, opts.radio, q, &mut ue_ip)?;

    let default = net(Ipv4Addr::UNSPECIFIED, 0)?;
    let ue_net = net(Ipv4Addr::new(7, 0, 0, 0), 8)?;
    let route = |node, dest, via| StaticRouteSpec { node, dest, via };
    b.routing(RoutingMode::Static(vec![
        route(ue, default, access_point),
        route(access_point, default, gateway),
        route(gateway, ue_net, access_point),
        route(remote, ue_net, gateway),
    ]));

    Ok(Cellular {
        topology: b.build(),
        ue,
        access_point,
        gateway,
        remote,
    })
}
