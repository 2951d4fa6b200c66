//! 流量安装
//!
//! 先装全部接收端再装发送端；端口按流量类别的基址加上该类别内的序号分配。
//! 发送端的启动时间不得早于对应接收端。

use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::{debug, info};

use super::tcp_variant::TransportDefaults;
use crate::app::{
    App, AppId, AppStart, AppStop, BulkSend, OnOffApp, OnOffConfig, OnOffProtocol, OnOffTime,
    SinkId, SinkStart, SinkStop,
};
use crate::error::ExperimentError;
use crate::net::{IpProtocol, NetWorld, NodeId};
use crate::sim::rng::{RngStream, stream_rng};
use crate::sim::{SimTime, Simulator};
use crate::topo::{InstalledTopology, NodeIndex, Topology};

/// web 类流量：on 0.2s / off 指数分布均值 0.8s，1200 字节，10Mbps
pub const WEB_RATE_BPS: u64 = 10_000_000;
pub const WEB_PACKET_BYTES: u32 = 1200;
/// UDP 背景流量：常开，15Mbps，1200 字节
pub const CROSS_RATE_BPS: u64 = 15_000_000;
pub const CROSS_PACKET_BYTES: u32 = 1200;
/// 视频流：常开，50Mbps，1316 字节
pub const STREAM_RATE_BPS: u64 = 50_000_000;
pub const STREAM_PACKET_BYTES: u32 = 1316;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficClass {
    /// TCP 批量传输，不限字节数
    Bulk,
    /// TCP on/off，短突发
    WebLike,
    /// UDP 常开背景流量
    CrossTraffic,
    /// TCP 常开视频流
    Stream,
}

impl TrafficClass {
    pub fn port_base(self) -> u16 {
        match self {
            TrafficClass::Bulk => 5000,
            TrafficClass::WebLike => 9000,
            TrafficClass::CrossTraffic => 7000,
            TrafficClass::Stream => 10000,
        }
    }

    pub fn protocol(self) -> IpProtocol {
        match self {
            TrafficClass::CrossTraffic => IpProtocol::Udp,
            _ => IpProtocol::Tcp,
        }
    }
}

/// 一条流的描述
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSpec {
    pub class: TrafficClass,
    pub src: NodeIndex,
    pub dst: NodeIndex,
    pub dst_addr: Ipv4Addr,
    pub sink_start: SimTime,
    pub source_start: SimTime,
    pub stop: SimTime,
}

impl FlowSpec {
    /// 运行在发送端启动前就结束时，停止时刻抬到启动时刻（该流不会发送任何数据）。
    pub fn new(
        class: TrafficClass,
        (src, dst): (NodeIndex, NodeIndex),
        dst_addr: Ipv4Addr,
        (sink_start, source_start): (SimTime, SimTime),
        stop: SimTime,
    ) -> Self {
        Self {
            class,
            src,
            dst,
            dst_addr,
            sink_start,
            source_start,
            stop: stop.max(source_start),
        }
    }

    /// 接收端与发送端同时在 `start` 启动
    pub fn bulk(ends: (NodeIndex, NodeIndex), dst_addr: Ipv4Addr, start: SimTime, stop: SimTime) -> Self {
        Self::new(TrafficClass::Bulk, ends, dst_addr, (start, start), stop)
    }

    /// 发送端比接收端晚 1 秒启动
    pub fn web(ends: (NodeIndex, NodeIndex), dst_addr: Ipv4Addr, sink_start: SimTime, stop: SimTime) -> Self {
        let source_start = sink_start.saturating_add(SimTime::from_secs(1));
        Self::new(TrafficClass::WebLike, ends, dst_addr, (sink_start, source_start), stop)
    }

    pub fn cross(ends: (NodeIndex, NodeIndex), dst_addr: Ipv4Addr, start: SimTime, stop: SimTime) -> Self {
        Self::new(TrafficClass::CrossTraffic, ends, dst_addr, (start, start), stop)
    }

    pub fn stream(
        ends: (NodeIndex, NodeIndex),
        dst_addr: Ipv4Addr,
        (sink_start, source_start): (SimTime, SimTime),
        stop: SimTime,
    ) -> Self {
        Self::new(TrafficClass::Stream, ends, dst_addr, (sink_start, source_start), stop)
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.source_start < self.sink_start {
            return Err(ExperimentError::InvalidFlow(format!(
                "{:?} source starts at {} before its sink at {}",
                self.class, self.source_start, self.sink_start
            )));
        }
        if self.stop < self.source_start {
            return Err(ExperimentError::InvalidFlow(format!(
                "{:?} flow stops at {} before it starts at {}",
                self.class, self.stop, self.source_start
            )));
        }
        Ok(())
    }

    fn app_for(&self, node: NodeId, local: Ipv4Addr, port: u16, defaults: &TransportDefaults, run: u64, idx: usize) -> App {
        let remote = (self.dst_addr, port);
        let rng = || stream_rng(run, RngStream::OnOff(idx as u64));
        match self.class {
            TrafficClass::Bulk => App::Bulk(BulkSend::new(node, local, remote, 0, defaults.tcp_config())),
            TrafficClass::WebLike => {
                let cfg = OnOffConfig {
                    rate_bps: WEB_RATE_BPS,
                    packet_bytes: WEB_PACKET_BYTES,
                    on: OnOffTime::Constant(SimTime::from_millis(200)),
                    off: OnOffTime::Exponential {
                        mean: SimTime::from_millis(800),
                    },
                    protocol: OnOffProtocol::Tcp(defaults.tcp_config()),
                };
                App::OnOff(OnOffApp::new(node, local, remote, cfg, rng()))
            }
            TrafficClass::CrossTraffic => {
                let cfg = OnOffConfig::always_on(CROSS_RATE_BPS, CROSS_PACKET_BYTES, OnOffProtocol::Udp);
                App::OnOff(OnOffApp::new(node, local, remote, cfg, rng()))
            }
            TrafficClass::Stream => {
                let cfg = OnOffConfig::always_on(
                    STREAM_RATE_BPS,
                    STREAM_PACKET_BYTES,
                    OnOffProtocol::Tcp(defaults.tcp_config()),
                );
                App::OnOff(OnOffApp::new(node, local, remote, cfg, rng()))
            }
        }
    }
}

/// 安装后的流
#[derive(Debug, Clone, Serialize)]
pub struct InstalledFlow {
    pub class: TrafficClass,
    pub protocol: IpProtocol,
    pub src: NodeId,
    pub dst: NodeId,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub port: u16,
    pub sink: SinkId,
    pub app: AppId,
    pub sink_start: SimTime,
    pub source_start: SimTime,
    pub stop: SimTime,
}

/// 按描述顺序分配端口：类别基址 + 类别内序号
pub fn assign_ports(flows: &[FlowSpec]) -> Vec<u16> {
    let mut seen: Vec<TrafficClass> = Vec::with_capacity(flows.len());
    flows
        .iter()
        .map(|f| {
            let idx = seen.iter().filter(|c| **c == f.class).count() as u16;
            seen.push(f.class);
            f.class.port_base() + idx
        })
        .collect()
}

/// 安装全部流：先校验，再装接收端，最后装发送端。
#[tracing::instrument(skip_all, fields(flows = flows.len()))]
pub fn install_flows(
    flows: &[FlowSpec],
    topology: &Topology,
    installed: &InstalledTopology,
    defaults: &TransportDefaults,
    run: u64,
    sim: &mut Simulator,
    world: &mut NetWorld,
) -> Result<Vec<InstalledFlow>, ExperimentError> {
    for f in flows {
        f.validate()?;
    }
    let ports = assign_ports(flows);

    let mut sinks = Vec::with_capacity(flows.len());
    for (f, &port) in flows.iter().zip(&ports) {
        let dst = installed.node(f.dst)?;
        let sink = world.net.sinks.add(dst, f.class.protocol(), port);
        sim.schedule(f.sink_start, SinkStart { sink });
        sim.schedule(f.stop, SinkStop { sink });
        debug!(sink, node = ?dst, port, start = %f.sink_start, "安装接收端");
        sinks.push((dst, sink));
    }

    let mut out = Vec::with_capacity(flows.len());
    for (idx, ((f, &port), (dst, sink))) in flows.iter().zip(&ports).zip(sinks).enumerate() {
        let src = installed.node(f.src)?;
        let src_addr = topology.primary_addr(f.src).ok_or_else(|| {
            ExperimentError::InvalidFlow(format!("source node {} has no address", f.src))
        })?;
        let app = world
            .apps
            .add(f.app_for(src, src_addr, port, defaults, run, idx));
        sim.schedule(f.source_start, AppStart { app });
        sim.schedule(f.stop, AppStop { app });
        debug!(app, node = ?src, dst = %f.dst_addr, port, start = %f.source_start, "安装发送端");
        out.push(InstalledFlow {
            class: f.class,
            protocol: f.class.protocol(),
            src,
            dst,
            src_addr,
            dst_addr: f.dst_addr,
            port,
            sink,
            app,
            sink_start: f.sink_start,
            source_start: f.source_start,
            stop: f.stop,
        });
    }
    info!(flows = out.len(), "🚦 流量安装完成");
    Ok(out)
}
