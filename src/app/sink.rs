//! 接收端（packet sink）
//!
//! 监听 `(节点, 协议, 端口)`；TCP 侧在握手时判断是否接受连接，UDP 侧直接累计收到的字节。

use serde::Serialize;

use crate::net::{IpProtocol, NetWorld, NodeId};
use crate::sim::{Event, SimTime, Simulator, World};

pub type SinkId = usize;

#[derive(Debug, Clone, Serialize)]
pub struct PacketSink {
    pub node: NodeId,
    pub protocol: IpProtocol,
    pub port: u16,
    listening: bool,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub accepted: u32,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
}

impl PacketSink {
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    fn record(&mut self, bytes: u64, now: SimTime) {
        self.rx_bytes += bytes;
        self.rx_packets += 1;
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);
    }
}

#[derive(Debug, Default)]
pub struct SinkTable {
    sinks: Vec<PacketSink>,
}

impl SinkTable {
    /// 登记一个接收端（尚未开始监听）
    pub fn add(&mut self, node: NodeId, protocol: IpProtocol, port: u16) -> SinkId {
        self.sinks.push(PacketSink {
            node,
            protocol,
            port,
            listening: false,
            rx_bytes: 0,
            rx_packets: 0,
            accepted: 0,
            first_rx: None,
            last_rx: None,
        });
        self.sinks.len() - 1
    }

    pub fn get(&self, id: SinkId) -> Option<&PacketSink> {
        self.sinks.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PacketSink> {
        self.sinks.iter()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn start(&mut self, id: SinkId) {
        if let Some(s) = self.sinks.get_mut(id) {
            s.listening = true;
        }
    }

    pub fn stop(&mut self, id: SinkId) {
        if let Some(s) = self.sinks.get_mut(id) {
            s.listening = false;
        }
    }

    fn find_mut(&mut self, node: NodeId, protocol: IpProtocol, port: u16) -> Option<&mut PacketSink> {
        self.sinks
            .iter_mut()
            .find(|s| s.listening && s.node == node && s.protocol == protocol && s.port == port)
    }

    pub fn is_listening(&self, node: NodeId, protocol: IpProtocol, port: u16) -> bool {
        self.sinks
            .iter()
            .any(|s| s.listening && s.node == node && s.protocol == protocol && s.port == port)
    }

    /// TCP 握手：有监听则接受连接
    pub fn accept(&mut self, node: NodeId, port: u16, _now: SimTime) -> bool {
        match self.find_mut(node, IpProtocol::Tcp, port) {
            Some(s) => {
                s.accepted += 1;
                true
            }
            None => false,
        }
    }

    /// TCP 按序交付给应用的字节
    pub fn on_stream_bytes(&mut self, node: NodeId, port: u16, bytes: u64, now: SimTime) {
        // 已建立的连接在监听关闭后仍然交付，与真实 socket 一致
        if let Some(s) = self
            .sinks
            .iter_mut()
            .find(|s| s.node == node && s.protocol == IpProtocol::Tcp && s.port == port)
        {
            s.record(bytes, now);
        }
    }

    /// UDP 数据报；没有监听时静默丢弃
    pub fn on_datagram(&mut self, node: NodeId, port: u16, bytes: u64, now: SimTime) {
        if let Some(s) = self.find_mut(node, IpProtocol::Udp, port) {
            s.record(bytes, now);
        }
    }
}

/// 接收端开始监听
#[derive(Debug)]
pub struct SinkStart {
    pub sink: SinkId,
}

impl Event for SinkStart {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        w.net.sinks.start(self.sink);
    }
}

/// 接收端停止监听
#[derive(Debug)]
pub struct SinkStop {
    pub sink: SinkId,
}

impl Event for SinkStop {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        w.net.sinks.stop(self.sink);
    }
}
