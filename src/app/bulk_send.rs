//! 批量发送应用
//!
//! 启动时打开一条 TCP 连接，尽可能快地发送；`max_bytes == 0` 表示不设上限。

use std::net::Ipv4Addr;

use tracing::debug;

use crate::net::{Network, NodeId};
use crate::proto::tcp::{TcpConfig, TcpConnId, TcpOpen, TcpSource};
use crate::sim::Simulator;

#[derive(Debug, Clone)]
pub struct BulkSend {
    pub node: NodeId,
    pub local: Ipv4Addr,
    pub remote: Ipv4Addr,
    pub port: u16,
    pub max_bytes: u64,
    pub tcp: TcpConfig,
    conn: Option<TcpConnId>,
}

impl BulkSend {
    pub fn new(
        node: NodeId,
        local: Ipv4Addr,
        remote: (Ipv4Addr, u16),
        max_bytes: u64,
        tcp: TcpConfig,
    ) -> Self {
        Self {
            node,
            local,
            remote: remote.0,
            port: remote.1,
            max_bytes,
            tcp,
            conn: None,
        }
    }

    pub fn conn(&self) -> Option<TcpConnId> {
        self.conn
    }

    pub(crate) fn start(&mut self, sim: &mut Simulator, net: &mut Network) {
        if self.conn.is_some() {
            return;
        }
        let source = match self.max_bytes {
            0 => TcpSource::Unlimited,
            n => TcpSource::Bounded(n),
        };
        let req = TcpOpen {
            src: self.node,
            src_addr: self.local,
            dst_addr: self.remote,
            dst_port: self.port,
            source,
        };
        let mut tcp = std::mem::take(&mut net.tcp);
        let id = tcp.open(req, self.tcp.clone(), sim, net);
        net.tcp = tcp;
        debug!(conn_id = id, dst = %self.remote, port = self.port, "bulk 发送启动");
        self.conn = Some(id);
    }

    pub(crate) fn stop(&mut self, net: &mut Network) {
        if let Some(id) = self.conn {
            net.tcp.close(id);
        }
    }
}
