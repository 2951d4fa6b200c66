//! 数据包类型
//!
//! 数据包按目的地址逐跳查路由转发，不再预先携带节点路径。

use std::net::Ipv4Addr;

use super::transport::{IpProtocol, Transport};
use crate::sim::SimTime;

/// 五元组：流统计的分类键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiveTuple {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: IpProtocol,
    pub src_port: u16,
    pub dst_port: u16,
}

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    /// TCP 连接号；UDP 为 0
    pub conn_id: u64,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    /// 线上字节数（含头部）
    pub size_bytes: u32,
    pub transport: Transport,
    /// 源端发出时刻，用于时延统计
    pub sent_at: SimTime,
    pub hops: u32,
}

impl Packet {
    pub fn protocol(&self) -> IpProtocol {
        self.transport.protocol()
    }

    pub fn five_tuple(&self) -> FiveTuple {
        FiveTuple {
            src: self.src,
            dst: self.dst,
            protocol: self.protocol(),
            src_port: self.src_port,
            dst_port: self.dst_port,
        }
    }
}
