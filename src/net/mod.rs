//! 网络模拟模块
//!
//! 节点、链路、地址、路由、数据包转发与流统计。

mod addr;
mod deliver_packet;
mod flow_monitor;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod stats;
mod transport;

pub use addr::{AddressAllocator, AddressError, blocks_overlap};
pub use deliver_packet::DeliverPacket;
pub use flow_monitor::{DropReason, FlowId, FlowMonitor, FlowStats};
pub use id::{LinkId, NodeId};
pub use link::{Link, RateErrorModel};
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub use network::{NetError, Network};
pub use node::{Interface, Node, NodeKind};
pub use packet::{FiveTuple, Packet};
pub use routing::{Route, RouteOrigin, RoutingTable, shortest_next_hops};
pub use stats::Stats;
pub use transport::{IpProtocol, TcpSegment, Transport};
