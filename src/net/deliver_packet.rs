//! 数据包到达事件

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};

/// 事件：packet 经链路 `via` 到达节点 `to`。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub via: LinkId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, via, pkt } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        w.net.deliver(to, via, pkt, sim);
    }
}
