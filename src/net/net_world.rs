//! 网络世界实现
//!
//! 持有网络（含协议栈与接收端应用）、发送端应用，以及拥塞窗口观测者。

use super::network::Network;
use crate::app::Applications;
use crate::proto::tcp::CwndObserver;
use crate::sim::{Simulator, World};
use std::any::Any;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: Applications,
    /// 每个事件之后把 TCP 栈积累的 cwnd 变化交给它
    pub cwnd_observer: Option<Box<dyn CwndObserver>>,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        if !self.net.tcp.has_cwnd_changes() {
            return;
        }
        let changes = self.net.tcp.take_cwnd_changes();
        if let Some(obs) = self.cwnd_observer.as_mut() {
            for c in changes {
                obs.on_cwnd_change(c);
            }
        }
    }
}
