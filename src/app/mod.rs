//! 应用层
//!
//! 发送端应用（bulk、on/off）保存在 `Applications` 中，由启动/停止事件驱动；
//! 接收端（sink）挂在 `Network` 上，随协议栈一起处理到达的数据。

pub mod bulk_send;
pub mod on_off;
pub mod sink;

pub use bulk_send::BulkSend;
pub use on_off::{OnOffApp, OnOffConfig, OnOffProtocol, OnOffTime};
pub use sink::{PacketSink, SinkId, SinkStart, SinkStop, SinkTable};

use crate::net::{NetWorld, Network, NodeId};
use crate::proto::tcp::TcpConnId;
use crate::sim::{Event, Simulator, World};

pub type AppId = usize;

#[derive(Debug, Clone)]
pub enum App {
    Bulk(BulkSend),
    OnOff(OnOffApp),
}

impl App {
    pub fn node(&self) -> NodeId {
        match self {
            App::Bulk(a) => a.node,
            App::OnOff(a) => a.node,
        }
    }

    pub fn conn(&self) -> Option<TcpConnId> {
        match self {
            App::Bulk(a) => a.conn(),
            App::OnOff(a) => a.conn(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Applications {
    apps: Vec<App>,
}

impl Applications {
    pub fn add(&mut self, app: App) -> AppId {
        self.apps.push(app);
        self.apps.len() - 1
    }

    pub fn get(&self, id: AppId) -> Option<&App> {
        self.apps.get(id)
    }

    pub fn on_off(&self, id: AppId) -> Option<&OnOffApp> {
        match self.apps.get(id) {
            Some(App::OnOff(a)) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn on_off_mut(&mut self, id: AppId) -> Option<&mut OnOffApp> {
        match self.apps.get_mut(id) {
            Some(App::OnOff(a)) => Some(a),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &App> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub(crate) fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) {
        match self.apps.get_mut(id) {
            Some(App::Bulk(a)) => a.start(sim, net),
            Some(App::OnOff(a)) => a.start(id, sim, net),
            None => {}
        }
    }

    pub(crate) fn stop(&mut self, id: AppId, net: &mut Network) {
        match self.apps.get_mut(id) {
            Some(App::Bulk(a)) => a.stop(net),
            Some(App::OnOff(a)) => a.stop(net),
            None => {}
        }
    }

    /// 修改 on/off 应用速率；目标不是 on/off 应用时返回 false。
    pub(crate) fn set_rate(&mut self, id: AppId, rate_bps: u64, sim: &mut Simulator) -> bool {
        match self.on_off_mut(id) {
            Some(a) => {
                a.set_rate(id, rate_bps, sim);
                true
            }
            None => false,
        }
    }
}

/// 启动发送端应用
#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let NetWorld { net, apps, .. } = w;
        apps.start(self.app, sim, net);
    }
}

/// 停止发送端应用
#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

impl Event for AppStop {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let NetWorld { net, apps, .. } = w;
        apps.stop(self.app, net);
    }
}
