//! 世界 trait
//!
//! 仿真器只负责推进时间与派发事件，具体状态（网络、应用、观测）由 World 持有。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如网络拓扑、应用、统计）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完后回调一次，可用于冲刷观测数据。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
