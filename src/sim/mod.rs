//! 仿真核心模块
//!
//! 单线程、事件驱动：所有安装动作（拓扑、流量、观测、扰动）都只是往虚拟时钟上登记事件，
//! 真正的推进只发生在 `Simulator::run` 中。

mod event;
pub mod rng;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub(crate) use event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
