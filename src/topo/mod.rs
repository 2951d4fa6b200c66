//! 拓扑模块
//!
//! `builder` 描述拓扑（纯数据），`install` 把描述写进仿真网络；
//! 其余文件是各实验场景用到的具体形状。

pub mod asymmetric;
pub mod builder;
pub mod cellular;
pub mod chain;
pub mod dumbbell;
pub mod install;

pub use asymmetric::{Asymmetric, AsymmetricOpts, build_asymmetric};
pub use builder::{
    DEFAULT_DEVICE_QUEUE, LinkClass, LinkProfile, NodeIndex, NodeSpec, RoutingMode, SegmentSpec,
    Side, StaticRouteSpec, Topology, TopologyBuilder, TopologyError,
};
pub use cellular::{Cellular, CellularOpts, build_cellular};
pub use chain::{Chain, ChainOpts, build_chain};
pub use dumbbell::{Dumbbell, DumbbellOpts, build_dumbbell};
pub use install::{InstalledTopology, install};
