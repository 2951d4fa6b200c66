//! 实验场景组合层
//!
//! 运行参数、TCP 变体解析、输出目录、流量安装、观测、扰动、S1–S5 场景描述与编排。

pub mod instrument;
pub mod options;
pub mod orchestrator;
pub mod output;
pub mod perturbation;
pub mod scenarios;
pub mod tcp_variant;
pub mod traffic;

pub use options::{RuntimeOptions, ScenarioId};
pub use orchestrator::{RunReport, RunState, run};
pub use output::OutputLayout;
pub use perturbation::{Perturbation, PerturbationAction};
pub use scenarios::{ScenarioContext, ScenarioDescriptor, ScenarioPlan, descriptor};
pub use tcp_variant::{TransportDefaults, resolve_tcp};
pub use traffic::{FlowSpec, InstalledFlow, TrafficClass};
