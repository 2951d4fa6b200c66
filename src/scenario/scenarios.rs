//! 场景描述 S1–S5
//!
//! 每个场景只产出一份纯数据的 `ScenarioPlan`：拓扑、流、cwnd 追踪节点、扰动列表。
//! 安装与运行由编排器统一完成。

use std::net::Ipv4Addr;

use super::options::ScenarioId;
use super::perturbation::{BLOCKAGE_START, Perturbation, blockage};
use super::traffic::{FlowSpec, TrafficClass};
use crate::error::ExperimentError;
use crate::queue::QueueSize;
use crate::sim::SimTime;
use crate::topo::{
    AsymmetricOpts, CellularOpts, ChainOpts, DumbbellOpts, NodeIndex, Topology, build_asymmetric,
    build_cellular, build_chain, build_dumbbell,
};

/// 场景构建所需的运行参数
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub queue: QueueSize,
    pub loss: f64,
    pub blockage: SimTime,
    pub duration: SimTime,
}

#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub topology: Topology,
    pub flows: Vec<FlowSpec>,
    /// cwnd 追踪挂载的节点
    pub trace_node: NodeIndex,
    pub perturbations: Vec<Perturbation>,
}

pub trait ScenarioDescriptor {
    fn id(&self) -> ScenarioId;

    fn summary(&self) -> &'static str;

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError>;
}

fn require(addr: Option<Ipv4Addr>, node: &str) -> Result<Ipv4Addr, ExperimentError> {
    addr.ok_or_else(|| ExperimentError::InvalidFlow(format!("{node} has no address")))
}

/// dumbbell：左 i → 右 i 各一条 bulk，全程运行
fn dumbbell_plan(id: ScenarioId, opts: DumbbellOpts, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
    let d = build_dumbbell(id.as_str(), &opts)?;
    let mut flows = Vec::with_capacity(opts.pairs);
    for (i, (&l, &r)) in d.left.iter().zip(&d.right).enumerate() {
        let addr = require(d.right_addr(i), "right host")?;
        flows.push(FlowSpec::bulk((l, r), addr, SimTime::ZERO, ctx.duration));
    }
    let trace_node = *d
        .left
        .first()
        .ok_or_else(|| ExperimentError::InvalidFlow("dumbbell has no left hosts".to_string()))?;
    Ok(ScenarioPlan {
        trace_node,
        topology: d.topology,
        flows,
        perturbations: Vec::new(),
    })
}

/// 基线 dumbbell
pub struct BaselineDumbbell;

impl ScenarioDescriptor for BaselineDumbbell {
    fn id(&self) -> ScenarioId {
        ScenarioId::S1
    }

    fn summary(&self) -> &'static str {
        "dumbbell, 2 bulk flows over a 20Mbps/15ms bottleneck"
    }

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
        dumbbell_plan(self.id(), DumbbellOpts::s1(ctx.queue), ctx)
    }
}

/// 非对称 RTT + web 突发
pub struct AsymmetricRtt;

impl ScenarioDescriptor for AsymmetricRtt {
    fn id(&self) -> ScenarioId {
        ScenarioId::S2
    }

    fn summary(&self) -> &'static str {
        "dumbbell with 1ms vs 60ms access links plus web-like on/off traffic"
    }

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
        let t = build_asymmetric(self.id().as_str(), &AsymmetricOpts::s2(ctx.queue))?;
        let [l0, l1] = t.left;
        let [r0, r1] = t.right;
        let r0_addr = require(t.addr(r0), "right0")?;
        let r1_addr = require(t.addr(r1), "right1")?;
        let l1_addr = require(t.addr(l1), "left1")?;
        let web_start = SimTime::from_secs(5);
        let end = ctx.duration;

        let flows = vec![
            FlowSpec::bulk((l0, r0), r0_addr, SimTime::ZERO, end),
            FlowSpec::bulk((l1, r1), r1_addr, SimTime::ZERO, end),
            FlowSpec::web((l0, r1), r1_addr, web_start, end),
            FlowSpec::web((r0, l1), l1_addr, web_start, end),
        ];
        Ok(ScenarioPlan {
            topology: t.topology,
            flows,
            trace_node: l0,
            perturbations: Vec::new(),
        })
    }
}

/// 有损链路 + UDP 背景流量
pub struct LossyChain;

impl ScenarioDescriptor for LossyChain {
    fn id(&self) -> ScenarioId {
        ScenarioId::S3
    }

    fn summary(&self) -> &'static str {
        "4-node chain with random loss on the bottleneck and UDP cross traffic"
    }

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
        let c = build_chain(self.id().as_str(), &ChainOpts::s3(ctx.queue, ctx.loss))?;
        let addr = require(c.receiver_addr(), "receiver")?;
        let ends = (c.sender, c.receiver);
        let flows = vec![
            FlowSpec::bulk(ends, addr, SimTime::ZERO, ctx.duration),
            FlowSpec::cross(ends, addr, SimTime::from_secs(5), ctx.duration),
        ];
        Ok(ScenarioPlan {
            topology: c.topology,
            flows,
            trace_node: c.sender,
            perturbations: Vec::new(),
        })
    }
}

/// 蜂窝接入 + 视频流遮挡
pub struct CellularBlockage;

impl ScenarioDescriptor for CellularBlockage {
    fn id(&self) -> ScenarioId {
        ScenarioId::S4
    }

    fn summary(&self) -> &'static str {
        "cellular access with a 50Mbps video stream throttled during a blockage"
    }

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
        let c = build_cellular(self.id().as_str(), &CellularOpts::default())?;
        let ue_addr = require(c.ue_addr(), "ue")?;
        let remote_addr = require(c.remote_addr(), "remote")?;
        let end = ctx.duration;

        let flows = vec![
            FlowSpec::stream(
                (c.remote, c.ue),
                ue_addr,
                (SimTime::ZERO, SimTime::from_secs(1)),
                end,
            ),
            FlowSpec::new(
                TrafficClass::Bulk,
                (c.ue, c.remote),
                remote_addr,
                (SimTime::ZERO, SimTime::from_secs(5)),
                end,
            ),
        ];
        Ok(ScenarioPlan {
            topology: c.topology,
            flows,
            trace_node: c.remote,
            perturbations: blockage(0, BLOCKAGE_START, ctx.blockage),
        })
    }
}

/// 多流竞争
pub struct ManyFlowDumbbell;

impl ScenarioDescriptor for ManyFlowDumbbell {
    fn id(&self) -> ScenarioId {
        ScenarioId::S5
    }

    fn summary(&self) -> &'static str {
        "dumbbell, 8 bulk flows over a 100Mbps/20ms bottleneck"
    }

    fn plan(&self, ctx: &ScenarioContext) -> Result<ScenarioPlan, ExperimentError> {
        dumbbell_plan(self.id(), DumbbellOpts::s5(ctx.queue), ctx)
    }
}

pub fn descriptor(id: ScenarioId) -> &'static dyn ScenarioDescriptor {
    match id {
        ScenarioId::S1 => &BaselineDumbbell,
        ScenarioId::S2 => &AsymmetricRtt,
        ScenarioId::S3 => &LossyChain,
        ScenarioId::S4 => &CellularBlockage,
        ScenarioId::S5 => &ManyFlowDumbbell,
    }
}
