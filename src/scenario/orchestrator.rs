//! 场景编排
//!
//! 一次运行的完整流程：
//! 校验参数 → 解析 TCP 变体 → 创建输出目录 → 场景描述 → 安装拓扑 → 安装流量 →
//! 挂观测 → 登记扰动 → 运行到时长上限 → 写出产物 → 拆除仿真器。
//! 任一步失败即中止，不重试。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::instrument::{
    enable_flow_monitor, finish_cwnd_tracer, install_cwnd_tracer, write_flow_monitor,
};
use super::options::{RuntimeOptions, ScenarioId};
use super::output::OutputLayout;
use super::perturbation::{Perturbation, schedule_perturbations};
use super::scenarios::{ScenarioContext, descriptor};
use super::tcp_variant::resolve_tcp;
use super::traffic::{InstalledFlow, install_flows};
use crate::error::ExperimentError;
use crate::net::{NetWorld, NodeId, Stats};
use crate::proto::tcp::{TcpConnId, TcpState};
use crate::queue::QueueSize;
use crate::sim::{SimTime, Simulator};
use crate::topo::install;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Configured,
    TopologyBuilt,
    TrafficInstalled,
    InstrumentationAttached,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifacts {
    pub dir: PathBuf,
    pub cwnd: PathBuf,
    pub flowmon: Option<PathBuf>,
    pub manifest: PathBuf,
}

/// 运行结束时每条 TCP 连接的概况
#[derive(Debug, Clone, Serialize)]
pub struct ConnSummary {
    pub id: TcpConnId,
    pub node: NodeId,
    pub dst_port: u16,
    pub state: TcpState,
    pub traced: bool,
    pub bytes_acked: u64,
    pub bytes_received: u64,
    pub cwnd_bytes: u64,
    pub retransmits: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: ScenarioId,
    pub summary: &'static str,
    pub tcp_variant: &'static str,
    pub queue: String,
    pub run: u32,
    pub duration_s: f64,
    pub warmup_s: f64,
    pub loss: f64,
    pub blockage_s: f64,
    pub state: RunState,
    pub artifacts: Artifacts,
    pub nodes: usize,
    pub links: usize,
    pub flows: Vec<InstalledFlow>,
    pub perturbations: Vec<Perturbation>,
    pub cwnd_records: u64,
    pub monitored_flows: Option<usize>,
    pub events: u64,
    pub final_time: SimTime,
    pub stats: Stats,
    pub connections: Vec<ConnSummary>,
}

struct Orchestrator<'a> {
    opts: &'a RuntimeOptions,
    state: RunState,
}

impl Orchestrator<'_> {
    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "运行状态切换");
        self.state = next;
    }

    fn execute(&mut self) -> Result<RunReport, ExperimentError> {
        let opts = self.opts;
        opts.validate()?;
        let scenario = opts.scenario_id()?;
        let defaults = resolve_tcp(&opts.tcp)?;
        let queue: QueueSize = opts.queue.parse().map_err(|source| ExperimentError::Queue {
            queue: opts.queue.clone(),
            source,
        })?;
        let variant = defaults.variant.type_name();
        let layout = OutputLayout::create(&opts.results_dir, scenario, variant, opts.run)?;

        let desc = descriptor(scenario);
        info!(scenario = %scenario, tcp = variant, run = opts.run, "🧪 {}", desc.summary());
        let ctx = ScenarioContext {
            queue,
            loss: opts.loss,
            blockage: opts.blockage(),
            duration: opts.duration(),
        };
        let plan = desc.plan(&ctx)?;

        let mut sim = Simulator::default();
        let mut world = NetWorld::default();
        let run = u64::from(opts.run);

        let installed = install(&plan.topology, &mut world.net, run)?;
        self.advance(RunState::TopologyBuilt);

        let flows = install_flows(
            &plan.flows,
            &plan.topology,
            &installed,
            &defaults,
            run,
            &mut sim,
            &mut world,
        )?;
        self.advance(RunState::TrafficInstalled);

        let cwnd_path = layout.cwnd_path();
        let trace_node = installed.node(plan.trace_node)?;
        let cwnd_records = install_cwnd_tracer(&cwnd_path, trace_node, &mut sim, &mut world)?;
        if opts.flow_monitor {
            enable_flow_monitor(&mut world);
        }
        schedule_perturbations(&plan.perturbations, &flows, &mut sim, &world)?;
        self.advance(RunState::InstrumentationAttached);

        sim.stop_at(ctx.duration);
        self.advance(RunState::Running);
        sim.run(&mut world);

        finish_cwnd_tracer(&cwnd_path, &mut world)?;
        let flowmon_path = layout.flowmon_path();
        let monitored_flows = write_flow_monitor(&flowmon_path, &world)?;
        let events = sim.executed();
        let final_time = sim.now();
        sim.destroy();
        self.advance(RunState::Completed);

        let connections = world
            .net
            .tcp
            .conns()
            .map(|c| ConnSummary {
                id: c.id,
                node: c.src,
                dst_port: c.dst_port,
                state: c.state(),
                traced: c.is_traced(),
                bytes_acked: c.bytes_acked(),
                bytes_received: c.bytes_received(),
                cwnd_bytes: c.cwnd_bytes(),
                retransmits: c.retransmits(),
                timeouts: c.timeouts(),
            })
            .collect();

        let report = RunReport {
            scenario,
            summary: desc.summary(),
            tcp_variant: variant,
            queue: queue.to_string(),
            run: opts.run,
            duration_s: opts.time_s,
            warmup_s: opts.warmup_s,
            loss: opts.loss,
            blockage_s: opts.blockage_s,
            state: self.state,
            artifacts: Artifacts {
                dir: layout.dir().to_path_buf(),
                cwnd: cwnd_path,
                flowmon: monitored_flows.map(|_| flowmon_path),
                manifest: layout.manifest_path(),
            },
            nodes: world.net.nodes().len(),
            links: world.net.links().len(),
            flows,
            perturbations: plan.perturbations,
            cwnd_records: cwnd_records.get(),
            monitored_flows,
            events,
            final_time,
            stats: world.net.stats.clone(),
            connections,
        };
        write_manifest(&report)?;
        Ok(report)
    }
}

fn write_manifest(report: &RunReport) -> Result<(), ExperimentError> {
    let path = &report.artifacts.manifest;
    let file = File::create(path).map_err(|e| ExperimentError::io(path, e))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, report)?;
    w.flush().map_err(|e| ExperimentError::io(path, e))
}

/// 执行一次实验运行
#[tracing::instrument(skip(opts), fields(scenario = %opts.scenario, tcp = %opts.tcp, run = opts.run))]
pub fn run(opts: &RuntimeOptions) -> Result<RunReport, ExperimentError> {
    let mut orch = Orchestrator {
        opts,
        state: RunState::Configured,
    };
    match orch.execute() {
        Ok(report) => {
            info!(
                dir = %report.artifacts.dir.display(),
                events = report.events,
                cwnd_records = report.cwnd_records,
                "✅ 运行完成"
            );
            Ok(report)
        }
        Err(e) => {
            orch.advance(RunState::Aborted);
            warn!(error = %e, "❌ 运行中止");
            Err(e)
        }
    }
}
