//! 扰动调度
//!
//! 扰动是显式的 `(时刻, 动作)` 列表，安装时逐条登记到事件队列。
//! 目前唯一的动作是修改某条流发送端的速率（用于模拟无线遮挡）。

use serde::Serialize;
use tracing::{debug, info};

use super::traffic::InstalledFlow;
use crate::app::AppId;
use crate::error::ExperimentError;
use crate::net::NetWorld;
use crate::sim::{Event, SimTime, Simulator, World};

/// 遮挡开始时刻
pub const BLOCKAGE_START: SimTime = SimTime::from_secs(30);
/// 遮挡期间的速率
pub const BLOCKAGE_RATE_BPS: u64 = 1;
/// 遮挡结束后恢复的速率
pub const RESTORE_RATE_BPS: u64 = 50_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum PerturbationAction {
    /// `flow` 为场景流列表中的下标
    SetRate { flow: usize, rate_bps: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Perturbation {
    pub at: SimTime,
    pub action: PerturbationAction,
}

/// 一次遮挡：`start` 时降到 1bps，`start + duration` 时恢复。
///
/// 恢复时刻晚于运行结束时不做处理：该事件不会执行，发送端保持降速状态。
pub fn blockage(flow: usize, start: SimTime, duration: SimTime) -> Vec<Perturbation> {
    vec![
        Perturbation {
            at: start,
            action: PerturbationAction::SetRate {
                flow,
                rate_bps: BLOCKAGE_RATE_BPS,
            },
        },
        Perturbation {
            at: start.saturating_add(duration),
            action: PerturbationAction::SetRate {
                flow,
                rate_bps: RESTORE_RATE_BPS,
            },
        },
    ]
}

/// 执行一条扰动
#[derive(Debug)]
pub struct ApplyPerturbation {
    pub app: AppId,
    pub action: PerturbationAction,
}

impl Event for ApplyPerturbation {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        match self.action {
            PerturbationAction::SetRate { rate_bps, .. } => {
                if w.apps.set_rate(self.app, rate_bps, sim) {
                    info!(app = self.app, rate_bps, now = %sim.now(), "⚡ 扰动：修改速率");
                }
            }
        }
    }
}

/// 把扰动登记到事件队列；引用不存在的流或非 on/off 发送端时报错。
pub fn schedule_perturbations(
    perturbations: &[Perturbation],
    flows: &[InstalledFlow],
    sim: &mut Simulator,
    world: &NetWorld,
) -> Result<usize, ExperimentError> {
    for p in perturbations {
        let PerturbationAction::SetRate { flow, .. } = p.action;
        let app = flows.get(flow).map(|f| f.app).ok_or_else(|| {
            ExperimentError::InvalidFlow(format!("perturbation targets unknown flow {flow}"))
        })?;
        if world.apps.on_off(app).is_none() {
            return Err(ExperimentError::InvalidFlow(format!(
                "perturbation targets flow {flow}, which has no rate-controlled source"
            )));
        }
        debug!(at = %p.at, flow, app, "登记扰动");
        sim.schedule(p.at, ApplyPerturbation { app, action: p.action });
    }
    Ok(perturbations.len())
}
