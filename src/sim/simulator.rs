//! 仿真器
//!
//! 维护虚拟时钟与事件队列。`run` 从一个事件跳到下一个事件，直到队列为空或到达停止时间；
//! 运行期间不提供轮询或取消入口。

use super::event::{Event, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    stop_at: Option<SimTime>,
    executed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在绝对时间 `at` 执行；早于当前时间的请求按当前时间处理。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(
            now = ?self.now,
            at = ?at,
            seq,
            event_type = std::any::type_name::<E>(),
            "调度事件"
        );
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 调度事件在 `now + delay` 执行。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    /// 设置停止时间：`run` 不会执行晚于该时刻的事件。
    pub fn stop_at(&mut self, at: SimTime) {
        debug!(stop_at = %at, "设置仿真停止时间");
        self.stop_at = Some(at);
    }

    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_at
    }

    /// 运行直到事件队列为空或到达 `until`（含 `until` 时刻的事件），结束时时间推进到 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        self.drain(Some(until), world);
        self.now = self.now.max(until);
    }

    /// 运行到停止时间；未设置停止时间时运行到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!(stop_at = ?self.stop_at, pending = self.q.len(), "▶️  开始运行仿真");
        let before = self.executed;
        match self.stop_at {
            Some(until) => self.run_until(until, world),
            None => self.drain(None, world),
        }
        info!(
            events = self.executed - before,
            final_time = %self.now,
            remaining = self.q.len(),
            "✅ 仿真完成"
        );
    }

    fn drain(&mut self, until: Option<SimTime>, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if until.is_some_and(|u| top.at > u) {
                break;
            }
            let Some(item) = self.q.pop() else {
                break;
            };
            self.now = item.at;
            self.executed = self.executed.wrapping_add(1);
            item.ev.execute(self, world);
            world.on_tick(self);
        }
    }

    /// 拆除：丢弃所有未执行事件。时间停留在当前值。
    pub fn destroy(&mut self) {
        debug!(dropped = self.q.len(), "销毁仿真器，丢弃剩余事件");
        self.q.clear();
        self.stop_at = None;
    }
}
