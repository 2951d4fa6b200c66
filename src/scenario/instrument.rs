//! 观测：拥塞窗口追踪与流统计
//!
//! cwnd 追踪器在 t = 0.1s 挂到代表节点上，只订阅该时刻节点上已有的 TCP 发送端；
//! 每次变化写一行 `time_s,old,new`（无表头）。流统计覆盖所有节点，运行结束时写成 XML。

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::ExperimentError;
use crate::net::{FlowMonitor, NetWorld, NodeId};
use crate::proto::tcp::{CwndChange, CwndObserver};
use crate::sim::{Event, SimTime, Simulator, World};

/// 追踪器挂载时刻
pub const CWND_ATTACH_AT: SimTime = SimTime::from_millis(100);

/// 把 cwnd 变化写进 CSV 文件
pub struct CwndTracer {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
    records: Rc<Cell<u64>>,
    error: Option<csv::Error>,
}

impl CwndTracer {
    /// 创建（截断）输出文件
    pub fn create(path: &Path) -> Result<Self, ExperimentError> {
        let file = File::create(path).map_err(|e| ExperimentError::io(path, e))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            records: Rc::new(Cell::new(0)),
            error: None,
        })
    }

    /// 已写记录数的句柄（追踪器交给仿真世界后仍可读取）
    pub fn record_counter(&self) -> Rc<Cell<u64>> {
        Rc::clone(&self.records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CwndObserver for CwndTracer {
    fn on_cwnd_change(&mut self, change: CwndChange) {
        if self.error.is_some() {
            return;
        }
        let row = [
            change.at.as_secs_f64().to_string(),
            change.old.to_string(),
            change.new.to_string(),
        ];
        match self.writer.write_record(&row) {
            Ok(()) => self.records.set(self.records.get() + 1),
            Err(e) => self.error = Some(e),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e.into());
        }
        self.writer.flush()
    }
}

/// 在节点上挂 cwnd 追踪：订阅此刻节点上全部 TCP 发送端
#[derive(Debug)]
pub struct AttachCwndTracer {
    pub node: NodeId,
}

impl Event for AttachCwndTracer {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let sockets = w.net.tcp.sockets_on(self.node);
        for id in &sockets {
            w.net.tcp.trace(*id);
        }
        info!(node = ?self.node, sockets = sockets.len(), "📈 cwnd 追踪已挂载");
    }
}

/// 安装 cwnd 追踪器：创建文件、交给仿真世界，并登记挂载事件。返回记录数句柄。
pub fn install_cwnd_tracer(
    path: &Path,
    node: NodeId,
    sim: &mut Simulator,
    world: &mut NetWorld,
) -> Result<Rc<Cell<u64>>, ExperimentError> {
    let tracer = CwndTracer::create(path)?;
    let counter = tracer.record_counter();
    world.cwnd_observer = Some(Box::new(tracer));
    sim.schedule(CWND_ATTACH_AT, AttachCwndTracer { node });
    debug!(path = %path.display(), node = ?node, "登记 cwnd 追踪器");
    Ok(counter)
}

/// 刷新 cwnd 追踪器并从仿真世界取下
pub fn finish_cwnd_tracer(path: &Path, world: &mut NetWorld) -> Result<(), ExperimentError> {
    if let Some(mut obs) = world.cwnd_observer.take() {
        obs.flush().map_err(|e| ExperimentError::io(path, e))?;
    }
    Ok(())
}

/// 在所有节点上启用流统计
pub fn enable_flow_monitor(world: &mut NetWorld) {
    world.net.monitor = Some(FlowMonitor::default());
}

/// 写出流统计 XML；未启用时不写文件，返回 `None`。
pub fn write_flow_monitor(path: &Path, world: &NetWorld) -> Result<Option<usize>, ExperimentError> {
    let Some(monitor) = world.net.monitor.as_ref() else {
        return Ok(None);
    };
    let file = File::create(path).map_err(|e| ExperimentError::io(path, e))?;
    monitor
        .write_xml(BufWriter::new(file))
        .map_err(|e| ExperimentError::io(path, e))?;
    info!(path = %path.display(), flows = monitor.len(), "💾 流统计已写出");
    Ok(Some(monitor.len()))
}
