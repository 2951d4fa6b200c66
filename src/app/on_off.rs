//! On/Off 应用
//!
//! 在 off 期与 on 期之间交替：启动后先进入 off 期，on 期内以 `rate_bps` 均匀发出
//! 固定大小的包。承载可以是 TCP（写入连接的发送缓冲）或 UDP（直接发数据报）。
//! 速率可在运行中修改，修改立即重排下一次发送。

use std::net::Ipv4Addr;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use tracing::{debug, trace};

use super::AppId;
use crate::net::{NetWorld, Network, NodeId, Transport};
use crate::proto::tcp::{TcpConfig, TcpConnId, TcpOpen, TcpSource};
use crate::sim::{Event, SimTime, Simulator, World};

/// IPv4 + UDP 头部
const UDP_HEADER_BYTES: u32 = 28;

/// on/off 时长分布
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnOffTime {
    Constant(SimTime),
    Exponential { mean: SimTime },
}

impl OnOffTime {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> SimTime {
        match *self {
            OnOffTime::Constant(t) => t,
            OnOffTime::Exponential { mean } => {
                let mean_s = mean.as_secs_f64();
                match Exp::new(1.0 / mean_s) {
                    Ok(exp) if mean_s > 0.0 => SimTime::from_secs_f64(exp.sample(rng)),
                    _ => SimTime::ZERO,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum OnOffProtocol {
    Tcp(TcpConfig),
    Udp,
}

#[derive(Debug, Clone)]
pub struct OnOffConfig {
    pub rate_bps: u64,
    /// 应用层包大小（字节）
    pub packet_bytes: u32,
    pub on: OnOffTime,
    pub off: OnOffTime,
    pub protocol: OnOffProtocol,
}

impl OnOffConfig {
    /// 一直处于 on 期
    pub fn always_on(rate_bps: u64, packet_bytes: u32, protocol: OnOffProtocol) -> Self {
        Self {
            rate_bps,
            packet_bytes,
            on: OnOffTime::Constant(SimTime::MAX),
            off: OnOffTime::Constant(SimTime::ZERO),
            protocol,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnOffApp {
    pub node: NodeId,
    pub local: Ipv4Addr,
    pub remote: Ipv4Addr,
    pub port: u16,
    cfg: OnOffConfig,
    rng: ChaCha8Rng,
    running: bool,
    sending: bool,
    period_gen: u64,
    tx_gen: u64,
    conn: Option<TcpConnId>,
    local_port: u16,
    packets_sent: u64,
    bytes_sent: u64,
    on_periods: u64,
}

impl OnOffApp {
    pub fn new(
        node: NodeId,
        local: Ipv4Addr,
        remote: (Ipv4Addr, u16),
        cfg: OnOffConfig,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            node,
            local,
            remote: remote.0,
            port: remote.1,
            cfg,
            rng,
            running: false,
            sending: false,
            period_gen: 0,
            tx_gen: 0,
            conn: None,
            local_port: 0,
            packets_sent: 0,
            bytes_sent: 0,
            on_periods: 0,
        }
    }

    pub fn config(&self) -> &OnOffConfig {
        &self.cfg
    }

    pub fn rate_bps(&self) -> u64 {
        self.cfg.rate_bps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 是否处于 on 期
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn conn(&self) -> Option<TcpConnId> {
        self.conn
    }

    /// 已交给传输层的包数（TCP 发送缓冲已满时写入失败，不计）
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn on_periods(&self) -> u64 {
        self.on_periods
    }

    /// 两个包之间的间隔；速率为 0 时不发送
    fn tx_interval(&self) -> Option<SimTime> {
        if self.cfg.rate_bps == 0 {
            return None;
        }
        let bits = self.cfg.packet_bytes as u128 * 8;
        let ns = bits * 1_000_000_000 / self.cfg.rate_bps as u128;
        Some(SimTime(ns.min(u64::MAX as u128) as u64))
    }

    pub(crate) fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) {
        if self.running {
            return;
        }
        self.running = true;
        match &self.cfg.protocol {
            OnOffProtocol::Tcp(tcp_cfg) => {
                let req = TcpOpen {
                    src: self.node,
                    src_addr: self.local,
                    dst_addr: self.remote,
                    dst_port: self.port,
                    source: TcpSource::Application,
                };
                let mut tcp = std::mem::take(&mut net.tcp);
                self.conn = Some(tcp.open(req, tcp_cfg.clone(), sim, net));
                net.tcp = tcp;
            }
            OnOffProtocol::Udp => {
                self.local_port = net.alloc_ephemeral_port();
            }
        }
        debug!(app = id, dst = %self.remote, port = self.port, rate_bps = self.cfg.rate_bps, "on/off 应用启动");
        self.begin_off(id, sim);
    }

    pub(crate) fn stop(&mut self, net: &mut Network) {
        self.running = false;
        self.sending = false;
        self.period_gen += 1;
        self.tx_gen += 1;
        if let Some(id) = self.conn {
            net.tcp.close(id);
        }
    }

    fn begin_off(&mut self, id: AppId, sim: &mut Simulator) {
        self.sending = false;
        self.period_gen += 1;
        self.tx_gen += 1;
        let d = self.cfg.off.sample(&mut self.rng);
        sim.schedule_in(
            d,
            OnOffPeriod {
                app: id,
                generation: self.period_gen,
                on: true,
            },
        );
    }

    fn begin_on(&mut self, id: AppId, sim: &mut Simulator) {
        self.sending = true;
        self.on_periods += 1;
        self.period_gen += 1;
        self.tx_gen += 1;
        let d = self.cfg.on.sample(&mut self.rng);
        if d != SimTime::MAX {
            sim.schedule_in(
                d,
                OnOffPeriod {
                    app: id,
                    generation: self.period_gen,
                    on: false,
                },
            );
        }
        self.schedule_next_tx(id, sim);
    }

    fn schedule_next_tx(&mut self, id: AppId, sim: &mut Simulator) {
        if let Some(dt) = self.tx_interval() {
            sim.schedule_in(
                dt,
                OnOffSend {
                    app: id,
                    generation: self.tx_gen,
                },
            );
        }
    }

    /// 修改发送速率；on 期内立即按新速率重排下一次发送。
    pub(crate) fn set_rate(&mut self, id: AppId, rate_bps: u64, sim: &mut Simulator) {
        debug!(app = id, old = self.cfg.rate_bps, new = rate_bps, "修改 on/off 速率");
        self.cfg.rate_bps = rate_bps;
        self.tx_gen += 1;
        if self.running && self.sending {
            self.schedule_next_tx(id, sim);
        }
    }

    fn on_period(&mut self, id: AppId, generation: u64, on: bool, sim: &mut Simulator) {
        if generation != self.period_gen || !self.running {
            return;
        }
        if on {
            self.begin_on(id, sim);
        } else {
            self.begin_off(id, sim);
        }
    }

    fn on_send(&mut self, id: AppId, generation: u64, sim: &mut Simulator, net: &mut Network) {
        if generation != self.tx_gen || !self.running || !self.sending {
            return;
        }
        let bytes = self.cfg.packet_bytes;
        let accepted = match self.conn {
            Some(conn) => {
                let mut tcp = std::mem::take(&mut net.tcp);
                let n = tcp.write(conn, bytes as u64, sim, net);
                net.tcp = tcp;
                n == bytes as u64
            }
            None => {
                let pkt = net.make_packet(
                    0,
                    (self.local, self.local_port),
                    (self.remote, self.port),
                    bytes.saturating_add(UDP_HEADER_BYTES),
                    Transport::Udp,
                );
                net.send_from(self.node, pkt, sim);
                true
            }
        };
        if accepted {
            self.packets_sent += 1;
            self.bytes_sent += bytes as u64;
        } else {
            trace!(app = id, "发送缓冲已满，丢弃本次写入");
        }
        self.schedule_next_tx(id, sim);
    }
}

/// on/off 期切换；`on == true` 表示进入 on 期
#[derive(Debug)]
pub struct OnOffPeriod {
    pub app: AppId,
    pub generation: u64,
    pub on: bool,
}

impl Event for OnOffPeriod {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        if let Some(app) = w.apps.on_off_mut(self.app) {
            app.on_period(self.app, self.generation, self.on, sim);
        }
    }
}

/// 发出一个包
#[derive(Debug)]
pub struct OnOffSend {
    pub app: AppId,
    pub generation: u64,
}

impl Event for OnOffSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let NetWorld { net, apps, .. } = w;
        if let Some(app) = apps.on_off_mut(self.app) {
            app.on_send(self.app, self.generation, sim, net);
        }
    }
}
