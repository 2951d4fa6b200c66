//! TCP（简化版）协议实现
//!
//! 支持对比实验所需的最小功能：
//! - SYN / SYN-ACK 握手；目的端口无监听时回 RST
//! - Reno 风格拥塞控制（慢启动 + AIMD），3 dupACK 快速重传，NewReno 部分确认
//! - RFC 6298 风格的 RTO 估计与指数退避
//! - 接收端乱序缓存、按接收缓冲与窗口缩放限制发送窗口
//! - 拥塞窗口变化钩子（供 cwnd 追踪器使用）
//!
//! 注意：所有 socket 类型共用这一套窗口演化逻辑；`TcpSocketType` 只是被记录和透传。

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::net::{NetWorld, Network, NodeId, Packet, TcpSegment, Transport};
use crate::sim::{Event, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（同时写在数据包的 `conn_id` 上）。
pub type TcpConnId = u64;

/// 引擎可识别的 TCP socket 类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TcpSocketType {
    NewReno,
    LinuxReno,
    Cubic,
    Bic,
    HighSpeed,
    Htcp,
    Hybla,
    Vegas,
    Veno,
    Scalable,
    WestwoodPlus,
    Yeah,
    Illinois,
    Ledbat,
    Lp,
    Dctcp,
    Bbr,
}

impl TcpSocketType {
    pub const ALL: [TcpSocketType; 17] = [
        TcpSocketType::NewReno,
        TcpSocketType::LinuxReno,
        TcpSocketType::Cubic,
        TcpSocketType::Bic,
        TcpSocketType::HighSpeed,
        TcpSocketType::Htcp,
        TcpSocketType::Hybla,
        TcpSocketType::Vegas,
        TcpSocketType::Veno,
        TcpSocketType::Scalable,
        TcpSocketType::WestwoodPlus,
        TcpSocketType::Yeah,
        TcpSocketType::Illinois,
        TcpSocketType::Ledbat,
        TcpSocketType::Lp,
        TcpSocketType::Dctcp,
        TcpSocketType::Bbr,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            TcpSocketType::NewReno => "TcpNewReno",
            TcpSocketType::LinuxReno => "TcpLinuxReno",
            TcpSocketType::Cubic => "TcpCubic",
            TcpSocketType::Bic => "TcpBic",
            TcpSocketType::HighSpeed => "TcpHighSpeed",
            TcpSocketType::Htcp => "TcpHtcp",
            TcpSocketType::Hybla => "TcpHybla",
            TcpSocketType::Vegas => "TcpVegas",
            TcpSocketType::Veno => "TcpVeno",
            TcpSocketType::Scalable => "TcpScalable",
            TcpSocketType::WestwoodPlus => "TcpWestwoodPlus",
            TcpSocketType::Yeah => "TcpYeah",
            TcpSocketType::Illinois => "TcpIllinois",
            TcpSocketType::Ledbat => "TcpLedbat",
            TcpSocketType::Lp => "TcpLp",
            TcpSocketType::Dctcp => "TcpDctcp",
            TcpSocketType::Bbr => "TcpBbr",
        }
    }

    /// 按类型名精确查找（区分大小写），接受可选的 `ns3::` 前缀。
    pub fn lookup(name: &str) -> Option<TcpSocketType> {
        let name = name.strip_prefix("ns3::").unwrap_or(name);
        Self::ALL.into_iter().find(|t| t.type_name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct TcpConfig {
    pub socket_type: TcpSocketType,
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// IP + TCP 基本头部（字节）
    pub header_bytes: u32,
    /// 启用时每段额外携带 12 字节时间戳选项
    pub timestamps: bool,
    /// 关闭时通告窗口上限为 65535 字节
    pub window_scaling: bool,
    pub snd_buf_bytes: u64,
    pub rcv_buf_bytes: u64,
    /// 初始 cwnd（MSS 个数）
    pub init_cwnd_segments: u32,
    pub init_ssthresh_bytes: u64,
    pub init_rto: SimTime,
    pub min_rto: SimTime,
    pub max_rto: SimTime,
    /// SYN 最多重传次数
    pub syn_retries: u32,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            socket_type: TcpSocketType::NewReno,
            mss: 1448,
            header_bytes: 40,
            timestamps: true,
            window_scaling: true,
            snd_buf_bytes: 128 * 1024,
            rcv_buf_bytes: 128 * 1024,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX as u64,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            syn_retries: 6,
        }
    }
}

impl TcpConfig {
    /// 载荷为 `payload` 的段在线上的字节数
    pub fn wire_bytes(&self, payload: u32) -> u32 {
        let opts = if self.timestamps { 12 } else { 0 };
        payload
            .saturating_add(self.header_bytes)
            .saturating_add(opts)
    }

    /// 对端可通告的最大窗口
    pub fn max_window(&self) -> u64 {
        if self.window_scaling {
            self.rcv_buf_bytes
        } else {
            self.rcv_buf_bytes.min(65_535)
        }
    }
}

/// 发送端数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSource {
    /// 无限数据（bulk，MaxBytes = 0）
    Unlimited,
    /// 固定字节数后结束
    Bounded(u64),
    /// 由应用按节奏写入（on/off 应用）
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    SynSent,
    Established,
    /// 应用关闭，不再发送
    Closed,
    /// 收到 RST（对端没有监听）
    Reset,
    /// SYN 重传次数用尽
    Failed,
}

/// 一次拥塞窗口变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CwndChange {
    pub at: SimTime,
    pub conn_id: TcpConnId,
    pub node: NodeId,
    pub old: u64,
    pub new: u64,
}

/// 拥塞窗口变化的订阅者
pub trait CwndObserver {
    fn on_cwnd_change(&mut self, change: CwndChange);

    /// 运行结束时调用
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// 打开连接的参数
#[derive(Debug, Clone)]
pub struct TcpOpen {
    pub src: NodeId,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
    pub source: TcpSource,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retx: bool,
}

#[derive(Debug, Clone)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub src: NodeId,
    pub src_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
    pub cfg: TcpConfig,
    state: TcpState,
    source: TcpSource,
    traced: bool,

    // sender
    data_end: Option<u64>,
    snd_una: u64,
    next_seq: u64,
    high_tx: u64,
    cwnd: u64,
    ssthresh: u64,
    dup_acks: u32,
    recover: Option<u64>,
    inflight: BTreeMap<u64, SentSeg>,
    rto: SimTime,
    srtt_ns: Option<f64>,
    rttvar_ns: f64,
    rto_gen: u64,
    rto_armed: bool,
    syn_sent_at: SimTime,
    syn_attempts: u32,

    // receiver
    rcv_node: Option<NodeId>,
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,

    // stats
    opened_at: SimTime,
    established_at: Option<SimTime>,
    done_at: Option<SimTime>,
    retransmits: u64,
    timeouts: u64,
}

impl TcpConn {
    fn new(id: TcpConnId, src_port: u16, req: TcpOpen, cfg: TcpConfig, now: SimTime) -> Self {
        let mss = cfg.mss as u64;
        let cwnd = mss.saturating_mul(cfg.init_cwnd_segments.max(1) as u64);
        let ssthresh = cfg.init_ssthresh_bytes.max(2 * mss);
        let data_end = match req.source {
            TcpSource::Unlimited => None,
            TcpSource::Bounded(n) => Some(n),
            TcpSource::Application => Some(0),
        };
        Self {
            id,
            src: req.src,
            src_addr: req.src_addr,
            src_port,
            dst_addr: req.dst_addr,
            dst_port: req.dst_port,
            rto: cfg.init_rto,
            cfg,
            state: TcpState::SynSent,
            source: req.source,
            traced: false,
            data_end,
            snd_una: 0,
            next_seq: 0,
            high_tx: 0,
            cwnd,
            ssthresh,
            dup_acks: 0,
            recover: None,
            inflight: BTreeMap::new(),
            srtt_ns: None,
            rttvar_ns: 0.0,
            rto_gen: 0,
            rto_armed: false,
            syn_sent_at: now,
            syn_attempts: 0,
            rcv_node: None,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            opened_at: now,
            established_at: None,
            done_at: None,
            retransmits: 0,
            timeouts: 0,
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd
    }

    pub fn ssthresh_bytes(&self) -> u64 {
        self.ssthresh
    }

    pub fn bytes_acked(&self) -> u64 {
        self.snd_una
    }

    /// 接收端按序收到的字节
    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn receiver(&self) -> Option<NodeId> {
        self.rcv_node
    }

    pub fn is_traced(&self) -> bool {
        self.traced
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    pub fn opened_at(&self) -> SimTime {
        self.opened_at
    }

    pub fn established_at(&self) -> Option<SimTime> {
        self.established_at
    }

    pub fn done_at(&self) -> Option<SimTime> {
        self.done_at
    }

    fn flight(&self) -> u64 {
        self.next_seq.saturating_sub(self.snd_una)
    }

    fn window(&self) -> u64 {
        self.cwnd.min(self.cfg.max_window())
    }

    fn mss(&self) -> u64 {
        self.cfg.mss as u64
    }

    fn set_cwnd(&mut self, new: u64, now: SimTime, log: &mut Vec<CwndChange>) {
        let old = self.cwnd;
        if old == new {
            return;
        }
        self.cwnd = new;
        if self.traced {
            log.push(CwndChange {
                at: now,
                conn_id: self.id,
                node: self.src,
                old,
                new,
            });
        }
    }

    fn on_rtt_sample(&mut self, sample: SimTime) {
        let r = sample.as_nanos() as f64;
        match self.srtt_ns {
            None => {
                self.srtt_ns = Some(r);
                self.rttvar_ns = r / 2.0;
            }
            Some(srtt) => {
                self.rttvar_ns = 0.75 * self.rttvar_ns + 0.25 * (srtt - r).abs();
                self.srtt_ns = Some(0.875 * srtt + 0.125 * r);
            }
        }
        let srtt = self.srtt_ns.unwrap_or(r);
        let rto = SimTime((srtt + 4.0 * self.rttvar_ns).max(0.0) as u64);
        self.rto = rto.max(self.cfg.min_rto).min(self.cfg.max_rto);
    }

    fn backoff(&mut self) {
        self.rto = SimTime(self.rto.0.saturating_mul(2)).min(self.cfg.max_rto);
    }

    fn arm_rto(&mut self, sim: &mut Simulator) {
        self.rto_gen = self.rto_gen.wrapping_add(1);
        self.rto_armed = true;
        sim.schedule_in(
            self.rto,
            TcpRto {
                conn_id: self.id,
                generation: self.rto_gen,
            },
        );
    }

    fn cancel_rto(&mut self) {
        self.rto_gen = self.rto_gen.wrapping_add(1);
        self.rto_armed = false;
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    conns: BTreeMap<TcpConnId, TcpConn>,
    next_id: TcpConnId,
    cwnd_changes: Vec<CwndChange>,
}

impl TcpStack {
    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &TcpConn> {
        self.conns.values()
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// 节点上当前存在的发送端 socket
    pub fn sockets_on(&self, node: NodeId) -> Vec<TcpConnId> {
        self.conns
            .values()
            .filter(|c| c.src == node)
            .map(|c| c.id)
            .collect()
    }

    /// 订阅某个连接的 cwnd 变化；连接不存在时返回 false。
    pub fn trace(&mut self, id: TcpConnId) -> bool {
        match self.conns.get_mut(&id) {
            Some(c) => {
                c.traced = true;
                true
            }
            None => false,
        }
    }

    pub fn has_cwnd_changes(&self) -> bool {
        !self.cwnd_changes.is_empty()
    }

    pub fn take_cwnd_changes(&mut self) -> Vec<CwndChange> {
        std::mem::take(&mut self.cwnd_changes)
    }

    /// 创建连接并发出 SYN。
    pub fn open(
        &mut self,
        req: TcpOpen,
        cfg: TcpConfig,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> TcpConnId {
        self.next_id += 1;
        let id = self.next_id;
        let port = net.alloc_ephemeral_port();
        let conn = TcpConn::new(id, port, req, cfg, sim.now());
        debug!(
            conn_id = id,
            src = %conn.src_addr,
            dst = %conn.dst_addr,
            dst_port = conn.dst_port,
            socket_type = conn.cfg.socket_type.type_name(),
            "打开 TCP 连接"
        );
        self.conns.insert(id, conn);
        self.send_syn(id, sim, net);
        id
    }

    /// 应用写入数据；返回被发送缓冲接受的字节数。
    pub fn write(
        &mut self,
        id: TcpConnId,
        bytes: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> u64 {
        let Some(conn) = self.conns.get_mut(&id) else {
            return 0;
        };
        if !matches!(conn.state, TcpState::SynSent | TcpState::Established) {
            return 0;
        }
        let Some(end) = conn.data_end else {
            return 0;
        };
        let buffered = end.saturating_sub(conn.snd_una);
        let accepted = bytes.min(conn.cfg.snd_buf_bytes.saturating_sub(buffered));
        conn.data_end = Some(end + accepted);
        if accepted > 0 && conn.state == TcpState::Established {
            self.send_data_if_possible(id, sim, net);
        }
        accepted
    }

    /// 应用关闭连接：不再发送任何段。
    pub fn close(&mut self, id: TcpConnId) {
        if let Some(conn) = self.conns.get_mut(&id) {
            if matches!(conn.state, TcpState::SynSent | TcpState::Established) {
                conn.state = TcpState::Closed;
                conn.cancel_rto();
            }
        }
    }

    fn send_syn(&mut self, id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        conn.syn_sent_at = sim.now();
        let pkt = net.make_packet(
            id,
            (conn.src_addr, conn.src_port),
            (conn.dst_addr, conn.dst_port),
            conn.cfg.wire_bytes(0),
            Transport::Tcp(TcpSegment::Syn),
        );
        conn.arm_rto(sim);
        let src = conn.src;
        net.send_from(src, pkt, sim);
    }

    /// 接收端回包（SYN-ACK / RST / ACK）
    fn reply(conn: &TcpConn, at: NodeId, seg: TcpSegment, sim: &mut Simulator, net: &mut Network) {
        let pkt = net.make_packet(
            conn.id,
            (conn.dst_addr, conn.dst_port),
            (conn.src_addr, conn.src_port),
            conn.cfg.wire_bytes(0),
            Transport::Tcp(seg),
        );
        net.send_from(at, pkt, sim);
    }

    fn send_segment(conn: &TcpConn, seq: u64, len: u32, sim: &mut Simulator, net: &mut Network) {
        let pkt = net.make_packet(
            conn.id,
            (conn.src_addr, conn.src_port),
            (conn.dst_addr, conn.dst_port),
            conn.cfg.wire_bytes(len),
            Transport::Tcp(TcpSegment::Data { seq, len }),
        );
        net.send_from(conn.src, pkt, sim);
    }

    pub(crate) fn send_data_if_possible(
        &mut self,
        id: TcpConnId,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != TcpState::Established {
            return;
        }

        let now = sim.now();
        let mss = conn.mss();
        let limit = conn.data_end.unwrap_or(u64::MAX);
        let mut sent = 0u32;
        loop {
            let flight = conn.flight();
            let wnd = conn.window();
            if flight >= wnd || conn.next_seq >= limit {
                break;
            }
            let room = wnd - flight;
            let len = mss.min(room).min(limit - conn.next_seq);
            // 窗口余量不足一个 MSS 且仍有在途数据：等 ACK 再发满段
            if len < mss && len == room && flight > 0 {
                break;
            }
            let seq = conn.next_seq;
            let retx = seq < conn.high_tx;
            conn.inflight.insert(
                seq,
                SentSeg {
                    len: len as u32,
                    sent_at: now,
                    retx,
                },
            );
            conn.next_seq += len;
            conn.high_tx = conn.high_tx.max(conn.next_seq);
            if retx {
                conn.retransmits += 1;
            }
            Self::send_segment(conn, seq, len as u32, sim, net);
            sent += 1;
        }

        if sent > 0 && !conn.rto_armed {
            conn.arm_rto(sim);
        }
        trace!(conn_id = id, sent, cwnd = conn.cwnd, flight = conn.flight(), "发送数据");
    }

    fn retransmit_head(conn: &mut TcpConn, sim: &mut Simulator, net: &mut Network) {
        let seq = conn.snd_una;
        let len = match conn.inflight.get_mut(&seq) {
            Some(s) => {
                s.retx = true;
                s.sent_at = sim.now();
                s.len
            }
            None => {
                let len = conn.mss().min(conn.high_tx.saturating_sub(seq)) as u32;
                if len == 0 {
                    return;
                }
                conn.inflight.insert(
                    seq,
                    SentSeg {
                        len,
                        sent_at: sim.now(),
                        retx: true,
                    },
                );
                conn.next_seq = conn.next_seq.max(seq + len as u64);
                len
            }
        };
        conn.retransmits += 1;
        Self::send_segment(conn, seq, len, sim, net);
    }

    pub(crate) fn on_segment(
        &mut self,
        at: NodeId,
        pkt: &Packet,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let id = pkt.conn_id;
        match seg {
            TcpSegment::Syn => self.on_syn(id, at, sim, net),
            TcpSegment::SynAck => self.on_syn_ack(id, at, sim, net),
            TcpSegment::Rst => {
                if let Some(conn) = self.conns.get_mut(&id) {
                    if conn.src == at && conn.state == TcpState::SynSent {
                        debug!(conn_id = id, "收到 RST：对端无监听");
                        conn.state = TcpState::Reset;
                        conn.cancel_rto();
                    }
                }
            }
            TcpSegment::Data { seq, len } => self.on_data(id, at, seq, len, sim, net),
            TcpSegment::Ack { ack } => self.on_ack(id, at, ack, sim, net),
        }
    }

    fn on_syn(&mut self, id: TcpConnId, at: NodeId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.rcv_node == Some(at) {
            // 重传的 SYN：再回一次 SYN-ACK
            Self::reply(conn, at, TcpSegment::SynAck, sim, net);
        } else if net.sinks.accept(at, conn.dst_port, sim.now()) {
            conn.rcv_node = Some(at);
            Self::reply(conn, at, TcpSegment::SynAck, sim, net);
        } else {
            Self::reply(conn, at, TcpSegment::Rst, sim, net);
        }
    }

    fn on_syn_ack(&mut self, id: TcpConnId, at: NodeId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.src != at || conn.state != TcpState::SynSent {
            return;
        }
        let now = sim.now();
        conn.state = TcpState::Established;
        conn.established_at = Some(now);
        conn.cancel_rto();
        if conn.syn_attempts == 0 {
            conn.on_rtt_sample(now.saturating_sub(conn.syn_sent_at));
        }
        debug!(conn_id = id, rto = %conn.rto, "TCP 连接建立");
        self.send_data_if_possible(id, sim, net);
    }

    fn on_data(
        &mut self,
        id: TcpConnId,
        at: NodeId,
        seq: u64,
        len: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.rcv_node != Some(at) {
            return;
        }

        let before = conn.rcv_nxt;
        let end = seq + len as u64;
        if seq <= conn.rcv_nxt && end > conn.rcv_nxt {
            conn.rcv_nxt = end;
            // 合并乱序缓存中已连续的部分
            while let Some((&s, &l)) = conn.ooo.first_key_value() {
                if s > conn.rcv_nxt {
                    break;
                }
                conn.ooo.pop_first();
                conn.rcv_nxt = conn.rcv_nxt.max(s + l as u64);
            }
        } else if seq > conn.rcv_nxt {
            conn.ooo.entry(seq).or_insert(len);
        }

        let delivered = conn.rcv_nxt - before;
        if delivered > 0 {
            net.sinks.on_stream_bytes(at, conn.dst_port, delivered, sim.now());
        }
        // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
        let ack = conn.rcv_nxt;
        Self::reply(conn, at, TcpSegment::Ack { ack }, sim, net);
    }

    fn on_ack(&mut self, id: TcpConnId, at: NodeId, ack: u64, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        let log = &mut self.cwnd_changes;
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.src != at || conn.state != TcpState::Established {
            return;
        }
        let mss = conn.mss();

        if ack > conn.snd_una {
            let ack = ack.min(conn.high_tx);
            let newly = ack - conn.snd_una;

            if let Some(head) = conn.inflight.get(&conn.snd_una) {
                if !head.retx && conn.snd_una + head.len as u64 <= ack {
                    let sample = now.saturating_sub(head.sent_at);
                    conn.on_rtt_sample(sample);
                }
            }
            conn.inflight = conn.inflight.split_off(&ack);
            conn.snd_una = ack;
            conn.next_seq = conn.next_seq.max(ack);
            conn.dup_acks = 0;

            match conn.recover {
                Some(recover) if ack < recover => {
                    // 部分确认：重传下一个缺口，窗口按新确认量收缩
                    let deflated = conn.cwnd.saturating_sub(newly).saturating_add(mss);
                    conn.set_cwnd(deflated, now, log);
                    Self::retransmit_head(conn, sim, net);
                }
                Some(_) => {
                    conn.recover = None;
                    let ssthresh = conn.ssthresh;
                    conn.set_cwnd(ssthresh, now, log);
                }
                None => {
                    let grown = if conn.cwnd < conn.ssthresh {
                        conn.cwnd.saturating_add(newly.min(mss))
                    } else {
                        // AIMD：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
                        let inc = (mss.saturating_mul(mss) / conn.cwnd.max(1)).max(1);
                        conn.cwnd.saturating_add(inc)
                    };
                    conn.set_cwnd(grown, now, log);
                }
            }

            if conn.flight() > 0 {
                conn.arm_rto(sim);
            } else {
                conn.cancel_rto();
            }

            if let (TcpSource::Bounded(total), None) = (conn.source, conn.done_at) {
                if conn.snd_una >= total {
                    conn.done_at = Some(now);
                    conn.cancel_rto();
                    return;
                }
            }
            self.send_data_if_possible(id, sim, net);
        } else if ack == conn.snd_una && conn.flight() > 0 {
            conn.dup_acks = conn.dup_acks.saturating_add(1);
            let dup = conn.dup_acks;
            if dup == 3 && conn.recover.is_none() {
                // 快速重传 + 进入快速恢复
                conn.ssthresh = (conn.flight() / 2).max(2 * mss);
                let inflated = conn.ssthresh.saturating_add(3 * mss);
                conn.set_cwnd(inflated, now, log);
                conn.recover = Some(conn.high_tx);
                Self::retransmit_head(conn, sim, net);
            } else if dup > 3 && conn.recover.is_some() {
                // 每个额外 dupACK 增加 cwnd 一个 MSS
                let inflated = conn.cwnd.saturating_add(mss);
                conn.set_cwnd(inflated, now, log);
                self.send_data_if_possible(id, sim, net);
            }
        }
    }

    pub(crate) fn on_rto(&mut self, id: TcpConnId, generation: u64, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        let log = &mut self.cwnd_changes;
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if generation != conn.rto_gen || !conn.rto_armed {
            return;
        }
        conn.rto_armed = false;

        match conn.state {
            TcpState::SynSent => {
                conn.syn_attempts += 1;
                if conn.syn_attempts > conn.cfg.syn_retries {
                    debug!(conn_id = id, "SYN 重传次数用尽，连接失败");
                    conn.state = TcpState::Failed;
                    return;
                }
                conn.backoff();
                self.send_syn(id, sim, net);
            }
            TcpState::Established if conn.flight() > 0 => {
                // 超时：回到慢启动，从最早未确认处重发
                let mss = conn.mss();
                conn.timeouts += 1;
                conn.ssthresh = (conn.flight() / 2).max(2 * mss);
                conn.set_cwnd(mss, now, log);
                conn.recover = None;
                conn.dup_acks = 0;
                conn.backoff();
                conn.inflight.clear();
                conn.next_seq = conn.snd_una;
                debug!(conn_id = id, rto = %conn.rto, snd_una = conn.snd_una, "RTO 超时重传");
                self.send_data_if_possible(id, sim, net);
            }
            _ => {}
        }
    }
}

/// TCP RTO 事件：代号与连接当前代号一致才生效（每次重设定时器都会递增代号）。
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
    pub generation: u64,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id, generation } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        // 规避同时借用 `w.net` 与 `w.net.tcp`
        let mut tcp = std::mem::take(&mut w.net.tcp);
        tcp.on_rto(conn_id, generation, sim, &mut w.net);
        w.net.tcp = tcp;
    }
}
