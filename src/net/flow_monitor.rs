//! 流统计（Flow monitor）
//!
//! 在所有节点上观测数据包：源端发出计 tx，目的端收到计 rx（同时累计时延与抖动），
//! 中间节点转发计 forwarded，丢包按原因计数。流按五元组分类，编号从 1 开始、按首次出现顺序分配。
//! 运行结束时序列化为 XML。

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use super::packet::{FiveTuple, Packet};
use crate::sim::SimTime;

pub type FlowId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Queue,
    RxError,
    NoRoute,
}

#[derive(Debug, Clone, Default)]
pub struct FlowStats {
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub times_forwarded: u64,
    pub delay_sum: SimTime,
    pub jitter_sum: SimTime,
    last_delay: Option<SimTime>,
    pub drops_queue: u64,
    pub drops_rx_error: u64,
    pub drops_no_route: u64,
}

impl FlowStats {
    /// 接收吞吐（bps），按首末接收时刻计算；不足两个接收包时为 0
    pub fn rx_throughput_bps(&self) -> f64 {
        match (self.first_rx, self.last_rx) {
            (Some(a), Some(b)) if b > a => {
                (self.rx_bytes as f64 * 8.0) / b.saturating_sub(a).as_secs_f64()
            }
            _ => 0.0,
        }
    }

    /// 平均单向时延（秒）
    pub fn mean_delay_s(&self) -> f64 {
        if self.rx_packets == 0 {
            0.0
        } else {
            self.delay_sum.as_secs_f64() / self.rx_packets as f64
        }
    }

    pub fn loss_ratio(&self) -> f64 {
        if self.tx_packets == 0 {
            0.0
        } else {
            self.lost_packets as f64 / self.tx_packets as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct FlowMonitor {
    classifier: HashMap<FiveTuple, FlowId>,
    flows: BTreeMap<FlowId, (FiveTuple, FlowStats)>,
}

impl FlowMonitor {
    fn classify(&mut self, pkt: &Packet) -> &mut FlowStats {
        let key = pkt.five_tuple();
        let next = self.classifier.len() as FlowId + 1;
        let id = *self.classifier.entry(key).or_insert(next);
        &mut self
            .flows
            .entry(id)
            .or_insert_with(|| (key, FlowStats::default()))
            .1
    }

    pub(crate) fn on_tx(&mut self, pkt: &Packet, now: SimTime) {
        let st = self.classify(pkt);
        st.first_tx.get_or_insert(now);
        st.last_tx = Some(now);
        st.tx_packets += 1;
        st.tx_bytes += pkt.size_bytes as u64;
    }

    pub(crate) fn on_forward(&mut self, pkt: &Packet) {
        self.classify(pkt).times_forwarded += 1;
    }

    pub(crate) fn on_rx(&mut self, pkt: &Packet, now: SimTime) {
        let st = self.classify(pkt);
        let delay = now.saturating_sub(pkt.sent_at);
        st.first_rx.get_or_insert(now);
        st.last_rx = Some(now);
        st.rx_packets += 1;
        st.rx_bytes += pkt.size_bytes as u64;
        st.delay_sum = st.delay_sum.saturating_add(delay);
        if let Some(prev) = st.last_delay {
            let jitter = if delay > prev {
                delay.saturating_sub(prev)
            } else {
                prev.saturating_sub(delay)
            };
            st.jitter_sum = st.jitter_sum.saturating_add(jitter);
        }
        st.last_delay = Some(delay);
    }

    pub(crate) fn on_drop(&mut self, pkt: &Packet, reason: DropReason) {
        let st = self.classify(pkt);
        st.lost_packets += 1;
        match reason {
            DropReason::Queue => st.drops_queue += 1,
            DropReason::RxError => st.drops_rx_error += 1,
            DropReason::NoRoute => st.drops_no_route += 1,
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn flows(&self) -> impl Iterator<Item = (FlowId, &FiveTuple, &FlowStats)> {
        self.flows.iter().map(|(id, (k, st))| (*id, k, st))
    }

    pub fn flow_of(&self, key: &FiveTuple) -> Option<&FlowStats> {
        let id = self.classifier.get(key)?;
        self.flows.get(id).map(|(_, st)| st)
    }

    /// 写出 XML 摘要：`FlowStats`（每流计数 + 吞吐/平均时延/丢包率）与 `Ipv4FlowClassifier`（五元组）。
    pub fn write_xml<W: Write>(&self, mut w: W) -> io::Result<()> {
        fn t(v: Option<SimTime>) -> String {
            format!("+{}ns", v.unwrap_or(SimTime::ZERO).as_nanos())
        }

        writeln!(w, r#"<?xml version="1.0" ?>"#)?;
        writeln!(w, "<FlowMonitor>")?;
        writeln!(w, "  <FlowStats>")?;
        for (id, (_, st)) in &self.flows {
            writeln!(
                w,
                concat!(
                    r#"    <Flow flowId="{}" timeFirstTxPacket="{}" timeFirstRxPacket="{}" "#,
                    r#"timeLastTxPacket="{}" timeLastRxPacket="{}" delaySum="+{}ns" jitterSum="+{}ns" "#,
                    r#"txBytes="{}" rxBytes="{}" txPackets="{}" rxPackets="{}" lostPackets="{}" "#,
                    r#"timesForwarded="{}" throughputBps="{:.3}" meanDelaySeconds="{:.9}" lossRatio="{:.6}">"#
                ),
                id,
                t(st.first_tx),
                t(st.first_rx),
                t(st.last_tx),
                t(st.last_rx),
                st.delay_sum.as_nanos(),
                st.jitter_sum.as_nanos(),
                st.tx_bytes,
                st.rx_bytes,
                st.tx_packets,
                st.rx_packets,
                st.lost_packets,
                st.times_forwarded,
                st.rx_throughput_bps(),
                st.mean_delay_s(),
                st.loss_ratio(),
            )?;
            for (reason, n) in [
                ("queue", st.drops_queue),
                ("rx-error", st.drops_rx_error),
                ("no-route", st.drops_no_route),
            ] {
                if n > 0 {
                    writeln!(w, r#"      <packetsDropped reason="{reason}" number="{n}" />"#)?;
                }
            }
            writeln!(w, "    </Flow>")?;
        }
        writeln!(w, "  </FlowStats>")?;
        writeln!(w, "  <Ipv4FlowClassifier>")?;
        for (id, (k, _)) in &self.flows {
            writeln!(
                w,
                r#"    <Flow flowId="{}" sourceAddress="{}" destinationAddress="{}" protocol="{}" sourcePort="{}" destinationPort="{}" />"#,
                id,
                k.src,
                k.dst,
                k.protocol.number(),
                k.src_port,
                k.dst_port
            )?;
        }
        writeln!(w, "  </Ipv4FlowClassifier>")?;
        writeln!(w, "</FlowMonitor>")?;
        w.flush()
    }
}
