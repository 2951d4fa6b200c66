use std::net::Ipv4Addr;

use crate::net::{FiveTuple, FlowMonitor, IpProtocol, NetError, NetWorld, Network, NodeId, RateErrorModel, Transport};
use crate::queue::QueueSize;
use crate::sim::rng::{RngStream, stream_rng};
use crate::sim::{SimTime, Simulator};

const A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// 两台主机直连，100Mbps / 1ms
fn pair() -> (NetWorld, NodeId, NodeId) {
    let mut world = NetWorld::default();
    let net = &mut world.net;
    let a = net.add_host("a");
    let b = net.add_host("b");
    net.install_stack(a).expect("stack a");
    net.install_stack(b).expect("stack b");
    net.connect_duplex(a, b, SimTime::from_millis(1), 100_000_000, QueueSize::Packets(100));
    let block = "10.0.0.0/24".parse().expect("block");
    net.add_interface(a, b, A, block).expect("iface a");
    net.add_interface(b, a, B, block).expect("iface b");
    (world, a, b)
}

fn send_udp(net: &mut Network, sim: &mut Simulator, from: NodeId, dst: Ipv4Addr, n: usize) {
    for _ in 0..n {
        let pkt = net.make_packet(0, (A, 49153), (dst, 7000), 1228, Transport::Udp);
        net.send_from(from, pkt, sim);
    }
}

#[test]
fn stack_install_is_once_per_node() {
    let mut net = Network::default();
    let a = net.add_host("a");
    net.install_stack(a).expect("first install");
    assert!(matches!(net.install_stack(a), Err(NetError::DuplicateStack(name)) if name == "a"));
    assert!(matches!(net.install_stack(NodeId(9)), Err(NetError::UnknownNode(NodeId(9)))));
}

#[test]
fn interface_requires_stack_and_link() {
    let mut net = Network::default();
    let a = net.add_host("a");
    let b = net.add_host("b");
    let block = "10.0.0.0/24".parse().expect("block");
    assert!(matches!(net.add_interface(a, b, A, block), Err(NetError::NoLink { .. })));
    net.connect(a, b, SimTime::ZERO, 1_000_000, QueueSize::Packets(1));
    assert!(matches!(net.add_interface(a, b, A, block), Err(NetError::NoStack(_))));
}

#[test]
fn udp_datagrams_reach_a_listening_sink() {
    let (mut world, a, b) = pair();
    let mut sim = Simulator::default();
    let sink = world.net.sinks.add(b, IpProtocol::Udp, 7000);
    world.net.sinks.start(sink);

    send_udp(&mut world.net, &mut sim, a, B, 10);
    sim.run(&mut world);

    let s = world.net.sinks.get(sink).expect("sink");
    assert_eq!(s.rx_packets, 10);
    assert_eq!(s.rx_bytes, 12_280);
    assert_eq!(world.net.stats.delivered_pkts, 10);
    // 串行化 1228B@100Mbps ≈ 98us，加 1ms 传播
    assert!(s.first_rx > Some(SimTime::from_millis(1)));
}

#[test]
fn flow_monitor_counts_tx_rx_and_unroutable_drops() {
    let (mut world, a, _) = pair();
    let mut sim = Simulator::default();
    world.net.monitor = Some(FlowMonitor::default());

    send_udp(&mut world.net, &mut sim, a, B, 4);
    send_udp(&mut world.net, &mut sim, a, Ipv4Addr::new(192, 168, 0, 1), 2);
    sim.run(&mut world);

    let monitor = world.net.monitor.as_ref().expect("monitor");
    assert_eq!(monitor.len(), 2);
    let key = FiveTuple {
        src: A,
        dst: B,
        protocol: IpProtocol::Udp,
        src_port: 49153,
        dst_port: 7000,
    };
    let st = monitor.flow_of(&key).expect("delivered flow");
    assert_eq!((st.tx_packets, st.rx_packets, st.lost_packets), (4, 4, 0));
    assert!(st.mean_delay_s() > 0.001);
    assert_eq!(world.net.stats.unroutable_pkts, 2);

    let mut xml = Vec::new();
    monitor.write_xml(&mut xml).expect("write xml");
    let xml = String::from_utf8(xml).expect("utf8");
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<FlowMonitor>") && xml.trim_end().ends_with("</FlowMonitor>"));
    assert_eq!(xml.matches("<Flow flowId=").count(), 4);
    assert!(xml.contains(r#"protocol="17""#));
    assert!(xml.contains(r#"<packetsDropped reason="no-route" number="2" />"#));
}

#[test]
fn receive_error_model_drops_deterministically_per_run() {
    let lost = |run: u64| {
        let (mut world, a, b) = pair();
        let mut sim = Simulator::default();
        let link = world.net.link_between(a, b).expect("a->b");
        world
            .net
            .set_rx_error(link, RateErrorModel::new(0.3, stream_rng(run, RngStream::RxError(0))));
        send_udp(&mut world.net, &mut sim, a, B, 200);
        sim.run(&mut world);
        world.net.stats.corrupted_pkts
    };
    let first = lost(1);
    assert_eq!(first, lost(1));
    assert!((20..=100).contains(&first), "corrupted {first} of 200 at 30%");
}

#[test]
fn full_loss_and_zero_loss_are_exact() {
    let rng = || stream_rng(1, RngStream::RxError(0));
    let mut never = RateErrorModel::new(0.0, rng());
    let mut always = RateErrorModel::new(1.0, rng());
    assert!((0..100).all(|_| !never.corrupt() && always.corrupt()));
    assert_eq!(RateErrorModel::new(7.0, rng()).rate(), 1.0);
}

#[test]
fn ephemeral_ports_are_distinct() {
    let mut net = Network::default();
    let p: Vec<u16> = (0..3).map(|_| net.alloc_ephemeral_port()).collect();
    assert_eq!(p, vec![49153, 49154, 49155]);
}
