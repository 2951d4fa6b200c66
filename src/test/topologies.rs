use std::net::Ipv4Addr;

use crate::net::{AddressError, NetWorld, NodeKind, Transport};
use crate::queue::QueueSize;
use crate::sim::{SimTime, Simulator};
use crate::topo::{
    AsymmetricOpts, CellularOpts, ChainOpts, DEFAULT_DEVICE_QUEUE, DumbbellOpts, LinkClass,
    LinkProfile, RoutingMode, Side, TopologyBuilder, TopologyError, build_asymmetric,
    build_cellular, build_chain, build_dumbbell, install,
};

const Q: QueueSize = QueueSize::Packets(150);

fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

fn assert_disjoint_blocks(topo: &crate::topo::Topology) {
    for (i, x) in topo.segments.iter().enumerate() {
        for y in &topo.segments[i + 1..] {
            assert!(
                !crate::net::blocks_overlap(&x.block, &y.block),
                "{} overlaps {}",
                x.block,
                y.block
            );
        }
    }
}

#[test]
fn s1_dumbbell_layout() {
    let d = build_dumbbell("S1", &DumbbellOpts::s1(Q)).expect("S1");
    let t = &d.topology;
    assert_eq!(t.node_count(), 6);
    assert_eq!(t.segment_count(), 5);
    assert_eq!(t.segments_of(LinkClass::Access).count(), 4);

    let bottleneck: Vec<_> = t.segments_of(LinkClass::Bottleneck).collect();
    assert_eq!(bottleneck.len(), 1);
    assert_eq!(bottleneck[0].profile, LinkProfile::mbps(20, 15));
    assert_eq!(bottleneck[0].queue, Q);
    assert_eq!((bottleneck[0].a_addr, bottleneck[0].b_addr), (ip(10, 3, 1, 1), ip(10, 3, 1, 2)));
    assert!(t.segments_of(LinkClass::Access).all(|s| s.queue == DEFAULT_DEVICE_QUEUE));

    assert_eq!(d.left_addr(0), Some(ip(10, 1, 1, 1)));
    assert_eq!(d.left_addr(1), Some(ip(10, 1, 2, 1)));
    assert_eq!(d.right_addr(0), Some(ip(10, 2, 1, 1)));
    assert_eq!(d.right_addr(1), Some(ip(10, 2, 2, 1)));
    assert_eq!(d.right_addr(2), None);
    assert_eq!(t.routing, RoutingMode::Global);
    assert_disjoint_blocks(t);
}

#[test]
fn s5_dumbbell_has_eight_pairs() {
    let d = build_dumbbell("S5", &DumbbellOpts::s5(Q)).expect("S5");
    assert_eq!(d.topology.node_count(), 18);
    assert_eq!(d.topology.segment_count(), 17);
    assert_eq!(d.left.len(), 8);
    assert_eq!(d.right_addr(7), Some(ip(10, 2, 8, 1)));
    let b = d.topology.segments_of(LinkClass::Bottleneck).next().expect("bottleneck");
    assert_eq!(b.profile, LinkProfile::mbps(100, 20));
    assert_disjoint_blocks(&d.topology);
}

#[test]
fn s2_access_delays_are_asymmetric() {
    let a = build_asymmetric("S2", &AsymmetricOpts::s2(Q)).expect("S2");
    let t = &a.topology;
    assert_eq!(t.node_count(), 6);
    assert_eq!(t.segment_count(), 5);

    let delay_of = |node| {
        t.segments
            .iter()
            .find(|s| s.a == node || s.b == node)
            .map(|s| s.profile.delay)
    };
    assert_eq!(delay_of(a.left[0]), Some(SimTime::from_millis(1)));
    assert_eq!(delay_of(a.left[1]), Some(SimTime::from_millis(60)));
    assert_eq!(delay_of(a.right[0]), Some(SimTime::from_millis(1)));

    // 单个分配器依次推进：10.1.1.0 .. 10.1.5.0
    assert_eq!(a.addr(a.left[0]), Some(ip(10, 1, 1, 1)));
    assert_eq!(a.addr(a.left[1]), Some(ip(10, 1, 2, 1)));
    assert_eq!(a.addr(a.right[0]), Some(ip(10, 1, 3, 2)));
    assert_eq!(a.addr(a.right[1]), Some(ip(10, 1, 4, 2)));
    let b = t.segments_of(LinkClass::Bottleneck).next().expect("bottleneck");
    assert_eq!(b.block, "10.1.5.0/24".parse().expect("net"));
    assert_disjoint_blocks(t);
}

#[test]
fn s3_chain_is_four_nodes_with_loss_on_the_bottleneck() {
    let c = build_chain("S3", &ChainOpts::s3(Q, 0.01)).expect("S3");
    let t = &c.topology;
    assert_eq!(t.node_count(), 4);
    assert_eq!(t.segment_count(), 3);
    assert_eq!(c.receiver_addr(), Some(ip(10, 10, 3, 2)));

    let b = &t.segments[c.bottleneck];
    assert_eq!(b.class, LinkClass::Bottleneck);
    assert_eq!(b.profile, LinkProfile::mbps(40, 10));
    assert_eq!(b.rx_loss, Some((Side::B, 0.01)));
    assert_eq!(t.segments.iter().filter(|s| s.rx_loss.is_some()).count(), 1);

    let lossless = build_chain("S3", &ChainOpts::s3(Q, 0.0)).expect("S3");
    assert!(lossless.topology.segments.iter().all(|s| s.rx_loss.is_none()));
}

#[test]
fn s4_cellular_uses_static_routes() {
    let c = build_cellular("S4", &CellularOpts::default()).expect("S4");
    let t = &c.topology;
    assert_eq!(t.node_count(), 4);
    assert_eq!(t.segment_count(), 3);
    assert_eq!(t.nodes[c.access_point].kind, NodeKind::AccessPoint);
    assert_eq!(t.nodes[c.gateway].kind, NodeKind::Gateway);
    assert_eq!(c.ue_addr(), Some(ip(7, 0, 0, 2)));
    assert_eq!(c.remote_addr(), Some(ip(1, 0, 0, 2)));
    assert_eq!(t.segments_of(LinkClass::Radio).count(), 1);

    let RoutingMode::Static(routes) = &t.routing else {
        panic!("S4 must use static routing");
    };
    assert_eq!(routes.len(), 4);
    assert!(routes.iter().any(|r| r.node == c.ue && r.via == c.access_point && r.dest.prefix_len() == 0));
    assert_disjoint_blocks(t);
}

#[test]
fn s4_static_routes_carry_traffic_both_ways() {
    let c = build_cellular("S4", &CellularOpts::default()).expect("S4");
    let mut world = NetWorld::default();
    let installed = install(&c.topology, &mut world.net, 1).expect("install");
    let ue = installed.nodes[c.ue];
    let remote = installed.nodes[c.remote];
    let (ue_addr, remote_addr) = (ip(7, 0, 0, 2), ip(1, 0, 0, 2));

    let mut sim = Simulator::default();
    for (from, src, dst) in [(remote, remote_addr, ue_addr), (ue, ue_addr, remote_addr)] {
        let pkt = world.net.make_packet(0, (src, 1), (dst, 2), 100, Transport::Udp);
        world.net.send_from(from, pkt, &mut sim);
    }
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 2);
    assert_eq!(world.net.stats.unroutable_pkts, 0);
    assert_eq!(world.net.stats.forwarded_pkts, 4);
}

#[test]
fn global_routes_connect_every_host_pair() {
    let d = build_dumbbell("S1", &DumbbellOpts::s1(Q)).expect("S1");
    let mut world = NetWorld::default();
    let installed = install(&d.topology, &mut world.net, 1).expect("install");
    assert_eq!(world.net.nodes().len(), 6);
    assert_eq!(world.net.links().len(), 10);
    assert!(world.net.nodes().iter().all(|n| n.has_stack()));

    let hosts: Vec<_> = d.left.iter().chain(&d.right).copied().collect();
    for &h in &hosts {
        let node = world.net.node(installed.nodes[h]).expect("node");
        for &other in hosts.iter().filter(|&&o| o != h) {
            let addr = d.topology.primary_addr(other).expect("addr");
            assert!(node.routes().lookup(addr).is_some(), "{} cannot reach {addr}", node.name());
        }
    }
}

#[test]
fn installed_nodes_refuse_a_second_stack() {
    let c = build_chain("S3", &ChainOpts::s3(Q, 0.0)).expect("S3");
    let mut world = NetWorld::default();
    install(&c.topology, &mut world.net, 1).expect("install");
    let sender = world.net.find_node("sender").expect("sender");
    assert!(world.net.install_stack(sender).is_err());
}

#[test]
fn builder_rejects_bad_segments() {
    let mut b = TopologyBuilder::new("bad");
    let x = b.host("x");
    let y = b.host("y");
    let p = LinkProfile::mbps(10, 1);
    let block = |s: &str| s.parse().expect("net");

    assert!(matches!(
        b.segment((x, 7), LinkClass::Access, p, Q, block("10.0.0.0/24"), (ip(10, 0, 0, 1), ip(10, 0, 0, 2))),
        Err(TopologyError::UnknownNode(7))
    ));
    assert!(matches!(
        b.segment((x, x), LinkClass::Access, p, Q, block("10.0.0.0/24"), (ip(10, 0, 0, 1), ip(10, 0, 0, 2))),
        Err(TopologyError::SelfLoop(_))
    ));
    assert!(matches!(
        b.segment((x, y), LinkClass::Access, p, Q, block("10.0.0.0/24"), (ip(10, 0, 1, 1), ip(10, 0, 0, 2))),
        Err(TopologyError::OutsideBlock { .. })
    ));
    assert!(matches!(
        b.segment((x, y), LinkClass::Access, p, Q, block("10.0.0.0/24"), (ip(10, 0, 0, 1), ip(10, 0, 0, 1))),
        Err(TopologyError::DuplicateAddress(_))
    ));

    b.segment((x, y), LinkClass::Access, p, Q, block("10.0.0.0/24"), (ip(10, 0, 0, 1), ip(10, 0, 0, 2)))
        .expect("first segment");
    assert!(matches!(
        b.segment((x, y), LinkClass::Access, p, Q, block("10.0.0.0/16"), (ip(10, 0, 9, 1), ip(10, 0, 9, 2))),
        Err(TopologyError::Address(AddressError::Overlap { .. }))
    ));
    assert_eq!(b.build().segment_count(), 1);
}
