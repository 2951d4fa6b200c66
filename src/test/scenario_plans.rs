use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::{ConfigurationError, ExperimentError};
use crate::net::{IpProtocol, NetWorld};
use crate::proto::tcp::TcpSocketType;
use crate::queue::QueueSize;
use crate::scenario::perturbation::blockage;
use crate::scenario::traffic::{CROSS_RATE_BPS, WEB_RATE_BPS, assign_ports, install_flows};
use crate::scenario::{
    FlowSpec, OutputLayout, RuntimeOptions, ScenarioContext, ScenarioId, ScenarioPlan, TrafficClass,
    descriptor, resolve_tcp,
};
use crate::sim::{SimTime, Simulator};
use crate::topo::install;

fn ctx(duration: SimTime) -> ScenarioContext {
    ScenarioContext {
        queue: QueueSize::Packets(150),
        loss: 0.01,
        blockage: SimTime::from_millis(200),
        duration,
    }
}

fn plan(id: ScenarioId) -> ScenarioPlan {
    descriptor(id).plan(&ctx(SimTime::from_secs(120))).expect("plan")
}

#[test]
fn runtime_defaults_match_the_command_line() {
    let o = RuntimeOptions::default();
    assert_eq!(o.scenario, "S1");
    assert_eq!(o.tcp, "TcpCubic");
    assert_eq!(o.queue, "150p");
    assert_eq!(o.time_s, 120.0);
    assert_eq!(o.warmup_s, 20.0);
    assert_eq!(o.run, 1);
    assert_eq!(o.loss, 0.0);
    assert_eq!(o.blockage_s, 0.2);
    assert!(o.flow_monitor);
    assert_eq!(o.results_dir, PathBuf::from("results"));
    assert!(o.validate().is_ok());
    assert_eq!(o.duration(), SimTime::from_secs(120));
    assert_eq!(o.blockage(), SimTime::from_millis(200));
}

#[test]
fn validate_rejects_bad_numbers() {
    let with = |f: fn(&mut RuntimeOptions)| {
        let mut o = RuntimeOptions::default();
        f(&mut o);
        o.validate()
    };
    let bad: [(fn(&mut RuntimeOptions), &str); 5] = [
        (|o| o.time_s = -1.0, "time"),
        (|o| o.time_s = f64::NAN, "time"),
        (|o| o.warmup_s = f64::INFINITY, "warmup"),
        (|o| o.blockage_s = -0.1, "blockage"),
        (|o| o.loss = 1.5, "loss"),
    ];
    for (f, name) in bad {
        match with(f) {
            Err(ConfigurationError::InvalidOption { option, .. }) => assert_eq!(option, name),
            other => panic!("expected {name} to be rejected, got {other:?}"),
        }
    }
    assert!(with(|o| o.time_s = 0.0).is_ok());
    assert!(with(|o| o.loss = 1.0).is_ok());
    assert!(with(|o| o.blockage_s = 0.0).is_ok());
}

#[test]
fn scenario_ids_parse_exactly() {
    for id in ScenarioId::ALL {
        assert_eq!(id.as_str().parse::<ScenarioId>().ok(), Some(id));
        assert_eq!(descriptor(id).id(), id);
        assert!(!descriptor(id).summary().is_empty());
    }
    for bad in ["s1", "S6", "", " S1"] {
        assert!(matches!(
            bad.parse::<ScenarioId>(),
            Err(ExperimentError::UnsupportedScenario(s)) if s == bad
        ));
    }
}

#[test]
fn every_known_tcp_variant_resolves() {
    for t in TcpSocketType::ALL {
        let d = resolve_tcp(t.type_name()).expect("known variant");
        assert_eq!(d.variant, t);
        let cfg = d.tcp_config();
        assert_eq!(cfg.socket_type, t);
        assert_eq!(cfg.snd_buf_bytes, d.snd_buf_bytes);
        assert_eq!(cfg.rcv_buf_bytes, d.rcv_buf_bytes);
    }
    assert_eq!(
        resolve_tcp("ns3::TcpBbr").map(|d| d.variant.type_name()).ok(),
        Some("TcpBbr")
    );
    for bad in ["tcpcubic", "Cubic", "ns3::", "", "TcpCubic "] {
        assert!(matches!(
            resolve_tcp(bad),
            Err(ConfigurationError::UnknownTcpVariant(s)) if s == bad
        ));
    }
}

#[test]
fn output_path_depends_only_on_its_inputs() {
    let root = Path::new("results");
    let a = OutputLayout::resolve(root, ScenarioId::S3, "TcpBbr", 4);
    assert_eq!(a, PathBuf::from("results/S3/TcpBbr/run-4"));
    assert_eq!(a, OutputLayout::resolve(root, ScenarioId::S3, "TcpBbr", 4));
    assert_ne!(a, OutputLayout::resolve(root, ScenarioId::S3, "TcpBbr", 5));
    assert_ne!(a, OutputLayout::resolve(root, ScenarioId::S3, "TcpVegas", 4));
}

#[test]
fn every_plan_starts_sinks_before_sources() {
    for id in ScenarioId::ALL {
        let p = plan(id);
        assert!(!p.flows.is_empty(), "{id}");
        assert!(p.trace_node < p.topology.node_count(), "{id}");
        for f in &p.flows {
            f.validate().expect("valid flow");
            assert!(f.sink_start <= f.source_start, "{id}: {f:?}");
            assert_eq!(p.topology.primary_addr(f.dst), Some(f.dst_addr), "{id}: {f:?}");
        }
        let ports = assign_ports(&p.flows);
        let mut unique = ports.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ports.len(), "{id}: {ports:?}");
    }
}

#[test]
fn dumbbell_plans_pair_left_with_right() {
    let s1 = plan(ScenarioId::S1);
    assert_eq!(assign_ports(&s1.flows), vec![5000, 5001]);
    assert_eq!(s1.trace_node, s1.flows[0].src);
    assert!(s1.perturbations.is_empty());

    let s5 = plan(ScenarioId::S5);
    assert_eq!(assign_ports(&s5.flows), (5000..5008).collect::<Vec<_>>());
    assert!(s5.flows.iter().all(|f| f.class == TrafficClass::Bulk));
    assert!(s5.flows.iter().all(|f| f.source_start == SimTime::ZERO));
    assert!(s5.flows.iter().all(|f| f.stop == SimTime::from_secs(120)));
}

#[test]
fn asymmetric_plan_adds_web_bursts_a_second_after_their_sinks() {
    let p = plan(ScenarioId::S2);
    let classes: Vec<_> = p.flows.iter().map(|f| f.class).collect();
    assert_eq!(
        classes,
        [TrafficClass::Bulk, TrafficClass::Bulk, TrafficClass::WebLike, TrafficClass::WebLike]
    );
    assert_eq!(assign_ports(&p.flows), vec![5000, 5001, 9000, 9001]);
    for web in &p.flows[2..] {
        assert_eq!(web.sink_start, SimTime::from_secs(5));
        assert_eq!(web.source_start, SimTime::from_secs(6));
    }
    // 反向 web 流从右侧发往左侧
    assert_eq!(p.flows[3].src, p.flows[0].dst);
    assert_eq!(p.flows[3].dst, p.flows[1].src);
}

#[test]
fn lossy_chain_plan_mixes_bulk_and_udp() {
    let p = plan(ScenarioId::S3);
    assert_eq!(assign_ports(&p.flows), vec![5000, 7000]);
    assert_eq!(p.flows[1].class.protocol(), IpProtocol::Udp);
    assert_eq!(p.flows[1].source_start, SimTime::from_secs(5));
    assert_eq!(p.flows[0].dst_addr, Ipv4Addr::new(10, 10, 3, 2));
    assert_eq!(p.trace_node, p.flows[0].src);
}

#[test]
fn cellular_plan_blocks_the_stream() {
    let p = plan(ScenarioId::S4);
    assert_eq!(p.flows[0].class, TrafficClass::Stream);
    assert_eq!(p.flows[0].source_start, SimTime::from_secs(1));
    assert_eq!(p.flows[1].source_start, SimTime::from_secs(5));
    assert_eq!(assign_ports(&p.flows), vec![10000, 5000]);
    assert_eq!(
        p.perturbations,
        blockage(0, SimTime::from_secs(30), SimTime::from_millis(200))
    );
    assert_eq!(p.trace_node, p.flows[0].src);
}

#[test]
fn short_runs_clamp_late_flows() {
    let p = descriptor(ScenarioId::S2)
        .plan(&ctx(SimTime::from_secs(3)))
        .expect("plan");
    for web in &p.flows[2..] {
        assert_eq!(web.stop, web.source_start);
        web.validate().expect("clamped flow is still valid");
    }
    assert_eq!(p.flows[0].stop, SimTime::from_secs(3));
}

#[test]
fn source_before_sink_is_rejected() {
    let p = plan(ScenarioId::S1);
    let mut bad = p.flows.clone();
    bad[1] = FlowSpec {
        sink_start: SimTime::from_secs(2),
        source_start: SimTime::from_secs(1),
        ..bad[1].clone()
    };
    assert!(matches!(bad[1].validate(), Err(ExperimentError::InvalidFlow(_))));

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let installed = install(&p.topology, &mut world.net, 1).expect("install");
    let defaults = resolve_tcp("TcpNewReno").expect("variant");
    let r = install_flows(&bad, &p.topology, &installed, &defaults, 1, &mut sim, &mut world);
    assert!(matches!(r, Err(ExperimentError::InvalidFlow(_))));
    // 校验先于安装
    assert!(world.net.sinks.is_empty());
    assert!(world.apps.is_empty());
    assert_eq!(sim.pending(), 0);
}

#[test]
fn installed_flows_listen_before_sending() {
    let p = plan(ScenarioId::S3);
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let installed = install(&p.topology, &mut world.net, 1).expect("install");
    let defaults = resolve_tcp("TcpCubic").expect("variant");
    let flows = install_flows(&p.flows, &p.topology, &installed, &defaults, 1, &mut sim, &mut world)
        .expect("flows");

    assert_eq!(flows.len(), 2);
    assert_eq!(world.net.sinks.len(), 2);
    assert_eq!(world.apps.len(), 2);
    assert_eq!(flows[0].port, 5000);
    assert_eq!(flows[1].protocol, IpProtocol::Udp);
    assert_eq!(
        world.apps.on_off(flows[1].app).map(|a| a.rate_bps()),
        Some(CROSS_RATE_BPS)
    );
    assert!(world.apps.on_off(flows[0].app).is_none());

    sim.run_until(SimTime::ZERO, &mut world);
    assert!(world.net.sinks.get(flows[0].sink).is_some_and(|s| s.is_listening()));
    assert!(!world.net.sinks.get(flows[1].sink).is_some_and(|s| s.is_listening()));

    sim.run_until(SimTime::from_secs(6), &mut world);
    let cross = world.net.sinks.get(flows[1].sink).expect("cross sink");
    assert!(cross.is_listening());
    assert!(cross.rx_packets > 0);
    assert!(world.net.sinks.get(flows[0].sink).is_some_and(|s| s.rx_bytes > 0));
}

#[test]
fn rates_follow_traffic_class() {
    let p = descriptor(ScenarioId::S2).plan(&ctx(SimTime::from_secs(8))).expect("plan");
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let installed = install(&p.topology, &mut world.net, 1).expect("install");
    let defaults = resolve_tcp("TcpVegas").expect("variant");
    let flows = install_flows(&p.flows, &p.topology, &installed, &defaults, 1, &mut sim, &mut world)
        .expect("flows");
    for f in &flows[2..] {
        let app = world.apps.on_off(f.app).expect("web source");
        assert_eq!(app.rate_bps(), WEB_RATE_BPS);
        assert!(!app.is_running());
    }
}
