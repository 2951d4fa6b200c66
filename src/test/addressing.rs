use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::net::{AddressAllocator, AddressError, NodeId, Route, RouteOrigin, RoutingTable, LinkId, blocks_overlap, shortest_next_hops};

fn net(s: &str) -> Ipv4Net {
    s.parse().expect("valid network")
}

#[test]
fn allocator_hands_out_hosts_then_moves_to_next_block() {
    let mut a = AddressAllocator::new(Ipv4Addr::new(10, 1, 1, 0), 24).expect("alloc");
    assert_eq!(a.network(), net("10.1.1.0/24"));
    assert_eq!(a.next_address(), Ok(Ipv4Addr::new(10, 1, 1, 1)));
    assert_eq!(a.next_address(), Ok(Ipv4Addr::new(10, 1, 1, 2)));

    assert_eq!(a.new_network(), Ok(net("10.1.2.0/24")));
    assert_eq!(a.next_address(), Ok(Ipv4Addr::new(10, 1, 2, 1)));
}

#[test]
fn allocator_truncates_base_and_reports_exhaustion() {
    let mut a = AddressAllocator::new(Ipv4Addr::new(10, 0, 0, 3), 30).expect("alloc");
    assert_eq!(a.network(), net("10.0.0.0/30"));
    assert_eq!(a.next_address(), Ok(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(a.next_address(), Ok(Ipv4Addr::new(10, 0, 0, 2)));
    assert_eq!(a.next_address(), Err(AddressError::Exhausted(net("10.0.0.0/30"))));

    assert!(matches!(
        AddressAllocator::new(Ipv4Addr::new(10, 0, 0, 0), 33),
        Err(AddressError::Prefix(33))
    ));
}

#[test]
fn allocator_cursor_is_monotonic_across_blocks() {
    let mut a = AddressAllocator::new(Ipv4Addr::new(10, 1, 1, 0), 24).expect("alloc");
    let mut blocks = vec![a.network()];
    for _ in 0..5 {
        blocks.push(a.new_network().expect("next block"));
    }
    for (i, x) in blocks.iter().enumerate() {
        for y in &blocks[i + 1..] {
            assert!(x.network() < y.network());
            assert!(!blocks_overlap(x, y));
        }
    }
}

#[test]
fn overlap_detects_containment_in_either_direction() {
    assert!(blocks_overlap(&net("10.0.0.0/8"), &net("10.1.1.0/24")));
    assert!(blocks_overlap(&net("10.1.1.0/24"), &net("10.0.0.0/8")));
    assert!(!blocks_overlap(&net("10.1.1.0/24"), &net("10.1.2.0/24")));
}

fn route(dest: &str, hop: usize) -> Route {
    Route {
        dest: net(dest),
        next_hop: NodeId(hop),
        link: LinkId(hop),
        origin: RouteOrigin::Static,
    }
}

#[test]
fn routing_table_prefers_longest_prefix() {
    let mut rt = RoutingTable::default();
    rt.add(route("0.0.0.0/0", 1));
    rt.add(route("7.0.0.0/8", 2));
    rt.add(route("7.0.0.2/32", 3));

    let hop = |a| rt.lookup(a).map(|r| r.next_hop);
    assert_eq!(hop(Ipv4Addr::new(7, 0, 0, 2)), Some(NodeId(3)));
    assert_eq!(hop(Ipv4Addr::new(7, 9, 9, 9)), Some(NodeId(2)));
    assert_eq!(hop(Ipv4Addr::new(1, 0, 0, 2)), Some(NodeId(1)));

    rt.clear_origin(RouteOrigin::Static);
    assert!(rt.is_empty());
    assert!(rt.lookup(Ipv4Addr::new(1, 0, 0, 2)).is_none());
}

#[test]
fn shortest_next_hops_picks_a_single_deterministic_neighbor() {
    // 菱形：0 -> {1, 2} -> 3
    let adj = vec![
        vec![NodeId(2), NodeId(1)],
        vec![NodeId(3)],
        vec![NodeId(3)],
        vec![],
    ];
    let mut rev = vec![Vec::new(); adj.len()];
    for (from, nbrs) in adj.iter().enumerate() {
        for &to in nbrs {
            rev[to.0].push(NodeId(from));
        }
    }

    let next = shortest_next_hops(&adj, &rev, NodeId(3));
    assert_eq!(next, vec![Some(NodeId(1)), Some(NodeId(3)), Some(NodeId(3)), None]);

    let to_zero = shortest_next_hops(&adj, &rev, NodeId(0));
    assert!(to_zero.iter().all(Option::is_none));
}
