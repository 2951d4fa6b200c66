//! 路由表与全局路由计算
//!
//! 每个节点持有一张按最长前缀匹配的路由表。表项来源有三种：
//! 直连网段（安装接口地址时写入）、全局最短路计算、静态注入（接入网场景）。
//!
//! 全局计算对每个目的节点在反向图上做 BFS 得到跳数，再为每个源节点选出
//! 一个距离减一的邻居作为下一跳。存在多个等价候选时取编号最小的邻居，
//! 因此任意主机对之间只有一条确定的转发路径。

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::id::{LinkId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOrigin {
    Connected,
    Global,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub dest: Ipv4Net,
    pub next_hop: NodeId,
    pub link: LinkId,
    pub origin: RouteOrigin,
}

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 最长前缀匹配；前缀长度相同时先写入的表项优先。
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for r in &self.routes {
            if !r.dest.contains(&dst) {
                continue;
            }
            match best {
                Some(b) if b.dest.prefix_len() >= r.dest.prefix_len() => {}
                _ => best = Some(r),
            }
        }
        best
    }

    pub fn clear_origin(&mut self, origin: RouteOrigin) {
        self.routes.retain(|r| r.origin != origin);
    }
}

/// 计算所有节点到 `dst` 的唯一下一跳。
///
/// `adj[from]` 为从 `from` 出发的所有出边邻居（已按节点编号排序更佳，但这里会自行取最小）；
/// `rev_adj[to]` 为所有能到达 `to` 的前驱节点集合。返回 `next[from]`，不可达或 `from == dst` 为 None。
pub fn shortest_next_hops(
    adj: &[Vec<NodeId>],
    rev_adj: &[Vec<NodeId>],
    dst: NodeId,
) -> Vec<Option<NodeId>> {
    let n = adj.len();
    let mut dist: Vec<u32> = vec![u32::MAX; n];
    let mut q: VecDeque<NodeId> = VecDeque::new();

    dist[dst.0] = 0;
    q.push_back(dst);
    while let Some(v) = q.pop_front() {
        let dv = dist[v.0];
        for &pred in &rev_adj[v.0] {
            if dist[pred.0] == u32::MAX {
                dist[pred.0] = dv.saturating_add(1);
                q.push_back(pred);
            }
        }
    }

    (0..n)
        .map(|from| {
            if from == dst.0 || dist[from] == u32::MAX {
                return None;
            }
            let want = dist[from] - 1;
            adj[from]
                .iter()
                .copied()
                .filter(|nh| dist[nh.0] == want)
                .min()
        })
        .collect()
}
