//! 统计信息
//!
//! 网络层计数器（不区分流）。

/// 网络统计信息
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct Stats {
    pub sent_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub forwarded_pkts: u64,
    /// 队列溢出丢包
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    /// 接收端误码模型丢包
    pub corrupted_pkts: u64,
    /// 查不到路由的丢包
    pub unroutable_pkts: u64,
}
