mod addressing;
mod network;
mod scenario_plans;
mod sim_time;
mod topologies;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 每次调用返回一个尚不存在的临时目录路径
pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "tcpcmp-rs-{prefix}-{}-{nanos}-{n}",
        std::process::id()
    ))
}
