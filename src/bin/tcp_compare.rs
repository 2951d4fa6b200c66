//! TCP 拥塞控制对比实验
//!
//! 选定场景（S1–S5）与 TCP 变体运行一次仿真，产物写到
//! `<results-dir>/<scenario>/<variant>/run-<run>/` 下：`cwnd.csv`、`flowmon.xml`、`run.json`。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tcpcmp_rs::scenario::{RuntimeOptions, run};

#[derive(Debug, Parser)]
#[command(name = "tcp-compare", about = "TCP 拥塞控制算法对比：五种场景的仿真实验")]
struct Args {
    /// 场景编号：S1..S5
    #[arg(long, default_value = "S1")]
    scenario: String,

    /// TCP socket 类型名，例如 TcpCubic、TcpBbr、TcpNewReno
    #[arg(long, default_value = "TcpCubic")]
    tcp: String,

    /// 瓶颈队列容量（`150p` 按包，`1MB`/`64KB`/`1500B` 按字节）
    #[arg(long, default_value = "150p")]
    queue: String,

    /// 仿真时长（秒）
    #[arg(long, default_value_t = 120.0)]
    time: f64,

    /// 预热时长（秒）；仅写入 run.json，分析时丢弃
    #[arg(long, default_value_t = 20.0)]
    warmup: f64,

    /// 随机数运行编号
    #[arg(long, default_value_t = 1)]
    run: u32,

    /// S3 瓶颈链路每包丢弃概率
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// S4 遮挡时长（秒）
    #[arg(long, default_value_t = 0.2)]
    blockage: f64,

    /// 是否启用流统计并写出 flowmon.xml
    #[arg(long = "flowMonitor", default_value_t = true, action = ArgAction::Set)]
    flow_monitor: bool,

    /// 结果根目录
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
}

impl From<Args> for RuntimeOptions {
    fn from(a: Args) -> Self {
        RuntimeOptions {
            scenario: a.scenario,
            tcp: a.tcp,
            queue: a.queue,
            time_s: a.time,
            warmup_s: a.warmup,
            run: a.run,
            loss: a.loss,
            blockage_s: a.blockage,
            flow_monitor: a.flow_monitor,
            results_dir: a.results_dir,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let opts = RuntimeOptions::from(Args::parse());

    match run(&opts) {
        Ok(report) => {
            println!(
                "done @ {}\n  scenario={} tcp={} run={}\n  dir={}\n  cwnd_records={} monitored_flows={:?}\n  net: delivered_pkts={}, delivered_bytes={}, dropped_pkts={}, dropped_bytes={}",
                report.final_time,
                report.scenario,
                report.tcp_variant,
                report.run,
                report.artifacts.dir.display(),
                report.cwnd_records,
                report.monitored_flows,
                report.stats.delivered_pkts,
                report.stats.delivered_bytes,
                report.stats.dropped_pkts,
                report.stats.dropped_bytes,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
