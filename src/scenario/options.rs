//! 运行参数
//!
//! 与命令行一一对应；默认值即命令行默认值。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigurationError, ExperimentError};
use crate::sim::SimTime;

/// 实验场景编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScenarioId {
    S1,
    S2,
    S3,
    S4,
    S5,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 5] = [
        ScenarioId::S1,
        ScenarioId::S2,
        ScenarioId::S3,
        ScenarioId::S4,
        ScenarioId::S5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::S1 => "S1",
            ScenarioId::S2 => "S2",
            ScenarioId::S3 => "S3",
            ScenarioId::S4 => "S4",
            ScenarioId::S5 => "S5",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ExperimentError::UnsupportedScenario(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeOptions {
    pub scenario: String,
    /// TCP socket 类型名，例如 `TcpCubic`
    pub tcp: String,
    /// 瓶颈队列容量，例如 `150p`、`1MB`
    pub queue: String,
    /// 仿真时长（秒）
    pub time_s: f64,
    /// 预热时长（秒），仅记录，分析时丢弃
    pub warmup_s: f64,
    /// 随机数运行编号
    pub run: u32,
    /// S3 每包丢弃概率
    pub loss: f64,
    /// S4 遮挡时长（秒）
    pub blockage_s: f64,
    pub flow_monitor: bool,
    /// 结果根目录
    pub results_dir: PathBuf,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            scenario: "S1".to_string(),
            tcp: "TcpCubic".to_string(),
            queue: "150p".to_string(),
            time_s: 120.0,
            warmup_s: 20.0,
            run: 1,
            loss: 0.0,
            blockage_s: 0.2,
            flow_monitor: true,
            results_dir: PathBuf::from("results"),
        }
    }
}

impl RuntimeOptions {
    /// 校验数值参数：时长必须是有限的非负数，丢包率在 [0, 1]。
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let seconds = [
            ("time", self.time_s),
            ("warmup", self.warmup_s),
            ("blockage", self.blockage_s),
        ];
        for (option, v) in seconds {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigurationError::InvalidOption {
                    option,
                    reason: format!("expected a non-negative number of seconds, got {v}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(ConfigurationError::InvalidOption {
                option: "loss",
                reason: format!("expected a probability in [0, 1], got {}", self.loss),
            });
        }
        Ok(())
    }

    pub fn scenario_id(&self) -> Result<ScenarioId, ExperimentError> {
        self.scenario.parse()
    }

    pub fn duration(&self) -> SimTime {
        SimTime::from_secs_f64(self.time_s)
    }

    pub fn blockage(&self) -> SimTime {
        SimTime::from_secs_f64(self.blockage_s)
    }
}
