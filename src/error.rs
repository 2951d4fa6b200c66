//! 实验错误类型
//!
//! 所有错误都是致命的：向上传播给调用方，不重试。

use std::io;
use std::path::PathBuf;

use crate::queue::QueueSizeError;
use crate::topo::TopologyError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown TCP variant `{0}`")]
    UnknownTcpVariant(String),
    #[error("invalid value for `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("unsupported scenario `{0}` (expected S1, S2, S3, S4 or S5)")]
    UnsupportedScenario(String),
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
    #[error("invalid flow: {0}")]
    InvalidFlow(String),
    #[error("invalid queue size `{queue}`: {source}")]
    Queue {
        queue: String,
        #[source]
        source: QueueSizeError,
    },
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write cwnd trace: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write run manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExperimentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExperimentError::Io {
            path: path.into(),
            source,
        }
    }
}
