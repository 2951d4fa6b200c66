//! TCP 变体解析
//!
//! 把命令行给的类型名解析成一份显式的传输层默认配置，在创建任何端点之前完成，
//! 之后作为参数传给所有需要打开 TCP 连接的地方。

use tracing::debug;

use crate::error::ConfigurationError;
use crate::proto::tcp::{TcpConfig, TcpSocketType};

/// 发送/接收缓冲
pub const TCP_BUFFER_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDefaults {
    pub variant: TcpSocketType,
    pub snd_buf_bytes: u64,
    pub rcv_buf_bytes: u64,
    pub window_scaling: bool,
    pub timestamps: bool,
}

impl TransportDefaults {
    pub fn new(variant: TcpSocketType) -> Self {
        Self {
            variant,
            snd_buf_bytes: TCP_BUFFER_BYTES,
            rcv_buf_bytes: TCP_BUFFER_BYTES,
            window_scaling: true,
            timestamps: true,
        }
    }

    /// 新连接使用的 TCP 配置
    pub fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            socket_type: self.variant,
            snd_buf_bytes: self.snd_buf_bytes,
            rcv_buf_bytes: self.rcv_buf_bytes,
            window_scaling: self.window_scaling,
            timestamps: self.timestamps,
            ..TcpConfig::default()
        }
    }
}

/// 按类型名解析 TCP 变体（区分大小写，可带 `ns3::` 前缀）。
pub fn resolve_tcp(name: &str) -> Result<TransportDefaults, ConfigurationError> {
    let variant = TcpSocketType::lookup(name)
        .ok_or_else(|| ConfigurationError::UnknownTcpVariant(name.to_string()))?;
    debug!(variant = variant.type_name(), "解析 TCP 变体");
    Ok(TransportDefaults::new(variant))
}
