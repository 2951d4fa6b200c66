//! 传输层/协议模块
//!
//! 包含 TCP 的简化实现（用于仿真实验）。

pub mod tcp;

pub use tcp::{
    CwndChange, CwndObserver, TcpConfig, TcpConn, TcpConnId, TcpOpen, TcpSocketType, TcpSource,
    TcpStack, TcpState,
};
