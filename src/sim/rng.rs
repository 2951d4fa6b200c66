//! 确定性随机数
//!
//! 每个随机消费者（误码模型、on/off 应用……）各拿一条独立的 ChaCha 流：
//! 种子取运行编号，流号区分消费者。同一运行编号下结果完全可复现。

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// 随机流号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    /// 链路接收端误码模型
    RxError(u64),
    /// 第 n 个 on/off 应用
    OnOff(u64),
}

impl RngStream {
    fn id(self) -> u64 {
        match self {
            RngStream::RxError(n) => n << 1,
            RngStream::OnOff(n) => (n << 1) | 1,
        }
    }
}

/// 按运行编号与流号构造随机数发生器。
pub fn stream_rng(run: u64, stream: RngStream) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(run);
    rng.set_stream(stream.id());
    rng
}
