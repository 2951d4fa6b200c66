//! IPv4 地址分配
//!
//! 行为与常见的“地址助手”一致：先设定一个网络块，`next_address` 依次分配 .1、.2 ……，
//! `new_network` 把游标推进到同样大小的下一个块。游标只会单调前进，
//! 保证同一次运行中不同链路段不会复用地址块。

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid prefix length /{0}")]
    Prefix(u8),
    #[error("address block {0} exhausted")]
    Exhausted(Ipv4Net),
    #[error("no address block after {0}")]
    NoNextNetwork(Ipv4Net),
    #[error("address block {new} overlaps already assigned block {existing}")]
    Overlap { new: Ipv4Net, existing: Ipv4Net },
}

#[derive(Debug, Clone)]
pub struct AddressAllocator {
    net: Ipv4Net,
    next_host: u32,
}

impl AddressAllocator {
    /// 以 `base/prefix_len` 为起始块（`base` 会被截断到网络地址）。
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, AddressError> {
        let net = Ipv4Net::new(base, prefix_len)
            .map_err(|_| AddressError::Prefix(prefix_len))?
            .trunc();
        Ok(Self { net, next_host: 1 })
    }

    /// 当前地址块
    pub fn network(&self) -> Ipv4Net {
        self.net
    }

    /// 在当前块内分配下一个主机地址。
    pub fn next_address(&mut self) -> Result<Ipv4Addr, AddressError> {
        let host_bits = 32 - u32::from(self.net.prefix_len());
        let size: u64 = 1u64 << host_bits;
        // /31 与 /32 之外，网络地址与广播地址都不可分配
        let last_usable = if size > 2 { size - 2 } else { size - 1 };
        if u64::from(self.next_host) > last_usable {
            return Err(AddressError::Exhausted(self.net));
        }
        let addr = u32::from(self.net.network()).wrapping_add(self.next_host);
        self.next_host += 1;
        Ok(Ipv4Addr::from(addr))
    }

    /// 推进到下一个同样大小的地址块，主机游标归位。
    pub fn new_network(&mut self) -> Result<Ipv4Net, AddressError> {
        let host_bits = 32 - u32::from(self.net.prefix_len());
        let step = 1u64 << host_bits;
        let next = u64::from(u32::from(self.net.network())) + step;
        if next > u64::from(u32::MAX) {
            return Err(AddressError::NoNextNetwork(self.net));
        }
        let net = Ipv4Net::new(Ipv4Addr::from(next as u32), self.net.prefix_len())
            .map_err(|_| AddressError::Prefix(self.net.prefix_len()))?;
        self.net = net;
        self.next_host = 1;
        Ok(net)
    }
}

/// 两个地址块是否有交集（任一包含另一个即为重叠）。
pub fn blocks_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}
