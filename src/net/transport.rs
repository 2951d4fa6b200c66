//! Transport-layer tags carried by packets.

/// IP protocol number as seen by the flow classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpProtocol {
    Tcp,
    Udp,
}

impl IpProtocol {
    pub fn number(self) -> u8 {
        match self {
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
        }
    }
}

/// Packet transport metadata.
///
/// `Packet` is a network-layer carrier; transport tags let the protocol stack
/// interpret it without coupling the network to protocol implementations.
#[derive(Debug, Clone)]
pub enum Transport {
    /// TCP segment (simplified).
    Tcp(TcpSegment),
    /// Opaque UDP datagram.
    Udp,
}

impl Transport {
    pub fn protocol(&self) -> IpProtocol {
        match self {
            Transport::Tcp(_) => IpProtocol::Tcp,
            Transport::Udp => IpProtocol::Udp,
        }
    }
}

/// TCP segment (minimal fields for simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSegment {
    /// SYN
    Syn,
    /// SYN-ACK
    SynAck,
    /// Reset: no listener on the destination port.
    Rst,
    /// Data segment: `seq` is byte sequence number, `len` is payload bytes.
    Data { seq: u64, len: u32 },
    /// ACK segment: `ack` is next expected byte (cumulative).
    Ack { ack: u64 },
}
