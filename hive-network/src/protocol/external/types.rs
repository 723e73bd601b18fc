//! Newtype wrappers for primitive wire types shared across several messages.

use std::io;
use std::net::SocketAddr;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use hive_chain::parameters::Network;
use hive_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The protocol version numbers supported by this crate.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(pub u32);

impl BitcoinSerialize for ProtocolVersion {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for ProtocolVersion {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(ProtocolVersion(u32::bitcoin_deserialize(reader)?))
    }
}

bitflags! {
    /// Services advertised by a peer in its `version` message and address
    /// book entries.
    #[derive(Default)]
    pub struct PeerServices: u64 {
        /// Full node: can serve the complete block chain.
        const NODE_NETWORK = 1 << 0;
        /// Can be asked for arbitrary blocks, not just recent ones, via
        /// BIP 37 Bloom filters.
        const NODE_BLOOM = 1 << 2;
        /// Can serve the last 288 blocks (BIP 159, pruned peer).
        const NODE_NETWORK_LIMITED = 1 << 10;
    }
}

impl BitcoinSerialize for PeerServices {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.bits().bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for PeerServices {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let bits = u64::bitcoin_deserialize(reader)?;
        Ok(PeerServices::from_bits_truncate(bits))
    }
}

/// A nonce used to detect self-connections (`version`, `ping`, `pong`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Nonce(pub u64);

impl BitcoinSerialize for Nonce {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Nonce {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Nonce(u64::bitcoin_deserialize(reader)?))
    }
}

/// A Bloom filter, as loaded via `filterload` (BIP 37). Capped at 36,000
/// bytes by the dispatcher, not by this type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter(pub Vec<u8>);

/// The tweak added to the seed of each of a Bloom filter's hash functions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Tweak(pub u32);

/// The 4-byte network magic that begins every message header.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Magic(pub [u8; 4]);

impl std::fmt::Debug for Magic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Magic").field(&hex::encode(&self.0)).finish()
    }
}

impl From<Network> for Magic {
    fn from(network: Network) -> Self {
        match network {
            Network::Mainnet => Magic([0xf2, 0xb5, 0x02, 0xc3]),
            Network::Testnet => Magic([0x0b, 0x11, 0x09, 0x07]),
        }
    }
}

/// Encodes `addr` as `<services:8><ip:16><port:2 be>`, the pre-BIP155 `addr`
/// encoding used alongside a separate 4-byte timestamp in the `addr`
/// message's vector framing.
pub(crate) fn write_addr_body<W: io::Write>(
    mut target: W,
    services: PeerServices,
    addr: SocketAddr,
) -> Result<(), io::Error> {
    services.bits().bitcoin_serialize(&mut target)?;

    let ip_bytes: [u8; 16] = match addr.ip() {
        std::net::IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        std::net::IpAddr::V6(v6) => v6.octets(),
    };
    target.write_all(&ip_bytes)?;
    target.write_u16::<BigEndian>(addr.port())
}

pub(crate) fn read_addr_body<R: io::Read>(
    mut reader: R,
) -> Result<(PeerServices, SocketAddr), SerializationError> {
    let services = PeerServices::bitcoin_deserialize(&mut reader)?;

    let mut ip_bytes = [0u8; 16];
    reader.read_exact(&mut ip_bytes)?;
    let port = reader.read_u16::<BigEndian>()?;

    let ip = std::net::Ipv6Addr::from(ip_bytes);
    let addr = match ip.to_ipv4_mapped() {
        Some(v4) => SocketAddr::new(std::net::IpAddr::V4(v4), port),
        None => SocketAddr::new(std::net::IpAddr::V6(ip), port),
    };
    Ok((services, addr))
}

impl BitcoinSerialize for (PeerServices, SocketAddr) {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        write_addr_body(target, self.0, self.1)
    }
}

impl BitcoinDeserialize for (PeerServices, SocketAddr) {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        read_addr_body(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_differs_by_network() {
        assert_ne!(Magic::from(Network::Mainnet), Magic::from(Network::Testnet));
    }

    #[test]
    fn addr_body_roundtrip() {
        use std::net::{IpAddr, Ipv4Addr};
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333);
        let services = PeerServices::NODE_NETWORK;

        let mut buf = Vec::new();
        write_addr_body(&mut buf, services, addr).unwrap();
        let (parsed_services, parsed_addr) = read_addr_body(&buf[..]).unwrap();

        assert_eq!(services, parsed_services);
        assert_eq!(addr, parsed_addr);
    }
}
