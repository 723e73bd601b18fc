//! Addresses carried in the peer address book and the `addr` message.

use std::io;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};

use hive_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use crate::protocol::external::types::{read_addr_body, write_addr_body, PeerServices};

/// A single entry of an `addr` message: a peer's advertised services and
/// socket address, timestamped with the sender's last-seen time for it.
///
/// Addresses with an implausible timestamp are normalized by the caller to
/// `now - 5 days`, per the dispatcher's `addr` handling contract; this type
/// only carries whatever timestamp it was given.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MetaAddr {
    pub addr: SocketAddr,
    pub services: PeerServices,
    pub last_seen: DateTime<Utc>,
}

impl MetaAddr {
    pub fn new(addr: SocketAddr, services: PeerServices) -> MetaAddr {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the unix epoch")
            .as_secs();
        MetaAddr {
            addr,
            services,
            last_seen: Utc.timestamp(now as i64, 0),
        }
    }
}

impl BitcoinSerialize for MetaAddr {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        let timestamp = u32::try_from_secs(self.last_seen);
        target.write_u32::<LittleEndian>(timestamp)?;
        write_addr_body(&mut target, self.services, self.addr)
    }
}

impl BitcoinDeserialize for MetaAddr {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let timestamp = reader.read_u32::<LittleEndian>()?;
        let (services, addr) = read_addr_body(&mut reader)?;
        Ok(MetaAddr {
            addr,
            services,
            last_seen: Utc.timestamp(timestamp as i64, 0),
        })
    }
}

trait TimestampExt {
    fn try_from_secs(time: DateTime<Utc>) -> Self;
}

impl TimestampExt for u32 {
    fn try_from_secs(time: DateTime<Utc>) -> u32 {
        u32::try_from(time.timestamp()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_addr_roundtrip() {
        use std::net::{IpAddr, Ipv4Addr};
        let addr = MetaAddr::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
        );

        let mut buf = Vec::new();
        addr.bitcoin_serialize(&mut buf).unwrap();
        let parsed = MetaAddr::bitcoin_deserialize(&buf[..]).unwrap();

        assert_eq!(addr.addr, parsed.addr);
        assert_eq!(addr.services, parsed.services);
        assert_eq!(addr.last_seen.timestamp(), parsed.last_seen.timestamp());
    }
}
