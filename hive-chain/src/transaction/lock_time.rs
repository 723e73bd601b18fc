use std::io;

use crate::{
    block,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError, SmallUnixTime},
};

/// A transaction's lock time, specified either as a block height or as a
/// Unix timestamp, following the usual Bitcoin convention of using the
/// magnitude of the encoded `u32` to distinguish the two.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LockTime {
    /// The transaction may be included in any block with a height greater
    /// than or equal to this height.
    Height(block::Height),
    /// The transaction may be included in any block whose median time past
    /// is greater than or equal to this timestamp.
    Time(SmallUnixTime),
}

impl LockTime {
    /// Values below this threshold are interpreted as block heights.
    pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

    /// The minimum timestamp representable by a lock time, equal to
    /// [`LOCKTIME_THRESHOLD`](Self::LOCKTIME_THRESHOLD).
    pub const MIN_TIMESTAMP: u32 = Self::LOCKTIME_THRESHOLD;

    /// The maximum timestamp representable by a lock time.
    pub const MAX_TIMESTAMP: u32 = u32::MAX;
}

impl BitcoinSerialize for LockTime {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        match self {
            LockTime::Height(height) => height.0.bitcoin_serialize(target),
            LockTime::Time(time) => time.bitcoin_serialize(target),
        }
    }
}

impl BitcoinDeserialize for LockTime {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = u32::bitcoin_deserialize(reader)?;
        if raw < Self::LOCKTIME_THRESHOLD {
            Ok(LockTime::Height(block::Height(raw)))
        } else {
            Ok(LockTime::Time(SmallUnixTime::from_raw(raw)))
        }
    }
}

impl SmallUnixTime {
    fn from_raw(raw: u32) -> SmallUnixTime {
        use chrono::{TimeZone, Utc};
        SmallUnixTime(Utc.timestamp(raw as i64, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_roundtrip() {
        let lock = LockTime::Height(block::Height(100));
        let bytes = lock.bitcoin_serialize_to_vec().unwrap();
        let parsed = LockTime::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(lock, parsed);
    }

    #[test]
    fn time_roundtrip() {
        let lock = LockTime::Time(SmallUnixTime::from_raw(LockTime::MIN_TIMESTAMP));
        let bytes = lock.bitcoin_serialize_to_vec().unwrap();
        let parsed = LockTime::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(lock, parsed);
    }
}
