//! Bitcoin-style difficulty representation (compact "nBits" target encoding)
//! and the expanded 256-bit target it decodes to.

use std::{cmp::Ordering, fmt, io};

use primitive_types::U256;

use crate::{
    block::Hash,
    parameters::Network,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError},
};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// A 32-bit value encoding a target threshold, in the nBits format used by
/// Bitcoin's wire protocol and block headers.
///
/// The high byte is an exponent; the low three bytes are the mantissa.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct CompactDifficulty(pub u32);

impl CompactDifficulty {
    /// Expand `self` into a full 256-bit target, or `None` if the encoding is
    /// degenerate (negative mantissa high bit set, or mantissa out of range).
    pub fn to_expanded(&self) -> Option<ExpandedDifficulty> {
        let exponent = (self.0 >> 24) as u32;
        let mantissa = self.0 & 0x007f_ffff;
        let is_negative = self.0 & 0x0080_0000 != 0;

        if is_negative || mantissa == 0 {
            return None;
        }

        let target = if exponent <= 3 {
            U256::from(mantissa) >> (8 * (3 - exponent))
        } else {
            if exponent > 32 {
                return None;
            }
            U256::from(mantissa) << (8 * (exponent - 3))
        };

        Some(ExpandedDifficulty(target))
    }

    /// Encode a full 256-bit target back into its compact representation.
    pub fn from_expanded(target: &ExpandedDifficulty) -> CompactDifficulty {
        let mut size = (target.0.bits() + 7) / 8;
        let mut compact: u32 = if size <= 3 {
            (target.0.low_u32()) << (8 * (3 - size))
        } else {
            (target.0 >> (8 * (size - 3))).low_u32()
        };

        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }

        CompactDifficulty(compact | ((size as u32) << 24))
    }
}

impl BitcoinSerialize for CompactDifficulty {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for CompactDifficulty {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(CompactDifficulty(u32::bitcoin_deserialize(reader)?))
    }
}

/// A 256-bit target threshold, expanded from its compact `nBits` encoding.
///
/// Block hashes (and Hive bee hashes) must compare as less-than-or-equal to
/// an `ExpandedDifficulty` to be valid. Lower values represent *more* work.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ExpandedDifficulty(pub U256);

impl fmt::Debug for ExpandedDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExpandedDifficulty")
            .field(&format!("{:064x}", self.0))
            .finish()
    }
}

impl ExpandedDifficulty {
    /// The consensus-defined maximum target (minimum difficulty) for `network`.
    ///
    /// Mirrors Bitcoin's `nPowLimit`: `0x1d00ffff` on mainnet, a looser limit
    /// on testnet.
    pub fn target_difficulty_limit(network: Network) -> ExpandedDifficulty {
        let compact = match network {
            Network::Mainnet => CompactDifficulty(0x1d00_ffff),
            Network::Testnet => CompactDifficulty(0x1d00_ffff),
        };
        compact
            .to_expanded()
            .expect("consensus difficulty limit is always a valid compact encoding")
    }

    pub fn to_compact(&self) -> CompactDifficulty {
        CompactDifficulty::from_expanded(self)
    }
}

impl PartialOrd for ExpandedDifficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl Ord for ExpandedDifficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Block (and bee) hashes are compared against a target by treating the
/// 32-byte hash as a little-endian 256-bit integer, the same convention
/// `arith_uint256` uses in the original implementation.
impl From<Hash> for U256 {
    fn from(hash: Hash) -> U256 {
        U256::from_little_endian(&hash.0)
    }
}

impl PartialEq<ExpandedDifficulty> for Hash {
    fn eq(&self, other: &ExpandedDifficulty) -> bool {
        U256::from_little_endian(&self.0) == other.0
    }
}

impl PartialOrd<ExpandedDifficulty> for Hash {
    fn partial_cmp(&self, other: &ExpandedDifficulty) -> Option<Ordering> {
        U256::from_little_endian(&self.0).partial_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_compact_expanded() {
        let compact = CompactDifficulty(0x1d00_ffff);
        let expanded = compact.to_expanded().expect("valid compact difficulty");
        assert_eq!(expanded.to_compact().0, compact.0);
    }

    #[test]
    fn degenerate_compact_is_none() {
        assert!(CompactDifficulty(0x0100_0000).to_expanded().is_none());
        assert!(CompactDifficulty(0x0180_0001).to_expanded().is_none());
    }

    #[test]
    fn limit_ordering() {
        let limit = ExpandedDifficulty::target_difficulty_limit(Network::Mainnet);
        let tighter = CompactDifficulty(0x1c00_ffff).to_expanded().unwrap();
        assert!(tighter < limit);
    }
}
