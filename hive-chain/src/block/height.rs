use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// A block height, counting from zero at the genesis block.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Height(pub u32);

impl Height {
    /// The minimum possible height.
    pub const MIN: Height = Height(0);

    /// The maximum possible height, matching the BIP34 32-bit little-endian
    /// encoding used in the coinbase scriptSig.
    pub const MAX: Height = Height(499_999_999);

    pub fn checked_add(&self, delta: i32) -> Option<Height> {
        let result = (self.0 as i64) + (delta as i64);
        if result < 0 || result > Height::MAX.0 as i64 {
            None
        } else {
            Some(Height(result as u32))
        }
    }
}

impl BitcoinSerialize for Height {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Height {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Height(u32::bitcoin_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_bounds() {
        assert_eq!(Height(5).checked_add(-5), Some(Height(0)));
        assert_eq!(Height(0).checked_add(-1), None);
        assert_eq!(Height::MAX.checked_add(1), None);
    }
}
