//! The Bitcoin-inherited transaction Merkle tree.

use std::{io, iter::FromIterator};

use crate::{
    serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transaction,
};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The root of a block's transaction Merkle tree.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Root(pub [u8; 32]);

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(&reversed))
            .finish()
    }
}

impl BitcoinSerialize for Root {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Root {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Root(<[u8; 32]>::bitcoin_deserialize(reader)?))
    }
}

/// Combine two 32-byte tree nodes using Bitcoin's SHA256d pairwise hash.
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    sha256d::hash(&data)
}

/// Builds a Merkle root from an iterator of transaction hashes, duplicating
/// the final node at each level when the row has an odd length, matching
/// Bitcoin's (malleable, CVE-2012-2459-prone) algorithm.
impl FromIterator<transaction::Hash> for Root {
    fn from_iter<T: IntoIterator<Item = transaction::Hash>>(iter: T) -> Self {
        let mut layer: Vec<[u8; 32]> = iter.into_iter().map(|hash| hash.0).collect();

        if layer.is_empty() {
            return Root([0; 32]);
        }

        while layer.len() > 1 {
            if layer.len() % 2 == 1 {
                let last = *layer.last().expect("layer is non-empty");
                layer.push(last);
            }
            layer = layer
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
        }

        Root(layer[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_is_zero() {
        let root: Root = std::iter::empty().collect();
        assert_eq!(root.0, [0; 32]);
    }

    #[test]
    fn single_leaf_is_identity() {
        let h = transaction::Hash([7; 32]);
        let root: Root = std::iter::once(h).collect();
        assert_eq!(root.0, h.0);
    }
}
