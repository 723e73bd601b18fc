use std::io;

use crate::{
    block,
    cached::Cached,
    compactint::CompactInt,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transaction,
};

use super::{CoinbaseData, Input, OutPoint, Script};

/// The `OutPoint` used by coinbase inputs: a null transaction hash paired
/// with the maximum possible index.
const COINBASE_OUTPOINT: OutPoint = OutPoint {
    hash: transaction::Hash([0; 32]),
    index: 0xffff_ffff,
};

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.bitcoin_serialize(&mut target)?;
                unlock_script.bitcoin_serialize(&mut target)?;
                sequence.bitcoin_serialize(&mut target)?;
            }
            Input::Coinbase {
                data, sequence, ..
            } => {
                COINBASE_OUTPOINT.bitcoin_serialize(&mut target)?;
                data.bitcoin_serialize(&mut target)?;
                sequence.bitcoin_serialize(&mut target)?;
            }
        }
        Ok(())
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let outpoint = OutPoint::bitcoin_deserialize(&mut reader)?;

        if outpoint == COINBASE_OUTPOINT {
            let data = CoinbaseData::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::Coinbase {
                height: None::<Cached<block::Height>>,
                data,
                sequence,
            })
        } else {
            let unlock_script = Script::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_roundtrip() {
        let input = Input::Coinbase {
            height: None,
            data: CoinbaseData(vec![1, 2, 3]),
            sequence: 0xffff_ffff,
        };
        let mut buf = Vec::new();
        input.bitcoin_serialize(&mut buf).unwrap();
        let parsed = Input::bitcoin_deserialize(&buf[..]).unwrap();
        assert!(matches!(parsed, Input::Coinbase { .. }));
    }

    #[test]
    fn prevout_roundtrip() {
        let input = Input::PrevOut {
            outpoint: OutPoint {
                hash: transaction::Hash([9; 32]),
                index: 1,
            },
            unlock_script: Script(vec![4, 5, 6]),
            sequence: 0,
        };
        let mut buf = Vec::new();
        input.bitcoin_serialize(&mut buf).unwrap();
        let parsed = Input::bitcoin_deserialize(&buf[..]).unwrap();
        assert!(matches!(parsed, Input::PrevOut { .. }));
    }
}
