use proptest::prelude::*;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize};

use super::{OutPoint, Output};

proptest! {
    #[test]
    fn outpoint_roundtrip(outpoint in any::<OutPoint>()) {
        hive_test::init();

        let bytes = outpoint.bitcoin_serialize_to_vec()?;
        let other = OutPoint::bitcoin_deserialize(&bytes[..])?;

        prop_assert_eq![outpoint, other];
    }

    #[test]
    fn output_roundtrip(output in any::<Output>()) {
        hive_test::init();

        let bytes = output.bitcoin_serialize_to_vec()?;
        let other = Output::bitcoin_deserialize(&bytes[..])?;

        prop_assert_eq![output, other];
    }
}
