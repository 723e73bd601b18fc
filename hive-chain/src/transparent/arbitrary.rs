use proptest::{collection::vec, prelude::*};

use crate::{cached::Cached, LedgerState};

use super::{CoinbaseData, Input, OutPoint, Script};

impl Arbitrary for CoinbaseData {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        vec(any::<u8>(), 0..95)
            .prop_map(CoinbaseData)
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Input {
    type Parameters = LedgerState;

    fn arbitrary_with(ledger_state: Self::Parameters) -> Self::Strategy {
        if ledger_state.is_coinbase {
            (any::<CoinbaseData>(), any::<u32>())
                .prop_map(|(data, sequence)| Input::Coinbase {
                    height: Some(Cached::from(ledger_state.tip_height)),
                    data,
                    sequence,
                })
                .boxed()
        } else {
            (any::<OutPoint>(), any::<Script>(), any::<u32>())
                .prop_map(|(outpoint, unlock_script, sequence)| Input::PrevOut {
                    outpoint,
                    unlock_script,
                    sequence,
                })
                .boxed()
        }
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Input {
    /// Returns a strategy for a transaction's input list: a single coinbase
    /// input when `ledger_state.is_coinbase`, otherwise `1..=max_len`
    /// spending inputs.
    pub fn vec_strategy(ledger_state: LedgerState, max_len: usize) -> BoxedStrategy<Vec<Input>> {
        if ledger_state.is_coinbase {
            Input::arbitrary_with(ledger_state)
                .prop_map(|input| vec![input])
                .boxed()
        } else {
            vec(Input::arbitrary_with(ledger_state), 1..max_len.max(2)).boxed()
        }
    }
}
