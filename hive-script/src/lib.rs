//! A narrow sigop-counting and standardness collaborator.
//!
//! Full script evaluation (`EvalScript`, the interpreter) is out of scope
//! per the specification: this crate only answers the two questions the
//! core subsystems actually ask of a script — "how many sigops does this
//! cost" (spec §4.5 Block Assembler weight/sigop caps) and "is this a
//! standard script" (spec §4.1 `filteradd` element-size check and mempool
//! admission policy). The surface mirrors `consensus/tx_verify.h`'s
//! `GetLegacySigOpCount` / `GetTransactionSigOpCost`, ported as counting
//! functions over raw script bytes rather than an interpreter.

use hive_chain::transaction::Transaction;
use hive_chain::transparent::{Input, Output, Script};

mod opcodes;

pub use opcodes::Opcode;

/// The maximum serialized size of a single script-pushed element, mirrored
/// from `script/script.h`'s `MAX_SCRIPT_ELEMENT_SIZE`. Consulted by the
/// dispatcher's `filteradd` handler (spec §4.1).
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Weight multiplier sigops are scaled by in `GetTransactionSigOpCost`,
/// mirrored from `consensus/consensus.h`'s `WITNESS_SCALE_FACTOR`.
pub const WITNESS_SCALE_FACTOR: i64 = 4;

/// Legacy (non-P2SH, non-witness) sigop count for a single script, counting
/// `OP_CHECKSIG`/`OP_CHECKSIGVERIFY` as 1 and `OP_CHECKMULTISIG`/
/// `OP_CHECKMULTISIGVERIFY` as up to 20 (or the preceding small-int push, if
/// any, following `accurate` mode).
pub fn count_legacy_sigops(script: &Script, accurate: bool) -> u32 {
    let mut count = 0u32;
    let mut last_opcode = None::<u8>;
    let mut iter = script.0.iter().copied().peekable();

    while let Some(op) = iter.next() {
        match op {
            Opcode::OP_CHECKSIG | Opcode::OP_CHECKSIGVERIFY => count += 1,
            Opcode::OP_CHECKMULTISIG | Opcode::OP_CHECKMULTISIGVERIFY => {
                if accurate {
                    if let Some(n) = last_opcode.and_then(small_int_value) {
                        count += n;
                    } else {
                        count += 20;
                    }
                } else {
                    count += 20;
                }
            }
            // Push opcodes consume their data length; skip over it so the
            // next byte we inspect is really the next opcode.
            0x01..=0x4b => {
                for _ in 0..op {
                    iter.next();
                }
            }
            _ => {}
        }
        last_opcode = Some(op);
    }

    count
}

fn small_int_value(opcode: u8) -> Option<u32> {
    match opcode {
        Opcode::OP_0 => Some(0),
        0x51..=0x60 => Some((opcode - 0x50) as u32),
        _ => None,
    }
}

/// Legacy sigop count summed over every input's `unlock_script` and every
/// output's `lock_script` of `tx`, mirroring `GetLegacySigOpCount`.
pub fn legacy_sigop_count(tx: &Transaction) -> u32 {
    let mut count = 0;
    for input in &tx.inputs {
        if let Input::PrevOut { unlock_script, .. } = input {
            count += count_legacy_sigops(unlock_script, false);
        }
    }
    for output in &tx.outputs {
        count += count_legacy_sigops(&output.lock_script, false);
    }
    count
}

/// P2SH sigop count: for every input spending a P2SH output, the redeem
/// script (the last push in the unlocking script) is counted in accurate
/// mode. `resolve_prevout` looks up the output being spent, matching
/// `GetP2SHSigOpCount`'s dependence on the UTXO set.
pub fn p2sh_sigop_count(
    tx: &Transaction,
    mut resolve_prevout: impl FnMut(&hive_chain::transparent::OutPoint) -> Option<Output>,
) -> u32 {
    if tx.is_coinbase() {
        return 0;
    }

    let mut count = 0;
    for input in &tx.inputs {
        if let Input::PrevOut {
            outpoint,
            unlock_script,
            ..
        } = input
        {
            if let Some(prevout) = resolve_prevout(outpoint) {
                if is_p2sh(&prevout.lock_script) {
                    if let Some(redeem_script) = last_push(unlock_script) {
                        count += count_legacy_sigops(&Script(redeem_script), true);
                    }
                }
            }
        }
    }
    count
}

/// `GetTransactionSigOpCost`: legacy + P2SH sigops, scaled by
/// [`WITNESS_SCALE_FACTOR`] (there is no witness discount yet, since
/// `hive-chain` does not implement SegWit, so this is simply `4 *
/// (legacy + p2sh)`).
pub fn transaction_sigop_cost(
    tx: &Transaction,
    resolve_prevout: impl FnMut(&hive_chain::transparent::OutPoint) -> Option<Output>,
) -> i64 {
    let legacy = legacy_sigop_count(tx) as i64;
    let p2sh = p2sh_sigop_count(tx, resolve_prevout) as i64;
    (legacy + p2sh) * WITNESS_SCALE_FACTOR
}

/// Returns `true` if `script` is a standard pay-to-script-hash output
/// script: `OP_HASH160 <20 bytes> OP_EQUAL`.
pub fn is_p2sh(script: &Script) -> bool {
    script.0.len() == 23
        && script.0[0] == Opcode::OP_HASH160
        && script.0[1] == 0x14
        && script.0[22] == Opcode::OP_EQUAL
}

fn last_push(script: &Script) -> Option<Vec<u8>> {
    let mut iter = script.0.iter().copied().peekable();
    let mut last = None;
    while let Some(op) = iter.next() {
        match op {
            0x01..=0x4b => {
                let data: Vec<u8> = (&mut iter).take(op as usize).collect();
                if data.len() == op as usize {
                    last = Some(data);
                }
            }
            _ => {}
        }
    }
    last
}

/// A narrow standardness check over raw output scripts, consulted by the
/// mempool admission policy (out of scope for detailed implementation, but
/// depended on by [`MAX_SCRIPT_ELEMENT_SIZE`] callers).
pub fn is_standard_output(script: &Script) -> bool {
    script.0.len() <= MAX_SCRIPT_ELEMENT_SIZE + 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(bytes: &[u8]) -> Script {
        Script(bytes.to_vec())
    }

    #[test]
    fn counts_bare_checksig() {
        hive_test::init();
        let s = script(&[Opcode::OP_CHECKSIG]);
        assert_eq!(count_legacy_sigops(&s, false), 1);
    }

    #[test]
    fn counts_inaccurate_multisig_as_twenty() {
        hive_test::init();
        let s = script(&[Opcode::OP_CHECKMULTISIG]);
        assert_eq!(count_legacy_sigops(&s, false), 20);
    }

    #[test]
    fn accurate_multisig_uses_preceding_small_int() {
        hive_test::init();
        let s = script(&[0x52, Opcode::OP_CHECKMULTISIG]);
        assert_eq!(count_legacy_sigops(&s, true), 2);
    }

    #[test]
    fn push_data_is_skipped_not_counted() {
        hive_test::init();
        let mut bytes = vec![0x02, 0xAA, Opcode::OP_CHECKSIG];
        bytes.push(Opcode::OP_CHECKSIG);
        let s = script(&bytes);
        // one 2-byte push (skipped) followed by two real CHECKSIGs
        assert_eq!(count_legacy_sigops(&s, false), 1);
    }

    #[test]
    fn p2sh_detection() {
        hive_test::init();
        let mut bytes = vec![Opcode::OP_HASH160, 0x14];
        bytes.extend_from_slice(&[0u8; 20]);
        bytes.push(Opcode::OP_EQUAL);
        assert!(is_p2sh(&script(&bytes)));
        assert!(!is_p2sh(&script(&[Opcode::OP_CHECKSIG])));
    }
}
