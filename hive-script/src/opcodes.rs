//! The handful of opcode bytes the sigop counter needs to recognize.
//! Not a full opcode table — this crate is not a script interpreter.

#![allow(non_upper_case_globals)]

pub struct Opcode;

impl Opcode {
    pub const OP_0: u8 = 0x00;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_CHECKSIGVERIFY: u8 = 0xad;
    pub const OP_CHECKMULTISIG: u8 = 0xae;
    pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
    pub const OP_RETURN: u8 = 0x6a;

    /// Not a standard Bitcoin opcode. Marks the start of a Hive proof
    /// script's payload, immediately following `OP_RETURN`. The original
    /// source declares its use but its numeric assignment was not part of
    /// the retained script table, so this follows the convention used by
    /// other single-purpose opcode extensions in this family of forks:
    /// the first unused slot in the `OP_NOP`/reserved range.
    pub const OP_BEE: u8 = 0xb2;
}
