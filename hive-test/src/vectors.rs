//! Hand-built, byte-exact wire fixtures.
//!
//! These are not captures of real chain data; they're the smallest byte
//! strings that satisfy each type's own `BitcoinDeserialize` contract, laid
//! out field-by-field so the encoding is easy to audit against the type
//! it feeds.

/// An 80-byte block header: version, an all-zero parent hash, an arbitrary
/// Merkle root, a timestamp, `nBits = 0x1d00ffff`, and a nonce.
#[rustfmt::skip]
pub const DUMMY_HEADER: [u8; 80] = [
    // version: 1 (LE u32)
    0x01, 0x00, 0x00, 0x00,
    // previous_block_hash: 32 zero bytes
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // merkle_root: bytes 1..=32
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
    0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x20,
    // time: 1_600_000_000 (LE u32)
    0x00, 0x10, 0x5e, 0x5f,
    // difficulty_threshold (nBits): 0x1d00ffff (LE u32)
    0xff, 0xff, 0x00, 0x1d,
    // nonce: 2_083_236_893 (LE u32)
    0x1d, 0xac, 0x2b, 0x7c,
];

/// A one-in, one-out coinbase transaction: version 1, a single `Coinbase`
/// input carrying 4 bytes of extranonce-style data, a single 50-coin output
/// locked with a one-byte script, and a height locktime of 0.
#[rustfmt::skip]
pub const DUMMY_TX1: [u8; 65] = [
    // version: 1 (LE i32)
    0x01, 0x00, 0x00, 0x00,
    // input count: 1
    0x01,
    //   coinbase outpoint: null hash (32 bytes) + index 0xffffffff
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0xff,
    //   coinbase data: length 4, bytes
    0x04, 0x01, 0x02, 0x03, 0x04,
    //   sequence
    0xff, 0xff, 0xff, 0xff,
    // output count: 1
    0x01,
    //   value: 5_000_000_000 (50 coins, LE i64)
    0x00, 0xf2, 0x05, 0x2a, 0x01, 0x00, 0x00, 0x00,
    //   lock_script: length 1, OP_TRUE (0x51)
    0x01, 0x51,
    // locktime: 0 (interpreted as a height)
    0x00, 0x00, 0x00, 0x00,
];

/// A standalone transparent output: 50 coins locked with a one-byte script.
#[rustfmt::skip]
pub const DUMMY_OUTPUT1: [u8; 10] = [
    // value: 5_000_000_000 (LE i64)
    0x00, 0xf2, 0x05, 0x2a, 0x01, 0x00, 0x00, 0x00,
    // lock_script: length 1, OP_TRUE (0x51)
    0x01, 0x51,
];

/// A standalone transparent input spending output 0 of an arbitrary
/// previous transaction (not the coinbase sentinel outpoint).
#[rustfmt::skip]
pub const DUMMY_INPUT1: [u8; 44] = [
    // outpoint.hash: 32 bytes, all 0xaa
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    // outpoint.index: 0
    0x00, 0x00, 0x00, 0x00,
    // unlock_script: length 3
    0x03, 0x48, 0x30, 0x45,
    // sequence: 0xffffffff
    0xff, 0xff, 0xff, 0xff,
];
