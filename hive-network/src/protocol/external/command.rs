//! The 12-byte ASCII command string that names a message's payload type.

use std::io;

use hive_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A message command, as carried in the 12-byte, null-padded ASCII command
/// field of a message header.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    Version,
    Verack,
    Addr,
    Inv,
    GetData,
    NotFound,
    GetBlocks,
    GetHeaders,
    Tx,
    Block,
    Headers,
    GetAddr,
    MemPool,
    Ping,
    Pong,
    Reject,
    SendHeaders,
    FeeFilter,
    SendCmpct,
    CmpctBlock,
    GetBlockTxn,
    BlockTxn,
    FilterLoad,
    FilterAdd,
    FilterClear,
    MerkleBlock,
    Alert,
}

impl Command {
    /// The 12-byte, null-padded ASCII command string used on the wire.
    pub fn bytes(&self) -> &'static [u8] {
        match self {
            Command::Version => b"version\0\0\0\0\0",
            Command::Verack => b"verack\0\0\0\0\0\0",
            Command::Addr => b"addr\0\0\0\0\0\0\0\0",
            Command::Inv => b"inv\0\0\0\0\0\0\0\0\0",
            Command::GetData => b"getdata\0\0\0\0\0",
            Command::NotFound => b"notfound\0\0\0\0",
            Command::GetBlocks => b"getblocks\0\0\0",
            Command::GetHeaders => b"getheaders\0\0",
            Command::Tx => b"tx\0\0\0\0\0\0\0\0\0\0",
            Command::Block => b"block\0\0\0\0\0\0\0",
            Command::Headers => b"headers\0\0\0\0\0",
            Command::GetAddr => b"getaddr\0\0\0\0\0",
            Command::MemPool => b"mempool\0\0\0\0\0",
            Command::Ping => b"ping\0\0\0\0\0\0\0\0",
            Command::Pong => b"pong\0\0\0\0\0\0\0\0",
            Command::Reject => b"reject\0\0\0\0\0\0",
            Command::SendHeaders => b"sendheaders\0",
            Command::FeeFilter => b"feefilter\0\0\0",
            Command::SendCmpct => b"sendcmpct\0\0\0",
            Command::CmpctBlock => b"cmpctblock\0\0",
            Command::GetBlockTxn => b"getblocktxn\0",
            Command::BlockTxn => b"blocktxn\0\0\0\0",
            Command::FilterLoad => b"filterload\0\0",
            Command::FilterAdd => b"filteradd\0\0\0",
            Command::FilterClear => b"filterclear\0",
            Command::MerkleBlock => b"merkleblock\0",
            Command::Alert => b"alert\0\0\0\0\0\0\0",
        }
    }
}

impl BitcoinSerialize for Command {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        target.write_all(self.bytes())
    }
}

impl BitcoinDeserialize for Command {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut raw = [0u8; 12];
        reader.read_exact(&mut raw)?;

        let commands = [
            Command::Version,
            Command::Verack,
            Command::Addr,
            Command::Inv,
            Command::GetData,
            Command::NotFound,
            Command::GetBlocks,
            Command::GetHeaders,
            Command::Tx,
            Command::Block,
            Command::Headers,
            Command::GetAddr,
            Command::MemPool,
            Command::Ping,
            Command::Pong,
            Command::Reject,
            Command::SendHeaders,
            Command::FeeFilter,
            Command::SendCmpct,
            Command::CmpctBlock,
            Command::GetBlockTxn,
            Command::BlockTxn,
            Command::FilterLoad,
            Command::FilterAdd,
            Command::FilterClear,
            Command::MerkleBlock,
            Command::Alert,
        ];

        commands
            .into_iter()
            .find(|c| c.bytes() == &raw[..])
            .ok_or(SerializationError::Parse("unrecognized message command"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_round_trips() {
        let commands = [
            Command::Version,
            Command::Verack,
            Command::Addr,
            Command::Inv,
            Command::GetData,
            Command::NotFound,
            Command::GetBlocks,
            Command::GetHeaders,
            Command::Tx,
            Command::Block,
            Command::Headers,
            Command::GetAddr,
            Command::MemPool,
            Command::Ping,
            Command::Pong,
            Command::Reject,
            Command::SendHeaders,
            Command::FeeFilter,
            Command::SendCmpct,
            Command::CmpctBlock,
            Command::GetBlockTxn,
            Command::BlockTxn,
            Command::FilterLoad,
            Command::FilterAdd,
            Command::FilterClear,
            Command::MerkleBlock,
            Command::Alert,
        ];
        for c in commands {
            assert_eq!(c.bytes().len(), 12);
            let parsed = Command::bitcoin_deserialize(c.bytes()).unwrap();
            assert_eq!(c, parsed);
        }
    }
}
