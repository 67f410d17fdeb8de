use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sha256::Hash;

/// The 80-byte consensus block header.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    /// the hash of the previous block.
    pub prev_block_hash: Hash,
    /// the Merkle tree root hash of the block's transactions.
    pub merkle_root: Hash,
    /// block time in unix seconds.
    pub time: u32,
    /// compact-encoded proof-of-work target this block claims to meet.
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Double SHA-256 of the serialized header. Every field is
    /// little-endian and hashes are serialized in their internal byte
    /// order; any deviation here forks the node off the network.
    pub fn hash(&self) -> Hash {
        let mut bytes = Vec::with_capacity(80);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.prev_block_hash.as_bytes());
        bytes.extend_from_slice(&self.merkle_root.as_bytes());
        bytes.extend_from_slice(&self.time.to_le_bytes());
        bytes.extend_from_slice(&self.bits.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        Hash::digest(&bytes)
    }

    pub fn block_time(&self) -> i64 {
        self.time as i64
    }
}

/// A node in the ancestor-linked block index, as the consensus engine
/// sees it. The engine only reads these fields; building and
/// reorganizing the index is the caller's job.
#[derive(Clone, Debug)]
pub struct BlockIndex {
    pub height: u64,
    /// block time in unix seconds.
    pub time: u32,
    /// compact-encoded target this block was validated against.
    pub bits: u32,
    /// the previous block, absent only at genesis.
    pub prev: Option<Arc<BlockIndex>>,
}

impl BlockIndex {
    pub fn block_time(&self) -> i64 {
        self.time as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(nonce: u32) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block_hash: Hash::zero(),
            merkle_root: Hash::zero(),
            time: 1_673_049_600,
            bits: 0x1e7fffff,
            nonce,
        }
    }

    #[test]
    fn header_hash_is_deterministic() {
        assert_eq!(header(7).hash(), header(7).hash());
    }

    #[test]
    fn header_hash_covers_the_nonce() {
        assert_ne!(header(7).hash(), header(8).hash());
    }
}
