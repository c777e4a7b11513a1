//! Blocks: numbered, hash-linked batches of envelopes.

use serde::{Deserialize, Serialize};

use crate::canonical::{block_data_hash, canonical_block_header_bytes};
use crate::crypto::Blake3Hash;
use crate::envelope::Envelope;
use crate::error::CoreError;

/// Header of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain; the genesis block is 0.
    pub number: u64,
    /// Hash of the previous block's header, zero for genesis.
    pub previous_hash: Blake3Hash,
    /// Hash over the canonical encoding of the block's envelopes.
    pub data_hash: Blake3Hash,
}

impl BlockHeader {
    /// Blake3 hash of this header's canonical encoding.
    pub fn hash(&self) -> Blake3Hash {
        Blake3Hash::hash(&canonical_block_header_bytes(self))
    }
}

/// A block of ordered envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: Vec<Envelope>,
}

impl Block {
    /// Block 0 of a chain, carrying the bootstrap configuration transaction.
    pub fn genesis(config_tx: Envelope) -> Self {
        let data = vec![config_tx];
        Self {
            header: BlockHeader {
                number: 0,
                previous_hash: Blake3Hash::ZERO,
                data_hash: block_data_hash(&data),
            },
            data,
        }
    }

    /// The block following `previous`.
    pub fn next(previous: &BlockHeader, data: Vec<Envelope>) -> Self {
        Self {
            header: BlockHeader {
                number: previous.number + 1,
                previous_hash: previous.hash(),
                data_hash: block_data_hash(&data),
            },
            data,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Whether `data_hash` matches the envelopes actually carried.
    pub fn verify_data_hash(&self) -> bool {
        block_data_hash(&self.data) == self.header.data_hash
    }

    /// Whether this block directly follows `previous`.
    pub fn follows(&self, previous: &BlockHeader) -> bool {
        self.header.number == previous.number + 1 && self.header.previous_hash == previous.hash()
    }

    /// Encode as CBOR for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChainId;

    fn msg(data: &[u8]) -> Envelope {
        Envelope::message(ChainId::from("c"), data.to_vec())
    }

    #[test]
    fn test_genesis_header() {
        let genesis = Block::genesis(msg(b"bootstrap"));
        assert_eq!(genesis.number(), 0);
        assert_eq!(genesis.header.previous_hash, Blake3Hash::ZERO);
        assert!(genesis.verify_data_hash());
    }

    #[test]
    fn test_next_links_to_previous() {
        let genesis = Block::genesis(msg(b"bootstrap"));
        let block = Block::next(&genesis.header, vec![msg(b"a"), msg(b"b")]);
        assert_eq!(block.number(), 1);
        assert!(block.follows(&genesis.header));
        assert!(!genesis.follows(&block.header));
    }

    #[test]
    fn test_tampered_data_detected() {
        let genesis = Block::genesis(msg(b"bootstrap"));
        let mut block = Block::next(&genesis.header, vec![msg(b"a")]);
        block.data.push(msg(b"smuggled"));
        assert!(!block.verify_data_hash());
    }

    #[test]
    fn test_storage_encoding() {
        let genesis = Block::genesis(msg(b"bootstrap"));
        let block = Block::next(&genesis.header, vec![msg(b"a")]);
        let decoded = Block::from_bytes(&block.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, block);
    }
}
