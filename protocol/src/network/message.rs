//! # Wire Messages
//!
//! Peers exchange newline-delimited JSON envelopes on the
//! `blockchain-storage` protocol:
//!
//! ```text
//! {"type":"NewBlock","payload":{"block":{...}}}\n
//! {"type":"RequestChunks","payload":{"merkleRoot":"ab12..","indices":[0,3]}}\n
//! ```
//!
//! The envelope carries its payload as raw JSON so a reader can route on
//! `type` before committing to a payload shape. Blank lines are keep-alives
//! and decode to nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{hex_bytes, hex_hash, Hash};
use crate::merkle::{verify_proof, MerkleError, MerkleProofStep, MerkleTree};
use crate::storage::block::Block;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("payload does not match {kind:?}: {source}")]
    Payload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("chunk {index} does not exist")]
    MissingChunk { index: usize },

    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    NewBlock,
    SendChunks,
    RequestChunks,
    RequestBlockchain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub payload: serde_json::Value,
}

impl Message {
    /// Wrap a typed payload in an envelope of the given kind.
    pub fn new<T: Serialize>(kind: MessageType, payload: &T) -> Result<Self, MessageError> {
        let payload = serde_json::to_value(payload).map_err(MessageError::Encode)?;
        Ok(Self { kind, payload })
    }

    pub fn new_block(block: Block) -> Result<Self, MessageError> {
        Self::new(MessageType::NewBlock, &NewBlock { block })
    }

    pub fn request_chunks(merkle_root: Hash, indices: Vec<usize>) -> Result<Self, MessageError> {
        Self::new(
            MessageType::RequestChunks,
            &RequestChunks {
                merkle_root,
                indices,
            },
        )
    }

    pub fn send_chunks(chunks: Vec<ChunkPackage>) -> Result<Self, MessageError> {
        Self::new(MessageType::SendChunks, &SendChunks { chunks })
    }

    pub fn request_blockchain() -> Result<Self, MessageError> {
        Self::new(MessageType::RequestBlockchain, &RequestBlockchain {})
    }

    /// Serialize as a single JSON line, newline included.
    pub fn encode_line(&self) -> Result<String, MessageError> {
        let mut line = serde_json::to_string(self).map_err(MessageError::Encode)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one line read off a stream. Blank lines yield `Ok(None)`.
    pub fn decode_line(line: &str) -> Result<Option<Self>, MessageError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line)
            .map(Some)
            .map_err(MessageError::Malformed)
    }

    /// Decode the payload as `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        T::deserialize(&self.payload).map_err(|source| MessageError::Payload {
            kind: self.kind,
            source,
        })
    }

    /// Decode the payload according to the envelope's `type`.
    pub fn decode_payload(&self) -> Result<Payload, MessageError> {
        Ok(match self.kind {
            MessageType::NewBlock => Payload::NewBlock(self.payload()?),
            MessageType::SendChunks => Payload::SendChunks(self.payload()?),
            MessageType::RequestChunks => Payload::RequestChunks(self.payload()?),
            MessageType::RequestBlockchain => Payload::RequestBlockchain(self.payload()?),
        })
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A freshly sealed block announced to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlock {
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestChunks {
    #[serde(with = "hex_hash")]
    pub merkle_root: Hash,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendChunks {
    pub chunks: Vec<ChunkPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestBlockchain {}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    NewBlock(NewBlock),
    SendChunks(SendChunks),
    RequestChunks(RequestChunks),
    RequestBlockchain(RequestBlockchain),
}

// ---------------------------------------------------------------------------
// Chunk Packages
// ---------------------------------------------------------------------------

/// A chunk shipped together with its inclusion proof, so the receiver can
/// check it against a Merkle root it already trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPackage {
    #[serde(with = "hex_hash")]
    pub merkle_root: Hash,
    pub index: usize,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub proof: Vec<MerkleProofStep>,
}

impl ChunkPackage {
    /// Package chunk `index` of `chunks`, which must be the sequence `tree`
    /// was built from.
    pub fn from_tree<T: AsRef<[u8]>>(
        tree: &MerkleTree,
        chunks: &[T],
        index: usize,
    ) -> Result<Self, MessageError> {
        let data = chunks
            .get(index)
            .ok_or(MessageError::MissingChunk { index })?
            .as_ref()
            .to_vec();
        let proof = tree.generate_proof(index)?;
        Ok(Self {
            merkle_root: tree.root(),
            index,
            data,
            proof,
        })
    }

    /// Whether `data` and `proof` reproduce `merkle_root`.
    pub fn verify(&self) -> bool {
        verify_proof(&self.data, &self.merkle_root, &self.proof)
    }
}
