//! # Network Module
//!
//! Wire types for the `blockchain-storage` peer protocol. This module defines
//! what peers say to each other; it does not open sockets. A transport reads
//! lines, hands them to [`Message::decode_line`], and routes on the decoded
//! [`Payload`].
//!
//! ## Architecture
//!
//! ```text
//! message.rs: JSON-line envelope, typed payloads, chunk packages
//! peers.rs  : thread-safe registry of known peers
//! ```

pub mod message;
pub mod peers;

pub use message::{
    ChunkPackage, Message, MessageError, MessageType, NewBlock, Payload, RequestBlockchain,
    RequestChunks, SendChunks,
};
pub use peers::{PeerInfo, PeerRegistry};
