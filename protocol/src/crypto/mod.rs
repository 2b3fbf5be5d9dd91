//! # Cryptographic Primitives
//!
//! Thin wrappers over `sha2`. Nothing here is clever, and that's the point.

pub mod hash;

pub use hash::{hash_pair, sha256, sha256_multi, Hash};
