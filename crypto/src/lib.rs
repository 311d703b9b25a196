//! Cryptographic primitives for weft events.
//!
//! - **Blake2b-256** over a canonical field encoding to derive event hashes
//! - **Ed25519** for signing event hashes and verifying creator signatures
//!
//! The consensus core never calls into this crate: it treats hashes and
//! signatures as opaque bytes. Producers and tests use it to build events.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, hash_event};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_event, sign_message, verify_event, verify_signature};
