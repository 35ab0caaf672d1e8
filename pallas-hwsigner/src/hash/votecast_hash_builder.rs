//! Votecast hash builder.
//!
//! Unlike the transaction and auxiliary-data builders, a votecast is
//! already serialized by the host into its final CBOR bytes; the device
//! only has to stream those bytes into a BLAKE2b-256 context without
//! buffering the whole thing. Grounded on
//! `votecastHashBuilder/votecastHashBuilder.h` and `votecastHashBuilder.c`,
//! whose `chunk`/`finalize` pair is a thin wrapper over the raw append.

use pallas_crypto::hash::{Hash, Hasher};

use crate::error::SigningError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Chunk,
    Finished,
}

/// Streaming builder for the hash of a votecast (a pre-serialized CIP-36
/// vote submission), fed in fixed-size chunks as they arrive over APDU.
pub struct VotecastHashBuilder {
    hash: Hasher<256>,
    state: State,
    remaining: u64,
}

impl VotecastHashBuilder {
    /// Starts a new votecast hash, declaring the total byte length up
    /// front so [`Self::finalize`] can detect a short transfer.
    pub fn new(total_len: u64) -> Self {
        VotecastHashBuilder {
            hash: Hasher::<256>::new(),
            state: if total_len == 0 {
                State::Finished
            } else {
                State::Chunk
            },
            remaining: total_len,
        }
    }

    /// Appends one chunk of the votecast's raw bytes.
    pub fn chunk(&mut self, bytes: &[u8]) -> Result<(), SigningError> {
        if self.state != State::Chunk {
            return Err(SigningError::BadState {
                expected: "CHUNK",
                got: "FINISHED",
            });
        }
        let len = bytes.len() as u64;
        if len > self.remaining {
            return Err(SigningError::InvalidData("votecast chunk exceeds declared length"));
        }
        self.hash.input(bytes);
        self.remaining -= len;
        if self.remaining == 0 {
            self.state = State::Finished;
        }
        Ok(())
    }

    /// Finalizes the hash. Fails if fewer bytes arrived than declared.
    pub fn finalize(self) -> Result<Hash<32>, SigningError> {
        if self.state != State::Finished || self.remaining != 0 {
            return Err(SigningError::BadState {
                expected: "FINISHED",
                got: "CHUNK",
            });
        }
        Ok(self.hash.finalize())
    }
}
