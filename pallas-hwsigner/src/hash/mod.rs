//! Streaming hash builders.
//!
//! Every builder in this module wraps a `pallas_crypto::hash::Hasher`
//! (BLAKE2b) plus a linear state enum. CBOR tokens produced by
//! [`crate::cbor`] are appended straight into the hash context; the
//! serialized bytes are never buffered. Grounded on `txHashBuilder.c`,
//! `auxDataHashBuilder.c`, `nativeScriptHashBuilder.c` and
//! `votecastHashBuilder.c`.

pub mod aux_data_hash_builder;
pub mod native_script_hash_builder;
pub mod tx_hash_builder;
pub mod votecast_hash_builder;
