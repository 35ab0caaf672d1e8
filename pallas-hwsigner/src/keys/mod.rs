//! Address / key derivation layer: BIP-32-Ed25519 derivation paths and
//! their classification, plus the host crypto boundary.

pub mod byron;
pub mod derivation;
pub mod path;
