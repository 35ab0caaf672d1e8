extern crate core;

pub mod hash;
pub mod kes;
pub mod key;
pub mod memsec;
pub mod nonce;
#[cfg(feature = "vrf")]
pub mod vrf;
