//! Host crypto boundary: BIP-32-Ed25519 ("Cardano Icarus") derivation and
//! Ed25519 signing.
//!
//! The real device exposes these as syscalls; [`SoftwareHostCrypto`]
//! is a software stand-in built the way
//! `pallas-wallet::hd` builds its `Bip32PrivateKey`, so the signing engine
//! can be driven end-to-end in tests.

use pallas_crypto::key::ed25519::{PublicKey, Signature};
use pallas_wallet::{hd::Bip32PrivateKey, PrivateKey};

use crate::error::SigningError;
use crate::keys::path::DerivationPath;

/// A key derived along a [`DerivationPath`]. Holds the private key
/// internally; callers only ever observe the public key or a signature.
pub struct DerivedKey {
    private: PrivateKey,
}

impl DerivedKey {
    pub fn public_key(&self) -> PublicKey {
        self.private.public_key()
    }

    /// BLAKE2b-224 of the raw 32-byte public key, used as a key hash in
    /// credentials and addresses.
    pub fn key_hash(&self) -> pallas_crypto::hash::Hash<28> {
        pallas_crypto::hash::Hasher::<224>::hash(self.public_key().as_ref())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.private.sign(message)
    }
}

/// Host crypto interfaces the signing engine consumes: BIP-32-Ed25519
/// derivation and Ed25519 signing, reached only through a derivation path.
pub trait HostCrypto {
    fn derive(&self, path: &DerivationPath) -> Result<DerivedKey, SigningError>;
}

/// Software implementation of [`HostCrypto`] over a root [`Bip32PrivateKey`].
/// Mirrors `pallas-wallet::hd::Bip32PrivateKey::derive` applied once per
/// path index.
pub struct SoftwareHostCrypto {
    root: Bip32PrivateKey,
}

impl SoftwareHostCrypto {
    pub fn from_root(root: Bip32PrivateKey) -> Self {
        SoftwareHostCrypto { root }
    }

    pub fn from_mnemonic(mnemonic: &str, password: &str) -> Result<Self, SigningError> {
        let root = Bip32PrivateKey::from_bip39_mnenomic(mnemonic.to_string(), password.to_string())
            .map_err(|_| SigningError::InvalidData("invalid mnemonic"))?;
        Ok(SoftwareHostCrypto { root })
    }
}

impl HostCrypto for SoftwareHostCrypto {
    fn derive(&self, path: &DerivationPath) -> Result<DerivedKey, SigningError> {
        let indices = path.as_slice();
        if indices.is_empty() {
            return Err(SigningError::InvalidPath);
        }
        let mut key = self.root.derive(indices[0]);
        for &index in &indices[1..] {
            key = key.derive(index);
        }
        Ok(DerivedKey {
            private: key.to_ed25519_private_key(),
        })
    }
}
