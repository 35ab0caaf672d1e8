//! `SIGN_OP_CERT` pure core: builds and signs a pool operational
//! certificate body.
//!
//! An operational certificate body is the fixed 48-byte structure
//! `kes_vk(32 B) || issue_counter(u64 BE) || kes_period(u64 BE)`, signed
//! directly (no hashing step first, unlike the transaction and votecast
//! signing paths) by the pool's cold key. Grounded on §4.6's "48 B
//! operational certificate body" signing target and the pool-cold-key
//! path family already classified by [`crate::keys::path`].

use pallas_crypto::key::ed25519::Signature;

use crate::error::SigningError;
use crate::keys::derivation::HostCrypto;
use crate::keys::path::{classify, DerivationPath, PathKind};

pub const OP_CERT_BODY_LEN: usize = 48;

/// The fields that make up an operational certificate body, as declared
/// over APDU.
#[derive(Debug, Clone, Copy)]
pub struct OpCertBody {
    pub kes_public_key: [u8; 32],
    pub issue_counter: u64,
    pub kes_period: u64,
}

impl OpCertBody {
    /// Serializes the body to its signed 48-byte wire form.
    pub fn to_bytes(&self) -> [u8; OP_CERT_BODY_LEN] {
        let mut out = [0u8; OP_CERT_BODY_LEN];
        out[..32].copy_from_slice(&self.kes_public_key);
        out[32..40].copy_from_slice(&self.issue_counter.to_be_bytes());
        out[40..48].copy_from_slice(&self.kes_period.to_be_bytes());
        out
    }
}

/// Signs `body` with the pool cold key at `path`, rejecting any path that
/// does not classify as [`PathKind::PoolColdKey`].
pub fn sign_op_cert(
    body: &OpCertBody,
    path: &DerivationPath,
    crypto: &impl HostCrypto,
) -> Result<Signature, SigningError> {
    if !matches!(classify(path), PathKind::PoolColdKey { .. }) {
        return Err(SigningError::InvalidPath);
    }
    let derived = crypto.derive(path)?;
    Ok(derived.sign(&body.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derivation::SoftwareHostCrypto;
    use crate::keys::path::HARDENED;

    const SEED_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn pool_cold_path() -> DerivationPath {
        DerivationPath::new(&[1853 | HARDENED, 1815 | HARDENED, 0 | HARDENED]).unwrap()
    }

    #[test]
    fn body_serializes_to_48_bytes_in_field_order() {
        let body = OpCertBody {
            kes_public_key: [0xAB; 32],
            issue_counter: 7,
            kes_period: 42,
        };
        let bytes = body.to_bytes();
        assert_eq!(bytes.len(), OP_CERT_BODY_LEN);
        assert_eq!(&bytes[..32], &[0xAB; 32]);
        assert_eq!(&bytes[32..40], &7u64.to_be_bytes());
        assert_eq!(&bytes[40..48], &42u64.to_be_bytes());
    }

    #[test]
    fn signs_with_pool_cold_key_and_rejects_other_paths() {
        let crypto = SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap();
        let body = OpCertBody {
            kes_public_key: [0x11; 32],
            issue_counter: 1,
            kes_period: 500,
        };

        let signature = sign_op_cert(&body, &pool_cold_path(), &crypto).unwrap();
        let cold_key = crypto.derive(&pool_cold_path()).unwrap();
        assert!(cold_key.public_key().verify(&body.to_bytes(), &signature));

        let spending_path =
            DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        assert!(sign_op_cert(&body, &spending_path, &crypto).is_err());
    }
}
