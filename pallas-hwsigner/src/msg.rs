//! `SIGN_MSG` pure core: CIP-8 `Sig_structure` construction and signing.
//!
//! CIP-8 message signing reuses COSE's `Sig_structure`:
//! `["Signature1", protected_headers, external_aad, payload]`, CBOR
//! encoded and signed directly with Ed25519. Built with the same
//! [`crate::cbor::write_token`] token writer the hash builders use, rather
//! than buffering through a general-purpose CBOR library, since the
//! device only ever needs to emit this one fixed shape.

use pallas_crypto::key::ed25519::Signature;

use crate::cbor::{write_token, CborType};
use crate::error::SigningError;
use crate::keys::derivation::HostCrypto;
use crate::keys::path::DerivationPath;

/// Builds the CBOR-encoded `Sig_structure` for a CIP-8 signature:
/// `["Signature1", protected_headers, external_aad, payload]`.
///
/// Enforces the cross-protocol safety rule from §4.6: the constructed
/// bytes must never be exactly 32 B, since that is the length of a
/// transaction hash and an identical byte string would be signable as
/// either one.
pub fn build_sig_structure(
    protected_headers: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, SigningError> {
    let mut out = Vec::new();
    out.extend(write_token(CborType::Array, 4)?);

    const CONTEXT: &[u8] = b"Signature1";
    out.extend(write_token(CborType::Text, CONTEXT.len() as u64)?);
    out.extend_from_slice(CONTEXT);

    out.extend(write_token(CborType::Bytes, protected_headers.len() as u64)?);
    out.extend_from_slice(protected_headers);

    out.extend(write_token(CborType::Bytes, external_aad.len() as u64)?);
    out.extend_from_slice(external_aad);

    out.extend(write_token(CborType::Bytes, payload.len() as u64)?);
    out.extend_from_slice(payload);

    if out.len() == 32 {
        return Err(SigningError::InvalidData(
            "Sig_structure collides with tx hash length",
        ));
    }

    Ok(out)
}

/// Builds the `Sig_structure` for `payload` and signs it with the key at
/// `path`.
pub fn sign_message(
    protected_headers: &[u8],
    external_aad: &[u8],
    payload: &[u8],
    path: &DerivationPath,
    crypto: &impl HostCrypto,
) -> Result<Signature, SigningError> {
    let sig_structure = build_sig_structure(protected_headers, external_aad, payload)?;
    let derived = crypto.derive(path)?;
    Ok(derived.sign(&sig_structure))
}
