//! `GET_PUBLIC_KEYS` and `DERIVE_ADDRESS` pure cores.
//!
//! Both instructions share the same "resolve a derivation path (or raw
//! hash) into key material, run it past the security policy, hand back
//! something the host can render" shape; this module keeps them together
//! since they're the two places [`crate::keys::path`] classification,
//! [`crate::keys::derivation::HostCrypto`], and [`crate::addresses`] meet
//! outside of a witness. The paginated-display/NVRAM side of `DERIVE_ADDRESS
//! (display)` is the external collaborator described in §6.1; this module
//! builds the address and decides whether policy allows returning or
//! showing it.

use pallas_addresses::Address;
use pallas_crypto::hash::Hash;
use pallas_crypto::key::ed25519::PublicKey;

use crate::addresses::{
    build_reward_address, build_shelley_address, AddressType, Credential, StakingDataSource,
};
use crate::error::SigningError;
use crate::keys::byron::derive_byron_address;
use crate::keys::derivation::HostCrypto;
use crate::keys::path::{classify, DerivationPath};
use crate::policy::{apply_decision, policy_for_get_extended_public_key, policy_for_return_derive_address, policy_for_show_derive_address, UserPrompt};

/// Derives the public key at every path in `paths`, in order, applying
/// `policyForGetExtendedPublicKey` to each. Mirrors the legacy bulk-export
/// flow: the host declares how many keys it wants up front and the device
/// walks them one at a time rather than buffering a reply of unbounded size.
pub fn export_public_keys(
    paths: &[DerivationPath],
    crypto: &impl HostCrypto,
    prompt: &mut impl UserPrompt,
) -> Result<Vec<PublicKey>, SigningError> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let kind = classify(path);
        let decision = policy_for_get_extended_public_key(&kind);
        if !apply_decision(decision, prompt, "export extended public key") {
            return Err(SigningError::RejectedByPolicy {
                reason: "get extended public key",
            });
        }
        out.push(crypto.derive(path)?.public_key());
    }
    Ok(out)
}

/// Where a credential in an address-derivation request comes from: a
/// device path (resolved internally to its key hash, per §3.2's
/// "extended credential") or an opaque hash supplied by the host.
#[derive(Debug, Clone, Copy)]
pub enum CredentialSource {
    Path(DerivationPath),
    Hash(Hash<28>),
}

/// The shape of a `DERIVE_ADDRESS` request, covering every address family
/// in §3.3.
#[derive(Debug, Clone, Copy)]
pub enum AddressSpec {
    Shelley {
        address_type: AddressType,
        payment: CredentialSource,
        staking: StakingDataSource,
    },
    Reward {
        address_type: AddressType,
        credential: CredentialSource,
    },
    Byron {
        path: DerivationPath,
        protocol_magic: u32,
    },
}

/// Whether `DERIVE_ADDRESS` should return the bytes silently (P1=1) or
/// require the user to review them on-screen first (P1=2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveAddressMode {
    Return,
    Display,
}

fn resolve_credential(
    source: CredentialSource,
    as_script: bool,
    crypto: &impl HostCrypto,
) -> Result<Credential, SigningError> {
    match source {
        CredentialSource::Hash(h) => {
            if as_script {
                Ok(Credential::ScriptHash(h))
            } else {
                Ok(Credential::KeyHash(h))
            }
        }
        CredentialSource::Path(path) => {
            let derived = crypto.derive(&path)?;
            Ok(Credential::KeyHash(derived.key_hash()))
        }
    }
}

fn is_script_address_type(address_type: AddressType) -> bool {
    matches!(
        address_type,
        AddressType::BasePaymentScriptStakeKey
            | AddressType::BasePaymentScriptStakeScript
            | AddressType::PointerScript
            | AddressType::EnterpriseScript
            | AddressType::RewardScript
    )
}

/// Builds the address described by `spec`, applying the first device
/// path involved (if any) to `policyForReturnDeriveAddress` or
/// `policyForShowDeriveAddress` depending on `mode`.
pub fn derive_address(
    spec: &AddressSpec,
    network: u8,
    mode: DeriveAddressMode,
    crypto: &impl HostCrypto,
    prompt: &mut impl UserPrompt,
) -> Result<Vec<u8>, SigningError> {
    let path_for_policy = match spec {
        AddressSpec::Shelley {
            payment: CredentialSource::Path(p),
            ..
        } => Some(*p),
        AddressSpec::Reward {
            credential: CredentialSource::Path(p),
            ..
        } => Some(*p),
        AddressSpec::Byron { path, .. } => Some(*path),
        _ => None,
    };

    if let Some(path) = path_for_policy {
        let kind = classify(&path);
        let decision = match mode {
            DeriveAddressMode::Return => policy_for_return_derive_address(&kind),
            DeriveAddressMode::Display => policy_for_show_derive_address(&kind),
        };
        if !apply_decision(decision, prompt, "derive address") {
            return Err(SigningError::RejectedByPolicy {
                reason: "derive address",
            });
        }
    }

    match spec {
        AddressSpec::Shelley {
            address_type,
            payment,
            staking,
        } => {
            let credential = resolve_credential(*payment, is_script_address_type(*address_type), crypto)?;
            let address = build_shelley_address(network, *address_type, credential, *staking)?;
            Ok(address_to_bytes(&address))
        }
        AddressSpec::Reward {
            address_type,
            credential,
        } => {
            let credential = resolve_credential(*credential, is_script_address_type(*address_type), crypto)?;
            let address = build_reward_address(network, *address_type, credential)?;
            Ok(address_to_bytes(&address))
        }
        AddressSpec::Byron { path, protocol_magic } => {
            let byron = derive_byron_address(path, *protocol_magic, crypto)?;
            Ok(byron.as_bytes().to_vec())
        }
    }
}

fn address_to_bytes(address: &Address) -> Vec<u8> {
    address.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derivation::SoftwareHostCrypto;
    use crate::keys::path::HARDENED;
    use crate::policy::AutoApprove;

    const SEED_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn crypto() -> SoftwareHostCrypto {
        SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap()
    }

    fn spending_path(index: u32) -> DerivationPath {
        DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, index]).unwrap()
    }

    fn staking_path() -> DerivationPath {
        DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 2, 0]).unwrap()
    }

    #[test]
    fn exports_several_public_keys_in_order() {
        let crypto = crypto();
        let mut prompt = AutoApprove;
        let paths = [spending_path(0), spending_path(1), staking_path()];
        let keys = export_public_keys(&paths, &crypto, &mut prompt).unwrap();
        assert_eq!(keys.len(), 3);
        assert_ne!(keys[0].as_ref(), keys[1].as_ref());
    }

    #[test]
    fn export_rejects_invalid_path() {
        let crypto = crypto();
        let mut prompt = AutoApprove;
        let bogus = DerivationPath::new(&[9999 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        assert!(export_public_keys(&[bogus], &crypto, &mut prompt).is_err());
    }

    #[test]
    fn derives_enterprise_address_from_spending_path() {
        let crypto = crypto();
        let mut prompt = AutoApprove;
        let spec = AddressSpec::Shelley {
            address_type: AddressType::EnterpriseKey,
            payment: CredentialSource::Path(spending_path(0)),
            staking: StakingDataSource::NoStaking,
        };
        let bytes = derive_address(&spec, 1, DeriveAddressMode::Return, &crypto, &mut prompt).unwrap();
        assert_eq!(bytes[0] >> 4, 0b0110);
    }

    #[test]
    fn derives_base_address_from_spending_and_staking_paths() {
        let crypto = crypto();
        let mut prompt = AutoApprove;
        let staking_hash = crypto.derive(&staking_path()).unwrap().key_hash();
        let spec = AddressSpec::Shelley {
            address_type: AddressType::BasePaymentKeyStakeKey,
            payment: CredentialSource::Path(spending_path(0)),
            staking: StakingDataSource::StakingKeyHash(staking_hash),
        };
        let bytes = derive_address(&spec, 1, DeriveAddressMode::Display, &crypto, &mut prompt).unwrap();
        assert_eq!(bytes[0] >> 4, 0b0000);
    }

    #[test]
    fn derives_byron_address() {
        let crypto = crypto();
        let mut prompt = AutoApprove;
        let spec = AddressSpec::Byron {
            path: DerivationPath::new(&[44 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap(),
            protocol_magic: 764_824_073,
        };
        let bytes = derive_address(&spec, 1, DeriveAddressMode::Return, &crypto, &mut prompt).unwrap();
        assert!(!bytes.is_empty());
    }
}
