//! Device-side address construction: turns a payment/staking credential
//! bundle supplied over APDU into a [`pallas_addresses::Address`].
//!
//! `pallas-addresses` already implements the wire layout, bech32/base58
//! rendering, and CRC32 framing for Byron; this module only adds the
//! device-specific "build from parts declared over the wire" step and its
//! invariant: every `(address_type, staking_data_source)` pair is matched
//! explicitly, with no wildcard arm, after a legacy C implementation was
//! found to let two cases fall through silently.

use pallas_addresses::{
    Address, Network as PallasNetwork, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
};
use pallas_crypto::hash::Hash;

use crate::error::SigningError;

/// Which credential backs the payment or staking part of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    KeyHash(Hash<28>),
    ScriptHash(Hash<28>),
}

/// How the staking part of a base/pointer/enterprise/reward address is
/// sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingDataSource {
    NoStaking,
    StakingKeyHash(Hash<28>),
    StakingScriptHash(Hash<28>),
    BlockchainPointer { slot: u64, tx_idx: u64, cert_idx: u64 },
}

/// The address type nibble, independent of network id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    BasePaymentKeyStakeKey,
    BasePaymentScriptStakeKey,
    BasePaymentKeyStakeScript,
    BasePaymentScriptStakeScript,
    PointerKey,
    PointerScript,
    EnterpriseKey,
    EnterpriseScript,
    RewardKey,
    RewardScript,
}

impl AddressType {
    /// Maps the 4-bit address-type nibble of §3.3's header byte to its
    /// `AddressType`. Byron (`1000`) has no `AddressType` counterpart: it
    /// carries no network nibble and is handled by
    /// [`crate::keys::byron`] instead.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0b0000 => Some(AddressType::BasePaymentKeyStakeKey),
            0b0001 => Some(AddressType::BasePaymentScriptStakeKey),
            0b0010 => Some(AddressType::BasePaymentKeyStakeScript),
            0b0011 => Some(AddressType::BasePaymentScriptStakeScript),
            0b0100 => Some(AddressType::PointerKey),
            0b0101 => Some(AddressType::PointerScript),
            0b0110 => Some(AddressType::EnterpriseKey),
            0b0111 => Some(AddressType::EnterpriseScript),
            0b1110 => Some(AddressType::RewardKey),
            0b1111 => Some(AddressType::RewardScript),
            _ => None,
        }
    }
}

/// Builds a Shelley-era address from an explicit `(type, payment credential,
/// staking source)` bundle, rejecting any combination that is not
/// consistent (the staking-info-consistent-with-address-type invariant).
pub fn build_shelley_address(
    network: u8,
    address_type: AddressType,
    payment: Credential,
    staking: StakingDataSource,
) -> Result<Address, SigningError> {
    let network = PallasNetwork::from(network);
    let payment_part = match payment {
        Credential::KeyHash(h) => ShelleyPaymentPart::key_hash(h),
        Credential::ScriptHash(h) => ShelleyPaymentPart::script_hash(h),
    };

    let delegation_part = match (address_type, staking) {
        (AddressType::BasePaymentKeyStakeKey, StakingDataSource::StakingKeyHash(h))
        | (AddressType::BasePaymentScriptStakeKey, StakingDataSource::StakingKeyHash(h)) => {
            ShelleyDelegationPart::key_hash(h)
        }
        (AddressType::BasePaymentKeyStakeScript, StakingDataSource::StakingScriptHash(h))
        | (AddressType::BasePaymentScriptStakeScript, StakingDataSource::StakingScriptHash(h)) => {
            ShelleyDelegationPart::script_hash(h)
        }
        (AddressType::PointerKey, StakingDataSource::BlockchainPointer { slot, tx_idx, cert_idx })
        | (AddressType::PointerScript, StakingDataSource::BlockchainPointer { slot, tx_idx, cert_idx }) => {
            let mut bytes = crate::varuint::write(slot);
            bytes.extend(crate::varuint::write(tx_idx));
            bytes.extend(crate::varuint::write(cert_idx));
            ShelleyDelegationPart::from_pointer(&bytes)?
        }
        (AddressType::EnterpriseKey, StakingDataSource::NoStaking)
        | (AddressType::EnterpriseScript, StakingDataSource::NoStaking) => ShelleyDelegationPart::Null,
        _ => return Err(SigningError::InvalidData("inconsistent staking source for address type")),
    };

    // payment/address-type credential kind must agree too.
    let payment_is_script = matches!(payment, Credential::ScriptHash(_));
    let expected_script = matches!(
        address_type,
        AddressType::BasePaymentScriptStakeKey
            | AddressType::BasePaymentScriptStakeScript
            | AddressType::PointerScript
            | AddressType::EnterpriseScript
    );
    if payment_is_script != expected_script {
        return Err(SigningError::InvalidData(
            "payment credential kind disagrees with address type",
        ));
    }

    Ok(Address::Shelley(ShelleyAddress::new(
        network,
        payment_part,
        delegation_part,
    )))
}

/// Builds a reward (staking-only) address.
pub fn build_reward_address(
    network: u8,
    address_type: AddressType,
    staking: Credential,
) -> Result<Address, SigningError> {
    use pallas_addresses::{StakeAddress, StakePayload};

    let network = PallasNetwork::from(network);
    let payload = match (address_type, staking) {
        (AddressType::RewardKey, Credential::KeyHash(h)) => StakePayload::Stake(h),
        (AddressType::RewardScript, Credential::ScriptHash(h)) => StakePayload::Script(h),
        _ => {
            return Err(SigningError::InvalidData(
                "inconsistent credential kind for reward address",
            ))
        }
    };

    Ok(Address::Stake(StakeAddress::new(network, payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash28(byte: u8) -> Hash<28> {
        Hash::from([byte; 28])
    }

    #[test]
    fn enterprise_address_requires_no_staking() {
        let addr = build_shelley_address(
            1,
            AddressType::EnterpriseKey,
            Credential::KeyHash(hash28(1)),
            StakingDataSource::NoStaking,
        )
        .unwrap();
        assert!(matches!(addr, Address::Shelley(_)));
    }

    #[test]
    fn base_address_requires_matching_staking_source() {
        let err = build_shelley_address(
            1,
            AddressType::BasePaymentKeyStakeKey,
            Credential::KeyHash(hash28(1)),
            StakingDataSource::StakingScriptHash(hash28(2)),
        );
        assert!(err.is_err());
    }

    #[test]
    fn base_address_with_consistent_parts_builds() {
        let addr = build_shelley_address(
            1,
            AddressType::BasePaymentKeyStakeKey,
            Credential::KeyHash(hash28(1)),
            StakingDataSource::StakingKeyHash(hash28(2)),
        )
        .unwrap();
        assert!(matches!(addr, Address::Shelley(_)));
    }

    #[test]
    fn reward_address_rejects_mismatched_kind() {
        let err = build_reward_address(1, AddressType::RewardKey, Credential::ScriptHash(hash28(3)));
        assert!(err.is_err());
    }

    #[test]
    fn pointer_address_encodes_varuint_triplet() {
        let addr = build_shelley_address(
            1,
            AddressType::PointerKey,
            Credential::KeyHash(hash28(1)),
            StakingDataSource::BlockchainPointer {
                slot: 2498243,
                tx_idx: 27,
                cert_idx: 3,
            },
        )
        .unwrap();
        assert!(matches!(addr, Address::Shelley(_)));
    }

    #[test]
    fn nibble_table_matches_header_byte_scheme() {
        assert_eq!(AddressType::from_nibble(0b0000), Some(AddressType::BasePaymentKeyStakeKey));
        assert_eq!(AddressType::from_nibble(0b0111), Some(AddressType::EnterpriseScript));
        assert_eq!(AddressType::from_nibble(0b1110), Some(AddressType::RewardKey));
        assert_eq!(AddressType::from_nibble(0b1000), None);
        assert_eq!(AddressType::from_nibble(0b1001), None);
    }
}
