//! Auxiliary data hash builder: CIP-36 voting-key registration metadata.
//!
//! Maintains two concurrent BLAKE2b-256 contexts — one for the whole
//! auxiliary-data blob, one for just the registration payload (metadatum
//! label 61284), the latter being what the device-held staking key signs.
//! Grounded on `auxDataHashBuilder.c`, generalized from its CIP-15
//! "Catalyst registration" constants to the CIP-36 payload shape:
//! a `voting_key` (or `delegations` array) replaces the single
//! `voting_key` of CIP-15, and an optional `voting_purpose` field is
//! added. Only the CIP-36 form is implemented; a CIP-15 payload carrying
//! delegations is rejected.

use pallas_crypto::hash::{Hash, Hasher};
use pallas_crypto::key::ed25519::Signature;

use crate::cbor::{write_token, CborType};
use crate::error::SigningError;

/// Metadatum label holding the CIP-36 registration payload.
const METADATA_KEY_REGISTRATION_PAYLOAD: u64 = 61284;
/// Metadatum label holding the registration signature.
const METADATA_KEY_REGISTRATION_SIGNATURE: u64 = 61285;

const PAYLOAD_KEY_VOTE_KEY_OR_DELEGATIONS: u64 = 1;
const PAYLOAD_KEY_STAKING_KEY: u64 = 2;
const PAYLOAD_KEY_PAYMENT_ADDRESS: u64 = 3;
const PAYLOAD_KEY_NONCE: u64 = 4;
const PAYLOAD_KEY_VOTING_PURPOSE: u64 = 5;
const SIGNATURE_KEY: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    RegInit,
    PayloadInit,
    Delegations { remaining: u16 },
    VoteKey,
    StakingKey,
    PaymentAddress,
    Nonce,
    VotingPurpose,
    AwaitingSignature,
    Confirm,
    AuxiliaryScripts,
    Finished,
}

/// Streaming builder for the hash of the transaction's auxiliary data,
/// specialised to the CIP-36 vote registration shape.
pub struct AuxDataHashBuilder {
    aux_data_hash: Hasher<256>,
    payload_hash: Option<Hasher<256>>,
    state: State,
    include_voting_purpose: bool,
}

impl AuxDataHashBuilder {
    /// Starts a plain auxiliary-data blob: `[metadata_map, auxiliary_scripts]`,
    /// with no vote registration. Used when the transaction carries
    /// arbitrary metadata whose hash the client already computed and only
    /// asks the device to include (policy: ALLOW in normal mode, SHOW in
    /// expert mode — see [`crate::policy`]).
    pub fn new() -> Self {
        let mut aux_data_hash = Hasher::<256>::new();
        let bytes = write_token(CborType::Array, 2).expect("static token");
        aux_data_hash.input(&bytes);
        AuxDataHashBuilder {
            aux_data_hash,
            payload_hash: None,
            state: State::Init,
            include_voting_purpose: false,
        }
    }

    fn append_aux(&mut self, ty: CborType, value: u64) -> Result<(), SigningError> {
        let bytes = write_token(ty, value)?;
        self.aux_data_hash.input(&bytes);
        Ok(())
    }

    fn append_both(&mut self, ty: CborType, value: u64) -> Result<(), SigningError> {
        self.append_aux(ty, value)?;
        let bytes = write_token(ty, value)?;
        if let Some(payload) = self.payload_hash.as_mut() {
            payload.input(&bytes);
        }
        Ok(())
    }

    fn require(&self, expected: State) -> Result<(), SigningError> {
        if self.state != expected {
            return Err(SigningError::BadState {
                expected: "cvote registration stage",
                got: "other",
            });
        }
        Ok(())
    }

    /// Opens the CIP-36 vote registration metadata map: `{61284: payload,
    /// 61285: {1: signature}}`.
    pub fn enter_cvote_registration(&mut self) -> Result<(), SigningError> {
        self.require(State::Init)?;
        self.append_aux(CborType::Map, 2)?;
        self.state = State::RegInit;
        Ok(())
    }

    /// Opens the registration payload map. `with_voting_purpose` controls
    /// whether the optional CIP-36 voting-purpose field is expected
    /// (payload map size is 4 without it, 5 with it).
    pub fn enter_payload(&mut self, with_voting_purpose: bool) -> Result<(), SigningError> {
        self.require(State::RegInit)?;
        self.include_voting_purpose = with_voting_purpose;
        self.payload_hash = Some(Hasher::<256>::new());
        let entries = if with_voting_purpose { 5 } else { 4 };

        // payload hash context sees only its own single-key wrapper map.
        if let Some(payload) = self.payload_hash.as_mut() {
            let bytes = write_token(CborType::Map, 1)?;
            payload.input(&bytes);
        }
        self.append_both(CborType::Unsigned, METADATA_KEY_REGISTRATION_PAYLOAD)?;
        self.append_both(CborType::Map, entries)?;

        self.state = State::PayloadInit;
        Ok(())
    }

    /// Supplies a single `voting_key` (CIP-15 compatible shape).
    pub fn add_vote_key(&mut self, voting_pub_key: &[u8; 32]) -> Result<(), SigningError> {
        self.require(State::PayloadInit)?;
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_VOTE_KEY_OR_DELEGATIONS)?;
        self.append_both(CborType::Bytes, 32)?;
        self.aux_data_hash.input(voting_pub_key);
        if let Some(payload) = self.payload_hash.as_mut() {
            payload.input(voting_pub_key);
        }
        self.state = State::VoteKey;
        Ok(())
    }

    /// Opens the CIP-36 `delegations` array in place of a single vote key.
    pub fn enter_delegations(&mut self, count: u16) -> Result<(), SigningError> {
        self.require(State::PayloadInit)?;
        if count == 0 {
            return Err(SigningError::InvalidData("delegations array must be non-empty"));
        }
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_VOTE_KEY_OR_DELEGATIONS)?;
        self.append_both(CborType::Array, count as u64)?;
        self.state = State::Delegations { remaining: count };
        Ok(())
    }

    /// Supplies one `[voting_pub_key, weight]` delegation pair.
    pub fn add_delegation(&mut self, voting_pub_key: &[u8; 32], weight: u32) -> Result<(), SigningError> {
        let remaining = match self.state {
            State::Delegations { remaining } if remaining > 0 => remaining,
            _ => {
                return Err(SigningError::BadState {
                    expected: "DELEGATIONS",
                    got: "other",
                })
            }
        };
        self.append_both(CborType::Array, 2)?;
        self.append_both(CborType::Bytes, 32)?;
        self.aux_data_hash.input(voting_pub_key);
        if let Some(payload) = self.payload_hash.as_mut() {
            payload.input(voting_pub_key);
        }
        self.append_both(CborType::Unsigned, weight as u64)?;
        self.state = State::Delegations {
            remaining: remaining - 1,
        };
        Ok(())
    }

    /// Adds the staking key whose corresponding private key signs the
    /// payload. Valid once the vote key or the full delegations array has
    /// been supplied.
    pub fn add_staking_key(&mut self, staking_pub_key: &[u8; 32]) -> Result<(), SigningError> {
        match self.state {
            State::VoteKey => {}
            State::Delegations { remaining: 0 } => {}
            _ => {
                return Err(SigningError::BadState {
                    expected: "VOTE_KEY or completed DELEGATIONS",
                    got: "other",
                })
            }
        }
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_STAKING_KEY)?;
        self.append_both(CborType::Bytes, 32)?;
        self.aux_data_hash.input(staking_pub_key);
        if let Some(payload) = self.payload_hash.as_mut() {
            payload.input(staking_pub_key);
        }
        self.state = State::StakingKey;
        Ok(())
    }

    pub fn add_payment_address(&mut self, address: &[u8]) -> Result<(), SigningError> {
        self.require(State::StakingKey)?;
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_PAYMENT_ADDRESS)?;
        self.append_both(CborType::Bytes, address.len() as u64)?;
        self.aux_data_hash.input(address);
        if let Some(payload) = self.payload_hash.as_mut() {
            payload.input(address);
        }
        self.state = State::PaymentAddress;
        Ok(())
    }

    pub fn add_nonce(&mut self, nonce: u64) -> Result<(), SigningError> {
        self.require(State::PaymentAddress)?;
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_NONCE)?;
        self.append_both(CborType::Unsigned, nonce)?;
        self.state = State::Nonce;
        Ok(())
    }

    /// Adds the optional CIP-36 voting-purpose field. Must be called iff
    /// [`Self::enter_payload`] declared `with_voting_purpose`.
    pub fn add_voting_purpose(&mut self, voting_purpose: u64) -> Result<(), SigningError> {
        self.require(State::Nonce)?;
        if !self.include_voting_purpose {
            return Err(SigningError::InvalidData(
                "voting purpose not declared by enter_payload",
            ));
        }
        self.append_both(CborType::Unsigned, PAYLOAD_KEY_VOTING_PURPOSE)?;
        self.append_both(CborType::Unsigned, voting_purpose)?;
        self.state = State::VotingPurpose;
        Ok(())
    }

    /// Finalizes the payload hash, consuming the payload-only context.
    /// The caller signs the returned hash under the device-held staking
    /// key and passes the signature to [`Self::add_signature`].
    pub fn finalize_payload_hash(&mut self) -> Result<Hash<32>, SigningError> {
        let reached_confirm = match self.state {
            State::Nonce if !self.include_voting_purpose => true,
            State::VotingPurpose if self.include_voting_purpose => true,
            _ => false,
        };
        if !reached_confirm {
            return Err(SigningError::BadState {
                expected: "NONCE or VOTING_PURPOSE",
                got: "other",
            });
        }
        let payload = self
            .payload_hash
            .take()
            .ok_or(SigningError::Internal("payload hash context missing"))?;
        self.state = State::AwaitingSignature;
        Ok(payload.finalize())
    }

    /// Appends the 64-byte Ed25519 signature of the payload hash.
    pub fn add_signature(&mut self, signature: &Signature) -> Result<(), SigningError> {
        self.require(State::AwaitingSignature)?;
        self.append_aux(CborType::Unsigned, METADATA_KEY_REGISTRATION_SIGNATURE)?;
        self.append_aux(CborType::Map, 1)?;
        self.append_aux(CborType::Unsigned, SIGNATURE_KEY)?;
        self.append_aux(CborType::Bytes, 64)?;
        self.aux_data_hash.input(signature.as_ref());
        self.state = State::Confirm;
        Ok(())
    }

    /// Appends the (currently always empty) auxiliary scripts array that
    /// closes the top-level `[metadata_map, auxiliary_scripts]` structure.
    pub fn add_empty_auxiliary_scripts(&mut self) -> Result<(), SigningError> {
        self.require(State::Confirm)?;
        self.append_aux(CborType::Array, 0)?;
        self.state = State::AuxiliaryScripts;
        Ok(())
    }

    pub fn finalize(self) -> Result<Hash<32>, SigningError> {
        if self.state != State::AuxiliaryScripts {
            return Err(SigningError::BadState {
                expected: "AUXILIARY_SCRIPTS",
                got: "other",
            });
        }
        Ok(self.aux_data_hash.finalize())
    }
}

impl Default for AuxDataHashBuilder {
    fn default() -> Self {
        Self::new()
    }
}
