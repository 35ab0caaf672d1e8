//! Top-level transaction signing state machine.
//!
//! Ties the hash builders, the key-derivation boundary, and the security
//! policy engine into the single linear stage ordering a signing call
//! follows: `INIT -> AUX_DATA -> INPUTS -> OUTPUTS -> FEE -> TTL
//! -> CERTIFICATES -> WITHDRAWALS -> VALIDITY_INTERVAL_START -> MINT ->
//! SCRIPT_DATA_HASH -> COLLATERAL_INPUTS -> REQUIRED_SIGNERS ->
//! NETWORK_ID -> COLLATERAL_RETURN -> TOTAL_COLLATERAL ->
//! REFERENCE_INPUTS -> VOTING_PROCEDURES -> TREASURY -> DONATION ->
//! CONFIRM -> WITNESSES`.
//!
//! Each stage either forwards to
//! [`crate::hash::tx_hash_builder::TxHashBuilder`] to extend the streamed
//! CBOR, consults [`crate::policy`] to decide whether the action needs a
//! prompt, or both. A stage is only reachable once its predecessor has
//! fully closed, mirroring the device's own "one in-flight instruction,
//! strictly linear progress" model.
//!
//! The body hash builder's own internal field ordering does not match
//! this APDU-level ordering: its `AuxData` state comes right after
//! `Withdrawals` (canonical map key 7 follows key 5), not right after
//! `INIT`. This session therefore *computes* the auxiliary-data hash
//! early, at its own `AuxData` stage, and holds it in
//! `pending_aux_data_hash` until the body builder's state machine
//! naturally reaches its own `AuxData` state — which happens exactly
//! once, right as withdrawals exhaust (see [`Self::advance_past_withdrawals_if_done`]).

use pallas_crypto::hash::Hash;
use pallas_crypto::key::ed25519::{PublicKey, Signature};

use crate::error::SigningError;
use crate::hash::aux_data_hash_builder::AuxDataHashBuilder;
use crate::hash::tx_hash_builder::{OutputExtras, TxBodyFlags, TxHashBuilder};
use crate::keys::derivation::HostCrypto;
use crate::keys::path::{classify, DerivationPath, PathKind};
use crate::policy::{
    self, apply_decision, CertificateKind, ExtraBodyField, InitParams, PolicyDecision, SigningMode,
    SingleAccountGuard, UserPrompt,
};

/// The declared shape of a transaction, supplied in full at `INIT`:
/// the signing mode, network identification, and every optional-field
/// flag the body hash builder needs to size its top-level map.
#[derive(Debug, Clone, Copy)]
pub struct InitRequest {
    pub mode: SigningMode,
    pub network_id_is_mainnet: bool,
    pub protocol_magic_is_mainnet: bool,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub body_flags: TxBodyFlags,
    pub mint_present: bool,
    pub has_collateral_inputs: bool,
    pub has_script_data_hash: bool,
}

/// Which stage the session is waiting in. Each stage accepts exactly the
/// calls named in its doc comment; anything else is a
/// [`SigningError::BadState`]. Stages whose declared count is zero or
/// whose include-flag is false are skipped automatically by the
/// `advance_past_*_if_done` chain, mirroring the body hash builder's own
/// `first_state_after_*` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Accepts `add_aux_data_hash_direct` or the CIP-36 submachine calls,
    /// only if declared present.
    AuxData,
    /// Accepts `add_input`, `num_inputs` times.
    Inputs,
    /// Accepts `add_output_*`/asset-group calls, `num_outputs` times.
    Outputs,
    /// Accepts `set_fee`.
    Fee,
    /// Accepts `set_ttl` if declared, otherwise auto-advances.
    Ttl,
    /// Accepts certificate calls, `num_certificates` times.
    Certificates,
    /// Accepts `add_withdrawal`, `num_withdrawals` times.
    Withdrawals,
    /// Accepts `set_validity_interval_start` if declared.
    ValidityIntervalStart,
    /// Accepts mint asset group/token calls if declared.
    Mint,
    /// Accepts `set_script_data_hash` if declared.
    ScriptDataHash,
    /// Accepts `add_collateral_input`, `num_collateral_inputs` times.
    CollateralInputs,
    /// Accepts `add_required_signer`, `num_required_signers` times.
    RequiredSigners,
    /// Accepts `set_network_id` if declared.
    NetworkId,
    /// Accepts `set_collateral_return` if declared.
    CollateralReturn,
    /// Accepts `set_total_collateral` if declared.
    TotalCollateral,
    /// Accepts `add_reference_input`, `num_reference_inputs` times.
    ReferenceInputs,
    /// Accepts `set_voting_procedures` if declared.
    VotingProcedures,
    /// Accepts `set_treasury` if declared.
    Treasury,
    /// Accepts `set_donation` if declared.
    Donation,
    /// Accepts `confirm`, which finalizes the tx hash.
    Confirm,
    /// Accepts `add_witness`, any number of times.
    Witnesses,
}

/// The orchestrating state machine for one `SIGN_TX` call.
pub struct SigningSession {
    stage: Stage,
    mode: SigningMode,
    network_id_is_mainnet: bool,
    mint_present: bool,
    flags: TxBodyFlags,
    body: TxHashBuilder,
    guard: SingleAccountGuard,
    remaining_inputs: u32,
    remaining_outputs: u32,
    remaining_certificates: u32,
    remaining_withdrawals: u32,
    remaining_collateral_inputs: u32,
    remaining_required_signers: u32,
    remaining_reference_inputs: u32,
    pending_aux_data_hash: Option<Hash<32>>,
    aux_data_submachine: Option<AuxDataHashBuilder>,
    tx_hash: Option<Hash<32>>,
}

impl SigningSession {
    /// `INIT`: validates the declared shape against policy and opens the
    /// transaction body map. A policy `DENY` here (mismatched network,
    /// forbidden mode combination) aborts before any stage is entered.
    pub fn init(request: InitRequest, prompt: &mut impl UserPrompt) -> Result<Self, SigningError> {
        let params = InitParams {
            mode: request.mode,
            network_id_is_mainnet: request.network_id_is_mainnet,
            protocol_magic_is_mainnet: request.protocol_magic_is_mainnet,
            num_certificates: request.body_flags.num_certificates,
            is_pool_registration: matches!(
                request.mode,
                SigningMode::PoolRegistrationOwner | SigningMode::PoolRegistrationOperator
            ),
            mint_present: request.mint_present,
            plutus_items_present: matches!(request.mode, SigningMode::Plutus),
            has_collateral_inputs: request.has_collateral_inputs,
            has_script_data_hash: request.has_script_data_hash,
        };
        let decision = policy::policy_for_sign_tx_init(&params);
        if !apply_decision(decision, prompt, "confirm transaction parameters") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx init",
            });
        }
        tracing::debug!(mode = ?request.mode, "sign tx session opened");

        let flags = request.body_flags;
        let body = TxHashBuilder::new(request.num_inputs, request.num_outputs, flags);
        let mut session = SigningSession {
            stage: Stage::AuxData,
            mode: request.mode,
            network_id_is_mainnet: request.network_id_is_mainnet,
            mint_present: request.mint_present,
            flags,
            body,
            guard: SingleAccountGuard::new(),
            remaining_inputs: request.num_inputs,
            remaining_outputs: request.num_outputs,
            remaining_certificates: flags.num_certificates,
            remaining_withdrawals: flags.num_withdrawals,
            remaining_collateral_inputs: flags.num_collateral_inputs,
            remaining_required_signers: flags.num_required_signers,
            remaining_reference_inputs: flags.num_reference_inputs,
            pending_aux_data_hash: None,
            aux_data_submachine: None,
            tx_hash: None,
        };
        if !flags.include_aux_data {
            session.enter_inputs_stage()?;
        }
        Ok(session)
    }

    fn require_stage(&self, expected: Stage) -> Result<(), SigningError> {
        if self.stage != expected {
            tracing::warn!(expected = ?expected, actual = ?self.stage, "apdu arrived out of stage order");
            return Err(SigningError::BadState {
                expected: "matching stage",
                got: "other",
            });
        }
        Ok(())
    }

    /// Opens the body's inputs container exactly once — `enter_inputs`
    /// on the body builder requires its own `Init` state and may only be
    /// called a single time per session, regardless of the declared
    /// input count.
    fn enter_inputs_stage(&mut self) -> Result<(), SigningError> {
        self.body.enter_inputs()?;
        self.stage = Stage::Inputs;
        if self.remaining_inputs == 0 {
            self.stage = Stage::Outputs;
            self.advance_from_outputs_if_done()?;
        }
        Ok(())
    }

    // -- stage-skipping chain, one function per optional stage ----------
    // Each mirrors the body hash builder's own `first_state_after_*`
    // chain: a stage whose declared count/flag is absent is
    // skipped entirely rather than waiting for a call that will never
    // come. The chain is threaded through `Result` because folding the
    // pending auxiliary-data hash into the body (at the Withdrawals ->
    // ValidityIntervalStart boundary) can fail.

    fn advance_from_outputs_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Outputs && self.remaining_outputs == 0 {
            self.stage = Stage::Fee;
        }
        Ok(())
    }

    fn advance_past_certificates_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Certificates && self.remaining_certificates == 0 {
            self.stage = Stage::Withdrawals;
            self.advance_past_withdrawals_if_done()?;
        }
        Ok(())
    }

    /// The single point where the auxiliary-data hash computed back at
    /// the session's own `AuxData` stage is folded into the body stream,
    /// matching the body builder's `first_state_after_withdrawals`.
    fn advance_past_withdrawals_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Withdrawals && self.remaining_withdrawals == 0 {
            if self.flags.include_aux_data {
                let hash = self
                    .pending_aux_data_hash
                    .ok_or(SigningError::Internal("aux data hash missing"))?;
                self.body.add_aux_data_hash(&hash)?;
            }
            self.stage = Stage::ValidityIntervalStart;
            self.advance_past_validity_interval_if_done()?;
        }
        Ok(())
    }

    fn advance_past_validity_interval_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::ValidityIntervalStart && !self.flags.include_validity_interval_start {
            self.stage = Stage::Mint;
            self.advance_past_mint_if_done()?;
        }
        Ok(())
    }

    fn advance_past_mint_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Mint && !self.flags.include_mint {
            self.stage = Stage::ScriptDataHash;
            self.advance_past_script_data_hash_if_done()?;
        }
        Ok(())
    }

    fn advance_past_script_data_hash_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::ScriptDataHash && !self.flags.include_script_data_hash {
            self.stage = Stage::CollateralInputs;
            self.advance_past_collateral_inputs_if_done()?;
        }
        Ok(())
    }

    fn advance_past_collateral_inputs_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::CollateralInputs && self.remaining_collateral_inputs == 0 {
            self.stage = Stage::RequiredSigners;
            self.advance_past_required_signers_if_done()?;
        }
        Ok(())
    }

    fn advance_past_required_signers_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::RequiredSigners && self.remaining_required_signers == 0 {
            self.stage = Stage::NetworkId;
            self.advance_past_network_id_if_done()?;
        }
        Ok(())
    }

    fn advance_past_network_id_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::NetworkId && !self.flags.include_network_id {
            self.stage = Stage::CollateralReturn;
            self.advance_past_collateral_return_if_done()?;
        }
        Ok(())
    }

    fn advance_past_collateral_return_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::CollateralReturn && !self.flags.include_collateral_return {
            self.stage = Stage::TotalCollateral;
            self.advance_past_total_collateral_if_done()?;
        }
        Ok(())
    }

    fn advance_past_total_collateral_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::TotalCollateral && !self.flags.include_total_collateral {
            self.stage = Stage::ReferenceInputs;
            self.advance_past_reference_inputs_if_done()?;
        }
        Ok(())
    }

    fn advance_past_reference_inputs_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::ReferenceInputs && self.remaining_reference_inputs == 0 {
            self.stage = Stage::VotingProcedures;
            self.advance_past_voting_procedures_if_done()?;
        }
        Ok(())
    }

    fn advance_past_voting_procedures_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::VotingProcedures && !self.flags.include_voting_procedures {
            self.stage = Stage::Treasury;
            self.advance_past_treasury_if_done()?;
        }
        Ok(())
    }

    fn advance_past_treasury_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Treasury && !self.flags.include_treasury {
            self.stage = Stage::Donation;
            self.advance_past_donation_if_done()?;
        }
        Ok(())
    }

    fn advance_past_donation_if_done(&mut self) -> Result<(), SigningError> {
        if self.stage == Stage::Donation && !self.flags.include_donation {
            self.stage = Stage::Confirm;
        }
        Ok(())
    }

    // -- AUX_DATA ---------------------------------------------------------

    /// `AUX_DATA`: supplies a pre-computed auxiliary-data hash directly
    /// (the transaction carries arbitrary metadata the client already
    /// hashed off-device). Mutually exclusive with the CIP-36 submachine.
    pub fn add_aux_data_hash_direct(
        &mut self,
        hash: &Hash<32>,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::AuxData)?;
        let decision = policy::policy_for_aux_data(false, false);
        if !apply_decision(decision, prompt, "confirm auxiliary data hash") {
            return Err(SigningError::RejectedByPolicy { reason: "aux data" });
        }
        self.pending_aux_data_hash = Some(*hash);
        self.enter_inputs_stage()
    }

    /// `AUX_DATA -> CVOTE_REGISTRATION_SUBMACHINE`: starts the CIP-36 vote
    /// registration submachine. Subsequent payload fields are
    /// supplied directly against the returned builder by the caller; once
    /// the payload hash is signed and the builder is finalized, pass the
    /// result to [`Self::finish_cvote_registration`].
    pub fn begin_cvote_registration(&mut self) -> Result<&mut AuxDataHashBuilder, SigningError> {
        self.require_stage(Stage::AuxData)?;
        let mut builder = AuxDataHashBuilder::new();
        builder.enter_cvote_registration()?;
        self.aux_data_submachine = Some(builder);
        Ok(self.aux_data_submachine.as_mut().unwrap())
    }

    /// `CVOTE_REGISTRATION_SUBMACHINE -> AUX_DATA`: finalizes the CIP-36
    /// submachine's auxiliary-data hash and folds it into the session,
    /// always requiring confirmation (the vote registration policy is
    /// unconditionally SHOW).
    pub fn finish_cvote_registration(&mut self, prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::AuxData)?;
        let builder = self
            .aux_data_submachine
            .take()
            .ok_or(SigningError::Internal("cvote registration not started"))?;
        let hash = builder.finalize()?;
        let decision = policy::policy_for_aux_data(true, false);
        if !apply_decision(decision, prompt, "confirm vote registration") {
            return Err(SigningError::RejectedByPolicy {
                reason: "vote registration",
            });
        }
        self.pending_aux_data_hash = Some(hash);
        self.enter_inputs_stage()
    }

    // -- INPUTS -----------------------------------------------------------

    /// `INPUTS`: one UTxO reference per call.
    pub fn add_input(&mut self, tx_id: &Hash<32>, index: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Inputs)?;
        if self.remaining_inputs == 0 {
            return Err(SigningError::Internal("no inputs remaining"));
        }
        self.body.add_input(tx_id, index)?;
        self.remaining_inputs -= 1;
        if self.remaining_inputs == 0 {
            self.stage = Stage::Outputs;
            self.advance_from_outputs_if_done()?;
        }
        Ok(())
    }

    // -- OUTPUTS ------------------------------------------------------------

    /// `OUTPUTS`, third-party address: always shown. `path` is
    /// `None` when the address bytes were supplied raw rather than
    /// derived from a device-held change path.
    pub fn check_output_address(
        &mut self,
        path: Option<&DerivationPath>,
        is_plutus_script_address: bool,
        has_datum: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        let decision = match path {
            Some(p) => policy::policy_for_sign_tx_output_path(&classify(p)),
            None => policy::policy_for_sign_tx_output_address(is_plutus_script_address, has_datum),
        };
        if !apply_decision(decision, prompt, "confirm output address") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx output address",
            });
        }
        Ok(())
    }

    /// `OUTPUTS`: appends one legacy (pre-Babbage) output.
    pub fn add_output_legacy(
        &mut self,
        address: &[u8],
        coin: u64,
        num_asset_groups: u32,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        if self.remaining_outputs == 0 {
            return Err(SigningError::Internal("no outputs remaining"));
        }
        self.body.add_output_legacy(address, coin, num_asset_groups)?;
        if num_asset_groups == 0 {
            self.remaining_outputs -= 1;
            self.advance_from_outputs_if_done()?;
        }
        Ok(())
    }

    /// `OUTPUTS`: appends one Babbage-era output (datum hash/script ref).
    pub fn add_output_babbage(
        &mut self,
        address: &[u8],
        coin: u64,
        num_asset_groups: u32,
        extras: OutputExtras,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        if self.remaining_outputs == 0 {
            return Err(SigningError::Internal("no outputs remaining"));
        }
        self.body.add_output_babbage(address, coin, num_asset_groups, extras)?;
        if num_asset_groups == 0 {
            self.remaining_outputs -= 1;
            self.advance_from_outputs_if_done()?;
        }
        Ok(())
    }

    pub fn enter_output_asset_group(&mut self, policy_id: &Hash<28>, num_tokens: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        self.body.enter_output_asset_group(policy_id, num_tokens)
    }

    pub fn add_output_token(&mut self, asset_name: &[u8], amount: u64) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        self.body.add_output_token(asset_name, amount)
    }

    /// Closes a multi-asset output's value; counts the output as done.
    pub fn close_output_value(&mut self) -> Result<(), SigningError> {
        self.require_stage(Stage::Outputs)?;
        self.body.close_output_value()?;
        self.remaining_outputs -= 1;
        self.advance_from_outputs_if_done()
    }

    // -- FEE / TTL ----------------------------------------------------------

    /// `FEE`.
    pub fn set_fee(&mut self, fee: u64, prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::Fee)?;
        if !apply_decision(policy::policy_for_sign_tx_fee(), prompt, "confirm fee") {
            return Err(SigningError::RejectedByPolicy { reason: "sign tx fee" });
        }
        self.body.add_fee(fee)?;
        self.stage = Stage::Ttl;
        if !self.flags.include_ttl {
            self.body.add_ttl(0)?;
            self.stage = Stage::Certificates;
            self.advance_past_certificates_if_done()?;
        }
        Ok(())
    }

    /// `TTL`, only reachable when declared present.
    pub fn set_ttl(&mut self, ttl: u64) -> Result<(), SigningError> {
        self.require_stage(Stage::Ttl)?;
        self.body.add_ttl(ttl)?;
        self.stage = Stage::Certificates;
        self.advance_past_certificates_if_done()
    }

    // -- CERTIFICATES ---------------------------------------------------

    /// `CERTIFICATES`: stake registration or deregistration. Stake
    /// delegation, pool retirement, and pool registration have dedicated
    /// entry points below since they carry extra fields.
    pub fn add_stake_registration_certificate(
        &mut self,
        is_registration: bool,
        credential: &Hash<28>,
        credential_is_device_path: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if self.remaining_certificates == 0 {
            return Err(SigningError::Internal("no certificates remaining"));
        }
        let kind = if is_registration {
            CertificateKind::StakeRegistration
        } else {
            CertificateKind::StakeDeregistration
        };
        let decision = policy::policy_for_certificate(kind, credential_is_device_path);
        if !apply_decision(decision, prompt, "confirm certificate") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx certificate",
            });
        }
        self.body.add_stake_registration(is_registration, credential)?;
        self.remaining_certificates -= 1;
        self.advance_past_certificates_if_done()
    }

    /// `CERTIFICATES`: stake delegation to a pool.
    pub fn add_delegation_certificate(
        &mut self,
        stake_credential: &Hash<28>,
        pool_key_hash: &Hash<28>,
        credential_is_device_path: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if self.remaining_certificates == 0 {
            return Err(SigningError::Internal("no certificates remaining"));
        }
        let decision = policy::policy_for_certificate(CertificateKind::StakeDelegation, credential_is_device_path);
        if !apply_decision(decision, prompt, "confirm stake delegation") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx certificate",
            });
        }
        self.body.add_stake_delegation(stake_credential, pool_key_hash)?;
        self.remaining_certificates -= 1;
        self.advance_past_certificates_if_done()
    }

    /// `CERTIFICATES`: pool retirement.
    pub fn add_pool_retirement_certificate(
        &mut self,
        pool_key_hash: &Hash<28>,
        epoch: u64,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if self.remaining_certificates == 0 {
            return Err(SigningError::Internal("no certificates remaining"));
        }
        let decision = policy::policy_for_certificate(CertificateKind::PoolRetirement, false);
        if !apply_decision(decision, prompt, "confirm pool retirement") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx certificate",
            });
        }
        self.body.add_pool_retirement(pool_key_hash, epoch)?;
        self.remaining_certificates -= 1;
        self.advance_past_certificates_if_done()
    }

    /// `CERTIFICATES -> POOL_REGISTRATION_SUBMACHINE`: opens a pool
    /// registration certificate. Gating for the owner/operator witness
    /// restriction happens at `WITNESSES` time; individual pool
    /// metadata/relay/reward-account fields are gated here by whether
    /// they resolve to a device-held path.
    pub fn enter_pool_registration(
        &mut self,
        pool_key_hash: &Hash<28>,
        vrf_key_hash: &Hash<32>,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if self.remaining_certificates == 0 {
            return Err(SigningError::Internal("no certificates remaining"));
        }
        if !apply_decision(
            PolicyDecision::ShowBeforeResponse,
            prompt,
            "confirm pool registration",
        ) {
            return Err(SigningError::RejectedByPolicy {
                reason: "pool registration",
            });
        }
        self.body.enter_pool_registration(pool_key_hash, vrf_key_hash)
    }

    pub fn add_pool_financials(
        &mut self,
        pledge: u64,
        cost: u64,
        margin_numerator: u64,
        margin_denominator: u64,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        self.body.add_pool_financials(pledge, cost, margin_numerator, margin_denominator)
    }

    pub fn add_pool_reward_account(
        &mut self,
        reward_account: &[u8],
        matches_device_path: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        let decision = policy::policy_for_pool_registration_field(matches_device_path);
        if !apply_decision(decision, prompt, "confirm pool reward account") {
            return Err(SigningError::RejectedByPolicy {
                reason: "pool reward account",
            });
        }
        self.body.add_pool_reward_account(reward_account)
    }

    pub fn enter_pool_owners(&mut self, num_owners: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        self.body.enter_pool_owners(num_owners)
    }

    pub fn add_pool_owner(
        &mut self,
        owner_key_hash: &Hash<28>,
        matches_device_path: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        let decision = policy::policy_for_pool_registration_field(matches_device_path);
        if !apply_decision(decision, prompt, "confirm pool owner") {
            return Err(SigningError::RejectedByPolicy {
                reason: "pool owner",
            });
        }
        self.body.add_pool_owner(owner_key_hash)
    }

    pub fn enter_pool_relays(&mut self, num_relays: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        self.body.enter_pool_relays(num_relays)
    }

    pub fn add_relay_single_host_ip(
        &mut self,
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if !apply_decision(
            policy::policy_for_pool_registration_field(false),
            prompt,
            "confirm pool relay",
        ) {
            return Err(SigningError::RejectedByPolicy { reason: "pool relay" });
        }
        self.body.add_relay_single_host_ip(port, ipv4, ipv6)
    }

    pub fn add_relay_single_host_name(
        &mut self,
        port: Option<u16>,
        dns_name: &str,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if !apply_decision(
            policy::policy_for_pool_registration_field(false),
            prompt,
            "confirm pool relay",
        ) {
            return Err(SigningError::RejectedByPolicy { reason: "pool relay" });
        }
        self.body.add_relay_single_host_name(port, dns_name)
    }

    pub fn add_relay_multi_host_name(
        &mut self,
        dns_name: &str,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        if !apply_decision(
            policy::policy_for_pool_registration_field(false),
            prompt,
            "confirm pool relay",
        ) {
            return Err(SigningError::RejectedByPolicy { reason: "pool relay" });
        }
        self.body.add_relay_multi_host_name(dns_name)
    }

    /// Adds pool metadata (or `None` for no-metadata-hash pools) and
    /// closes the pool registration certificate, counting it against the
    /// session's declared certificate count.
    pub fn add_pool_metadata(
        &mut self,
        metadata: Option<(&str, &Hash<32>)>,
        matches_device_path: bool,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::Certificates)?;
        let decision = policy::policy_for_pool_registration_field(matches_device_path);
        if !apply_decision(decision, prompt, "confirm pool metadata") {
            return Err(SigningError::RejectedByPolicy {
                reason: "pool metadata",
            });
        }
        self.body.add_pool_metadata(metadata)?;
        self.remaining_certificates -= 1;
        self.advance_past_certificates_if_done()
    }

    // -- WITHDRAWALS ------------------------------------------------------

    /// `WITHDRAWALS`: one reward withdrawal.
    pub fn add_withdrawal(&mut self, reward_account: &[u8], amount: u64) -> Result<(), SigningError> {
        self.require_stage(Stage::Withdrawals)?;
        if self.remaining_withdrawals == 0 {
            return Err(SigningError::Internal("no withdrawals remaining"));
        }
        self.body.add_withdrawal(reward_account, amount)?;
        self.remaining_withdrawals -= 1;
        self.advance_past_withdrawals_if_done()
    }

    // -- VALIDITY_INTERVAL_START / MINT ------------------------------------

    /// `VALIDITY_INTERVAL_START`, only reachable when declared present.
    pub fn set_validity_interval_start(&mut self, start: u64) -> Result<(), SigningError> {
        self.require_stage(Stage::ValidityIntervalStart)?;
        self.body.add_validity_interval_start(start)?;
        self.stage = Stage::Mint;
        self.advance_past_mint_if_done()
    }

    pub fn enter_mint(&mut self, num_asset_groups: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Mint)?;
        self.body.enter_mint(num_asset_groups)?;
        if num_asset_groups == 0 {
            self.stage = Stage::ScriptDataHash;
            self.advance_past_script_data_hash_if_done()?;
        }
        Ok(())
    }

    pub fn enter_mint_asset_group(&mut self, policy_id: &Hash<28>, num_tokens: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::Mint)?;
        self.body.enter_mint_asset_group(policy_id, num_tokens)
    }

    pub fn add_mint_token(&mut self, asset_name: &[u8], amount: i64) -> Result<(), SigningError> {
        self.require_stage(Stage::Mint)?;
        self.body.add_mint_token(asset_name, amount)
    }

    pub fn close_mint(&mut self) -> Result<(), SigningError> {
        self.require_stage(Stage::Mint)?;
        self.body.close_mint()?;
        self.stage = Stage::ScriptDataHash;
        self.advance_past_script_data_hash_if_done()
    }

    // -- SCRIPT_DATA_HASH / COLLATERAL / REQUIRED SIGNERS ------------------

    pub fn set_script_data_hash(&mut self, hash: &Hash<32>) -> Result<(), SigningError> {
        self.require_stage(Stage::ScriptDataHash)?;
        self.body.add_script_data_hash(hash)?;
        self.stage = Stage::CollateralInputs;
        self.advance_past_collateral_inputs_if_done()
    }

    pub fn add_collateral_input(
        &mut self,
        tx_hash: &Hash<32>,
        index: u32,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::CollateralInputs)?;
        if self.remaining_collateral_inputs == 0 {
            return Err(SigningError::Internal("no collateral inputs remaining"));
        }
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::CollateralInput),
            prompt,
            "confirm collateral input",
        ) {
            return Err(SigningError::RejectedByPolicy {
                reason: "collateral input",
            });
        }
        self.body.add_collateral_input(tx_hash, index)?;
        self.remaining_collateral_inputs -= 1;
        self.advance_past_collateral_inputs_if_done()
    }

    pub fn add_required_signer(&mut self, key_hash: &Hash<28>) -> Result<(), SigningError> {
        self.require_stage(Stage::RequiredSigners)?;
        if self.remaining_required_signers == 0 {
            return Err(SigningError::Internal("no required signers remaining"));
        }
        self.body.add_required_signer(key_hash)?;
        self.remaining_required_signers -= 1;
        self.advance_past_required_signers_if_done()
    }

    pub fn set_network_id(&mut self, network_id: u64) -> Result<(), SigningError> {
        self.require_stage(Stage::NetworkId)?;
        self.body.add_network_id(network_id)?;
        self.stage = Stage::CollateralReturn;
        self.advance_past_collateral_return_if_done()
    }

    pub fn set_collateral_return(
        &mut self,
        address: &[u8],
        coin: u64,
        prompt: &mut impl UserPrompt,
    ) -> Result<(), SigningError> {
        self.require_stage(Stage::CollateralReturn)?;
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::CollateralReturn),
            prompt,
            "confirm collateral return",
        ) {
            return Err(SigningError::RejectedByPolicy {
                reason: "collateral return",
            });
        }
        self.body.add_collateral_return(address, coin)?;
        self.stage = Stage::TotalCollateral;
        self.advance_past_total_collateral_if_done()
    }

    pub fn set_total_collateral(&mut self, amount: u64, prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::TotalCollateral)?;
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::TotalCollateral),
            prompt,
            "confirm total collateral",
        ) {
            return Err(SigningError::RejectedByPolicy {
                reason: "total collateral",
            });
        }
        self.body.add_total_collateral(amount)?;
        self.stage = Stage::ReferenceInputs;
        self.advance_past_reference_inputs_if_done()
    }

    pub fn add_reference_input(&mut self, tx_hash: &Hash<32>, index: u32) -> Result<(), SigningError> {
        self.require_stage(Stage::ReferenceInputs)?;
        if self.remaining_reference_inputs == 0 {
            return Err(SigningError::Internal("no reference inputs remaining"));
        }
        self.body.add_reference_input(tx_hash, index)?;
        self.remaining_reference_inputs -= 1;
        self.advance_past_reference_inputs_if_done()
    }

    pub fn set_voting_procedures(&mut self, encoded_map: &[u8], prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::VotingProcedures)?;
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::VotingProcedures),
            prompt,
            "confirm voting procedures",
        ) {
            return Err(SigningError::RejectedByPolicy {
                reason: "voting procedures",
            });
        }
        self.body.add_voting_procedures(encoded_map)?;
        self.stage = Stage::Treasury;
        self.advance_past_treasury_if_done()
    }

    pub fn set_treasury(&mut self, amount: u64, prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::Treasury)?;
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::Treasury),
            prompt,
            "confirm treasury withdrawal",
        ) {
            return Err(SigningError::RejectedByPolicy { reason: "treasury" });
        }
        self.body.add_treasury(amount)?;
        self.stage = Stage::Donation;
        self.advance_past_donation_if_done()
    }

    pub fn set_donation(&mut self, amount: u64, prompt: &mut impl UserPrompt) -> Result<(), SigningError> {
        self.require_stage(Stage::Donation)?;
        if !apply_decision(
            policy::policy_for_extra_body_field(ExtraBodyField::Donation),
            prompt,
            "confirm donation",
        ) {
            return Err(SigningError::RejectedByPolicy { reason: "donation" });
        }
        self.body.add_donation(amount)?;
        self.stage = Stage::Confirm;
        Ok(())
    }

    // -- CONFIRM / WITNESSES ------------------------------------------------

    /// `CONFIRM`: finalizes the streamed body into the transaction hash
    /// and requires the user to confirm it before any witness may be
    /// produced.
    pub fn confirm(&mut self, prompt: &mut impl UserPrompt) -> Result<Hash<32>, SigningError> {
        self.require_stage(Stage::Confirm)?;
        if !apply_decision(
            PolicyDecision::PromptBeforeResponse,
            prompt,
            "confirm transaction hash",
        ) {
            return Err(SigningError::RejectedByUser);
        }
        let body = std::mem::replace(&mut self.body, TxHashBuilder::new(0, 0, TxBodyFlags::default()));
        let hash = body.finalize()?;
        self.tx_hash = Some(hash);
        self.stage = Stage::Witnesses;
        tracing::debug!(tx_hash = %hash, "transaction body confirmed");
        Ok(hash)
    }

    /// `WITNESSES`: derives the key for `path`, checks it against the
    /// single-account guard and the witness policy for this session's
    /// mode, and signs the confirmed transaction hash.
    pub fn add_witness(
        &mut self,
        path: &DerivationPath,
        crypto: &impl HostCrypto,
        prompt: &mut impl UserPrompt,
    ) -> Result<Signature, SigningError> {
        self.require_stage(Stage::Witnesses)?;
        let tx_hash = self
            .tx_hash
            .ok_or(SigningError::Internal("witness requested before confirm"))?;

        let kind = classify(path);
        if !apply_decision(self.guard.check(&kind), prompt, "confirm signing account") {
            return Err(SigningError::RejectedByPolicy {
                reason: "mixed-account witness",
            });
        }

        let decision = policy::policy_for_sign_tx_witness(self.mode, &kind);
        if !apply_decision(decision, prompt, "confirm witness") {
            return Err(SigningError::RejectedByPolicy {
                reason: "sign tx witness",
            });
        }

        let derived = crypto.derive(path)?;
        tracing::debug!(?kind, "witness signed");
        Ok(derived.sign(tx_hash.as_ref()))
    }

    /// The derived key's public key, exposed so callers can build the
    /// witness set's verification key alongside the signature.
    pub fn witness_public_key(path: &DerivationPath, crypto: &impl HostCrypto) -> Result<PublicKey, SigningError> {
        Ok(crypto.derive(path)?.public_key())
    }

    pub fn is_mainnet(&self) -> bool {
        self.network_id_is_mainnet
    }

    pub fn mint_present(&self) -> bool {
        self.mint_present
    }

    pub fn tx_hash(&self) -> Option<Hash<32>> {
        self.tx_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derivation::SoftwareHostCrypto;
    use crate::keys::path::HARDENED;
    use crate::policy::AutoApprove;

    const SEED_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn hash32(byte: u8) -> Hash<32> {
        Hash::from([byte; 32])
    }

    fn hash28(byte: u8) -> Hash<28> {
        Hash::from([byte; 28])
    }

    fn minimal_init() -> InitRequest {
        InitRequest {
            mode: SigningMode::Ordinary,
            network_id_is_mainnet: true,
            protocol_magic_is_mainnet: true,
            num_inputs: 1,
            num_outputs: 1,
            body_flags: TxBodyFlags::default(),
            mint_present: false,
            has_collateral_inputs: false,
            has_script_data_hash: false,
        }
    }

    fn run_to_confirm(session: &mut SigningSession, prompt: &mut impl UserPrompt) -> Hash<32> {
        session.add_input(&hash32(0x11), 0).unwrap();
        session.add_output_legacy(&[0x61; 29], 1_000_000, 0).unwrap();
        session.set_fee(170_000, prompt).unwrap();
        session.confirm(prompt).unwrap()
    }

    #[test]
    fn rejects_mismatched_network_at_init() {
        let mut request = minimal_init();
        request.protocol_magic_is_mainnet = false;
        let mut prompt = AutoApprove;
        assert!(SigningSession::init(request, &mut prompt).is_err());
    }

    #[test]
    fn full_ordinary_session_produces_a_witness() {
        let mut prompt = AutoApprove;
        let mut session = SigningSession::init(minimal_init(), &mut prompt).unwrap();
        let tx_hash = run_to_confirm(&mut session, &mut prompt);
        assert_eq!(session.tx_hash(), Some(tx_hash));

        let crypto = SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap();
        let path = DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        let sig = session.add_witness(&path, &crypto, &mut prompt).unwrap();

        let pubkey = SigningSession::witness_public_key(&path, &crypto).unwrap();
        assert!(pubkey.verify(tx_hash.as_ref(), &sig));
    }

    #[test]
    fn witness_in_wrong_account_after_first_is_denied() {
        let mut prompt = AutoApprove;
        let mut session = SigningSession::init(minimal_init(), &mut prompt).unwrap();
        run_to_confirm(&mut session, &mut prompt);

        let crypto = SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap();
        let first = DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        session.add_witness(&first, &crypto, &mut prompt).unwrap();

        let second = DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 1 | HARDENED, 0, 0]).unwrap();
        assert!(session.add_witness(&second, &crypto, &mut prompt).is_err());
    }

    #[test]
    fn multisig_path_is_denied_in_ordinary_session() {
        let mut prompt = AutoApprove;
        let mut session = SigningSession::init(minimal_init(), &mut prompt).unwrap();
        run_to_confirm(&mut session, &mut prompt);

        let crypto = SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap();
        let multisig = DerivationPath::new(&[1854 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        assert!(session.add_witness(&multisig, &crypto, &mut prompt).is_err());
    }

    #[test]
    fn cannot_add_witness_before_confirm() {
        let mut prompt = AutoApprove;
        let mut session = SigningSession::init(minimal_init(), &mut prompt).unwrap();
        session.add_input(&hash32(0x11), 0).unwrap();
        session.add_output_legacy(&[0x61; 29], 1_000_000, 0).unwrap();
        let crypto = SoftwareHostCrypto::from_mnemonic(SEED_PHRASE, "").unwrap();
        let path = DerivationPath::new(&[1852 | HARDENED, 1815 | HARDENED, 0 | HARDENED, 0, 0]).unwrap();
        assert!(session.add_witness(&path, &crypto, &mut prompt).is_err());
    }

    #[test]
    fn direct_aux_data_hash_is_folded_into_body_before_validity_interval() {
        let mut prompt = AutoApprove;
        let request = InitRequest {
            body_flags: TxBodyFlags {
                include_aux_data: true,
                include_validity_interval_start: true,
                ..TxBodyFlags::default()
            },
            ..minimal_init()
        };
        let mut session = SigningSession::init(request, &mut prompt).unwrap();
        session.add_aux_data_hash_direct(&hash32(0x77), &mut prompt).unwrap();
        session.add_input(&hash32(0x11), 0).unwrap();
        session.add_output_legacy(&[0x61; 29], 1_000_000, 0).unwrap();
        session.set_fee(170_000, &mut prompt).unwrap();
        session.set_ttl(7200).unwrap();
        session.set_validity_interval_start(100).unwrap();
        assert!(session.confirm(&mut prompt).is_ok());
    }

    #[test]
    fn aux_data_hash_is_folded_even_when_every_later_optional_stage_is_absent() {
        // no validity interval start, no mint, no script data hash, no
        // collateral/required-signers/etc: the fold must still happen,
        // right at the withdrawals -> validity-interval-start boundary.
        let mut prompt = AutoApprove;
        let request = InitRequest {
            body_flags: TxBodyFlags {
                include_aux_data: true,
                ..TxBodyFlags::default()
            },
            ..minimal_init()
        };
        let mut session = SigningSession::init(request, &mut prompt).unwrap();
        session.add_aux_data_hash_direct(&hash32(0x77), &mut prompt).unwrap();
        assert!(run_to_confirm(&mut session, &mut prompt) != Hash::from([0u8; 32]));
    }

    #[test]
    fn cvote_registration_submachine_produces_an_aux_data_hash() {
        let mut prompt = AutoApprove;
        let request = InitRequest {
            body_flags: TxBodyFlags {
                include_aux_data: true,
                ..TxBodyFlags::default()
            },
            ..minimal_init()
        };
        let mut session = SigningSession::init(request, &mut prompt).unwrap();
        {
            let builder = session.begin_cvote_registration().unwrap();
            builder.enter_payload(false).unwrap();
            builder.add_vote_key(&[0x11; 32]).unwrap();
            builder.add_staking_key(&[0x22; 32]).unwrap();
            builder.add_payment_address(&[0x01; 29]).unwrap();
            builder.add_nonce(22634813).unwrap();
            let _payload_hash = builder.finalize_payload_hash().unwrap();
            let sig = Signature::from([0u8; 64]);
            builder.add_signature(&sig).unwrap();
            builder.add_empty_auxiliary_scripts().unwrap();
        }
        session.finish_cvote_registration(&mut prompt).unwrap();
        run_to_confirm(&mut session, &mut prompt);
    }

    #[test]
    fn babbage_tail_fields_are_wired_in_order() {
        let mut prompt = AutoApprove;
        let request = InitRequest {
            body_flags: TxBodyFlags {
                include_script_data_hash: true,
                num_collateral_inputs: 1,
                num_required_signers: 1,
                include_network_id: true,
                include_total_collateral: true,
                num_reference_inputs: 1,
                include_treasury: true,
                include_donation: true,
                ..TxBodyFlags::default()
            },
            has_collateral_inputs: true,
            has_script_data_hash: true,
            ..minimal_init()
        };
        let mut session = SigningSession::init(request, &mut prompt).unwrap();
        session.add_input(&hash32(0x11), 0).unwrap();
        session.add_output_legacy(&[0x61; 29], 1_000_000, 0).unwrap();
        session.set_fee(170_000, &mut prompt).unwrap();
        session.set_script_data_hash(&hash32(0x07)).unwrap();
        session.add_collateral_input(&hash32(0x08), 0, &mut prompt).unwrap();
        session.add_required_signer(&hash28(0x03)).unwrap();
        session.set_network_id(1).unwrap();
        session.set_total_collateral(5_000_000, &mut prompt).unwrap();
        session.add_reference_input(&hash32(0x09), 2).unwrap();
        session.set_treasury(1_000, &mut prompt).unwrap();
        session.set_donation(500, &mut prompt).unwrap();
        assert!(session.confirm(&mut prompt).is_ok());
    }

    #[test]
    fn pool_registration_submachine_closes_a_certificate() {
        let mut prompt = AutoApprove;
        let request = InitRequest {
            mode: SigningMode::PoolRegistrationOwner,
            body_flags: TxBodyFlags {
                num_certificates: 1,
                ..TxBodyFlags::default()
            },
            ..minimal_init()
        };
        let mut session = SigningSession::init(request, &mut prompt).unwrap();
        session.add_input(&hash32(0x11), 0).unwrap();
        session.add_output_legacy(&[0x61; 29], 1_000_000, 0).unwrap();
        session.set_fee(170_000, &mut prompt).unwrap();
        session
            .enter_pool_registration(&hash28(5), &hash32(6), &mut prompt)
            .unwrap();
        session.add_pool_financials(1_000, 340, 3, 100).unwrap();
        session
            .add_pool_reward_account(&[0xe1; 29], false, &mut prompt)
            .unwrap();
        session.enter_pool_owners(1).unwrap();
        session.add_pool_owner(&hash28(1), true, &mut prompt).unwrap();
        session.enter_pool_relays(0).unwrap();
        session.add_pool_metadata(None, false, &mut prompt).unwrap();
        assert!(session.confirm(&mut prompt).is_ok());
    }
}
