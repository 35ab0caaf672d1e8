//! Security policy engine.
//!
//! A pure decision function per kind of data the device handles, each
//! mapping its inputs to one of five outcomes. Grounded on
//! `securityPolicy.c`'s `DENY_IF`/`WARN_IF`/`PROMPT_IF`/`ALLOW_IF`/
//! `SHOW_IF` macro idiom (reproduced here as local `macro_rules!` early
//! returns) and its helper predicates
//! (`has_cardano_prefix_and_any_account`, `has_valid_change_and_any_address`,
//! `has_reasonable_account_and_address`, `is_too_deep`,
//! `spending_path_is_consistent_with_header`). The legacy source's ~10
//! policy functions are generalized here to the signing modes and body
//! fields this engine's larger transaction model adds (Babbage/Conway
//! fields, multisig, Plutus, pool registration), following the same
//! "derive a decision from a handful of boolean predicates" shape.

use crate::keys::path::{is_reasonable, PathKind};

/// The outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Deny,
    AllowWithoutPrompt,
    ShowBeforeResponse,
    PromptBeforeResponse,
    PromptWarnUnusual,
}

macro_rules! deny_if {
    ($cond:expr) => {
        if $cond {
            return PolicyDecision::Deny;
        }
    };
}

macro_rules! warn_if {
    ($cond:expr) => {
        if $cond {
            return PolicyDecision::PromptWarnUnusual;
        }
    };
}

macro_rules! prompt_if {
    ($cond:expr) => {
        if $cond {
            return PolicyDecision::PromptBeforeResponse;
        }
    };
}

macro_rules! allow_if {
    ($cond:expr) => {
        if $cond {
            return PolicyDecision::AllowWithoutPrompt;
        }
    };
}

macro_rules! show_if {
    ($cond:expr) => {
        if $cond {
            return PolicyDecision::ShowBeforeResponse;
        }
    };
}

/// The user-facing confirmation surface a [`PolicyDecision`] drives.
/// Real hardware renders a screen and waits on a button; tests can stub
/// this with a fixed answer or a recorded script of answers.
pub trait UserPrompt {
    /// Shows `message` and returns whether the user approved it. Called
    /// for every decision other than [`PolicyDecision::Deny`] and
    /// [`PolicyDecision::AllowWithoutPrompt`], which need no confirmation.
    fn confirm(&mut self, message: &str) -> bool;
}

/// Always approves every prompt. Useful for driving the engine in tests
/// without modeling a human in the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl UserPrompt for AutoApprove {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Applies a [`PolicyDecision`] against a [`UserPrompt`], returning
/// whether the action may proceed. `DENY` never prompts; the two
/// silent-allow cases never prompt either; everything else shows
/// `message` and defers to the user's answer.
pub fn apply_decision(decision: PolicyDecision, prompt: &mut impl UserPrompt, message: &str) -> bool {
    match decision {
        PolicyDecision::Deny => {
            tracing::warn!(%message, "policy denied");
            false
        }
        PolicyDecision::AllowWithoutPrompt => {
            tracing::debug!(%message, "policy allowed without prompt");
            true
        }
        PolicyDecision::ShowBeforeResponse
        | PolicyDecision::PromptBeforeResponse
        | PolicyDecision::PromptWarnUnusual => {
            if decision == PolicyDecision::PromptWarnUnusual {
                tracing::warn!(%message, "prompting on an unusual path");
            } else {
                tracing::debug!(%message, ?decision, "prompting user");
            }
            let approved = prompt.confirm(message);
            if !approved {
                tracing::debug!(%message, "user rejected prompt");
            }
            approved
        }
    }
}

/// Which family of transaction this signing session belongs to. Chosen
/// at INIT from the caller-declared body shape and constrains which
/// witness paths, certificates, and body fields are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// A plain wallet transaction: ordinary spending/staking paths only.
    Ordinary,
    /// A multisig script transaction: multisig paths only.
    Multisig,
    /// A transaction invoking Plutus scripts: any valid path, but every
    /// witness and output is forced to SHOW.
    Plutus,
    /// The owner sub-machine of a pool registration certificate: the
    /// only acceptable witness path is a device-held pool owner path.
    PoolRegistrationOwner,
    /// The operator sub-machine of a pool registration certificate: the
    /// only acceptable witness path is the pool cold key path.
    PoolRegistrationOperator,
}

fn has_cardano_prefix_and_any_account(kind: &PathKind) -> bool {
    kind.account_group().is_some()
}

fn has_valid_change_and_any_address(kind: &PathKind) -> bool {
    matches!(
        kind,
        PathKind::WalletSpendingKey { .. } | PathKind::MultisigSpendingKey { .. } | PathKind::ByronPayment { .. }
    )
}

fn has_reasonable_account_and_address(kind: &PathKind) -> bool {
    is_reasonable(kind)
}

fn is_too_deep(kind: &PathKind) -> bool {
    // every PathKind this engine recognizes is already bounded to a
    // fixed depth by classify(); only Invalid represents "too deep or
    // malformed", which the DENY check above already screens out.
    matches!(kind, PathKind::Invalid)
}

/// `policyForGetExtendedPublicKey`.
pub fn policy_for_get_extended_public_key(kind: &PathKind) -> PolicyDecision {
    deny_if!(!has_cardano_prefix_and_any_account(kind));
    warn_if!(!has_reasonable_account_and_address(kind));
    warn_if!(matches!(
        kind,
        PathKind::WalletSpendingKey { .. } | PathKind::MultisigSpendingKey { .. }
    ));
    PolicyDecision::PromptBeforeResponse
}

/// `policyForReturnDeriveAddress`.
pub fn policy_for_return_derive_address(kind: &PathKind) -> PolicyDecision {
    deny_if!(!has_cardano_prefix_and_any_account(kind));
    deny_if!(matches!(kind, PathKind::Invalid));
    warn_if!(!has_reasonable_account_and_address(kind));
    warn_if!(is_too_deep(kind));
    PolicyDecision::PromptBeforeResponse
}

/// `policyForShowDeriveAddress`.
pub fn policy_for_show_derive_address(kind: &PathKind) -> PolicyDecision {
    deny_if!(!has_cardano_prefix_and_any_account(kind));
    deny_if!(matches!(kind, PathKind::Invalid));
    warn_if!(!has_reasonable_account_and_address(kind));
    warn_if!(is_too_deep(kind));
    PolicyDecision::ShowBeforeResponse
}

/// Parameters gating `policy_for_sign_tx_init`. Mirrors the flags an
/// INIT APDU declares up front.
#[derive(Debug, Clone, Copy)]
pub struct InitParams {
    pub mode: SigningMode,
    pub network_id_is_mainnet: bool,
    pub protocol_magic_is_mainnet: bool,
    pub num_certificates: u32,
    pub is_pool_registration: bool,
    pub mint_present: bool,
    pub plutus_items_present: bool,
    pub has_collateral_inputs: bool,
    pub has_script_data_hash: bool,
}

/// `policyForSignTxInit`, generalized from its legacy always-PROMPT body
/// to the mode/field consistency checks a larger body model requires.
pub fn policy_for_sign_tx_init(params: &InitParams) -> PolicyDecision {
    deny_if!(params.network_id_is_mainnet != params.protocol_magic_is_mainnet);
    deny_if!(params.is_pool_registration && params.mint_present);
    deny_if!(params.is_pool_registration && params.num_certificates > 1);
    deny_if!(params.plutus_items_present && params.mode != SigningMode::Plutus);
    warn_if!(!params.network_id_is_mainnet);
    warn_if!(
        params.mode == SigningMode::Plutus
            && (!params.has_collateral_inputs || !params.has_script_data_hash)
    );
    PolicyDecision::PromptBeforeResponse
}

/// `policyForSignTxInput`: no need to check attested inputs.
pub fn policy_for_sign_tx_input() -> PolicyDecision {
    PolicyDecision::AllowWithoutPrompt
}

/// `policyForSignTxOutputAddress`, extended with the Plutus
/// missing-datum warning.
pub fn policy_for_sign_tx_output_address(is_plutus_script_address: bool, has_datum: bool) -> PolicyDecision {
    warn_if!(is_plutus_script_address && !has_datum);
    PolicyDecision::ShowBeforeResponse
}

/// `policyForSignTxOutputPath`: a change output whose address was built
/// from a device-held path rather than supplied raw.
pub fn policy_for_sign_tx_output_path(kind: &PathKind) -> PolicyDecision {
    deny_if!(!has_cardano_prefix_and_any_account(kind));
    deny_if!(!has_valid_change_and_any_address(kind));
    show_if!(!has_reasonable_account_and_address(kind));
    show_if!(is_too_deep(kind));
    PolicyDecision::AllowWithoutPrompt
}

/// `policyForSignTxFee`.
pub fn policy_for_sign_tx_fee() -> PolicyDecision {
    PolicyDecision::ShowBeforeResponse
}

/// `policyForSignTxWitness`, extended with the per-mode path
/// compatibility rules. Each mode accepts a different, disjoint
/// family of paths; the shared "invalid"/"unreasonable" checks run only
/// after the mode has confirmed the path belongs to its family, since
/// e.g. a pool cold key has no account and would otherwise fail the
/// ordinary-wallet account checks.
pub fn policy_for_sign_tx_witness(mode: SigningMode, kind: &PathKind) -> PolicyDecision {
    deny_if!(matches!(kind, PathKind::Invalid));

    match mode {
        SigningMode::Ordinary => {
            deny_if!(!matches!(
                kind,
                PathKind::WalletSpendingKey { .. } | PathKind::WalletStakingKey { .. } | PathKind::ByronPayment { .. }
            ));
        }
        SigningMode::Multisig => {
            deny_if!(!matches!(
                kind,
                PathKind::MultisigSpendingKey { .. } | PathKind::MultisigStakingKey { .. }
            ));
        }
        SigningMode::Plutus => {
            deny_if!(!has_valid_change_and_any_address(kind) && !matches!(kind, PathKind::WalletStakingKey { .. } | PathKind::MultisigStakingKey { .. }));
            return PolicyDecision::ShowBeforeResponse;
        }
        SigningMode::PoolRegistrationOwner => {
            deny_if!(!matches!(kind, PathKind::WalletStakingKey { .. }));
        }
        SigningMode::PoolRegistrationOperator => {
            deny_if!(!matches!(kind, PathKind::PoolColdKey { .. }));
        }
    }

    warn_if!(!has_reasonable_account_and_address(kind));
    warn_if!(is_too_deep(kind));
    PolicyDecision::AllowWithoutPrompt
}

/// Certificate kinds covered by a single dedicated policy function,
/// keyed on whether the credential names a device path (known) or an
/// opaque hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    StakeRegistration,
    StakeDeregistration,
    StakeDelegation,
    VoteDelegation,
    CommitteeAuthorization,
    CommitteeResignation,
    DRepRegistration,
    PoolRetirement,
}

/// `policyForSignTxCertificate` equivalent: stake registration and vote
/// delegation silently ALLOW when the credential is a recognized device
/// path (the user already confirmed the witness); deregistration and
/// pool retirement always PROMPT since they end an ongoing commitment;
/// everything else, and any opaque-hash credential, is SHOW so the user
/// can verify what's being certified.
pub fn policy_for_certificate(kind: CertificateKind, credential_is_device_path: bool) -> PolicyDecision {
    allow_if!(
        matches!(kind, CertificateKind::StakeRegistration | CertificateKind::VoteDelegation)
            && credential_is_device_path
    );
    prompt_if!(matches!(
        kind,
        CertificateKind::StakeDeregistration | CertificateKind::PoolRetirement
    ));
    PolicyDecision::ShowBeforeResponse
}

/// `policyForSignTxPoolRegistration` family: pool metadata URL/hash,
/// relay records, and reward accounts are SHOW unless they resolve to a
/// device-held path (owner keys, reward account built from a device
/// path), matching "gates ... by whether it matches a device-held path".
pub fn policy_for_pool_registration_field(matches_device_path: bool) -> PolicyDecision {
    if matches_device_path {
        PolicyDecision::AllowWithoutPrompt
    } else {
        PolicyDecision::ShowBeforeResponse
    }
}

/// Aux data policy: a CIP-36 vote registration payload is always shown;
/// a plain auxiliary-data hash is silently allowed unless the session
/// is in expert mode.
pub fn policy_for_aux_data(is_vote_registration: bool, expert_mode: bool) -> PolicyDecision {
    if is_vote_registration {
        PolicyDecision::ShowBeforeResponse
    } else if expert_mode {
        PolicyDecision::ShowBeforeResponse
    } else {
        PolicyDecision::AllowWithoutPrompt
    }
}

/// Shared rule for ledger-era body fields that are new enough that an
/// unaware wallet could be tricked by them (collateral, reference
/// inputs, required signers, total collateral, voting procedures,
/// treasury, donation): ALLOW when it cannot silently change the signed
/// meaning of the transaction (it only restricts what may be spent or
/// read), SHOW when it moves value or asserts a governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraBodyField {
    CollateralInput,
    ReferenceInput,
    RequiredSigner,
    CollateralReturn,
    TotalCollateral,
    VotingProcedures,
    Treasury,
    Donation,
}

pub fn policy_for_extra_body_field(field: ExtraBodyField) -> PolicyDecision {
    match field {
        ExtraBodyField::ReferenceInput | ExtraBodyField::RequiredSigner => PolicyDecision::AllowWithoutPrompt,
        ExtraBodyField::CollateralInput => PolicyDecision::ShowBeforeResponse,
        ExtraBodyField::CollateralReturn | ExtraBodyField::TotalCollateral => PolicyDecision::ShowBeforeResponse,
        ExtraBodyField::VotingProcedures => PolicyDecision::PromptBeforeResponse,
        ExtraBodyField::Treasury | ExtraBodyField::Donation => PolicyDecision::PromptBeforeResponse,
    }
}

/// Tracks the account of the first path seen in a signing session:
/// every later path must agree on kind-group and account, or the
/// session is denied. The legacy single-signing-key device has no
/// equivalent for this since it never mixed derivation scheme in one
/// transaction.
#[derive(Debug, Default)]
pub struct SingleAccountGuard {
    seen: Option<(bool, u32)>,
}

impl SingleAccountGuard {
    pub fn new() -> Self {
        SingleAccountGuard { seen: None }
    }

    /// Checks (and, on the first call, records) the path's account
    /// grouping. Paths with no account (pool cold key, mint key) are not
    /// tracked and never conflict.
    pub fn check(&mut self, kind: &PathKind) -> PolicyDecision {
        let Some(account) = kind.account_group() else {
            return PolicyDecision::AllowWithoutPrompt;
        };
        let this = (kind.is_byron(), account);
        match self.seen {
            None => {
                self.seen = Some(this);
                PolicyDecision::AllowWithoutPrompt
            }
            Some(seen) if seen == this => PolicyDecision::AllowWithoutPrompt,
            Some(_) => PolicyDecision::Deny,
        }
    }
}
