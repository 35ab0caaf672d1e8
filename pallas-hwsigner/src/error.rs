use crate::apdu::StatusWord;

/// Errors produced anywhere in the signing engine.
///
/// Every fallible function in this crate returns `Result<T, SigningError>`.
/// The APDU dispatcher is the only place that converts one of these into a
/// wire-level [`StatusWord`] (see [`StatusWord::from`]).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// Malformed APDU payload, buffer underflow, or an out-of-range field.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    /// A derivation path failed to parse or classify into any known kind.
    #[error("invalid BIP44 path")]
    InvalidPath,

    /// An APDU (or a hash-builder append) arrived while the machine was in a
    /// state that does not accept it.
    #[error("bad state: expected {expected}, got {got}")]
    BadState {
        expected: &'static str,
        got: &'static str,
    },

    /// A new instruction arrived while a previous one was still in progress.
    #[error("still in call")]
    StillInCall,

    /// The security policy engine returned `DENY`.
    #[error("rejected by policy: {reason}")]
    RejectedByPolicy { reason: &'static str },

    /// The user declined a confirmation prompt.
    #[error("rejected by user")]
    RejectedByUser,

    /// An address type this engine does not know how to derive/encode.
    #[error("unsupported address type")]
    UnsupportedAddressType,

    /// An internal invariant was violated. On real hardware this resets the
    /// device; here it surfaces as an ordinary error so callers (and tests)
    /// can observe it.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

impl From<pallas_addresses::Error> for SigningError {
    fn from(_err: pallas_addresses::Error) -> Self {
        SigningError::InvalidData("address construction failed")
    }
}

impl From<&SigningError> for StatusWord {
    fn from(err: &SigningError) -> Self {
        match err {
            SigningError::InvalidData(_) => StatusWord::InvalidData,
            SigningError::InvalidPath => StatusWord::InvalidBip44Path,
            SigningError::BadState { .. } => StatusWord::BadState,
            SigningError::StillInCall => StatusWord::StillInCall,
            SigningError::RejectedByPolicy { .. } => StatusWord::RejectedByPolicy,
            SigningError::RejectedByUser => StatusWord::RejectedByUser,
            SigningError::UnsupportedAddressType => StatusWord::UnsupportedAddressType,
            SigningError::Internal(_) => StatusWord::BadState,
        }
    }
}
