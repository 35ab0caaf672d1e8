//! BIP-32 derivation path parsing and classification.
//!
//! Grounded on `bip44.c`: the wire encoding (one length byte followed by
//! big-endian u32 indices), the hardened-bit convention, and the prefix
//! scheme used to classify a path. The Conway-era chain types (DRep key,
//! committee cold/hot key) extend the legacy `CARDANO_CHAIN_*` constant
//! set with the newer purpose/chain-type combinations.

use crate::error::SigningError;

pub const HARDENED: u32 = 0x8000_0000;
pub const MAX_PATH_LENGTH: usize = 10;

const PURPOSE_BYRON: u32 = 44;
const PURPOSE_SHELLEY: u32 = 1852;
const PURPOSE_MULTISIG: u32 = 1854;
const PURPOSE_MINT: u32 = 1855;
const PURPOSE_POOL_COLD_KEY: u32 = 1853;
const PURPOSE_CVOTE: u32 = 1694;
const ADA_COIN_TYPE: u32 = 1815;

const CHAIN_EXTERNAL: u32 = 0;
const CHAIN_INTERNAL: u32 = 1;
const CHAIN_STAKING_KEY: u32 = 2;
const CHAIN_DREP_KEY: u32 = 3;
const CHAIN_COMMITTEE_COLD: u32 = 4;
const CHAIN_COMMITTEE_HOT: u32 = 5;

const CVOTE_ACCOUNT_CHAIN: u32 = 0;
const CVOTE_KEY_CHAIN_EXTERNAL: u32 = 1;
const CVOTE_KEY_CHAIN_INTERNAL: u32 = 2;

const MAX_REASONABLE_ACCOUNT: u32 = 100;
const MAX_REASONABLE_ADDRESS: u32 = 1_000_000;
const MAX_REASONABLE_COLD_KEY_INDEX: u32 = 100;

fn is_hardened(value: u32) -> bool {
    value & HARDENED != 0
}

fn unharden(value: u32) -> u32 {
    value & !HARDENED
}

/// A parsed BIP-32 derivation path, up to [`MAX_PATH_LENGTH`] 32-bit
/// indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationPath {
    indices: [u32; MAX_PATH_LENGTH],
    len: usize,
}

impl DerivationPath {
    pub fn new(indices: &[u32]) -> Result<Self, SigningError> {
        if indices.len() > MAX_PATH_LENGTH {
            return Err(SigningError::InvalidPath);
        }
        let mut buf = [0u32; MAX_PATH_LENGTH];
        buf[..indices.len()].copy_from_slice(indices);
        Ok(DerivationPath {
            indices: buf,
            len: indices.len(),
        })
    }

    /// Parses the wire format: one length byte, then `length` big-endian
    /// u32 indices. Returns the path and the number of bytes consumed.
    /// Mirrors `bip44_parseFromWire`.
    pub fn parse_from_wire(data: &[u8]) -> Result<(Self, usize), SigningError> {
        let length = *data
            .first()
            .ok_or(SigningError::InvalidData("empty path"))? as usize;
        if length > MAX_PATH_LENGTH {
            return Err(SigningError::InvalidData("path too long"));
        }
        if 1 + length * 4 > data.len() {
            return Err(SigningError::InvalidData("path truncated"));
        }
        let mut indices = [0u32; MAX_PATH_LENGTH];
        let mut offset = 1;
        for slot in indices.iter_mut().take(length) {
            let bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
            *slot = u32::from_be_bytes(bytes);
            offset += 4;
        }
        Ok((
            DerivationPath {
                indices,
                len: length,
            },
            offset,
        ))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.indices[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn get(&self, i: usize) -> Option<u32> {
        if i < self.len {
            Some(self.indices[i])
        } else {
            None
        }
    }

    fn has_prefix(&self, purpose: u32, coin_type: u32) -> bool {
        self.get(0) == Some(purpose | HARDENED) && self.get(1) == Some(coin_type | HARDENED)
    }

    fn has_byron_prefix(&self) -> bool {
        self.has_prefix(PURPOSE_BYRON, ADA_COIN_TYPE)
    }

    fn has_shelley_prefix(&self) -> bool {
        self.has_prefix(PURPOSE_SHELLEY, ADA_COIN_TYPE)
    }

    fn has_multisig_prefix(&self) -> bool {
        self.has_prefix(PURPOSE_MULTISIG, ADA_COIN_TYPE)
    }

    fn has_cvote_prefix(&self) -> bool {
        self.has_prefix(PURPOSE_CVOTE, ADA_COIN_TYPE)
    }

    fn has_pool_cold_key_prefix(&self) -> bool {
        self.get(0) == Some(PURPOSE_POOL_COLD_KEY | HARDENED)
            && self.get(1) == Some(ADA_COIN_TYPE | HARDENED)
    }

    fn has_mint_prefix(&self) -> bool {
        self.get(0) == Some(PURPOSE_MINT | HARDENED) && self.get(1) == Some(ADA_COIN_TYPE | HARDENED)
    }

    fn account(&self) -> Option<u32> {
        self.get(2)
    }

    fn is_valid_pool_cold_key_path(&self) -> bool {
        self.len == 3
            && self.has_pool_cold_key_prefix()
            && self.get(2).map(is_hardened).unwrap_or(false)
    }
}

/// The outcome of classifying a [`DerivationPath`]: which kind of key it
/// names, carrying enough detail (account number, chain, address index)
/// for the single-account guard and the "reasonable path" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    WalletAccount { account: u32 },
    WalletSpendingKey { account: u32, chain: u32, index: u32 },
    WalletStakingKey { account: u32 },
    MultisigAccount { account: u32 },
    MultisigSpendingKey { account: u32, chain: u32, index: u32 },
    MultisigStakingKey { account: u32 },
    DRepKey { account: u32 },
    CommitteeColdKey { account: u32 },
    CommitteeHotKey { account: u32 },
    MintKey,
    PoolColdKey { index: u32 },
    CVoteAccount { account: u32 },
    CVoteKey { account: u32, chain: u32, index: u32 },
    ByronPayment { account: u32, index: u32 },
    Invalid,
}

impl PathKind {
    /// The account grouping used by the single-account guard: two
    /// paths are in conflict if they are both present but disagree.
    pub fn account_group(&self) -> Option<u32> {
        match *self {
            PathKind::WalletAccount { account }
            | PathKind::WalletSpendingKey { account, .. }
            | PathKind::WalletStakingKey { account }
            | PathKind::MultisigAccount { account }
            | PathKind::MultisigSpendingKey { account, .. }
            | PathKind::MultisigStakingKey { account }
            | PathKind::DRepKey { account }
            | PathKind::CommitteeColdKey { account }
            | PathKind::CommitteeHotKey { account }
            | PathKind::CVoteAccount { account }
            | PathKind::CVoteKey { account, .. }
            | PathKind::ByronPayment { account, .. } => Some(account),
            PathKind::PoolColdKey { .. } | PathKind::MintKey | PathKind::Invalid => None,
        }
    }

    pub fn is_byron(&self) -> bool {
        matches!(self, PathKind::ByronPayment { .. })
    }
}

fn classify_wallet_style(
    path: &DerivationPath,
    account_of: impl Fn(u32) -> PathKind,
    spending_of: impl Fn(u32, u32, u32) -> PathKind,
    staking_of: impl Fn(u32) -> PathKind,
) -> PathKind {
    match path.len() {
        3 => account_of(unharden(path.account().unwrap())),
        5 => {
            let account = unharden(path.account().unwrap());
            let chain = path.get(3).unwrap();
            let index = path.get(4).unwrap();
            match chain {
                CHAIN_EXTERNAL | CHAIN_INTERNAL => spending_of(account, chain, index),
                CHAIN_STAKING_KEY if index == 0 => staking_of(account),
                _ => PathKind::Invalid,
            }
        }
        _ => PathKind::Invalid,
    }
}

/// Classifies a derivation path into exactly one [`PathKind`] (P5: total,
/// partitioning classification).
pub fn classify(path: &DerivationPath) -> PathKind {
    if path.has_pool_cold_key_prefix() {
        return if path.is_valid_pool_cold_key_path() {
            PathKind::PoolColdKey {
                index: unharden(path.get(2).unwrap()),
            }
        } else {
            PathKind::Invalid
        };
    }

    if path.has_mint_prefix() {
        return if path.len() == 3 && path.get(2).map(is_hardened).unwrap_or(false) {
            PathKind::MintKey
        } else {
            PathKind::Invalid
        };
    }

    if path.has_byron_prefix() {
        return match (path.account(), path.len()) {
            (Some(account), 5) if path.get(3) == Some(CHAIN_EXTERNAL) || path.get(3) == Some(CHAIN_INTERNAL) => {
                PathKind::ByronPayment {
                    account: unharden(account),
                    index: path.get(4).unwrap(),
                }
            }
            _ => PathKind::Invalid,
        };
    }

    if path.has_cvote_prefix() {
        return match path.len() {
            3 => PathKind::CVoteAccount {
                account: unharden(path.account().unwrap()),
            },
            5 => {
                let account = unharden(path.account().unwrap());
                let chain = path.get(3).unwrap();
                let index = path.get(4).unwrap();
                match chain {
                    CVOTE_ACCOUNT_CHAIN | CVOTE_KEY_CHAIN_EXTERNAL | CVOTE_KEY_CHAIN_INTERNAL => {
                        PathKind::CVoteKey {
                            account,
                            chain,
                            index,
                        }
                    }
                    _ => PathKind::Invalid,
                }
            }
            _ => PathKind::Invalid,
        };
    }

    if path.has_shelley_prefix() {
        if path.len() == 5 {
            let account = unharden(path.account().unwrap());
            match path.get(3) {
                Some(CHAIN_DREP_KEY) => return PathKind::DRepKey { account },
                Some(CHAIN_COMMITTEE_COLD) => return PathKind::CommitteeColdKey { account },
                Some(CHAIN_COMMITTEE_HOT) => return PathKind::CommitteeHotKey { account },
                _ => {}
            }
        }
        return classify_wallet_style(
            path,
            |account| PathKind::WalletAccount { account },
            |account, chain, index| PathKind::WalletSpendingKey {
                account,
                chain,
                index,
            },
            |account| PathKind::WalletStakingKey { account },
        );
    }

    if path.has_multisig_prefix() {
        return classify_wallet_style(
            path,
            |account| PathKind::MultisigAccount { account },
            |account, chain, index| PathKind::MultisigSpendingKey {
                account,
                chain,
                index,
            },
            |account| PathKind::MultisigStakingKey { account },
        );
    }

    PathKind::Invalid
}

/// Whether every hardened index is within the device's sane display
/// domain (account ≤ 100, address index ≤ 1 000 000, pool cold key index
/// ≤ 100). Paths outside this range are permitted only behind an explicit
/// "unusual path" warning.
pub fn is_reasonable(kind: &PathKind) -> bool {
    match *kind {
        PathKind::WalletAccount { account }
        | PathKind::MultisigAccount { account }
        | PathKind::WalletStakingKey { account }
        | PathKind::MultisigStakingKey { account }
        | PathKind::DRepKey { account }
        | PathKind::CommitteeColdKey { account }
        | PathKind::CommitteeHotKey { account }
        | PathKind::CVoteAccount { account } => account <= MAX_REASONABLE_ACCOUNT,
        PathKind::WalletSpendingKey { account, index, .. }
        | PathKind::MultisigSpendingKey { account, index, .. }
        | PathKind::CVoteKey { account, index, .. }
        | PathKind::ByronPayment { account, index } => {
            account <= MAX_REASONABLE_ACCOUNT && index <= MAX_REASONABLE_ADDRESS
        }
        PathKind::PoolColdKey { index } => index <= MAX_REASONABLE_COLD_KEY_INDEX,
        PathKind::MintKey => true,
        PathKind::Invalid => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(indices: &[u32]) -> DerivationPath {
        DerivationPath::new(indices).unwrap()
    }

    #[test]
    fn classifies_ordinary_payment_key() {
        let p = path(&[
            PURPOSE_SHELLEY | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            0 | HARDENED,
            0,
            0,
        ]);
        assert_eq!(
            classify(&p),
            PathKind::WalletSpendingKey {
                account: 0,
                chain: 0,
                index: 0
            }
        );
    }

    #[test]
    fn classifies_ordinary_staking_key() {
        let p = path(&[
            PURPOSE_SHELLEY | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            0 | HARDENED,
            2,
            0,
        ]);
        assert_eq!(classify(&p), PathKind::WalletStakingKey { account: 0 });
    }

    #[test]
    fn staking_key_with_nonzero_index_is_invalid() {
        let p = path(&[
            PURPOSE_SHELLEY | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            0 | HARDENED,
            2,
            1,
        ]);
        assert_eq!(classify(&p), PathKind::Invalid);
    }

    #[test]
    fn classifies_pool_cold_key() {
        let p = path(&[
            PURPOSE_POOL_COLD_KEY | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            2 | HARDENED,
        ]);
        assert_eq!(classify(&p), PathKind::PoolColdKey { index: 2 });
    }

    #[test]
    fn classifies_byron_payment() {
        let p = path(&[
            PURPOSE_BYRON | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            0 | HARDENED,
            0,
            55,
        ]);
        assert_eq!(
            classify(&p),
            PathKind::ByronPayment {
                account: 0,
                index: 55
            }
        );
    }

    #[test]
    fn classifies_cvote_account_and_key() {
        let acct = path(&[PURPOSE_CVOTE | HARDENED, ADA_COIN_TYPE | HARDENED, 0 | HARDENED]);
        assert_eq!(classify(&acct), PathKind::CVoteAccount { account: 0 });

        let key = path(&[
            PURPOSE_CVOTE | HARDENED,
            ADA_COIN_TYPE | HARDENED,
            0 | HARDENED,
            1,
            3,
        ]);
        assert_eq!(
            classify(&key),
            PathKind::CVoteKey {
                account: 0,
                chain: 1,
                index: 3
            }
        );
    }

    #[test]
    fn unknown_purpose_is_invalid() {
        let p = path(&[9999 | HARDENED, ADA_COIN_TYPE | HARDENED, 0 | HARDENED, 0, 0]);
        assert_eq!(classify(&p), PathKind::Invalid);
    }

    #[test]
    fn reasonable_limits_are_enforced() {
        assert!(is_reasonable(&PathKind::WalletAccount { account: 100 }));
        assert!(!is_reasonable(&PathKind::WalletAccount { account: 101 }));
        assert!(!is_reasonable(&PathKind::Invalid));
    }

    #[test]
    fn wire_round_trip() {
        let bytes = [
            5u8,
            0x80, 0x00, 0x07, 0x3C, // 1852'
            0x80, 0x00, 0x07, 0x17, // 1815'
            0x80, 0x00, 0x00, 0x00, // 0'
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        let (p, consumed) = DerivationPath::parse_from_wire(&bytes).unwrap();
        assert_eq!(consumed, 21);
        assert_eq!(p.len(), 5);
        assert_eq!(
            classify(&p),
            PathKind::WalletSpendingKey {
                account: 0,
                chain: 0,
                index: 0
            }
        );
    }
}
