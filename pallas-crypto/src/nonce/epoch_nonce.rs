use crate::hash::{Hash, Hasher};
use crate::nonce::{Error, NonceGenerator};

/// A nonce generator that calculates an epoch nonce from the eta_v value (nc) of the block right before
/// the stability window and the block hash of the first block from the previous epoch (nh).
#[derive(Debug, Clone)]
pub struct EpochNonceGenerator {
    pub nonce: Hash<32>,
}

impl EpochNonceGenerator {
    /// Create a new [`EpochNonceGenerator`] generator.
    /// params:
    /// - nc: the eta_v value of the block right before the stability window.
    /// - nh: the block hash of the first block from the previous epoch.
    /// - extra_entropy: optional extra entropy to be used in the nonce calculation.
    pub fn new(nc: Hash<32>, nh: Hash<32>, extra_entropy: Option<&[u8]>) -> Self {
        let mut hasher = Hasher::<256>::new();
        hasher.input(nc.as_ref());
        hasher.input(nh.as_ref());
        let epoch_nonce = hasher.finalize();
        if let Some(extra_entropy) = extra_entropy {
            let mut hasher = Hasher::<256>::new();
            hasher.input(epoch_nonce.as_ref());
            hasher.input(extra_entropy);
            let extra_nonce = hasher.finalize();
            Self { nonce: extra_nonce }
        } else {
            Self { nonce: epoch_nonce }
        }
    }
}

impl NonceGenerator for EpochNonceGenerator {
    fn finalize(&mut self) -> Result<Hash<32>, Error> {
        Ok(self.nonce)
    }
}
