use super::Validator;
use rand::{CryptoRng, Rng};
use shardbft_cryptography::{bls12381, secp256r1, PrivateKeyExt, Signer};
use std::fmt::Debug;

/// Private keys held by a validator: a BLS key for votes and a secp256r1 key for bridge
/// confirmations.
#[derive(Clone)]
pub struct MiningKeySet {
    bls: bls12381::PrivateKey,
    bridge: secp256r1::PrivateKey,
    identity: Validator,
}

impl MiningKeySet {
    pub fn new(bls: bls12381::PrivateKey, bridge: secp256r1::PrivateKey) -> Self {
        let identity = Validator {
            bls: bls.public_key(),
            bridge: bridge.public_key(),
        };
        Self {
            bls,
            bridge,
            identity,
        }
    }

    /// Derive both keys from a seed.
    ///
    /// # Warning
    ///
    /// This function is insecure and should only be used for examples and testing.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(
            bls12381::PrivateKey::from_seed(seed),
            secp256r1::PrivateKey::from_seed(seed),
        )
    }

    /// Generate both keys from the supplied RNG.
    pub fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self::new(
            bls12381::PrivateKey::from_rng(rng),
            secp256r1::PrivateKey::from_rng(rng),
        )
    }

    /// Public keys of the set.
    pub fn identity(&self) -> Validator {
        self.identity.clone()
    }

    pub fn bls(&self) -> &bls12381::PrivateKey {
        &self.bls
    }

    pub fn bridge(&self) -> &secp256r1::PrivateKey {
        &self.bridge
    }
}

impl Debug for MiningKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MiningKeySet({})", self.identity)
    }
}
