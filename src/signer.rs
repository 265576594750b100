use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature, H256, U256};
use ethers::utils::{hash_message, keccak256};

/// Holds the release authority key and produces the authorization the
/// destination bridge verifies before releasing funds.
///
/// Signing is a pure function of the inputs and the held key; it never
/// touches the network.
pub struct AuthorizationSigner {
    wallet: LocalWallet,
}

impl AuthorizationSigner {
    /// Creates a signer around the given authority wallet.
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }

    /// The account address of the held authority key, as the destination
    /// bridge recovers it.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Signs the release of `amount` tokens to `recipient` for the lock with
    /// the given `sequence` number.
    ///
    /// The destination bridge recovers the signer from the same digest over
    /// the same tightly packed fields, so the layout here is part of the
    /// on-chain protocol and must never drift.
    pub fn sign(
        &self,
        recipient: Address,
        amount: U256,
        sequence: U256,
    ) -> crate::Result<Signature> {
        let digest = release_digest(recipient, amount, sequence);
        let signature = self.wallet.sign_hash(hash_message(digest))?;
        Ok(signature)
    }
}

/// The keccak-256 digest over `recipient (20) || amount (32 BE) ||
/// sequence (32 BE)`, without any padding between the fields.
pub fn release_digest(
    recipient: Address,
    amount: U256,
    sequence: U256,
) -> H256 {
    let mut preimage = [0u8; 84];
    preimage[0..20].copy_from_slice(recipient.as_bytes());
    amount.to_big_endian(&mut preimage[20..52]);
    sequence.to_big_endian(&mut preimage[52..84]);
    H256::from(keccak256(preimage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const AUTHORITY_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn authority() -> AuthorizationSigner {
        AuthorizationSigner::new(AUTHORITY_KEY.parse().unwrap())
    }

    fn sample_release() -> (Address, U256, U256) {
        let recipient =
            Address::from_str("0x90F79bf6EB2c4f870365E785982E1f101E93b906")
                .unwrap();
        let amount = U256::from_dec_str("100000000000000000000").unwrap();
        (recipient, amount, U256::one())
    }

    #[test]
    fn digest_layout_is_pinned() {
        let (recipient, amount, sequence) = sample_release();
        let digest = release_digest(recipient, amount, sequence);
        assert_eq!(
            digest,
            H256::from_str(
                "0x81b6b36b0c86e27c2346603abcc747daf019c7b10d2426269b6132ed5b4e9d01"
            )
            .unwrap(),
        );
        // And the prefixed digest that actually gets signed.
        assert_eq!(
            hash_message(digest),
            H256::from_str(
                "0x4ca76ae3def3758738c171a4c644b9c21d94463e1008b97cf3526c1936dfb455"
            )
            .unwrap(),
        );
    }

    #[test]
    fn signature_recovers_to_the_authority_address() {
        let signer = authority();
        let (recipient, amount, sequence) = sample_release();
        let signature = signer.sign(recipient, amount, sequence).unwrap();
        assert_eq!(signature.to_vec().len(), 65);
        let digest = release_digest(recipient, amount, sequence);
        signature
            .verify(digest.as_bytes().to_vec(), signer.address())
            .expect("authority must recover from its own signature");
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = authority();
        let (recipient, amount, sequence) = sample_release();
        let first = signer.sign(recipient, amount, sequence).unwrap();
        let second = signer.sign(recipient, amount, sequence).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn foreign_key_does_not_recover_to_the_authority() {
        let signer = authority();
        let imposter = AuthorizationSigner::new(
            "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
                .parse()
                .unwrap(),
        );
        let (recipient, amount, sequence) = sample_release();
        let signature = imposter.sign(recipient, amount, sequence).unwrap();
        let digest = release_digest(recipient, amount, sequence);
        assert!(signature
            .verify(digest.as_bytes().to_vec(), signer.address())
            .is_err());
    }

    #[test]
    fn digest_binds_every_field() {
        let (recipient, amount, sequence) = sample_release();
        let base = release_digest(recipient, amount, sequence);
        assert_ne!(
            base,
            release_digest(recipient, amount, sequence + U256::one()),
        );
        assert_ne!(
            base,
            release_digest(recipient, amount + U256::one(), sequence),
        );
        assert_ne!(base, release_digest(Address::zero(), amount, sequence));
    }
}
