// Signature capability and transaction signatures

use crate::core::{pubkey_hash, FixedBuf, Hash256, PubKeyBuf};
use crate::error::{Error, Result};
use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;

/// Compact signature bytes
pub type SigBuf = FixedBuf<64>;

/// Elliptic-curve signing over a 32-byte digest
///
/// Signing must be deterministic: the same digest and key always yield the
/// same signature.
pub trait SignatureScheme: Send + Sync {
    fn sign(&self, digest: &Hash256, privkey: &PrivKey) -> Result<SigBuf>;
    fn verify(&self, digest: &Hash256, sig: &SigBuf, pubkey: &PubKeyBuf) -> bool;
    fn public_key(&self, privkey: &PrivKey) -> Result<PubKeyBuf>;
}

/// Private key bytes
#[derive(Clone, PartialEq, Eq)]
pub struct PrivKey(pub [u8; 32]);

impl PrivKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(FixedBuf::<32>::from_slice(bytes)?.0))
    }

    /// Fresh random secp256k1 secret key
    pub fn generate() -> Self {
        Self(SecretKey::new(&mut OsRng).secret_bytes())
    }
}

impl fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PrivKey(..)")
    }
}

/// ECDSA over secp256k1 with RFC 6979 nonces
pub struct Secp256k1Scheme {
    secp: Secp256k1<secp256k1::All>,
}

impl Secp256k1Scheme {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Secp256k1Scheme {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureScheme for Secp256k1Scheme {
    fn sign(&self, digest: &Hash256, privkey: &PrivKey) -> Result<SigBuf> {
        let secret_key = SecretKey::from_slice(&privkey.0)
            .map_err(|e| Error::InvalidKey(format!("invalid private key: {}", e)))?;
        let message = Message::from_digest(digest.0);
        let signature = self.secp.sign_ecdsa(&message, &secret_key);
        Ok(SigBuf::new(signature.serialize_compact()))
    }

    fn verify(&self, digest: &Hash256, sig: &SigBuf, pubkey: &PubKeyBuf) -> bool {
        let Ok(public_key) = PublicKey::from_slice(pubkey.as_bytes()) else {
            return false;
        };
        let Ok(signature) = Signature::from_compact(sig.as_bytes()) else {
            return false;
        };
        let message = Message::from_digest(digest.0);
        self.secp
            .verify_ecdsa(&message, &signature, &public_key)
            .is_ok()
    }

    fn public_key(&self, privkey: &PrivKey) -> Result<PubKeyBuf> {
        let secret_key = SecretKey::from_slice(&privkey.0)
            .map_err(|e| Error::InvalidKey(format!("invalid private key: {}", e)))?;
        Ok(PubKeyBuf::new(secret_key.public_key(&self.secp).serialize()))
    }
}

/// Key pair as supplied by an external key store
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub privkey: PrivKey,
    pub pubkey: PubKeyBuf,
}

impl KeyPair {
    pub fn from_privkey(scheme: &dyn SignatureScheme, privkey: PrivKey) -> Result<Self> {
        let pubkey = scheme.public_key(&privkey)?;
        Ok(Self { privkey, pubkey })
    }

    /// New random key pair
    pub fn generate(scheme: &dyn SignatureScheme) -> Result<Self> {
        Self::from_privkey(scheme, PrivKey::generate())
    }

    pub fn pubkey_hash(&self) -> Hash256 {
        pubkey_hash(self.pubkey.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::double_blake3_hash;

    fn privkey(byte: u8) -> PrivKey {
        PrivKey([byte; 32])
    }

    #[test]
    fn test_sign_is_deterministic() {
        let scheme = Secp256k1Scheme::new();
        let digest = double_blake3_hash(b"message");
        let sig1 = scheme.sign(&digest, &privkey(1)).unwrap();
        let sig2 = scheme.sign(&digest, &privkey(1)).unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_verify() {
        let scheme = Secp256k1Scheme::new();
        let digest = double_blake3_hash(b"message");
        let sig = scheme.sign(&digest, &privkey(1)).unwrap();
        let pubkey = scheme.public_key(&privkey(1)).unwrap();
        let other = scheme.public_key(&privkey(2)).unwrap();

        assert!(scheme.verify(&digest, &sig, &pubkey));
        assert!(!scheme.verify(&digest, &sig, &other));
        assert!(!scheme.verify(&double_blake3_hash(b"other"), &sig, &pubkey));
        assert!(!scheme.verify(&digest, &sig, &PubKeyBuf::zero()));
    }

    #[test]
    fn test_invalid_private_key() {
        let scheme = Secp256k1Scheme::new();
        assert!(matches!(
            scheme.public_key(&PrivKey([0; 32])),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_keypair() {
        let scheme = Secp256k1Scheme::new();
        let kp = KeyPair::from_privkey(&scheme, privkey(3)).unwrap();
        assert_eq!(kp.pubkey.as_bytes().len(), 33);
        assert_eq!(kp.pubkey_hash(), pubkey_hash(kp.pubkey.as_bytes()));
        assert_eq!(format!("{:?}", kp.privkey), "PrivKey(..)");
    }

    #[test]
    fn test_generate() {
        let scheme = Secp256k1Scheme::new();
        let a = KeyPair::generate(&scheme).unwrap();
        let b = KeyPair::generate(&scheme).unwrap();
        assert_ne!(a.privkey, b.privkey);
        assert_ne!(a.pubkey_hash(), b.pubkey_hash());
    }
}
