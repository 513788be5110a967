// Key management

use crate::core::{Hash256, KeyPair, PrivKey, SignatureScheme};
use crate::error::Result;
use std::collections::HashMap;

/// Key pairs indexed by public key hash
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: HashMap<Hash256, KeyPair>,
    default_pkh: Option<Hash256>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key pair, returning its public key hash
    pub fn add(&mut self, keypair: KeyPair) -> Hash256 {
        let pkh = keypair.pubkey_hash();
        // First key becomes the default
        if self.default_pkh.is_none() {
            self.default_pkh = Some(pkh);
        }
        self.keys.insert(pkh, keypair);
        pkh
    }

    pub fn add_privkey(&mut self, scheme: &dyn SignatureScheme, privkey: PrivKey) -> Result<Hash256> {
        Ok(self.add(KeyPair::from_privkey(scheme, privkey)?))
    }

    /// Generate and store a fresh key
    pub fn generate(&mut self, scheme: &dyn SignatureScheme) -> Result<Hash256> {
        Ok(self.add(KeyPair::generate(scheme)?))
    }

    pub fn get(&self, pkh: &Hash256) -> Option<&KeyPair> {
        self.keys.get(pkh)
    }

    pub fn default_pkh(&self) -> Option<&Hash256> {
        self.default_pkh.as_ref()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
