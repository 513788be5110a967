// Spendable output lookup

use crate::core::{Hash256, Tx, TxOut};
use std::collections::HashMap;

/// Source of previously created outputs, keyed by `(tx id, output index)`
pub trait OutputLookup {
    fn get_output(&self, tx_id: &Hash256, n_out: u32) -> Option<&TxOut>;
}

/// In-memory output set
#[derive(Debug, Clone, Default)]
pub struct TxOutMap {
    map: HashMap<(Hash256, u32), TxOut>,
}

impl TxOutMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx_id: Hash256, n_out: u32, output: TxOut) {
        self.map.insert((tx_id, n_out), output);
    }

    /// Add every output of `tx` under its id
    pub fn add_tx_outputs(&mut self, tx: &Tx) {
        let tx_id = tx.id();
        for (n_out, output) in tx.outputs.iter().enumerate() {
            self.add(tx_id, n_out as u32, output.clone());
        }
    }

    pub fn remove(&mut self, tx_id: &Hash256, n_out: u32) -> Option<TxOut> {
        self.map.remove(&(*tx_id, n_out))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Hash256, u32), &TxOut)> {
        self.map.iter()
    }
}

impl OutputLookup for TxOutMap {
    fn get_output(&self, tx_id: &Hash256, n_out: u32) -> Option<&TxOut> {
        self.map.get(&(*tx_id, n_out))
    }
}

impl OutputLookup for HashMap<(Hash256, u32), TxOut> {
    fn get_output(&self, tx_id: &Hash256, n_out: u32) -> Option<&TxOut> {
        self.get(&(*tx_id, n_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Script, TxIn};

    #[test]
    fn test_add_tx_outputs() {
        let tx = Tx::new(
            0,
            vec![TxIn::new(Hash256::new([1; 32]), 0, Script::empty(), 0)],
            vec![TxOut::new(10, Script::empty()), TxOut::new(20, Script::empty())],
            0,
        );
        let mut map = TxOutMap::new();
        map.add_tx_outputs(&tx);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_output(&tx.id(), 1).map(|o| o.value), Some(20));
        assert!(map.get_output(&tx.id(), 2).is_none());

        assert_eq!(map.remove(&tx.id(), 0).map(|o| o.value), Some(10));
        assert!(map.get_output(&tx.id(), 0).is_none());
    }
}
