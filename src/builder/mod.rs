// Transaction and block construction

mod block_builder;
mod keystore;
mod tx_builder;

pub use block_builder::BlockBuilder;
pub use keystore::KeyStore;
pub use tx_builder::{TxBuilder, TxSigner};
