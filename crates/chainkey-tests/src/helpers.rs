//! Shared test helpers for E2E and property tests.

use chainkey_core::address::Address;
use chainkey_core::chain::{Chain, Network};
use chainkey_core::crypto::KeyPair;
use chainkey_core::types::{Hash256, OutPoint, Utxo};
use chainkey_wallet::coin_selection::UtxoSnapshot;
use chainkey_wallet::config::WalletConfig;
use chainkey_wallet::mnemonic::Mnemonic;
use chainkey_wallet::wallet::Wallet;

/// The all-zero-entropy BIP-39 phrase used by most published vectors.
pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Wallet restored from [`ABANDON`] with an empty passphrase.
pub fn abandon_wallet(chain: Chain, network: Network) -> Wallet {
    let mnemonic = Mnemonic::parse(ABANDON).expect("valid phrase");
    Wallet::from_mnemonic(&mnemonic, "", WalletConfig::for_chain(chain, network))
        .expect("default config is valid")
}

/// Key pair whose secret is `[seed; 32]`.
pub fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes(&[seed.max(1); 32]).expect("small scalars are valid")
}

/// Bitcoin mainnet address of [`keypair`]`(seed)`.
pub fn btc_address(seed: u8) -> Address {
    Address::from_public_key(&keypair(seed).public_key(), Chain::Bitcoin, Network::Mainnet)
}

/// A UTXO locked to `owner`, with a txid derived from `n`.
pub fn utxo_for(owner: &Address, n: u32, value: u64) -> Utxo {
    let mut txid = [0u8; 32];
    txid[..4].copy_from_slice(&n.to_le_bytes());
    txid[31] = 0xcc;
    Utxo::new(
        OutPoint::new(Hash256(txid), n),
        value,
        owner.locking_script().expect("utxo chain address"),
    )
}

/// Snapshot of UTXOs with `values`, all locked to `owner`.
pub fn snapshot_for(owner: &Address, values: &[u64]) -> UtxoSnapshot {
    UtxoSnapshot::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| utxo_for(owner, i as u32, *v))
            .collect(),
    )
    .expect("helper snapshots are well formed")
}
