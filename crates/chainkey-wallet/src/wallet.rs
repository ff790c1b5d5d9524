//! Wallet composition: seed custody, address derivation, transfer creation.
//!
//! The [`Wallet`] struct ties together the BIP-39 seed, the BIP-32 master
//! key and a [`WalletConfig`]. It holds no chain state: callers pass a
//! [`UtxoSnapshot`] to every transfer and get the raw transaction back.

use std::fmt;
use tracing::{debug, info};

use chainkey_core::address::Address;
use chainkey_core::chain::{Chain, Network};
use chainkey_core::crypto::KeyPair;
use chainkey_core::types::{Hash256, OutPoint};

use crate::builder::TransactionBuilder;
use crate::coin_selection::{CoinSelector, DustRule, FeePolicy, UtxoSnapshot};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::{
    derive_address, DerivationPath, DerivedAddress, ExtendedKey, KeyChain, Seed, EXTERNAL_BRANCH,
    INTERNAL_BRANCH,
};
use crate::mnemonic::Mnemonic;
use crate::signer::sign_transaction;

/// A signed transfer ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Serialized transaction.
    pub raw: Vec<u8>,
    pub txid: Hash256,
    pub fee: u64,
    pub change: u64,
    /// Outpoints consumed; exclude them from the next snapshot.
    pub spent: Vec<OutPoint>,
}

impl Transfer {
    /// Raw transaction as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

/// Select coins from `snapshot`, build a payment of `amount` to
/// `destination` and sign every input with `keypair`.
///
/// Fails without producing a transaction if any step fails.
pub fn build_and_sign_transfer(
    snapshot: &UtxoSnapshot,
    keypair: &KeyPair,
    destination: &Address,
    amount: u64,
    fee_policy: FeePolicy,
    change_address: &Address,
    dust: DustRule,
) -> Result<Transfer, WalletError> {
    if destination.chain() != change_address.chain()
        || destination.network() != change_address.network()
    {
        return Err(WalletError::BuildError(format!(
            "destination is {} {} but change address is {} {}",
            destination.chain(),
            destination.network(),
            change_address.chain(),
            change_address.network()
        )));
    }

    let selection = CoinSelector::select(snapshot, amount, fee_policy, dust)?;
    debug!(
        inputs = selection.selected.len(),
        fee = selection.fee,
        "transfer: coins selected"
    );
    let unsigned = TransactionBuilder::new().set_dust_rule(dust).build(
        &selection.selected,
        destination,
        amount,
        change_address,
        fee_policy,
    )?;
    let signed = sign_transaction(unsigned, keypair)?;

    info!(
        txid = %signed.txid,
        to = %destination,
        amount,
        fee = signed.fee,
        change = signed.change,
        inputs = signed.spent.len(),
        "transfer: signed"
    );

    Ok(Transfer {
        raw: signed.raw(),
        txid: signed.txid,
        fee: signed.fee,
        change: signed.change,
        spent: signed.spent,
    })
}

/// HD wallet over a single seed.
///
/// Derives BIP-44 addresses for the configured chain and builds signed
/// transfers from caller-supplied UTXO snapshots.
pub struct Wallet {
    seed: Seed,
    master: ExtendedKey,
    config: WalletConfig,
}

impl Wallet {
    /// Create a wallet from a fresh mnemonic of `entropy_bits` bits.
    ///
    /// The mnemonic is returned once and not kept by the wallet.
    pub fn create(
        entropy_bits: usize,
        passphrase: &str,
        config: WalletConfig,
    ) -> Result<(Self, Mnemonic), WalletError> {
        let mnemonic = Mnemonic::generate(entropy_bits)?;
        let wallet = Self::from_mnemonic(&mnemonic, passphrase, config)?;
        Ok((wallet, mnemonic))
    }

    /// Restore a wallet from its mnemonic and passphrase.
    pub fn from_mnemonic(
        mnemonic: &Mnemonic,
        passphrase: &str,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        Self::from_seed(mnemonic.to_seed(passphrase), config)
    }

    /// Create a wallet from an existing seed (deterministic recovery).
    pub fn from_seed(seed: Seed, config: WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let master = ExtendedKey::master(seed.as_bytes())?;
        debug!(chain = %config.chain, network = %config.network, "wallet: opened");
        Ok(Self {
            seed,
            master,
            config,
        })
    }

    /// The BIP-32 master node.
    pub fn master_key(&self) -> &ExtendedKey {
        &self.master
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    /// Key and address at `m/44'/coin'/account'/0/index`.
    pub fn derive_default_address(
        &self,
        account: u32,
        index: u32,
    ) -> Result<DerivedAddress, WalletError> {
        self.derive_branch(account, EXTERNAL_BRANCH, index)
    }

    /// Key and address at `m/44'/coin'/account'/1/index`.
    pub fn derive_change_address(
        &self,
        account: u32,
        index: u32,
    ) -> Result<DerivedAddress, WalletError> {
        self.derive_branch(account, INTERNAL_BRANCH, index)
    }

    /// Key and address at an arbitrary path.
    pub fn derive_at(&self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
        derive_address(&self.master, path, self.chain(), self.network())
    }

    /// Sequential keychain for BIP-44 `account`.
    pub fn keychain(&self, account: u32) -> Result<KeyChain, WalletError> {
        KeyChain::new(&self.master, account, self.chain(), self.network())
    }

    /// [`build_and_sign_transfer`] with this wallet's fee and dust settings.
    pub fn build_and_sign_transfer(
        &self,
        snapshot: &UtxoSnapshot,
        keypair: &KeyPair,
        destination: &Address,
        amount: u64,
        change_address: &Address,
    ) -> Result<Transfer, WalletError> {
        build_and_sign_transfer(
            snapshot,
            keypair,
            destination,
            amount,
            self.config.fee_policy,
            change_address,
            self.config.dust_rule(),
        )
    }

    fn derive_branch(
        &self,
        account: u32,
        branch: u32,
        index: u32,
    ) -> Result<DerivedAddress, WalletError> {
        let coin_type = self.chain().params(self.network()).coin_type;
        let path = DerivationPath::bip44(coin_type, account, branch, index)?;
        self.derive_at(&path)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("config", &self.config)
            .field("fingerprint", &hex::encode(self.master.fingerprint()))
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainkey_core::types::Utxo;

    use crate::coin_selection::DustPolicy;
    use crate::signer::verify_input;
    use chainkey_core::types::Transaction;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn abandon_wallet(config: WalletConfig) -> Wallet {
        Wallet::from_mnemonic(&Mnemonic::parse(ABANDON).unwrap(), "", config).unwrap()
    }

    fn funded(owner: &DerivedAddress, values: &[u64]) -> UtxoSnapshot {
        let script = owner.address.locking_script().unwrap();
        UtxoSnapshot::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    Utxo::new(OutPoint::new(Hash256([i as u8 + 1; 32]), i as u32), *v, script.clone())
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn create_returns_matching_mnemonic() {
        let (wallet, mnemonic) = Wallet::create(128, "pw", WalletConfig::default()).unwrap();
        assert_eq!(mnemonic.word_count(), 12);
        let restored = Wallet::from_mnemonic(&mnemonic, "pw", WalletConfig::default()).unwrap();
        assert_eq!(
            restored.master_key().fingerprint(),
            wallet.master_key().fingerprint()
        );
    }

    #[test]
    fn create_rejects_bad_entropy() {
        assert!(matches!(
            Wallet::create(100, "", WalletConfig::default()),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = WalletConfig {
            fee_policy: FeePolicy::PerByte { rate: 0 },
            ..WalletConfig::default()
        };
        assert!(matches!(
            Wallet::from_seed(Seed::from([1u8; 64]), config),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn default_address_is_bip44_vector() {
        let wallet = abandon_wallet(WalletConfig::default());
        let derived = wallet.derive_default_address(0, 0).unwrap();
        assert_eq!(derived.path.to_string(), "m/44'/0'/0'/0/0");
        assert_eq!(
            hex::encode(derived.keypair.secret_bytes()),
            "e284129cc0922579a535bbf4d1a3b25773090d28c909bc0fed73b5e0222cc372"
        );
        assert_eq!(derived.address.to_string(), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
    }

    #[test]
    fn change_address_uses_internal_branch() {
        let wallet = abandon_wallet(WalletConfig::default());
        let change = wallet.derive_change_address(0, 0).unwrap();
        assert_eq!(change.path.to_string(), "m/44'/0'/0'/1/0");
        assert_eq!(change.address.to_string(), "1J3J6EvPrv8q6AC3VCjWV45Uf3nssNMRtH");
    }

    #[test]
    fn keychain_matches_direct_derivation() {
        let wallet = abandon_wallet(WalletConfig::default());
        let mut keychain = wallet.keychain(0).unwrap();
        let first = keychain.next_keypair().unwrap().clone();
        assert_eq!(first, wallet.derive_default_address(0, 0).unwrap());
    }

    #[test]
    fn transfer_pins_raw_transaction() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let to = wallet.derive_default_address(0, 1).unwrap().address;
        let change = wallet.derive_change_address(0, 0).unwrap().address;
        let snapshot = UtxoSnapshot::new(vec![Utxo::from_hex_parts(
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            0,
            100_000,
            "76a914d986ed01b7a22225a70edbf2ba7cfb63a15cb3aa88ac",
        )
        .unwrap()])
        .unwrap();

        let transfer = wallet
            .build_and_sign_transfer(&snapshot, &owner.keypair, &to, 60_000, &change)
            .unwrap();

        assert_eq!(transfer.fee, 2_260);
        assert_eq!(transfer.change, 37_740);
        assert_eq!(
            transfer.to_hex(),
            "01000000013ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a000000006b483045022100a9dee43e552c04bc582540a3069e15107779241a8245a78a015e8f6b1f6b705d0220300d3654d895b91fbe3424e4007a0e5de71d56ff37def1c0c0a9c7c27f11cf90012103aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5effffffff0260ea0000000000001976a9146ae1301cf44ca525751d1763ac4fef12d115398688ac6c930000000000001976a914bae93c8e7fb682422d24780b1a12a550eff428f288ac00000000"
        );
        assert_eq!(
            transfer.txid.to_string(),
            "2f4cb93aa37536ccd704fa8228b7d28b256dec73d299a38ea9362083939cfb48"
        );
        assert_eq!(transfer.spent, vec![snapshot.as_slice()[0].outpoint]);
    }

    #[test]
    fn transfer_verifies_and_balances() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let to = wallet.derive_default_address(0, 5).unwrap().address;
        let snapshot = funded(&owner, &[3_000, 4_000, 50_000]);

        let transfer = wallet
            .build_and_sign_transfer(&snapshot, &owner.keypair, &to, 6_000, &owner.address)
            .unwrap();
        let tx = Transaction::parse(&transfer.raw).unwrap();

        let spent_value: u64 = transfer
            .spent
            .iter()
            .map(|op| snapshot.get(op).unwrap().value)
            .sum();
        assert_eq!(spent_value, tx.total_output_value().unwrap() + transfer.fee);
        for (i, op) in transfer.spent.iter().enumerate() {
            verify_input(&tx, i, &snapshot.get(op).unwrap().script_pubkey).unwrap();
        }
    }

    #[test]
    fn spent_outpoints_leave_the_next_snapshot() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let to = wallet.derive_default_address(0, 1).unwrap().address;
        let snapshot = funded(&owner, &[30_000, 30_000]);

        let first = wallet
            .build_and_sign_transfer(&snapshot, &owner.keypair, &to, 20_000, &owner.address)
            .unwrap();
        let rest = snapshot.without(&first.spent);
        let second = wallet
            .build_and_sign_transfer(&rest, &owner.keypair, &to, 20_000, &owner.address)
            .unwrap();
        assert!(first.spent.iter().all(|op| !second.spent.contains(op)));
    }

    #[test]
    fn insufficient_funds_produces_nothing() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let snapshot = funded(&owner, &[1_000]);
        let err = wallet
            .build_and_sign_transfer(&snapshot, &owner.keypair, &owner.address, 900, &owner.address)
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { have: 1_000, .. }));
    }

    #[test]
    fn wrong_key_produces_nothing() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let stranger = wallet.derive_default_address(0, 1).unwrap();
        let snapshot = funded(&owner, &[100_000]);
        let err = wallet
            .build_and_sign_transfer(&snapshot, &stranger.keypair, &owner.address, 1_000, &owner.address)
            .unwrap_err();
        assert_eq!(err, WalletError::SigningKeyMismatch { index: 0 });
    }

    #[test]
    fn mixed_chain_addresses_rejected() {
        let wallet = abandon_wallet(WalletConfig::default());
        let owner = wallet.derive_default_address(0, 0).unwrap();
        let ltc = abandon_wallet(WalletConfig::for_chain(Chain::Litecoin, Network::Mainnet))
            .derive_default_address(0, 0)
            .unwrap()
            .address;
        let err = build_and_sign_transfer(
            &funded(&owner, &[100_000]),
            &owner.keypair,
            &ltc,
            1_000,
            FeePolicy::Fixed { amount: 100 },
            &owner.address,
            DustRule::new(0, DustPolicy::KeepChange),
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::BuildError(_)));
    }

    #[test]
    fn debug_redacts_seed() {
        let wallet = abandon_wallet(WalletConfig::default());
        let debug = format!("{wallet:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("5eb00bbd"));
    }
}
