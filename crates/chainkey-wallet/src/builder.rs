//! Unsigned transaction construction.
//!
//! Given the UTXOs chosen by the coin selector, the builder produces a legacy
//! transaction with one payment output and, when the dust rule allows it, one
//! change output:
//! 1. Validate the amount, inputs and addresses
//! 2. Compute the fee for the input count and two outputs
//! 3. Settle change against the dust rule
//! 4. Emit inputs in selection order with empty scriptSigs

use tracing::debug;

use chainkey_core::address::Address;
use chainkey_core::constants::TX_VERSION;
use chainkey_core::error::TransactionError;
use chainkey_core::types::{OutPoint, Transaction, TxIn, TxOut, Utxo};

use crate::coin_selection::{DustRule, FeePolicy, UtxoSnapshot, ESTIMATE_OUTPUTS};
use crate::error::WalletError;

/// Default transaction version.
pub const DEFAULT_TX_VERSION: i32 = TX_VERSION;

/// Default lock time (no lock).
pub const DEFAULT_LOCK_TIME: u32 = 0;

/// A transaction whose inputs still carry empty scriptSigs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// The transaction with empty signatures.
    pub tx: Transaction,
    /// The UTXO each input spends, index-aligned with `tx.inputs`.
    pub prevouts: Vec<Utxo>,
    /// Fee paid, including folded dust.
    pub fee: u64,
    /// Change output value (0 if there is no change output).
    pub change: u64,
}

impl UnsignedTransaction {
    /// Outpoints consumed by this transaction.
    pub fn spent(&self) -> Vec<OutPoint> {
        self.prevouts.iter().map(|u| u.outpoint).collect()
    }

    /// Sum of the spent UTXO values.
    pub fn total_in(&self) -> u64 {
        self.prevouts.iter().map(|u| u.value).sum()
    }
}

/// Builder for unsigned legacy transactions.
///
/// # Example
/// ```ignore
/// let selection = CoinSelector::select(&snapshot, amount, fee, dust)?;
/// let unsigned = TransactionBuilder::new()
///     .set_dust_rule(dust)
///     .build(&selection.selected, &to, amount, &change, fee)?;
/// ```
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    dust: DustRule,
    version: i32,
    lock_time: u32,
}

impl TransactionBuilder {
    /// Builder with the default dust rule, version and lock time.
    pub fn new() -> Self {
        Self {
            dust: DustRule::default(),
            version: DEFAULT_TX_VERSION,
            lock_time: DEFAULT_LOCK_TIME,
        }
    }

    /// Override the dust threshold and policy.
    pub fn set_dust_rule(&mut self, dust: DustRule) -> &mut Self {
        self.dust = dust;
        self
    }

    /// Override the transaction version (default: [`DEFAULT_TX_VERSION`]).
    pub fn set_version(&mut self, version: i32) -> &mut Self {
        self.version = version;
        self
    }

    /// Set the transaction lock time (default: [`DEFAULT_LOCK_TIME`]).
    pub fn set_lock_time(&mut self, lock_time: u32) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    /// Build an unsigned transaction paying `amount` to `destination`.
    ///
    /// The fee is recomputed from `fee_policy` for `selected.len()` inputs
    /// and two outputs, the same estimate [`CoinSelector`] uses, even when the
    /// change output is later dropped as dust. Pass [`FeePolicy::Fixed`] to
    /// charge an exact amount.
    ///
    /// # Arguments
    /// - `selected` — UTXOs to spend, in the order the inputs should appear
    /// - `destination` — payment address
    /// - `amount` — payment value in minor units
    /// - `change_address` — receives change above the dust threshold
    /// - `fee_policy` — per-byte rate or fixed fee
    ///
    /// [`CoinSelector`]: crate::coin_selection::CoinSelector
    pub fn build(
        &self,
        selected: &[Utxo],
        destination: &Address,
        amount: u64,
        change_address: &Address,
        fee_policy: FeePolicy,
    ) -> Result<UnsignedTransaction, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount("payment amount is zero".into()));
        }
        if selected.is_empty() {
            return Err(WalletError::BuildError("no inputs".into()));
        }
        let payment_script = utxo_locking_script(destination)?;
        let change_script = utxo_locking_script(change_address)?;

        // Reject duplicate or zero-value inputs the same way a snapshot does.
        let inputs = UtxoSnapshot::new(selected.to_vec())?;
        let total_in = inputs.total_value();

        let fee = fee_policy.fee_for(inputs.len(), ESTIMATE_OUTPUTS)?;
        let need = amount
            .checked_add(fee)
            .ok_or(TransactionError::ValueOverflow)?;
        if total_in < need {
            return Err(WalletError::InsufficientFunds {
                have: total_in,
                need,
            });
        }
        let (fee, change) = self.dust.settle(fee, total_in - need);

        let mut outputs = Vec::with_capacity(2);
        outputs.push(TxOut {
            value: amount,
            script_pubkey: payment_script,
        });
        if change > 0 {
            outputs.push(TxOut {
                value: change,
                script_pubkey: change_script,
            });
        }

        let tx = Transaction {
            version: self.version,
            inputs: inputs
                .iter()
                .map(|u| TxIn::unsigned(u.outpoint))
                .collect(),
            outputs,
            lock_time: self.lock_time,
        };

        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            total_in, amount, fee, change, "builder: unsigned transaction ready"
        );

        Ok(UnsignedTransaction {
            tx,
            prevouts: inputs.into(),
            fee,
            change,
        })
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn utxo_locking_script(address: &Address) -> Result<Vec<u8>, WalletError> {
    if !address.chain().is_utxo_based() {
        return Err(WalletError::UnsupportedChain(format!(
            "{} address {address} cannot receive a UTXO output",
            address.chain()
        )));
    }
    Ok(address.locking_script()?)
}
