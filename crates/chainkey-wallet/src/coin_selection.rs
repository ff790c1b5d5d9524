//! Greedy coin selection over a caller-supplied UTXO snapshot.
//!
//! UTXOs are consumed in the order the snapshot presents them until their sum
//! covers the target plus a fee estimated for the inputs chosen so far and two
//! outputs (payment and change). Change at or below the dust threshold is
//! handled by an explicit [`DustPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use chainkey_core::constants::{
    DEFAULT_DUST_THRESHOLD, P2PKH_INPUT_SIZE, P2PKH_OUTPUT_SIZE, TX_OVERHEAD_SIZE,
};
use chainkey_core::error::TransactionError;
use chainkey_core::types::{OutPoint, Utxo};

use crate::error::WalletError;

/// Outputs assumed while estimating the fee: payment plus change.
pub const ESTIMATE_OUTPUTS: usize = 2;

/// Estimated serialized size of a legacy P2PKH transaction.
pub fn estimate_size(inputs: usize, outputs: usize) -> u64 {
    TX_OVERHEAD_SIZE + P2PKH_INPUT_SIZE * inputs as u64 + P2PKH_OUTPUT_SIZE * outputs as u64
}

/// How the network fee is computed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeePolicy {
    /// `rate` minor units per estimated byte.
    PerByte { rate: u64 },
    /// A flat fee regardless of size.
    Fixed { amount: u64 },
}

impl FeePolicy {
    /// Fee for a transaction with the given input and output counts.
    pub fn fee_for(&self, inputs: usize, outputs: usize) -> Result<u64, WalletError> {
        match *self {
            FeePolicy::PerByte { rate } => estimate_size(inputs, outputs)
                .checked_mul(rate)
                .ok_or_else(|| WalletError::InvalidAmount("fee overflow".into())),
            FeePolicy::Fixed { amount } => Ok(amount),
        }
    }
}

/// What to do with change at or below the dust threshold.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DustPolicy {
    /// Add the change to the fee and omit the change output.
    #[default]
    FoldIntoFee,
    /// Keep a change output whenever change is non-zero.
    KeepChange,
}

/// Dust threshold together with the policy that applies below it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DustRule {
    pub threshold: u64,
    pub policy: DustPolicy,
}

impl DustRule {
    pub fn new(threshold: u64, policy: DustPolicy) -> Self {
        Self { threshold, policy }
    }

    /// Split the surplus `total_in - target - fee` into (final fee, change).
    pub fn settle(&self, fee: u64, surplus: u64) -> (u64, u64) {
        if surplus > self.threshold {
            return (fee, surplus);
        }
        match self.policy {
            DustPolicy::FoldIntoFee => (fee + surplus, 0),
            DustPolicy::KeepChange => (fee, surplus),
        }
    }
}

impl Default for DustRule {
    fn default() -> Self {
        Self::new(DEFAULT_DUST_THRESHOLD, DustPolicy::default())
    }
}

/// Validated, immutable set of spendable outputs.
///
/// Order is preserved; the selector consumes entries in this order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<Utxo>", into = "Vec<Utxo>")]
pub struct UtxoSnapshot {
    utxos: Vec<Utxo>,
    total: u64,
}

impl UtxoSnapshot {
    /// Validate `utxos`: outpoints must be unique, values non-zero and the
    /// sum must fit in a `u64`.
    pub fn new(utxos: Vec<Utxo>) -> Result<Self, WalletError> {
        let mut seen = HashSet::with_capacity(utxos.len());
        let mut total: u64 = 0;
        for utxo in &utxos {
            let malformed = |reason: &str| WalletError::MalformedUtxo {
                outpoint: utxo.outpoint,
                reason: reason.into(),
            };
            if !seen.insert(utxo.outpoint) {
                return Err(malformed("duplicate outpoint"));
            }
            if utxo.value == 0 {
                return Err(malformed("zero value"));
            }
            if utxo.script_pubkey.is_empty() {
                return Err(malformed("empty locking script"));
            }
            total = total
                .checked_add(utxo.value)
                .ok_or_else(|| malformed("snapshot total overflows u64"))?;
        }
        Ok(Self { utxos, total })
    }

    /// A snapshot without the outpoints in `spent`.
    pub fn without(&self, spent: &[OutPoint]) -> Self {
        let spent: HashSet<&OutPoint> = spent.iter().collect();
        let utxos: Vec<Utxo> = self
            .utxos
            .iter()
            .filter(|u| !spent.contains(&u.outpoint))
            .cloned()
            .collect();
        let total = utxos.iter().map(|u| u.value).sum();
        Self { utxos, total }
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        self.utxos.iter().find(|u| u.outpoint == *outpoint)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Utxo> {
        self.utxos.iter()
    }

    pub fn as_slice(&self) -> &[Utxo] {
        &self.utxos
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Sum of all values.
    pub fn total_value(&self) -> u64 {
        self.total
    }
}

impl TryFrom<Vec<Utxo>> for UtxoSnapshot {
    type Error = WalletError;

    fn try_from(utxos: Vec<Utxo>) -> Result<Self, Self::Error> {
        Self::new(utxos)
    }
}

impl From<UtxoSnapshot> for Vec<Utxo> {
    fn from(snapshot: UtxoSnapshot) -> Self {
        snapshot.utxos
    }
}

impl<'a> IntoIterator for &'a UtxoSnapshot {
    type Item = &'a Utxo;
    type IntoIter = std::slice::Iter<'a, Utxo>;

    fn into_iter(self) -> Self::IntoIter {
        self.utxos.iter()
    }
}

/// Result of coin selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected UTXOs, in snapshot order.
    pub selected: Vec<Utxo>,
    /// Sum of selected values.
    pub total_in: u64,
    /// Fee paid, including any folded dust.
    pub fee: u64,
    /// Change returned to the wallet (0 means no change output).
    pub change: u64,
}

impl CoinSelection {
    /// Outpoints of the selected UTXOs.
    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.selected.iter().map(|u| u.outpoint).collect()
    }
}

/// Greedy first-fit coin selector.
pub struct CoinSelector;

impl CoinSelector {
    /// Select UTXOs from `snapshot` to pay `target` plus fee.
    ///
    /// # Errors
    /// - `NoUtxos` if the snapshot is empty
    /// - `InvalidAmount` if `target` is zero
    /// - `InsufficientFunds` if the whole snapshot cannot cover target + fee
    pub fn select(
        snapshot: &UtxoSnapshot,
        target: u64,
        fee_policy: FeePolicy,
        dust: DustRule,
    ) -> Result<CoinSelection, WalletError> {
        if snapshot.is_empty() {
            return Err(WalletError::NoUtxos);
        }
        if target == 0 {
            return Err(WalletError::InvalidAmount("target is zero".into()));
        }

        let mut selected = Vec::new();
        let mut total_in: u64 = 0;
        let mut need = target;

        for utxo in snapshot {
            selected.push(utxo.clone());
            total_in = total_in
                .checked_add(utxo.value)
                .ok_or(TransactionError::ValueOverflow)?;

            let fee = fee_policy.fee_for(selected.len(), ESTIMATE_OUTPUTS)?;
            need = target
                .checked_add(fee)
                .ok_or_else(|| WalletError::InvalidAmount("target plus fee overflows".into()))?;

            if total_in >= need {
                let (fee, change) = dust.settle(fee, total_in - need);
                debug!(
                    inputs = selected.len(),
                    total_in, target, fee, change, "coin selection: target covered"
                );
                return Ok(CoinSelection {
                    selected,
                    total_in,
                    fee,
                    change,
                });
            }
        }

        Err(WalletError::InsufficientFunds {
            have: total_in,
            need,
        })
    }
}
