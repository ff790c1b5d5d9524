//! Wallet configuration.
//!
//! Provides [`WalletConfig`] with per-chain defaults for network, fee policy
//! and dust handling. Values can be set programmatically, deserialized, or
//! overridden from `CHAINKEY_*` environment variables.

use serde::{Deserialize, Serialize};

use chainkey_core::chain::{Chain, Network};
use chainkey_core::constants::{DEFAULT_DUST_THRESHOLD, DEFAULT_FEE_RATE};

use crate::coin_selection::{DustPolicy, DustRule, FeePolicy};
use crate::error::WalletError;

/// Highest accepted per-byte fee rate; anything above is a typo.
pub const MAX_FEE_RATE: u64 = 100_000;

pub const ENV_CHAIN: &str = "CHAINKEY_CHAIN";
pub const ENV_NETWORK: &str = "CHAINKEY_NETWORK";
pub const ENV_FEE_RATE: &str = "CHAINKEY_FEE_RATE";
pub const ENV_FIXED_FEE: &str = "CHAINKEY_FIXED_FEE";
pub const ENV_DUST_THRESHOLD: &str = "CHAINKEY_DUST_THRESHOLD";
pub const ENV_DUST_POLICY: &str = "CHAINKEY_DUST_POLICY";

/// Configuration for a wallet instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WalletConfig {
    /// Chain whose addresses and coin type the wallet uses.
    pub chain: Chain,
    /// Mainnet or testnet parameters.
    pub network: Network,
    /// Fee applied when building transfers.
    pub fee_policy: FeePolicy,
    /// Change at or below this value is dust.
    pub dust_threshold: u64,
    /// What happens to dust change.
    pub dust_policy: DustPolicy,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::for_chain(Chain::default(), Network::default())
    }
}

impl WalletConfig {
    /// Defaults for `chain` on `network`: a per-byte rate on UTXO chains,
    /// the chain's flat fee elsewhere.
    pub fn for_chain(chain: Chain, network: Network) -> Self {
        let params = chain.params(network);
        let fee_policy = if params.utxo_based {
            FeePolicy::PerByte {
                rate: DEFAULT_FEE_RATE,
            }
        } else {
            FeePolicy::Fixed {
                amount: params.default_fixed_fee,
            }
        };
        Self {
            chain,
            network,
            fee_policy,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            dust_policy: DustPolicy::default(),
        }
    }

    /// Defaults overridden by `CHAINKEY_*` environment variables.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WalletError> {
        let chain = match lookup(ENV_CHAIN) {
            Some(v) => v.trim().parse().map_err(|e| config_err(ENV_CHAIN, e))?,
            None => Chain::default(),
        };
        let network = match lookup(ENV_NETWORK) {
            Some(v) => v.trim().parse().map_err(|e| config_err(ENV_NETWORK, e))?,
            None => Network::default(),
        };
        let mut config = Self::for_chain(chain, network);

        match (lookup(ENV_FEE_RATE), lookup(ENV_FIXED_FEE)) {
            (Some(_), Some(_)) => {
                return Err(WalletError::Config(format!(
                    "{ENV_FEE_RATE} and {ENV_FIXED_FEE} are mutually exclusive"
                )))
            }
            (Some(rate), None) => {
                config.fee_policy = FeePolicy::PerByte {
                    rate: parse_u64(ENV_FEE_RATE, &rate)?,
                }
            }
            (None, Some(amount)) => {
                config.fee_policy = FeePolicy::Fixed {
                    amount: parse_u64(ENV_FIXED_FEE, &amount)?,
                }
            }
            (None, None) => {}
        }

        if let Some(v) = lookup(ENV_DUST_THRESHOLD) {
            config.dust_threshold = parse_u64(ENV_DUST_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_DUST_POLICY) {
            config.dust_policy = match v.trim().to_ascii_lowercase().as_str() {
                "fold" | "fold_into_fee" => DustPolicy::FoldIntoFee,
                "keep" | "keep_change" => DustPolicy::KeepChange,
                other => {
                    return Err(WalletError::Config(format!(
                        "{ENV_DUST_POLICY}: unknown policy {other:?}"
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), WalletError> {
        if let FeePolicy::PerByte { rate } = self.fee_policy {
            if rate == 0 {
                return Err(WalletError::Config("fee rate must be positive".into()));
            }
            if rate > MAX_FEE_RATE {
                return Err(WalletError::Config(format!(
                    "fee rate {rate} exceeds maximum {MAX_FEE_RATE}"
                )));
            }
        }
        Ok(())
    }

    /// The dust threshold and policy as one rule.
    pub fn dust_rule(&self) -> DustRule {
        DustRule::new(self.dust_threshold, self.dust_policy)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, WalletError> {
    value
        .trim()
        .parse()
        .map_err(|e| config_err(key, format!("{value:?}: {e}")))
}

fn config_err(key: &str, e: impl std::fmt::Display) -> WalletError {
    WalletError::Config(format!("{key}: {e}"))
}
