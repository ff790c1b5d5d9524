//! Legacy `SIGHASH_ALL` signing and verification of P2PKH inputs.
//!
//! ```text
//! preimage = serialize(tx with every scriptSig empty except
//!                      input[index].scriptSig = prior locking script)
//!            || u32_le(SIGHASH_ALL)
//! sighash  = SHA256d(preimage)
//! scriptSig = push(DER(sig) || 0x01) push(compressed pubkey)
//! ```

use std::fmt;
use tracing::debug;

use chainkey_core::constants::SIGHASH_ALL;
use chainkey_core::crypto::{KeyPair, PublicKey};
use chainkey_core::error::{CryptoError, TransactionError};
use chainkey_core::hash::sha256d;
use chainkey_core::script::{p2pkh_hash, p2pkh_script_sig, parse_p2pkh_script_sig};
use chainkey_core::types::{Hash256, OutPoint, Transaction};

use crate::builder::UnsignedTransaction;
use crate::error::WalletError;
use crate::keys::KeyChain;

/// A fully signed transaction ready for broadcast.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub txid: Hash256,
    pub fee: u64,
    pub change: u64,
    /// Outpoints this transaction consumes.
    pub spent: Vec<OutPoint>,
}

impl SignedTransaction {
    /// Raw wire bytes.
    pub fn raw(&self) -> Vec<u8> {
        self.tx.serialize()
    }

    pub fn to_hex(&self) -> String {
        self.tx.to_hex()
    }
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("txid", &self.txid.to_string())
            .field("inputs", &self.tx.inputs.len())
            .field("outputs", &self.tx.outputs.len())
            .field("fee", &self.fee)
            .field("change", &self.change)
            .finish()
    }
}

/// Legacy signature hash of input `index` committing to `prior_script`.
pub fn sighash(
    tx: &Transaction,
    index: usize,
    prior_script: &[u8],
) -> Result<[u8; 32], TransactionError> {
    check_index(tx, index)?;
    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.script_sig = if i == index {
            prior_script.to_vec()
        } else {
            Vec::new()
        };
    }
    let mut preimage = copy.serialize();
    preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
    Ok(sha256d(&preimage))
}

/// Produce the scriptSig for input `index`, which spends an output locked by
/// `prior_script`.
///
/// # Errors
/// - `InputIndexOutOfBounds` if `index` is not an input of `tx`
/// - `UnsupportedScript` if `prior_script` is not P2PKH
/// - `SigningKeyMismatch` if `keypair` does not hash to the locked pubkey hash
pub fn sign_input(
    tx: &Transaction,
    index: usize,
    keypair: &KeyPair,
    prior_script: &[u8],
) -> Result<Vec<u8>, WalletError> {
    check_index(tx, index)?;
    let locked_hash =
        p2pkh_hash(prior_script).map_err(|_| WalletError::UnsupportedScript { index })?;
    let pubkey = keypair.public_key();
    if pubkey.hash160() != locked_hash {
        return Err(WalletError::SigningKeyMismatch { index });
    }

    let digest = sighash(tx, index, prior_script)?;
    let mut signature = keypair.sign_digest_der(&digest);
    signature.push(SIGHASH_ALL as u8);
    Ok(p2pkh_script_sig(&signature, &pubkey.serialize_compressed())?)
}

/// Sign every input of `unsigned` with `keypair`.
///
/// Either all inputs are signed or no transaction is returned.
pub fn sign_transaction(
    unsigned: UnsignedTransaction,
    keypair: &KeyPair,
) -> Result<SignedTransaction, WalletError> {
    sign_with(unsigned, |_, _| Some(keypair))
}

/// Sign every input with the keychain key that owns its prevout.
///
/// Inputs whose pubkey hash has not been derived by `keychain` fail with
/// `SigningKeyMismatch`.
pub fn sign_with_keychain(
    unsigned: UnsignedTransaction,
    keychain: &KeyChain,
) -> Result<SignedTransaction, WalletError> {
    sign_with(unsigned, |index, script| {
        let hash = p2pkh_hash(script).ok()?;
        debug!(index, "signer: looking up keychain key");
        keychain.keypair_for_payload(&hash).map(|d| &d.keypair)
    })
}

fn sign_with<'k>(
    unsigned: UnsignedTransaction,
    key_for: impl Fn(usize, &[u8]) -> Option<&'k KeyPair>,
) -> Result<SignedTransaction, WalletError> {
    let UnsignedTransaction {
        mut tx,
        prevouts,
        fee,
        change,
    } = unsigned;
    if prevouts.len() != tx.inputs.len() {
        return Err(WalletError::BuildError(format!(
            "{} prevouts for {} inputs",
            prevouts.len(),
            tx.inputs.len()
        )));
    }

    // Each sighash blanks the other scriptSigs, so signatures are computed
    // against the unsigned transaction and attached afterwards.
    let mut script_sigs = Vec::with_capacity(prevouts.len());
    for (index, prevout) in prevouts.iter().enumerate() {
        if tx.inputs[index].previous_output != prevout.outpoint {
            return Err(WalletError::BuildError(format!(
                "input {index} spends {} but prevout is {}",
                tx.inputs[index].previous_output, prevout.outpoint
            )));
        }
        let keypair = match key_for(index, &prevout.script_pubkey) {
            Some(kp) => kp,
            None if p2pkh_hash(&prevout.script_pubkey).is_err() => {
                return Err(WalletError::UnsupportedScript { index })
            }
            None => return Err(WalletError::SigningKeyMismatch { index }),
        };
        script_sigs.push(sign_input(&tx, index, keypair, &prevout.script_pubkey)?);
    }
    for (input, script_sig) in tx.inputs.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    let txid = tx.txid();
    debug!(%txid, inputs = tx.inputs.len(), "signer: all inputs signed");
    Ok(SignedTransaction {
        txid,
        fee,
        change,
        spent: prevouts.iter().map(|u| u.outpoint).collect(),
        tx,
    })
}

/// Check the scriptSig of input `index` against the output it spends.
pub fn verify_input(
    tx: &Transaction,
    index: usize,
    prior_script: &[u8],
) -> Result<(), WalletError> {
    check_index(tx, index)?;
    let locked_hash =
        p2pkh_hash(prior_script).map_err(|_| WalletError::UnsupportedScript { index })?;
    let (signature, pubkey_bytes) = parse_p2pkh_script_sig(&tx.inputs[index].script_sig)?;

    let (hash_type, der) = signature
        .split_last()
        .ok_or(CryptoError::InvalidSignature)?;
    if *hash_type != SIGHASH_ALL as u8 {
        return Err(CryptoError::InvalidSignature.into());
    }
    let pubkey = PublicKey::from_slice(&pubkey_bytes)?;
    if pubkey.hash160() != locked_hash {
        return Err(WalletError::SigningKeyMismatch { index });
    }

    let digest = sighash(tx, index, prior_script)?;
    pubkey.verify_der(&digest, der)?;
    Ok(())
}

fn check_index(tx: &Transaction, index: usize) -> Result<(), TransactionError> {
    if index >= tx.inputs.len() {
        return Err(TransactionError::InputIndexOutOfBounds {
            index,
            len: tx.inputs.len(),
        });
    }
    Ok(())
}
