//! Integration and property test suite for chainkey.
//!
//! The tests in this crate drive the public APIs of `chainkey-core` and
//! `chainkey-wallet` together: published derivation vectors, pinned raw
//! transactions, and randomized invariants over keys, addresses, coin
//! selection and the wire format.

pub mod helpers;
