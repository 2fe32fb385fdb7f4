//! Key pairs for the session-cookie layer. Each pair holds a 32 byte hash key
//! used for cookie authentication and a 32 byte block key used for cookie
//! encryption; the cookie algorithm itself lives in the consuming layer.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

pub const HASH_KEY_LEN: usize = 32;
pub const BLOCK_KEY_LEN: usize = 32;
/// On-disk record size: `hash_key || block_key`.
pub const RECORD_LEN: usize = HASH_KEY_LEN + BLOCK_KEY_LEN;

/// One generation of cookie key material.
#[derive(PartialEq, Eq)]
pub struct Keypair {
    hash_key: [u8; HASH_KEY_LEN],
    block_key: [u8; BLOCK_KEY_LEN],
}

impl Keypair {
    /// Draws a fresh pair from the provided generator. The `CryptoRng` bound
    /// keeps non-cryptographic generators out at compile time; both keys are
    /// drawn independently.
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng,
    {
        let mut hash_key = [0u8; HASH_KEY_LEN];
        rng.fill_bytes(&mut hash_key);
        let mut block_key = [0u8; BLOCK_KEY_LEN];
        rng.fill_bytes(&mut block_key);
        Self {
            hash_key,
            block_key,
        }
    }

    /// Rebuilds a pair from the two halves of an on-disk record.
    pub(crate) fn from_parts(
        hash_key: [u8; HASH_KEY_LEN],
        block_key: [u8; BLOCK_KEY_LEN],
    ) -> Self {
        Self {
            hash_key,
            block_key,
        }
    }

    /// Key used to authenticate cookie payloads.
    pub fn hash_key(&self) -> &[u8; HASH_KEY_LEN] {
        &self.hash_key
    }

    /// Key used to encrypt cookie payloads.
    pub fn block_key(&self) -> &[u8; BLOCK_KEY_LEN] {
        &self.block_key
    }

    /// Serializes the pair into its 64 byte on-disk record.
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        record[..HASH_KEY_LEN].copy_from_slice(&self.hash_key);
        record[HASH_KEY_LEN..].copy_from_slice(&self.block_key);
        record
    }

    /// SHA-256 digest of the record in hex. Safe to print and log; the raw
    /// key bytes never appear in any output.
    pub fn fingerprint(&self) -> String {
        let mut record = self.to_record();
        let mut hasher = Sha256::new();
        hasher.update(&record);
        record.zeroize();
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        // Zero the key material on drop to reduce its lifetime in memory.
        self.hash_key.zeroize();
        self.block_key.zeroize();
    }
}

/// Printable summary of one key pair, for operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    pub index: usize,
    pub fingerprint: String,
}

/// Ordered key pairs in on-disk record order, oldest first. The list is
/// immutable once built; rotation rewrites the secret file and a fresh load
/// produces a new list.
#[derive(Debug, PartialEq, Eq)]
pub struct CodecList {
    pairs: Vec<Keypair>,
}

impl CodecList {
    pub(crate) fn new(pairs: Vec<Keypair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Keypair> {
        self.pairs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypair> {
        self.pairs.iter()
    }

    /// The most recently appended pair. Consumers should prefer it when
    /// issuing new cookies and try every pair when verifying, so rotated-out
    /// keys keep validating existing sessions until their record is dropped.
    pub fn newest(&self) -> Option<&Keypair> {
        self.pairs.last()
    }

    /// Fingerprint summaries in record order.
    pub fn describe(&self) -> Vec<KeyInfo> {
        self.pairs
            .iter()
            .enumerate()
            .map(|(index, pair)| KeyInfo {
                index,
                fingerprint: pair.fingerprint(),
            })
            .collect()
    }
}
