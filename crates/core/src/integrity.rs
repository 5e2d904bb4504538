// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hash chaining and signing.
//!
//! Two chains exist. The WAL chain ([`IntegrityChain`]) is a keyed HMAC over
//! serialized entries. The record chain ([`content_hash`]) is a plain SHA-256
//! over the canonical JSON of each record, carried inside the record itself.

use crate::log::Log;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of every root and derived key
pub const KEY_LEN: usize = 32;

/// Previous hash of the first record in a worker's chain
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("invalid hex key: {0}")]
    InvalidHex(String),
    #[error("mac failure: {0}")]
    Mac(String),
    #[error("signature does not match")]
    SignatureMismatch,
}

/// Parse a hex-encoded root key, ignoring surrounding whitespace
pub fn parse_hex_key(text: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    let bytes = hex::decode(text.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    check_key(&bytes)
}

pub fn check_key(bytes: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: bytes.len(),
    })
}

fn hmac_parts(key: &[u8], parts: &[&[u8]]) -> Result<HmacSha256, CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CryptoError::Mac(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

/// Raw HMAC-SHA256 over the concatenation of `parts`
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], CryptoError> {
    Ok(hmac_parts(key, parts)?.finalize().into_bytes().into())
}

/// Constant-time HMAC check
pub fn hmac_verify(key: &[u8], parts: &[&[u8]], tag: &[u8]) -> Result<(), CryptoError> {
    hmac_parts(key, parts)?
        .verify_slice(tag)
        .map_err(|_| CryptoError::SignatureMismatch)
}

/// Derive a purpose-bound subkey so one root key never serves two roles
pub fn derive_key(root: &[u8], label: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    hmac_sha256(root, &[b"aw/", label.as_bytes()])
}

/// Keyed rolling hash: `H_n = HMAC(key, H_{n-1} || data_n)`
#[derive(Clone)]
pub struct IntegrityChain {
    key: [u8; KEY_LEN],
    head: String,
}

impl IntegrityChain {
    pub fn new(root: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            key: derive_key(root, "wal-chain")?,
            head: String::new(),
        })
    }

    /// Chain value after appending `data` onto `prev`
    pub fn compute(&self, prev: &str, data: &[u8]) -> Result<String, CryptoError> {
        hmac_sha256(&self.key, &[prev.as_bytes(), data]).map(hex::encode)
    }

    /// Advance the head over `data` and return the new head
    pub fn advance(&mut self, data: &[u8]) -> Result<&str, CryptoError> {
        self.head = self.compute(&self.head, data)?;
        Ok(&self.head)
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn set_head(&mut self, head: impl Into<String>) {
        self.head = head.into();
    }

    pub fn reset(&mut self) {
        self.head.clear();
    }
}

impl std::fmt::Debug for IntegrityChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityChain")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Write `value` as JSON with object keys sorted, independent of map ordering
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(field) = fields.get(key) {
                    write_canonical(field, out);
                }
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 over the canonical record (minus `hash` and `signature`) followed by `previous_hash`
pub fn content_hash(log: &Log, previous_hash: &str) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(log)?;
    if let Value::Object(fields) = &mut value {
        fields.remove("hash");
        fields.remove("signature");
    }
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&value).as_bytes());
    hasher.update(previous_hash.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Record signer, rendered as `<key_id>:<hex mac>`
#[derive(Clone)]
pub struct Signer {
    key_id: String,
    key: [u8; KEY_LEN],
}

impl Signer {
    pub fn new(root: &[u8], key_id: impl Into<String>) -> Result<Self, CryptoError> {
        let key_id = key_id.into();
        let key = derive_key(root, &format!("sign/{key_id}"))?;
        Ok(Self { key_id, key })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, hash: &str) -> Result<String, CryptoError> {
        let mac = hmac_sha256(&self.key, &[hash.as_bytes()])?;
        Ok(format!("{}:{}", self.key_id, hex::encode(mac)))
    }

    pub fn verify(&self, hash: &str, signature: &str) -> Result<(), CryptoError> {
        let (key_id, mac_hex) = signature
            .split_once(':')
            .ok_or(CryptoError::SignatureMismatch)?;
        if key_id != self.key_id {
            return Err(CryptoError::SignatureMismatch);
        }
        let tag = hex::decode(mac_hex).map_err(|_| CryptoError::SignatureMismatch)?;
        hmac_verify(&self.key, &[hash.as_bytes()], &tag)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
