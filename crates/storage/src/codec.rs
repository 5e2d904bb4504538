// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame layout and the sealed-record envelope.
//!
//! Frame: `[mode:1][len:4 BE][payload:len]`.
//! Sealed payload: `[hmac:32][iv:12][tag:16][ciphertext]`, where the HMAC
//! covers `iv || tag || ciphertext` and is checked before any decryption.

use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use aw_core::integrity::{check_key, derive_key, hmac_sha256, hmac_verify, KEY_LEN};
use aw_core::CryptoError;
use thiserror::Error;

pub const HEADER_SIZE: usize = 5;
const HMAC_SIZE: usize = 32;
const IV_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
/// Smallest well-formed sealed payload (empty ciphertext)
pub const MIN_SEALED_SIZE: usize = HMAC_SIZE + IV_SIZE + TAG_SIZE;

const SELF_TEST_PLAINTEXT: &[u8] = b"integrity-check";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("incomplete header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[error("incomplete payload at offset {offset}: expected {expected} bytes, {available} available")]
    TruncatedPayload {
        offset: usize,
        expected: usize,
        available: usize,
    },
    #[error("unknown record mode {mode:#04x} at offset {offset}")]
    UnknownMode { offset: usize, mode: u8 },
    #[error("payload of {0} bytes does not fit in a frame")]
    TooLarge(usize),
    #[error("sealed payload too short: {0} bytes")]
    ShortEnvelope(usize),
    #[error("envelope authentication failed")]
    Authentication,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("cipher self-test failed")]
    SelfTest,
    #[error(transparent)]
    Key(#[from] CryptoError),
}

impl CodecError {
    /// Failures of the envelope or key rather than of the framing
    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            CodecError::ShortEnvelope(_)
                | CodecError::Authentication
                | CodecError::Encrypt
                | CodecError::Decrypt
                | CodecError::SelfTest
                | CodecError::Key(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordMode {
    Plain = 0x00,
    Sealed = 0x01,
}

impl RecordMode {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(RecordMode::Plain),
            0x01 => Some(RecordMode::Sealed),
            _ => None,
        }
    }
}

pub fn encode_frame(mode: RecordMode, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::TooLarge(payload.len()))?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.push(mode as u8);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub offset: usize,
    pub mode: RecordMode,
    pub payload: &'a [u8],
}

/// Sequential frame scanner over an in-memory file image.
///
/// Yields at most one error, then stops.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn next_frame(&mut self) -> Result<Frame<'a>, CodecError> {
        let offset = self.pos;
        let rest = &self.buf[offset..];
        if rest.len() < HEADER_SIZE {
            return Err(CodecError::TruncatedHeader { offset });
        }
        let mode = RecordMode::from_byte(rest[0]).ok_or(CodecError::UnknownMode {
            offset,
            mode: rest[0],
        })?;
        let len = u32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]]) as usize;
        let body = &rest[HEADER_SIZE..];
        if body.len() < len {
            return Err(CodecError::TruncatedPayload {
                offset,
                expected: len,
                available: body.len(),
            });
        }
        self.pos = offset + HEADER_SIZE + len;
        Ok(Frame {
            offset,
            mode,
            payload: &body[..len],
        })
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<Frame<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let result = self.next_frame();
        if result.is_err() {
            self.pos = self.buf.len();
        }
        Some(result)
    }
}

/// AES-256-GCM with an outer HMAC-SHA256, keyed from one root key
#[derive(Clone)]
pub struct WalCipher {
    aead: Aes256Gcm,
    mac_key: [u8; KEY_LEN],
}

impl WalCipher {
    /// Validate the root key, derive subkeys, and prove a round trip before use
    pub fn from_root_key(root: &[u8]) -> Result<Self, CodecError> {
        let root = check_key(root)?;
        let enc_key = derive_key(&root, "wal-encryption")?;
        let cipher = Self {
            aead: Aes256Gcm::new_from_slice(&enc_key).map_err(|_| CodecError::SelfTest)?,
            mac_key: derive_key(&root, "wal-hmac")?,
        };
        cipher.self_test()?;
        Ok(cipher)
    }

    fn self_test(&self) -> Result<(), CodecError> {
        let sealed = self.seal(SELF_TEST_PLAINTEXT)?;
        match self.open(&sealed) {
            Ok(plain) if plain == SELF_TEST_PLAINTEXT => Ok(()),
            _ => Err(CodecError::SelfTest),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut ciphertext = plaintext.to_vec();
        let tag = self
            .aead
            .encrypt_in_place_detached(&nonce, b"", &mut ciphertext)
            .map_err(|_| CodecError::Encrypt)?;
        let mac = hmac_sha256(
            &self.mac_key,
            &[nonce.as_slice(), tag.as_slice(), ciphertext.as_slice()],
        )?;

        let mut out = Vec::with_capacity(MIN_SEALED_SIZE + ciphertext.len());
        out.extend_from_slice(&mac);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CodecError> {
        if envelope.len() < MIN_SEALED_SIZE {
            return Err(CodecError::ShortEnvelope(envelope.len()));
        }
        let (mac, bundle) = envelope.split_at(HMAC_SIZE);
        hmac_verify(&self.mac_key, &[bundle], mac).map_err(|_| CodecError::Authentication)?;

        let (iv, rest) = bundle.split_at(IV_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);
        let mut plaintext = ciphertext.to_vec();
        self.aead
            .decrypt_in_place_detached(
                Nonce::from_slice(iv),
                b"",
                &mut plaintext,
                Tag::from_slice(tag),
            )
            .map_err(|_| CodecError::Decrypt)?;
        Ok(plaintext)
    }
}

impl std::fmt::Debug for WalCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
