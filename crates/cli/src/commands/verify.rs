// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aw verify` - Offline WAL integrity check

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use aw_core::config::WAL_KEY_ENV;
use aw_daemon::key::{parse_key, read_key_file};
use aw_storage::verify_wal;
use clap::Args;
use serde::Serialize;

use crate::error::AwError;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// WAL file to check
    #[arg(long)]
    pub wal: PathBuf,

    /// File holding the hex root key; falls back to AW_WAL_KEY
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct VerifyView {
    pub wal: PathBuf,
    pub entries: usize,
    pub tail_sequence: u64,
    pub tail_hash: String,
}

impl fmt::Display for VerifyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WAL:           {}", self.wal.display())?;
        writeln!(f, "Entries:       {}", self.entries)?;
        write!(f, "Tail sequence: {}", self.tail_sequence)?;
        if !self.tail_hash.is_empty() {
            write!(f, "\nTail hash:     {}", self.tail_hash)?;
        }
        Ok(())
    }
}

pub fn verify(args: VerifyArgs) -> Result<VerifyView> {
    let key = match &args.key_file {
        Some(path) => read_key_file(path)?,
        None => match std::env::var(WAL_KEY_ENV) {
            Ok(value) => parse_key(&value)?,
            Err(_) => {
                return Err(AwError::new("no root key given")
                    .with_suggestion("Pass --key-file <file>")
                    .with_suggestion(format!("Or set {}", WAL_KEY_ENV))
                    .into())
            }
        },
    };

    let report = verify_wal(&args.wal, &key).map_err(|e| {
        AwError::new(format!("WAL verification failed ({})", e.code()))
            .with_context(e.to_string())
            .with_source(e)
    })?;

    Ok(VerifyView {
        wal: args.wal,
        entries: report.entries,
        tail_sequence: report.tail_sequence,
        tail_hash: report.tail_hash,
    })
}
