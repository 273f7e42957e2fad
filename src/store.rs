// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! At-rest persistence for the wallet record.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//!   wallet.json     # Public metadata (address, created_at)
//!   secret.bin      # Encrypted secret blob (opaque to this module)
//! ```
//!
//! The secret file holds the vault's ciphertext blob byte for byte; this
//! module never inspects it, and there is no persisted plaintext anywhere.
//! Writes go through a temp file and rename so a crash cannot leave a
//! half-written record.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vault::Wallet;

const META_FILE: &str = "wallet.json";
const SECRET_FILE: &str = "secret.bin";

/// Errors from wallet persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Public wallet metadata persisted alongside the secret blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletMeta {
    public_address: String,
    created_at: DateTime<Utc>,
}

/// Filesystem store for the single wallet record.
#[derive(Debug, Clone)]
pub struct WalletStore {
    root: PathBuf,
}

impl WalletStore {
    /// Create a store rooted at the given data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether a wallet record exists.
    pub fn exists(&self) -> bool {
        self.root.join(META_FILE).exists() && self.root.join(SECRET_FILE).exists()
    }

    /// Persist the wallet record, replacing any existing one.
    pub fn save(&self, wallet: &Wallet) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;

        let meta = WalletMeta {
            public_address: wallet.public_address.clone(),
            created_at: wallet.created_at,
        };
        write_json_atomic(&self.root.join(META_FILE), &meta)?;
        write_raw_atomic(&self.root.join(SECRET_FILE), &wallet.encrypted_secret)?;
        Ok(())
    }

    /// Load the wallet record, or `None` when nothing is stored yet.
    pub fn load(&self) -> Result<Option<Wallet>, StoreError> {
        let meta_path = self.root.join(META_FILE);
        let secret_path = self.root.join(SECRET_FILE);
        if !meta_path.exists() || !secret_path.exists() {
            return Ok(None);
        }

        let meta: WalletMeta = serde_json::from_reader(File::open(meta_path)?)?;
        let encrypted_secret = fs::read(secret_path)?;

        Ok(Some(Wallet {
            public_address: meta.public_address,
            encrypted_secret,
            created_at: meta.created_at,
        }))
    }
}

/// Write JSON to a temp file, then rename for atomicity.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write raw bytes to a temp file, then rename for atomicity.
fn write_raw_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
