// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger configuration loaded from TOML.
//!
//! Every section is optional:
//!
//! ```toml
//! [storage]
//! backend = "json"          # or "memory"
//! path = "ledger.json"
//!
//! [store]
//! insert_policy = "cascade" # or "append_only"
//!
//! [defaults]
//! basePay = "120.00"
//! perBooking = "35.00"
//! advanceBalance = "0"
//! ```

use crate::error::{LedgerError, Result};
use crate::record::Settings;
use crate::storage::{JsonFileBackend, MemoryBackend, StorageBackend};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub storage: StorageConfig,
    pub store: StoreConfig,
    /// Settings used when the backend has none stored yet.
    pub defaults: Settings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Json,
            path: PathBuf::from("ledger.json"),
        }
    }
}

/// How insertions treat records that come after them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    /// Adding a record restamps every later record, and creating the anchor
    /// restamps the whole chain.
    #[default]
    Cascade,
    /// Only the new record is stamped; anchor creation leaves existing
    /// records alone. Matches the behaviour of earlier ledger files.
    AppendOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub insert_policy: InsertPolicy,
}

impl LedgerConfig {
    /// Builds the configured persistence backend.
    pub fn open_backend(&self) -> Arc<dyn StorageBackend> {
        match self.storage.backend {
            StorageKind::Json => Arc::new(JsonFileBackend::with_defaults(
                self.storage.path.clone(),
                self.defaults,
            )),
            StorageKind::Memory => Arc::new(MemoryBackend::with_settings(self.defaults)),
        }
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
///
/// Returns [`LedgerError::Config`] if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LedgerConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading ledger configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| {
        LedgerError::Config(format!("failed to read config file {:?}: {}", path_ref, e))
    })?;
    parse_config(&contents)
        .map_err(|e| LedgerError::Config(format!("failed to parse {:?}: {}", path_ref, e)))
}

fn parse_config(contents: &str) -> std::result::Result<LedgerConfig, toml::de::Error> {
    toml::from_str(contents)
}
