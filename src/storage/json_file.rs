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

//! JSON document backend.
//!
//! The whole ledger lives in one file:
//!
//! ```json
//! { "settings": { "basePay": "120", ... }, "records": [ ... ] }
//! ```
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the original,
//! so readers never observe a half-written document.

use super::StorageBackend;
use crate::error::BackendError;
use crate::record::{Record, Settings};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFile {
    #[serde(default)]
    settings: Option<Settings>,
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    /// Settings reported until the file stores its own.
    defaults: Settings,
    /// Serializes the read-modify-write of the shared document.
    io: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(path, Settings::default())
    }

    pub fn with_defaults(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        Self {
            path: path.into(),
            defaults,
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<LedgerFile, BackendError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(LedgerFile::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LedgerFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, file: &LedgerFile) -> Result<(), BackendError> {
        let json = serde_json::to_vec_pretty(file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = file.records.len(), "ledger file written");
        Ok(())
    }
}

impl StorageBackend for JsonFileBackend {
    fn read_all(&self) -> Result<Vec<Record>, BackendError> {
        let _guard = self.io.lock();
        Ok(self.load()?.records)
    }

    fn write_all(&self, records: &[Record]) -> Result<(), BackendError> {
        let _guard = self.io.lock();
        let mut file = self.load()?;
        file.records = records.to_vec();
        self.store(&file)
    }

    fn read_settings(&self) -> Result<Settings, BackendError> {
        let _guard = self.io.lock();
        Ok(self.load()?.settings.unwrap_or(self.defaults))
    }

    fn write_settings(&self, settings: &Settings) -> Result<(), BackendError> {
        let _guard = self.io.lock();
        let mut file = self.load()?;
        file.settings = Some(*settings);
        self.store(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::RecordId;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn backend() -> (JsonFileBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("ledger.json"));
        (backend, dir)
    }

    #[test]
    fn missing_file_reads_as_empty_ledger() {
        let (backend, _dir) = backend();
        assert!(backend.read_all().unwrap().is_empty());
        assert_eq!(backend.read_settings().unwrap(), Settings::default());
    }

    #[test]
    fn defaults_apply_until_settings_are_written() {
        let dir = TempDir::new().unwrap();
        let defaults = Settings {
            base_pay: dec!(100),
            ..Default::default()
        };
        let backend = JsonFileBackend::with_defaults(dir.path().join("ledger.json"), defaults);
        assert_eq!(backend.read_settings().unwrap(), defaults);

        let stored = Settings {
            base_pay: dec!(150),
            ..Default::default()
        };
        backend.write_settings(&stored).unwrap();
        assert_eq!(backend.read_settings().unwrap(), stored);
    }

    #[test]
    fn records_and_settings_share_one_document() {
        let (backend, _dir) = backend();
        let anchor = Record::anchor(RecordId(1), dec!(1000), "2024-01-01".parse().unwrap(), Utc::now());

        backend.write_all(std::slice::from_ref(&anchor)).unwrap();
        backend
            .write_settings(&Settings {
                per_booking: dec!(30),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(backend.read_all().unwrap(), vec![anchor]);
        assert_eq!(backend.read_settings().unwrap().per_booking, dec!(30));

        let text = fs::read_to_string(backend.path()).unwrap();
        assert!(text.contains("\"isInitialAdvance\": true"));
        assert!(text.contains("\"perBooking\": \"30\""));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let (backend, _dir) = backend();
        fs::write(backend.path(), "{ not json").unwrap();
        assert!(matches!(backend.read_all(), Err(BackendError::Corrupt(_))));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/deeper/ledger.json"));
        backend.write_all(&[]).unwrap();
        assert!(backend.path().exists());
    }
}
