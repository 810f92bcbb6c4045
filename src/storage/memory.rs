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

//! In-memory backend, used by tests and short-lived sessions.

use super::StorageBackend;
use crate::error::BackendError;
use crate::record::{Record, Settings};
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<Vec<Record>>,
    settings: RwLock<Settings>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            settings: RwLock::new(settings),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn read_all(&self) -> Result<Vec<Record>, BackendError> {
        Ok(self.records.read().clone())
    }

    fn write_all(&self, records: &[Record]) -> Result<(), BackendError> {
        *self.records.write() = records.to_vec();
        Ok(())
    }

    fn read_settings(&self) -> Result<Settings, BackendError> {
        Ok(*self.settings.read())
    }

    fn write_settings(&self, settings: &Settings) -> Result<(), BackendError> {
        *self.settings.write() = *settings;
        Ok(())
    }
}
