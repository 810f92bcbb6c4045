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

//! Persistence backends.
//!
//! The store reads and writes the whole record set at once, so a backend only
//! has to make each of these four calls atomic.

mod json_file;
mod memory;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

use crate::error::BackendError;
use crate::record::{Record, Settings};
use std::sync::Arc;

/// Whole-set persistence for records and settings.
pub trait StorageBackend: Send + Sync {
    /// Returns every stored record in stored order.
    fn read_all(&self) -> Result<Vec<Record>, BackendError>;

    /// Replaces the stored record set.
    fn write_all(&self, records: &[Record]) -> Result<(), BackendError>;

    fn read_settings(&self) -> Result<Settings, BackendError>;

    fn write_settings(&self, settings: &Settings) -> Result<(), BackendError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn read_all(&self) -> Result<Vec<Record>, BackendError> {
        (**self).read_all()
    }

    fn write_all(&self, records: &[Record]) -> Result<(), BackendError> {
        (**self).write_all(records)
    }

    fn read_settings(&self) -> Result<Settings, BackendError> {
        (**self).read_settings()
    }

    fn write_settings(&self, settings: &Settings) -> Result<(), BackendError> {
        (**self).write_settings(settings)
    }
}
