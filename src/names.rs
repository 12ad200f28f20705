/*
 * This file is part of Thermowire.
 *
 * Copyright (C) 2025 Thermowire contributors
 *
 * Thermowire is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermowire is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermowire. If not, see <https://www.gnu.org/licenses/>.
 */

//! Persistent sensor-name storage.
//!
//! The crate only requires a flat string-keyed mapping keyed by the
//! canonical address string; `JsonNameStore` keeps it as a single JSON
//! object on disk.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};

/// Key-value storage for sensor names.
///
/// `put` must merge into the mapping already stored at `path`, so that
/// saves from several buses sharing one file accumulate instead of
/// overwriting each other.
#[cfg_attr(test, mockall::automock)]
pub trait NameStore {
    fn get(&self, path: &Path, key: &str) -> Option<String>;
    fn put(&self, path: &Path, key: &str, value: &str) -> io::Result<()>;
}

/// Flat JSON object on disk: `{"<address>": "<name>", ...}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonNameStore;

impl JsonNameStore {
    pub fn new() -> Self {
        JsonNameStore
    }

    fn read_map(path: &Path) -> Map<String, Value> {
        fs::read_to_string(path)
            .ok()
            .and_then(|data| serde_json::from_str::<Map<String, Value>>(&data).ok())
            .unwrap_or_default()
    }
}

impl NameStore for JsonNameStore {
    fn get(&self, path: &Path, key: &str) -> Option<String> {
        Self::read_map(path)
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn put(&self, path: &Path, key: &str, value: &str) -> io::Result<()> {
        let mut map = Self::read_map(path);
        map.insert(key.to_string(), Value::String(value.to_string()));
        let json = serde_json::to_string(&Value::Object(map))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}
