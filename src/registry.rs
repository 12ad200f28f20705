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

//! Per-bus collection of discovered sensors and their cached readings.
//!
//! Records are rebuilt wholesale on every rescan; indices are positional
//! in discovery order and stable only between rescans.

use std::io;
use std::path::Path;

use crate::bus::{DeviceAddress, TemperatureBus, Unit};
use crate::error::PollError;
use crate::names::NameStore;

/// Cached state of one discovered device.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    address: DeviceAddress,
    temperature: f32,
    valid: bool,
    last_valid_millis: u64,
    name: String,
}

impl SensorRecord {
    fn new(address: DeviceAddress, unit: Unit) -> Self {
        SensorRecord {
            address,
            temperature: unit.disconnected(),
            valid: false,
            last_valid_millis: 0,
            name: String::new(),
        }
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Last reading, valid or not. Holds the unit's disconnected sentinel
    /// until the first successful read and after any failed one.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Clock time of the last valid reading; 0 if there never was one.
    /// Survives invalid reads, so callers can compute staleness.
    pub fn last_valid_millis(&self) -> u64 {
        self.last_valid_millis
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered set of sensor records for one bus.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    records: Vec<SensorRecord>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        SensorRegistry {
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record and re-discover the bus: one address read per
    /// device, plus one name-store lookup per device when a path is
    /// configured. Discovery order defines the index space.
    pub fn rebuild(
        &mut self,
        bus: &mut dyn TemperatureBus,
        unit: Unit,
        names: Option<(&dyn NameStore, &Path)>,
    ) {
        self.records.clear();
        let count = bus.device_count();
        self.records.reserve_exact(count);
        for i in 0..count {
            // A device that fails its address read still occupies its
            // slot, so indices keep matching the bus's reported count
            let found = bus.device_address(i);
            let mut record = SensorRecord::new(found.unwrap_or_default(), unit);
            if let (Some(address), Some((store, path))) = (found, names) {
                if let Some(name) = store.get(path, &address.to_string()) {
                    record.name = name;
                }
            }
            self.records.push(record);
        }
    }

    pub fn record(&self, index: usize) -> Result<&SensorRecord, PollError> {
        self.records.get(index).ok_or(PollError::IndexOutOfRange)
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    /// First record whose name matches exactly (case-sensitive).
    pub fn index_by_name(&self, name: &str) -> Result<usize, PollError> {
        self.records
            .iter()
            .position(|r| r.name == name)
            .ok_or(PollError::NameNotFound)
    }

    pub fn index_by_address(&self, address: &DeviceAddress) -> Option<usize> {
        self.records.iter().position(|r| r.address == *address)
    }

    pub fn set_name_by_index(&mut self, index: usize, name: &str) -> Result<(), PollError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(PollError::IndexOutOfRange)?;
        record.name = name.to_string();
        Ok(())
    }

    pub fn set_name_by_address(
        &mut self,
        address: &DeviceAddress,
        name: &str,
    ) -> Result<(), PollError> {
        let index = self
            .index_by_address(address)
            .ok_or(PollError::AddressNotFound)?;
        self.records[index].name = name.to_string();
        Ok(())
    }

    /// Store one harvest result. Temperature and validity always move
    /// together; the last-valid timestamp only advances on a valid read.
    pub fn apply_reading(&mut self, index: usize, temperature: f32, valid: bool, now_millis: u64) {
        if let Some(record) = self.records.get_mut(index) {
            record.temperature = temperature;
            record.valid = valid;
            if valid {
                record.last_valid_millis = now_millis;
            }
        }
    }

    /// Write every address→name pair through the name store.
    pub fn persist_names(&self, store: &dyn NameStore, path: &Path) -> io::Result<()> {
        for record in &self.records {
            store.put(path, &record.address.to_string(), &record.name)?;
        }
        Ok(())
    }
}
