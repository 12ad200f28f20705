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

//! Aggregation of many [`BusPoller`]s behind one flat sensor index.
//!
//! The flat index is a computed projection over live per-wire counts:
//! `global = count(wire 0) + ... + count(wire i-1) + local`. Nothing is
//! stored, so a rescan that changes a wire's count simply changes what
//! the next query resolves to.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::bus::{DeviceAddress, Resolution, Unit};
use crate::error::PollError;
use crate::logger;
use crate::names::{JsonNameStore, NameStore};
use crate::poller::BusPoller;

/// A set of uniquely named, uniquely pinned wires addressed as one
/// logical array of sensors.
pub struct BusArray {
    wires: Vec<BusPoller>,
    resolution: Resolution,
    unit: Unit,
    names: Arc<dyn NameStore>,
    names_path: Option<PathBuf>,
}

impl Default for BusArray {
    fn default() -> Self {
        Self::new()
    }
}

impl BusArray {
    pub fn new() -> Self {
        BusArray {
            wires: Vec::new(),
            resolution: Resolution::Bits12,
            unit: Unit::Celsius,
            names: Arc::new(JsonNameStore::new()),
            names_path: None,
        }
    }

    /// Register a wire. A candidate whose name or pin collides with an
    /// already-registered wire is dropped as a no-op: every wire in the
    /// array is uniquely named and uniquely pinned.
    pub fn add(&mut self, poller: BusPoller) {
        let collision = self
            .wires
            .iter()
            .any(|w| w.wire_name() == poller.wire_name() || w.pin() == poller.pin());
        if collision {
            logger::log_event(
                "wire_rejected",
                json!({ "wire": poller.wire_name(), "pin": poller.pin() }),
            );
            return;
        }
        self.wires.push(poller);
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Total sensors across all wires as of their latest rescans.
    pub fn sensor_count(&self) -> usize {
        self.wires.iter().map(BusPoller::sensor_count).sum()
    }

    pub fn wires(&self) -> &[BusPoller] {
        &self.wires
    }

    pub fn wire_mut(&mut self, index: usize) -> Option<&mut BusPoller> {
        self.wires.get_mut(index)
    }

    /// Configure every wire identically and run their first discovery.
    /// The array's name-store path (if any) is pushed down first so the
    /// rescan can resolve persisted names.
    pub fn begin(&mut self, resolution: Resolution, unit: Unit, interval_ms: u64) {
        self.resolution = resolution;
        self.unit = unit;
        for wire in &mut self.wires {
            wire.set_name_store(self.names.clone());
            wire.set_names_path(self.names_path.clone());
            wire.begin(resolution, unit, interval_ms);
        }
    }

    pub fn begin_with_names(
        &mut self,
        resolution: Resolution,
        unit: Unit,
        interval_ms: u64,
        names_path: impl Into<PathBuf>,
    ) {
        self.names_path = Some(names_path.into());
        self.begin(resolution, unit, interval_ms);
    }

    /// One tick for every wire, in registration order.
    pub fn update(&mut self) {
        for wire in &mut self.wires {
            wire.update();
        }
    }

    pub fn rescan_all(&mut self) {
        for wire in &mut self.wires {
            wire.rescan_wire();
        }
    }

    pub fn request_all(&mut self) {
        for wire in &mut self.wires {
            wire.request_temperature();
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Propagated to every wire; effective at each wire's next rescan.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
        for wire in &mut self.wires {
            wire.set_resolution(resolution);
        }
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
        for wire in &mut self.wires {
            wire.set_unit(unit);
        }
    }

    pub fn unit_char(&self) -> char {
        self.unit.as_char()
    }

    pub fn set_names_path(&mut self, path: Option<PathBuf>) {
        self.names_path = path;
    }

    pub fn set_name_store(&mut self, store: Arc<dyn NameStore>) {
        self.names = store;
    }

    /// Resolve a global index to (wire position, local index).
    fn locate(&self, index: usize) -> Result<(usize, usize), PollError> {
        let mut offset = 0;
        for (w, wire) in self.wires.iter().enumerate() {
            let count = wire.sensor_count();
            if index < offset + count {
                return Ok((w, index - offset));
            }
            offset += count;
        }
        Err(PollError::IndexOutOfRange)
    }

    pub fn temperature_by_index(&self, index: usize) -> Result<f32, PollError> {
        let (w, local) = self.locate(index)?;
        self.wires[w].temperature_by_index(local)
    }

    pub fn sensor_name_by_index(&self, index: usize) -> Result<String, PollError> {
        let (w, local) = self.locate(index)?;
        self.wires[w].sensor_name_by_index(local)
    }

    pub fn set_sensor_name_by_index(&mut self, index: usize, name: &str) -> Result<(), PollError> {
        let (w, local) = self.locate(index)?;
        self.wires[w].set_sensor_name_by_index(local, name)
    }

    pub fn last_valid_by_index(&self, index: usize) -> Result<u64, PollError> {
        let (w, local) = self.locate(index)?;
        self.wires[w].last_valid_by_index(local)
    }

    pub fn address_by_index(&self, index: usize) -> Result<DeviceAddress, PollError> {
        let (w, local) = self.locate(index)?;
        self.wires[w].address_by_index(local)
    }

    /// Pin of the wire hosting the sensor at the global index.
    pub fn pin_by_index(&self, index: usize) -> Result<u8, PollError> {
        let (w, _) = self.locate(index)?;
        Ok(self.wires[w].pin())
    }

    /// First match across wires in registration order.
    pub fn temperature_by_name(&self, name: &str) -> Result<f32, PollError> {
        for wire in &self.wires {
            match wire.temperature_by_name(name) {
                Ok(temperature) => return Ok(temperature),
                Err(PollError::NameNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(PollError::NameNotFound)
    }

    pub fn last_valid_by_name(&self, name: &str) -> Result<u64, PollError> {
        for wire in &self.wires {
            match wire.last_valid_by_name(name) {
                Ok(millis) => return Ok(millis),
                Err(PollError::NameNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(PollError::NameNotFound)
    }

    /// Global index of the first sensor with this name: the matching
    /// wire's local index plus the counts of every wire before it.
    pub fn index_by_name(&self, name: &str) -> Result<usize, PollError> {
        let mut offset = 0;
        for wire in &self.wires {
            match wire.index_by_name(name) {
                Ok(local) => return Ok(offset + local),
                Err(PollError::NameNotFound) => offset += wire.sensor_count(),
                Err(e) => return Err(e),
            }
        }
        Err(PollError::NameNotFound)
    }

    pub fn set_sensor_name_by_address(
        &mut self,
        address: &DeviceAddress,
        name: &str,
    ) -> Result<(), PollError> {
        for wire in &mut self.wires {
            match wire.set_sensor_name_by_address(address, name) {
                Ok(()) => return Ok(()),
                Err(PollError::AddressNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(PollError::AddressNotFound)
    }

    pub fn wire_name(&self, wire_index: usize) -> Option<&str> {
        self.wires.get(wire_index).map(BusPoller::wire_name)
    }

    pub fn set_wire_name(&mut self, wire_index: usize, name: impl Into<String>) {
        if let Some(wire) = self.wires.get_mut(wire_index) {
            wire.set_wire_name(name);
        }
    }

    /// Write one combined address→name mapping covering every wire.
    /// No-op without a configured path.
    pub fn save_all_names(&self) -> io::Result<()> {
        let Some(path) = &self.names_path else {
            return Ok(());
        };
        for wire in &self.wires {
            wire.registry().persist_names(self.names.as_ref(), path)?;
        }
        logger::log_event(
            "names_saved",
            json!({ "wires": self.wires.len(), "sensors": self.sensor_count() }),
        );
        Ok(())
    }
}
