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

//! The per-bus polling state machine.
//!
//! A conversion on real hardware takes up to 750 ms, so the poller never
//! waits for one: `update()` inspects the current state, does at most one
//! cheap thing, and returns. "Waiting" is a state that no-ops until the
//! next tick finds the awaited condition true.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::bus::{DeviceAddress, Resolution, TemperatureBus, Unit};
use crate::clock::{Clock, MonotonicClock};
use crate::error::PollError;
use crate::logger;
use crate::names::{JsonNameStore, NameStore};
use crate::registry::SensorRegistry;

/// Fallback reading interval applied when the configured one is invalid.
pub const DEFAULT_INTERVAL_MS: u64 = 31_000;

/// Phase of the request → wait → harvest cycle.
///
/// `WaitingConversion` only detects completion; `ReadingSensors` harvests.
/// An `update()` that observes completion falls through to the harvest in
/// the same call, so results land on the tick that saw the hardware
/// finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No devices discovered, or `begin()` not called yet.
    NotFound,
    WaitingNextReading,
    WaitingConversion,
    ReadingSensors,
}

/// Payload handed to observers, once per sensor per completed cycle.
#[derive(Debug, Clone, Copy)]
pub struct SensorEvent<'a> {
    pub temperature: f32,
    pub valid: bool,
    pub wire_name: &'a str,
    pub pin: u8,
    pub sensor_index: usize,
}

/// Observer of harvest results, invoked synchronously inside `update()`.
///
/// For each sensor, `on_temperature_change` (fired only when a valid
/// reading differs from the cached value) strictly precedes
/// `on_interval_elapsed` (fired every completed cycle regardless).
/// Observers must not call back into the poller that invoked them.
pub trait PollObserver {
    fn on_temperature_change(&mut self, _event: &SensorEvent<'_>) {}
    fn on_interval_elapsed(&mut self, _event: &SensorEvent<'_>) {}
}

/// Non-blocking poller for one physical wire.
pub struct BusPoller {
    bus: Box<dyn TemperatureBus>,
    clock: Arc<dyn Clock>,
    registry: SensorRegistry,
    observers: Vec<Box<dyn PollObserver>>,
    names: Arc<dyn NameStore>,
    names_path: Option<PathBuf>,
    wire_name: String,
    pin: u8,
    state: PollState,
    resolution: Resolution,
    unit: Unit,
    interval_ms: u64,
    last_reading_millis: u64,
    conversion_start_millis: u64,
    conversion_millis: u64,
}

impl BusPoller {
    pub fn new(bus: Box<dyn TemperatureBus>, pin: u8) -> Self {
        BusPoller {
            bus,
            clock: Arc::new(MonotonicClock::new()),
            registry: SensorRegistry::new(),
            observers: Vec::new(),
            names: Arc::new(JsonNameStore::new()),
            names_path: None,
            wire_name: format!("GPIO{}", pin),
            pin,
            state: PollState::NotFound,
            resolution: Resolution::Bits12,
            unit: Unit::Celsius,
            interval_ms: DEFAULT_INTERVAL_MS,
            last_reading_millis: 0,
            conversion_start_millis: 0,
            conversion_millis: 0,
        }
    }

    pub fn with_names_path(
        bus: Box<dyn TemperatureBus>,
        pin: u8,
        names_path: impl Into<PathBuf>,
    ) -> Self {
        let mut poller = Self::new(bus, pin);
        poller.names_path = Some(names_path.into());
        poller
    }

    /// Configure and run the first discovery. The interval is clamped to
    /// [`DEFAULT_INTERVAL_MS`] when it is shorter than the conversion
    /// time for `resolution` or beyond the 32-bit millisecond range.
    pub fn begin(&mut self, resolution: Resolution, unit: Unit, interval_ms: u64) {
        self.resolution = resolution;
        self.unit = unit;
        self.interval_ms = interval_ms;
        self.conversion_millis = resolution.conversion_millis();
        self.rescan_wire();

        if self.interval_ms < self.conversion_millis || self.interval_ms > u32::MAX as u64 {
            logger::log_event(
                "interval_clamped",
                json!({
                    "wire": self.wire_name,
                    "requested_ms": self.interval_ms,
                    "conversion_ms": self.conversion_millis,
                    "effective_ms": DEFAULT_INTERVAL_MS,
                }),
            );
            self.interval_ms = DEFAULT_INTERVAL_MS;
        }
    }

    /// Advance the state machine by at most one step. Never blocks.
    pub fn update(&mut self) {
        match self.state {
            PollState::NotFound => {}
            PollState::WaitingNextReading => self.wait_next_reading(),
            PollState::WaitingConversion => {
                self.wait_conversion();
                if self.state == PollState::ReadingSensors {
                    self.read_sensors();
                }
            }
            PollState::ReadingSensors => self.read_sensors(),
        }
    }

    /// Start a conversion now, regardless of the interval countdown.
    pub fn request_temperature(&mut self) {
        self.state = PollState::WaitingConversion;
        self.conversion_start_millis = self.clock.now_millis();
        self.bus.start_conversion_for_all();
        logger::log_event(
            "conversion_request",
            json!({ "wire": self.wire_name, "pin": self.pin }),
        );
    }

    /// Re-discover the wire: rebuilds the registry from scratch and arms
    /// the polling loop if at least one device answered. Cached values
    /// and previously assigned names do not survive; names are reloaded
    /// from the store when a path is configured.
    pub fn rescan_wire(&mut self) {
        self.bus.init();
        // The capability must never block update() internally
        self.bus.set_wait_for_conversion(false);
        self.bus.set_resolution(self.resolution);
        self.state = PollState::NotFound;

        let names = match &self.names_path {
            Some(path) => Some((self.names.as_ref(), path.as_path())),
            None => None,
        };
        self.registry.rebuild(self.bus.as_mut(), self.unit, names);

        if !self.registry.is_empty() {
            self.state = PollState::WaitingNextReading;
        }
        logger::log_event(
            "rescan",
            json!({
                "wire": self.wire_name,
                "pin": self.pin,
                "sensors": self.registry.len(),
            }),
        );
    }

    fn wait_next_reading(&mut self) {
        let now = self.clock.now_millis();
        // The countdown is shortened by the measured conversion duration
        // so successive requests stay one interval apart instead of
        // drifting by one conversion per cycle. First reading fires
        // immediately.
        if self.last_reading_millis != 0
            && now.saturating_sub(self.last_reading_millis)
                < self.interval_ms.saturating_sub(self.conversion_millis)
        {
            return;
        }
        self.request_temperature();
    }

    fn wait_conversion(&mut self) {
        if !self.bus.is_conversion_complete() {
            return;
        }
        let now = self.clock.now_millis();
        self.conversion_millis = now.saturating_sub(self.conversion_start_millis);
        self.state = PollState::ReadingSensors;
    }

    fn read_sensors(&mut self) {
        for index in 0..self.registry.len() {
            self.read_temperature(index);
        }
        self.last_reading_millis = self.clock.now_millis();
        self.state = PollState::WaitingNextReading;
        logger::log_event(
            "harvest",
            json!({
                "wire": self.wire_name,
                "sensors": self.registry.len(),
                "conversion_ms": self.conversion_millis,
            }),
        );
    }

    fn read_temperature(&mut self, index: usize) {
        let Ok(record) = self.registry.record(index) else {
            return;
        };
        let address = record.address();
        let previous = record.temperature();

        let temperature = match self.unit {
            Unit::Celsius => self.bus.read_celsius(&address),
            Unit::Fahrenheit => self.bus.read_fahrenheit(&address),
        };
        let valid = temperature != self.unit.disconnected();
        let changed = valid && temperature != previous;

        let now = self.clock.now_millis();
        self.registry.apply_reading(index, temperature, valid, now);

        let event = SensorEvent {
            temperature,
            valid,
            wire_name: &self.wire_name,
            pin: self.pin,
            sensor_index: index,
        };
        if changed {
            for observer in self.observers.iter_mut() {
                observer.on_temperature_change(&event);
            }
        }
        for observer in self.observers.iter_mut() {
            observer.on_interval_elapsed(&event);
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PollObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Number of sensors as of the most recent rescan.
    pub fn sensor_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn set_wire_name(&mut self, name: impl Into<String>) {
        self.wire_name = name.into();
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    pub fn unit_char(&self) -> char {
        self.unit.as_char()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Takes effect at the next rescan.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Predicted conversion duration until the first cycle completes,
    /// measured thereafter.
    pub fn conversion_millis(&self) -> u64 {
        self.conversion_millis
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    pub fn set_name_store(&mut self, store: Arc<dyn NameStore>) {
        self.names = store;
    }

    pub fn set_names_path(&mut self, path: Option<PathBuf>) {
        self.names_path = path;
    }

    pub fn names_path(&self) -> Option<&PathBuf> {
        self.names_path.as_ref()
    }

    pub fn temperature_by_index(&self, index: usize) -> Result<f32, PollError> {
        self.registry.record(index).map(|r| r.temperature())
    }

    pub fn temperature_by_name(&self, name: &str) -> Result<f32, PollError> {
        let index = self.registry.index_by_name(name)?;
        self.temperature_by_index(index)
    }

    pub fn sensor_name_by_index(&self, index: usize) -> Result<String, PollError> {
        self.registry.record(index).map(|r| r.name().to_string())
    }

    pub fn index_by_name(&self, name: &str) -> Result<usize, PollError> {
        self.registry.index_by_name(name)
    }

    pub fn address_by_index(&self, index: usize) -> Result<DeviceAddress, PollError> {
        self.registry.record(index).map(|r| r.address())
    }

    pub fn last_valid_by_index(&self, index: usize) -> Result<u64, PollError> {
        self.registry.record(index).map(|r| r.last_valid_millis())
    }

    pub fn last_valid_by_name(&self, name: &str) -> Result<u64, PollError> {
        let index = self.registry.index_by_name(name)?;
        self.last_valid_by_index(index)
    }

    pub fn set_sensor_name_by_index(&mut self, index: usize, name: &str) -> Result<(), PollError> {
        self.registry.set_name_by_index(index, name)
    }

    pub fn set_sensor_name_by_address(
        &mut self,
        address: &DeviceAddress,
        name: &str,
    ) -> Result<(), PollError> {
        self.registry.set_name_by_address(address, name)
    }

    /// Persist this wire's address→name mapping. No-op without a path.
    pub fn save_sensor_names(&self) -> io::Result<()> {
        let Some(path) = &self.names_path else {
            return Ok(());
        };
        self.registry.persist_names(self.names.as_ref(), path)?;
        logger::log_event(
            "names_saved",
            json!({ "wire": self.wire_name, "sensors": self.registry.len() }),
        );
        Ok(())
    }
}
