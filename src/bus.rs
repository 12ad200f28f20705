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

//! The `TemperatureBus` capability and the value types shared with it.
//!
//! Everything electrical lives behind the trait: the crate only assumes a
//! bus that can enumerate devices, start a conversion for all of them at
//! once, report completion, and read back per-device temperatures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reading reported for a missing or CRC-failing device, in Celsius.
pub const DISCONNECTED_C: f32 = -127.0;
/// Reading reported for a missing or CRC-failing device, in Fahrenheit.
pub const DISCONNECTED_F: f32 = -196.6;

/// Fixed 8-byte identity of a device on the wire: 7 bytes of family code
/// and serial, 1 byte CRC. Read fresh on every rescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress([u8; 8]);

impl DeviceAddress {
    pub const fn new(bytes: [u8; 8]) -> Self {
        DeviceAddress(bytes)
    }

    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// Canonical string form: the 8 bytes in decimal, joined by dots. This is
/// the key format used in the persisted name mapping.
impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("malformed device address")]
pub struct AddressParseError;

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 8];
        let mut parts = s.split('.');
        for slot in bytes.iter_mut() {
            let part = parts.next().ok_or(AddressParseError)?;
            *slot = part.parse().map_err(|_| AddressParseError)?;
        }
        if parts.next().is_some() {
            return Err(AddressParseError);
        }
        Ok(DeviceAddress(bytes))
    }
}

/// Measurement precision of the sensor ADC. Conversion time grows with
/// resolution, so the poller's interval floor depends on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    pub fn bits(self) -> u8 {
        match self {
            Resolution::Bits9 => 9,
            Resolution::Bits10 => 10,
            Resolution::Bits11 => 11,
            Resolution::Bits12 => 12,
        }
    }

    /// Worst-case conversion duration for this resolution, per datasheet.
    pub fn conversion_millis(self) -> u64 {
        match self {
            Resolution::Bits9 => 94,
            Resolution::Bits10 => 188,
            Resolution::Bits11 => 375,
            Resolution::Bits12 => 750,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            9 => Some(Resolution::Bits9),
            10 => Some(Resolution::Bits10),
            11 => Some(Resolution::Bits11),
            12 => Some(Resolution::Bits12),
            _ => None,
        }
    }
}

/// Unit the cached temperatures are held in. Each unit has its own
/// disconnected sentinel, so readers must compare against the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Celsius,
    Fahrenheit,
}

impl Unit {
    pub fn disconnected(self) -> f32 {
        match self {
            Unit::Celsius => DISCONNECTED_C,
            Unit::Fahrenheit => DISCONNECTED_F,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Unit::Celsius => 'C',
            Unit::Fahrenheit => 'F',
        }
    }
}

/// One physical one-wire bus.
///
/// Implementations must never block inside `start_conversion_for_all` or
/// `is_conversion_complete`; the poller calls `set_wait_for_conversion(false)`
/// at every rescan to make that contract explicit. Reads return the unit's
/// disconnected sentinel on failure rather than an error.
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureBus {
    /// (Re)initialize the bus and enumerate devices.
    fn init(&mut self);
    fn set_wait_for_conversion(&mut self, wait: bool);
    fn set_resolution(&mut self, resolution: Resolution);
    fn device_count(&self) -> usize;
    /// Address of the device at `index` in enumeration order, if present.
    fn device_address(&self, index: usize) -> Option<DeviceAddress>;
    /// Kick off a conversion on every device at once. Returns immediately.
    fn start_conversion_for_all(&mut self);
    fn is_conversion_complete(&self) -> bool;
    fn read_celsius(&mut self, address: &DeviceAddress) -> f32;
    fn read_fahrenheit(&mut self, address: &DeviceAddress) -> f32;
}
