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

//! Thermowire - non-blocking polling of one-wire temperature sensors
//!
//! This library drives DS18B20-class sensors from a cooperative loop:
//! each call to `update()` advances a per-bus state machine that requests
//! conversions, polls for completion, and harvests results without ever
//! blocking the caller. Multiple buses can be grouped behind one flat
//! sensor index.

pub mod array;
pub mod bus;
pub mod clock;
pub mod error;
pub mod logger;
pub mod names;
pub mod poller;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
