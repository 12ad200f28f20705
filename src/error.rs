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

use thiserror::Error;

/// Recoverable lookup failures surfaced by the registry and the array.
///
/// A disconnected sensor is not an error: it shows up as `valid = false`
/// plus the unit's sentinel temperature on the record itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollError {
    #[error("sensor index out of range")]
    IndexOutOfRange,
    #[error("no sensor with that address")]
    AddressNotFound,
    #[error("no sensor with that name")]
    NameNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", PollError::IndexOutOfRange),
            "sensor index out of range"
        );
        assert_eq!(
            format!("{}", PollError::AddressNotFound),
            "no sensor with that address"
        );
        assert_eq!(
            format!("{}", PollError::NameNotFound),
            "no sensor with that name"
        );
    }

    #[test]
    fn test_error_is_copy_and_comparable() {
        let a = PollError::NameNotFound;
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, PollError::IndexOutOfRange);
    }
}
