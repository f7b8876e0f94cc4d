/*
 * This file is part of Segtherm.
 *
 * Copyright (C) 2025 Segtherm contributors
 *
 * Segtherm is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Segtherm is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Segtherm. If not, see <https://www.gnu.org/licenses/>.
 */

//! Segtherm - USB 7-segment hardware monitor display daemon for Linux
//!
//! Reads CPU temperature and fan speed from hwmon and drives a
//! write-only 4-digit USB HID display, rotating between readings on a
//! configurable schedule.

pub mod config;
pub mod logger;
pub mod protocol;
pub mod schedule;
pub mod sensors;
pub mod session;
pub mod system;
pub mod transport;

#[cfg(test)]
pub mod test_utils;
