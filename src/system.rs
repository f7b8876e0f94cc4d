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

//! Host probing: best-effort loading of the hwmon kernel modules the
//! sensor autodetection depends on.

use std::fs;
use std::process::Command;

fn modprobe(module: &str) {
    let _ = Command::new("modprobe").args(["-q", module]).output();
}

/// Load common temperature and fan sensor modules. Failures are
/// ignored; built-in or already-loaded modules simply no-op.
pub fn load_sensor_modules() {
    // Super I/O fan controllers
    for m in ["nct6775", "it87", "w83627ehf"] {
        modprobe(m);
    }

    // CPU temperature driver by vendor string
    if let Ok(cpuinfo) = fs::read_to_string("/proc/cpuinfo") {
        if cpuinfo.contains("GenuineIntel") {
            modprobe("coretemp");
        } else if cpuinfo.contains("AuthenticAMD") {
            modprobe("k10temp");
            modprobe("k8temp");
        }
    }

    // Laptop embedded controllers by board vendor
    if let Ok(vendor) = fs::read_to_string("/sys/devices/virtual/dmi/id/board_vendor") {
        let vendor = vendor.trim().to_lowercase();
        if vendor.contains("dell") {
            modprobe("dell_smm_hwmon");
        } else if vendor.contains("lenovo") || vendor.contains("ibm") {
            modprobe("thinkpad_acpi");
        }
    }
}
