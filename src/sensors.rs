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

//! hwmon-backed sensor sources.
//!
//! Temperature inputs are millidegree Celsius files (`tempN_input`), fan
//! inputs plain RPM (`fanN_input`). A missing or unreadable input simply
//! yields `None`; the session skips that tick instead of displaying stale
//! or zero data.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const HWMON_ROOT: &str = "/sys/class/hwmon";

/// CPU temperature drivers in preference order. The first chip whose
/// `name` file matches wins; otherwise any chip with a temp input is used.
const TEMP_CHIP_PREFERENCE: &[&str] = &["k10temp", "zenpower", "coretemp", "cpu_thermal", "acpitz"];

/// One numeric input the display can show. `read` returns `None` when the
/// value is currently unavailable; that is a normal state, not an error.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource {
    fn read(&self) -> Option<f64>;
    fn describe(&self) -> String;
}

/// Temperature source scaled from millidegrees to degrees Celsius.
#[derive(Debug, Clone)]
pub struct HwmonTempSensor {
    input: Option<PathBuf>,
}

impl HwmonTempSensor {
    pub fn new(input: Option<PathBuf>) -> Self {
        Self { input }
    }
}

impl SensorSource for HwmonTempSensor {
    fn read(&self) -> Option<f64> {
        let path = self.input.as_ref()?;
        let raw = read_trimmed(path).ok()?;
        let millideg = raw.parse::<i64>().ok()?;
        Some(millideg as f64 / 1000.0)
    }

    fn describe(&self) -> String {
        match &self.input {
            Some(p) => format!("temp:{}", p.display()),
            None => "temp:unavailable".to_string(),
        }
    }
}

/// Fan speed source reading RPM directly.
#[derive(Debug, Clone)]
pub struct HwmonFanSensor {
    input: Option<PathBuf>,
}

impl HwmonFanSensor {
    pub fn new(input: Option<PathBuf>) -> Self {
        Self { input }
    }
}

impl SensorSource for HwmonFanSensor {
    fn read(&self) -> Option<f64> {
        let path = self.input.as_ref()?;
        let raw = read_trimmed(path).ok()?;
        let rpm = raw.parse::<u64>().ok()?;
        Some(rpm as f64)
    }

    fn describe(&self) -> String {
        match &self.input {
            Some(p) => format!("fan:{}", p.display()),
            None => "fan:unavailable".to_string(),
        }
    }
}

/// Locate a default CPU temperature input under `/sys/class/hwmon`.
pub fn find_default_temp_input() -> Option<PathBuf> {
    find_temp_input_under(Path::new(HWMON_ROOT))
}

/// Locate the first fan tach input under `/sys/class/hwmon`.
pub fn find_default_fan_input() -> Option<PathBuf> {
    find_fan_input_under(Path::new(HWMON_ROOT))
}

pub(crate) fn find_temp_input_under(root: &Path) -> Option<PathBuf> {
    let chips = enumerate_chips(root);
    for preferred in TEMP_CHIP_PREFERENCE {
        for (name, dir) in &chips {
            if name == preferred {
                if let Some(input) = lowest_input(dir, "temp") {
                    return Some(input);
                }
            }
        }
    }
    chips.iter().find_map(|(_, dir)| lowest_input(dir, "temp"))
}

pub(crate) fn find_fan_input_under(root: &Path) -> Option<PathBuf> {
    enumerate_chips(root)
        .iter()
        .find_map(|(_, dir)| lowest_input(dir, "fan"))
}

/// All hwmon chips as `(name, dir)`, sorted by directory name so discovery
/// is stable across runs.
fn enumerate_chips(root: &Path) -> Vec<(String, PathBuf)> {
    let mut chips: Vec<(String, PathBuf)> = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return chips;
    };
    for ent in entries.flatten() {
        let path = ent.path();
        if !path.is_dir() {
            continue;
        }
        let dir = fs::canonicalize(&path).unwrap_or(path);
        let name = read_trimmed(dir.join("name")).unwrap_or_else(|_| "unknown".into());
        chips.push((name, dir));
    }
    chips.sort_by(|a, b| a.1.cmp(&b.1));
    chips
}

/// Smallest-index `<prefix>N_input` file present in a chip directory.
fn lowest_input(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;
    let entries = fs::read_dir(dir).ok()?;
    for ent in entries.flatten() {
        let fname = ent.file_name();
        let fname = fname.to_string_lossy();
        if let Some(idx) = extract_index(&fname, prefix, "_input") {
            match &best {
                Some((cur, _)) if *cur <= idx => {}
                _ => best = Some((idx, ent.path())),
            }
        }
    }
    best.map(|(_, p)| p)
}

pub fn extract_index(fname: &str, prefix: &str, suffix: &str) -> Option<usize> {
    if fname.starts_with(prefix)
        && fname.ends_with(suffix)
        && fname.len() > prefix.len() + suffix.len()
    {
        fname[prefix.len()..fname.len() - suffix.len()].parse().ok()
    } else {
        None
    }
}

fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}
