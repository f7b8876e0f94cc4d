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

//! Daemon configuration: rotation slots, poll interval, sensor overrides.
//!
//! JSON on disk. The user copy lives under the XDG config dir and is
//! promoted to `/etc/segtherm/config.json` with `segtherm save`; the
//! system copy is what the daemon loads at boot.

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schedule::{DisplayMode, DisplaySlot};

pub const MAX_SLOTS: usize = 32;
pub const MIN_SLOT_SECONDS: u64 = 1;
pub const MAX_SLOT_SECONDS: u64 = 3600;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub mode: DisplayMode,
    pub seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    /// Ordered display rotation. An empty list is legal; the scheduler
    /// substitutes a default Celsius slot.
    #[serde(default = "default_slots")]
    pub slots: Vec<SlotSpec>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Explicit sysfs temperature input; autodetected when absent.
    #[serde(default)]
    pub temp_input: Option<PathBuf>,
    /// Explicit sysfs fan input; autodetected when absent.
    #[serde(default)]
    pub fan_input: Option<PathBuf>,
    /// Flash the display while the CPU temperature exceeds this (Celsius).
    #[serde(default)]
    pub flash_above_c: Option<f64>,
}

fn default_slots() -> Vec<SlotSpec> {
    vec![
        SlotSpec {
            mode: DisplayMode::Celsius,
            seconds: 10,
        },
        SlotSpec {
            mode: DisplayMode::Fan,
            seconds: 5,
        },
    ]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            poll_interval_ms: default_poll_interval_ms(),
            temp_input: None,
            fan_input: None,
            flash_above_c: None,
        }
    }
}

impl DisplayConfig {
    pub fn slots(&self) -> Vec<DisplaySlot> {
        self.slots
            .iter()
            .map(|s| DisplaySlot {
                mode: s.mode,
                duration: Duration::from_secs(s.seconds),
            })
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("segtherm").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("segtherm")
            .join("config.json");
    }
    PathBuf::from("/etc/segtherm/config.json")
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/segtherm/config.json")
}

/// Best-effort load of the user config; `None` when missing or unparsable.
pub fn load_user_config() -> Option<DisplayConfig> {
    let data = fs::read_to_string(config_path()).ok()?;
    serde_json::from_str(&data).ok()
}

/// Load and validate the system config, with a readable reason on failure.
pub fn try_load_system_config() -> Result<DisplayConfig, String> {
    let path = system_config_path();
    let data = fs::read_to_string(&path).map_err(|e| e.to_string())?;
    let cfg: DisplayConfig =
        serde_json::from_str(&data).map_err(|e| format!("parse error: {}", e))?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn write_system_config(cfg: &DisplayConfig) -> io::Result<()> {
    let path = system_config_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(cfg).unwrap_or_else(|_| "{}".to_string());
    fs::write(&path, json)?;
    // Best-effort set permissions to 0644
    let perms = fs::Permissions::from_mode(0o644);
    let _ = fs::set_permissions(&path, perms);
    Ok(())
}

pub fn validate_config(cfg: &DisplayConfig) -> Result<(), String> {
    if cfg.slots.len() > MAX_SLOTS {
        return Err(format!("too many display slots (max {})", MAX_SLOTS));
    }
    for (i, s) in cfg.slots.iter().enumerate() {
        if !(MIN_SLOT_SECONDS..=MAX_SLOT_SECONDS).contains(&s.seconds) {
            return Err(format!(
                "slot #{} duration out of range ({}..={} seconds)",
                i + 1,
                MIN_SLOT_SECONDS,
                MAX_SLOT_SECONDS
            ));
        }
    }
    if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&cfg.poll_interval_ms) {
        return Err(format!(
            "poll_interval_ms out of range ({}..={})",
            MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS
        ));
    }
    for (field, path) in [
        ("temp_input", &cfg.temp_input),
        ("fan_input", &cfg.fan_input),
    ] {
        if let Some(p) = path {
            if !p.is_absolute() {
                return Err(format!("{} must be an absolute path", field));
            }
        }
    }
    if let Some(limit) = cfg.flash_above_c {
        if !limit.is_finite() || !(0.0..=150.0).contains(&limit) {
            return Err("flash_above_c out of range (0..=150)".to_string());
        }
    }
    Ok(())
}

/// Config used by the daemon: system copy first, then the user copy,
/// then built-in defaults.
pub fn load_or_default() -> DisplayConfig {
    match try_load_system_config() {
        Ok(cfg) => cfg,
        Err(_) => load_user_config().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = DisplayConfig::default();
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert_eq!(cfg.slots.len(), 2);
        assert_eq!(cfg.slots[0].mode, DisplayMode::Celsius);
    }

    #[test]
    fn test_round_trip_json() {
        let cfg = DisplayConfig {
            slots: vec![
                SlotSpec {
                    mode: DisplayMode::Fahrenheit,
                    seconds: 7,
                },
                SlotSpec {
                    mode: DisplayMode::Fan,
                    seconds: 3,
                },
            ],
            poll_interval_ms: 500,
            temp_input: Some(PathBuf::from("/sys/class/hwmon/hwmon2/temp1_input")),
            fan_input: None,
            flash_above_c: Some(85.0),
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let loaded: DisplayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_minimal_json_gets_defaults() {
        let loaded: DisplayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, DisplayConfig::default());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = serde_json::from_str::<DisplayConfig>(r#"{ "brightness": 5 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_slot_duration_bounds() {
        let mut cfg = DisplayConfig::default();
        cfg.slots[0].seconds = 0;
        assert!(validate_config(&cfg).is_err());
        cfg.slots[0].seconds = MAX_SLOT_SECONDS + 1;
        assert!(validate_config(&cfg).is_err());
        cfg.slots[0].seconds = MAX_SLOT_SECONDS;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_too_many_slots() {
        let cfg = DisplayConfig {
            slots: (0..MAX_SLOTS + 1)
                .map(|_| SlotSpec {
                    mode: DisplayMode::Fan,
                    seconds: 5,
                })
                .collect(),
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_poll_interval_bounds() {
        let mut cfg = DisplayConfig::default();
        cfg.poll_interval_ms = 99;
        assert!(validate_config(&cfg).is_err());
        cfg.poll_interval_ms = 60_001;
        assert!(validate_config(&cfg).is_err());
        cfg.poll_interval_ms = 100;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_relative_sensor_path() {
        let cfg = DisplayConfig {
            temp_input: Some(PathBuf::from("hwmon0/temp1_input")),
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_flash_threshold() {
        let mut cfg = DisplayConfig::default();
        cfg.flash_above_c = Some(-1.0);
        assert!(validate_config(&cfg).is_err());
        cfg.flash_above_c = Some(f64::NAN);
        assert!(validate_config(&cfg).is_err());
        cfg.flash_above_c = Some(90.0);
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_empty_slot_list_is_valid() {
        let cfg = DisplayConfig {
            slots: Vec::new(),
            ..Default::default()
        };
        // The scheduler falls back to its default slot.
        assert!(validate_config(&cfg).is_ok());
        assert!(cfg.slots().is_empty());
    }

    #[test]
    fn test_slot_conversion() {
        let cfg = DisplayConfig::default();
        let slots = cfg.slots();
        assert_eq!(slots[0].duration, Duration::from_secs(10));
        assert_eq!(slots[1].mode, DisplayMode::Fan);
    }

    #[test]
    #[serial]
    fn test_config_path_with_xdg() {
        std::env::set_var("XDG_CONFIG_HOME", "/custom/config");
        let path = config_path();
        assert!(path
            .to_string_lossy()
            .contains("/custom/config/segtherm/config.json"));
        std::env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn test_config_path_with_home() {
        std::env::remove_var("XDG_CONFIG_HOME");
        std::env::set_var("HOME", "/home/testuser");
        let path = config_path();
        assert!(path
            .to_string_lossy()
            .contains("/home/testuser/.config/segtherm/config.json"));
    }

    #[test]
    fn test_system_config_path() {
        assert_eq!(
            system_config_path(),
            PathBuf::from("/etc/segtherm/config.json")
        );
    }
}
