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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use segtherm::config::{
    self, config_path, load_user_config, system_config_path, validate_config, write_system_config,
};
use segtherm::logger;
use segtherm::schedule::DisplayScheduler;
use segtherm::sensors::{find_default_fan_input, find_default_temp_input, HwmonFanSensor, HwmonTempSensor};
use segtherm::session::DeviceSession;
use segtherm::system;
use segtherm::transport::HidapiConnector;

fn main() -> anyhow::Result<()> {
    // Check if running as root: hidraw nodes and modprobe need it
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: segtherm requires root privileges to access the display and load sensor modules.");
        eprintln!(
            "Please run with: sudo {}",
            std::env::args()
                .next()
                .unwrap_or_else(|| "segtherm".to_string())
        );
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().collect();

    // Optional logging to /etc/segtherm/logs.json
    let logging_enabled = args.iter().any(|a| a == "--logging");
    if logging_enabled {
        logger::init_logging();
        logger::log_event(
            "startup",
            serde_json::json!({
                "args": args,
            }),
        );
    }

    // `segtherm save` promotes the user config to /etc/segtherm/config.json and exits
    if args.get(1).map(|s| s.as_str()) == Some("save") {
        match load_user_config() {
            Some(cfg) => {
                if let Err(e) = validate_config(&cfg) {
                    eprintln!("Invalid config: {}", e);
                    std::process::exit(1);
                }
                write_system_config(&cfg)?;
                println!("Wrote config to {}", system_config_path().display());
                return Ok(());
            }
            None => {
                eprintln!(
                    "No user config found at {}. Write one first, then run: sudo segtherm save",
                    config_path().display()
                );
                std::process::exit(1);
            }
        }
    }

    let cfg = config::load_or_default();
    if let Err(e) = validate_config(&cfg) {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    if args.iter().any(|a| a == "--print-config") {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    // Auto-detect and load sensor modules before chip discovery
    system::load_sensor_modules();

    let temp_input = cfg.temp_input.clone().or_else(find_default_temp_input);
    let fan_input = cfg.fan_input.clone().or_else(find_default_fan_input);
    if temp_input.is_none() {
        eprintln!("Warning: no CPU temperature input found; temperature slots will be skipped.");
    }
    if fan_input.is_none() {
        eprintln!("Warning: no fan tachometer input found; fan slots will be skipped.");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::SeqCst);
    })?;

    let connector = HidapiConnector::new()?;
    let scheduler = DisplayScheduler::new(cfg.slots(), std::time::Instant::now());
    let mut session = DeviceSession::new(
        Box::new(connector),
        scheduler,
        Box::new(HwmonTempSensor::new(temp_input)),
        Box::new(HwmonFanSensor::new(fan_input)),
        cfg.flash_above_c,
        cancel,
    );

    let res = session.run(cfg.poll_interval());
    if let Err(ref err) = res {
        eprintln!("error: {err}");
        if logging_enabled {
            logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        }
        std::process::exit(1);
    }
    res
}
