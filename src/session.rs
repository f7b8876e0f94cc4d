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

//! One display session: connect, init, then tick until cancelled.
//!
//! Single thread of control. Each tick advances the rotation, reads the
//! active slot's sensor, encodes a packet and writes it. A failed write is
//! treated as a disconnect: the handle is dropped and the loop goes back
//! through the connect retry before the next tick. No tick failure ever
//! terminates the loop; only the cancellation flag does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::json;

use crate::logger;
use crate::protocol::{self, Reading, TempUnit};
use crate::schedule::{DisplayMode, DisplayScheduler};
use crate::sensors::SensorSource;
use crate::transport::{HidConnector, HidTransport, PRODUCT_ID, VENDOR_ID};

/// Fixed backoff between connect attempts.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// Log a waiting notice on the first attempt and then every Nth, to keep
/// an unplugged panel from flooding the journal.
const CONNECT_NOTICE_EVERY: u64 = 10;
/// Granularity of cancellation checks while sleeping.
const POLL_SLEEP: Duration = Duration::from_millis(50);

pub struct DeviceSession {
    connector: Box<dyn HidConnector>,
    transport: Option<Box<dyn HidTransport>>,
    scheduler: DisplayScheduler,
    temp_sensor: Box<dyn SensorSource>,
    fan_sensor: Box<dyn SensorSource>,
    flash_above_c: Option<f64>,
    cancel: Arc<AtomicBool>,
}

impl DeviceSession {
    pub fn new(
        connector: Box<dyn HidConnector>,
        scheduler: DisplayScheduler,
        temp_sensor: Box<dyn SensorSource>,
        fan_sensor: Box<dyn SensorSource>,
        flash_above_c: Option<f64>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            connector,
            transport: None,
            scheduler,
            temp_sensor,
            fan_sensor,
            flash_above_c,
            cancel,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Acquire the transport, retrying at a fixed interval until it opens.
    /// Returns `false` only when cancelled; never gives up on its own.
    pub fn connect(&mut self) -> bool {
        let mut attempt: u64 = 0;
        loop {
            if self.cancelled() {
                return false;
            }
            attempt += 1;
            match self.connector.try_open() {
                Ok(transport) => {
                    self.transport = Some(transport);
                    eprintln!("segtherm: display connected after {} attempt(s)", attempt);
                    logger::log_event("device_connected", json!({ "attempts": attempt }));
                    return true;
                }
                Err(e) => {
                    if attempt == 1 || attempt % CONNECT_NOTICE_EVERY == 0 {
                        eprintln!(
                            "segtherm: waiting for display {:04x}:{:04x} ({})",
                            VENDOR_ID, PRODUCT_ID, e
                        );
                        logger::log_event(
                            "device_wait",
                            json!({ "attempt": attempt, "error": e.to_string() }),
                        );
                    }
                }
            }
            self.cancellable_sleep(CONNECT_RETRY_INTERVAL);
        }
    }

    /// Send the init report once after connecting. The panel works without
    /// it on warm reconnects, so failure is reported but not fatal.
    pub fn initialize(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.write_report(protocol::encode_init().as_bytes()) {
            eprintln!("segtherm: init packet failed: {}", e);
            logger::log_event("init_failed", json!({ "error": e.to_string() }));
        }
    }

    /// One polling tick: rotate, read, encode, write. An absent sensor
    /// value skips the write entirely; a failed write drops the handle so
    /// the run loop reconnects.
    pub fn tick(&mut self, now: Instant) {
        self.scheduler.advance(now);
        let slot = self.scheduler.current_slot();

        let Some((reading, flashing)) = self.read_slot(slot.mode) else {
            logger::log_event(
                "tick_skipped",
                json!({
                    "mode": format!("{:?}", slot.mode),
                    "source": self.slot_source(slot.mode),
                }),
            );
            return;
        };

        let packet = protocol::encode(reading, flashing);
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.write_report(packet.as_bytes()) {
            eprintln!("segtherm: write failed, assuming display unplugged: {}", e);
            logger::log_event("device_lost", json!({ "error": e.to_string() }));
            // Drop the handle; the run loop reconnects before the next tick.
            self.transport = None;
        }
    }

    /// The polling loop. Interval comes from configuration; sleeps are
    /// chopped into short slices so cancellation stays prompt.
    pub fn run(&mut self, interval: Duration) -> Result<()> {
        let mut last: Option<Instant> = None;
        loop {
            if self.cancelled() {
                break;
            }
            if self.transport.is_none() {
                if !self.connect() {
                    break;
                }
                self.initialize();
            }
            let now = Instant::now();
            if let Some(prev) = last {
                if now.duration_since(prev) < interval {
                    thread::sleep(POLL_SLEEP);
                    continue;
                }
            }
            last = Some(now);
            self.tick(now);
        }
        logger::log_event("session_end", json!({}));
        Ok(())
    }

    fn read_slot(&self, mode: DisplayMode) -> Option<(Reading, bool)> {
        match mode {
            DisplayMode::Celsius | DisplayMode::Fahrenheit => {
                let celsius = self.temp_sensor.read()?;
                let flashing = self.flash_above_c.is_some_and(|limit| celsius > limit);
                let reading = match mode {
                    DisplayMode::Celsius => Reading::Temperature {
                        value: celsius,
                        unit: TempUnit::Celsius,
                    },
                    _ => Reading::Temperature {
                        value: protocol::celsius_to_fahrenheit(celsius),
                        unit: TempUnit::Fahrenheit,
                    },
                };
                Some((reading, flashing))
            }
            DisplayMode::Fan => {
                let rpm = self.fan_sensor.read()?;
                Some((
                    Reading::FanSpeed {
                        rpm: rpm.max(0.0).round() as u64,
                    },
                    false,
                ))
            }
        }
    }

    fn slot_source(&self, mode: DisplayMode) -> String {
        match mode {
            DisplayMode::Fan => self.fan_sensor.describe(),
            _ => self.temp_sensor.describe(),
        }
    }

    fn cancellable_sleep(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.cancelled() {
                return;
            }
            let step = remaining.min(POLL_SLEEP);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}
