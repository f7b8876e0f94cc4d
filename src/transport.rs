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

//! USB HID transport for the display panel.
//!
//! The panel is write-only: one 64-byte output report per update, nothing
//! read back. The device is matched by fixed vendor/product identifiers on
//! interface 0. Everything behind the two traits here is mockable, so the
//! session logic tests without hardware.

use hidapi::{HidApi, HidDevice};
use thiserror::Error;

use crate::protocol::REPORT_LEN;

pub const VENDOR_ID: u16 = 0x1B80;
pub const PRODUCT_ID: u16 = 0xB53A;
pub const INTERFACE_NUMBER: i32 = 0;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no HID device {vendor:04x}:{product:04x} on interface {interface}")]
    DeviceNotFound {
        vendor: u16,
        product: u16,
        interface: i32,
    },
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

/// An open handle to the panel. Exclusively owned by the session; dropping
/// it closes the underlying device.
#[cfg_attr(test, mockall::automock)]
pub trait HidTransport {
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError>;
}

/// Enumerates and opens the panel. Split from [`HidTransport`] so the
/// session can reacquire a fresh handle after a failed write.
#[cfg_attr(test, mockall::automock)]
pub trait HidConnector {
    fn try_open(&mut self) -> Result<Box<dyn HidTransport>, TransportError>;
}

pub struct HidapiTransport {
    device: HidDevice,
}

impl HidTransport for HidapiTransport {
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        // hidraw expects the report number in front of the payload; the
        // panel uses unnumbered reports, so that byte is zero.
        let mut framed = Vec::with_capacity(report.len() + 1);
        framed.push(0x00);
        framed.extend_from_slice(report);
        let written = self.device.write(&framed)?;
        if written < report.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: REPORT_LEN,
            });
        }
        Ok(())
    }
}

pub struct HidapiConnector {
    api: HidApi,
    vendor: u16,
    product: u16,
    interface: i32,
}

impl HidapiConnector {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            api: HidApi::new()?,
            vendor: VENDOR_ID,
            product: PRODUCT_ID,
            interface: INTERFACE_NUMBER,
        })
    }
}

impl HidConnector for HidapiConnector {
    fn try_open(&mut self) -> Result<Box<dyn HidTransport>, TransportError> {
        // Refresh so a freshly plugged-in panel shows up between retries.
        self.api.refresh_devices()?;
        let info = self
            .api
            .device_list()
            .find(|d| {
                d.vendor_id() == self.vendor
                    && d.product_id() == self.product
                    && d.interface_number() == self.interface
            })
            .ok_or(TransportError::DeviceNotFound {
                vendor: self.vendor,
                product: self.product,
                interface: self.interface,
            })?;
        let device = self.api.open_path(info.path())?;
        Ok(Box::new(HidapiTransport { device }))
    }
}
