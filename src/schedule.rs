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

//! Display rotation over the configured slots.
//!
//! Rotation is polled: the service loop calls [`DisplayScheduler::advance`]
//! once per tick with the current time, and the scheduler flips to the next
//! slot when the active one has been shown for its full duration. There is
//! no timer thread; passing timestamps in keeps the state machine
//! deterministic under test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// What a slot shows on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Celsius,
    Fahrenheit,
    Fan,
}

/// One entry in the display rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySlot {
    pub mode: DisplayMode,
    pub duration: Duration,
}

/// Duration of the synthetic slot substituted for an empty rotation.
pub const DEFAULT_SLOT_SECS: u64 = 10;

fn default_slot() -> DisplaySlot {
    DisplaySlot {
        mode: DisplayMode::Celsius,
        duration: Duration::from_secs(DEFAULT_SLOT_SECS),
    }
}

/// State machine over a non-empty ordered slot list.
///
/// The active index is always in range: an empty list is replaced by a
/// single Celsius slot at construction, and the list never changes during
/// a session.
#[derive(Debug)]
pub struct DisplayScheduler {
    slots: Vec<DisplaySlot>,
    active: usize,
    last_rotation: Instant,
}

impl DisplayScheduler {
    pub fn new(slots: Vec<DisplaySlot>, now: Instant) -> Self {
        let slots = if slots.is_empty() {
            vec![default_slot()]
        } else {
            slots
        };
        Self {
            slots,
            active: 0,
            last_rotation: now,
        }
    }

    /// Read-only query for the slot currently on the panel.
    pub fn current_slot(&self) -> DisplaySlot {
        self.slots[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Rotate if the active slot has used up its duration. The only
    /// mutator; a single-slot rotation never moves.
    pub fn advance(&mut self, now: Instant) {
        if self.slots.len() < 2 {
            return;
        }
        if now.duration_since(self.last_rotation) >= self.slots[self.active].duration {
            self.active = (self.active + 1) % self.slots.len();
            self.last_rotation = now;
        }
    }
}
