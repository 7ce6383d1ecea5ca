use bitflags::bitflags;
use serde::Serialize;

use crate::{
    error::Result,
    report::{FlagsReport, ValuesReport},
};

pub trait Ups {
    /// Get UPS status
    fn status(&mut self) -> Result<UpsStatus>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "StatusLine")]
pub struct UpsStatus {
    pub charge_percent: u8,
    pub runtime_minutes: u16,
    pub flags: UpsStatusFlags,
}

impl UpsStatus {
    /// Combines the two reports as the device reported them, without any
    /// range checks.
    pub fn decode(values: &ValuesReport, flags: &FlagsReport) -> Self {
        let mut status_flags = UpsStatusFlags::empty();
        status_flags.set(UpsStatusFlags::LINE_POWER, flags.line_powered());
        status_flags.set(UpsStatusFlags::BATTERY_LOW, flags.battery_low());
        status_flags.set(UpsStatusFlags::CHARGING, flags.charging());
        status_flags.set(UpsStatusFlags::DISCHARGING, flags.discharging());

        Self {
            charge_percent: values.charge_percent(),
            runtime_minutes: values.runtime_minutes(),
            flags: status_flags,
        }
    }

    pub fn line_powered(&self) -> bool {
        self.flags.contains(UpsStatusFlags::LINE_POWER)
    }

    pub fn battery_low(&self) -> bool {
        self.flags.contains(UpsStatusFlags::BATTERY_LOW)
    }

    pub fn charging(&self) -> bool {
        self.flags.contains(UpsStatusFlags::CHARGING)
    }

    pub fn discharging(&self) -> bool {
        self.flags.contains(UpsStatusFlags::DISCHARGING)
    }

    /// The single JSON line the monitoring side expects, without a newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct UpsStatusFlags: u8 {
        const LINE_POWER  = 0b0001;
        const BATTERY_LOW = 0b0010;
        const CHARGING    = 0b0100;
        const DISCHARGING = 0b1000;
    }
}

/// Wire form of [`UpsStatus`]. Field order is the key order.
#[derive(Serialize)]
struct StatusLine {
    charge: u8,
    runtime: u16,
    line: bool,
    battery_low: bool,
    charging: bool,
    discharging: bool,
}

impl From<UpsStatus> for StatusLine {
    fn from(status: UpsStatus) -> Self {
        Self {
            charge: status.charge_percent,
            runtime: status.runtime_minutes,
            line: status.line_powered(),
            battery_low: status.battery_low(),
            charging: status.charging(),
            discharging: status.discharging(),
        }
    }
}
