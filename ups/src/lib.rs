//! Reads the status of HID UPS devices through Linux hidraw feature reports,
//! with an optional usbfs port reset when a read fails.

pub mod config;
pub mod error;
pub mod hid_device;
mod hid_util;
pub mod identity;
pub mod phoenix_hid_ups;
pub mod report;
pub mod ups;
pub mod usb_device;
mod util;

#[cfg(test)]
mod test_log;

pub use error::{Error, Result};
