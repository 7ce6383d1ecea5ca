use std::{fmt, str::FromStr};

use crate::error::Error;

/// Vendor/product pair the UPS is searched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl FromStr for DeviceIdentity {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidIdentity(string.to_string());

        let (vendor, product) = string.split_once(':').ok_or_else(invalid)?;

        Ok(Self {
            vendor_id: parse_hex_id(vendor).ok_or_else(invalid)?,
            product_id: parse_hex_id(product).ok_or_else(invalid)?,
        })
    }
}

fn parse_hex_id(part: &str) -> Option<u16> {
    if part.is_empty() || part.len() > 4 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(part, 16).ok()
}
