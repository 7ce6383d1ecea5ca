use std::{
    cell::UnsafeCell,
    fs::{self, File, OpenOptions},
    marker::PhantomData,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, info, trace, warn};
use nix::ioctl_none;
use static_assertions::{assert_impl_all, assert_not_impl_all};

use crate::{
    config::Paths,
    error::{DeviceKind, Error, Result},
    identity::DeviceIdentity,
    report::Remediation,
    util::{parse_leading_number, read_attribute_prefix},
};

const ID_ATTRIBUTE_LENGTH: u64 = 4;
const NUMBER_ATTRIBUTE_LENGTH: u64 = 128;

ioctl_none!(usbdevfs_reset, b'U', 20);

/// Bus and device number of a USB device, as exposed by `busnum`/`devnum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAddress {
    pub bus: i64,
    pub device: i64,
}

impl BusAddress {
    /// `<root>/<bus>/<device>`, both zero-padded to three digits.
    pub fn control_node_path(&self, usbfs: &Path) -> PathBuf {
        usbfs
            .join(format!("{:03}", self.bus))
            .join(format!("{:03}", self.device))
    }
}

/// Lists the entries of the USB topology directory whose names start with a
/// digit. That drops the `usbN` root hubs; interface entries like `1-1:1.0`
/// stay and are skipped later for lacking `idVendor`.
pub fn usb_topology_entries(directory: &Path) -> Result<impl Iterator<Item = PathBuf>> {
    let entries = fs::read_dir(directory).map_err(|source| Error::Enumeration {
        path: directory.to_path_buf(),
        source,
    })?;

    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(|c: char| c.is_ascii_digit())
        })
        .map(|entry| entry.path()))
}

fn read_hex_id(entry: &Path, attribute: &str) -> anyhow::Result<u16> {
    let text = read_attribute_prefix(&entry.join(attribute), ID_ATTRIBUTE_LENGTH)?;
    Ok(parse_leading_number(&text, 16) as u16)
}

fn read_number(entry: &Path, attribute: &str) -> anyhow::Result<i64> {
    let text = read_attribute_prefix(&entry.join(attribute), NUMBER_ATTRIBUTE_LENGTH)?;
    Ok(parse_leading_number(&text, 10))
}

pub fn read_identity(entry: &Path) -> anyhow::Result<DeviceIdentity> {
    Ok(DeviceIdentity::new(
        read_hex_id(entry, "idVendor")?,
        read_hex_id(entry, "idProduct")?,
    ))
}

pub fn read_bus_address(entry: &Path) -> anyhow::Result<BusAddress> {
    Ok(BusAddress {
        bus: read_number(entry, "busnum")?,
        device: read_number(entry, "devnum")?,
    })
}

/// Walks the topology directory and returns the address of the first device
/// matching `identity`. Entries with unreadable attributes are skipped.
pub fn find_bus_address(identity: &DeviceIdentity, topology: &Path) -> Result<BusAddress> {
    usb_topology_entries(topology)?
        .find_map(|entry| {
            let probe = || -> anyhow::Result<Option<BusAddress>> {
                let found = read_identity(&entry)?;
                if found != *identity {
                    trace!("{} is {}, skipping", entry.display(), found);
                    return Ok(None);
                }
                read_bus_address(&entry)
                    .map(Some)
                    .with_context(|| format!("{} matched", entry.display()))
            };

            probe().unwrap_or_else(|error| {
                debug!("Skipping {}: {:#}", entry.display(), error);
                None
            })
        })
        .ok_or(Error::DeviceNotFound {
            kind: DeviceKind::Bus,
            identity: *identity,
        })
}

/// A write handle to a usbfs control node. Closed when dropped.
#[derive(Debug)]
pub struct UsbDevice {
    file: File,
    path: PathBuf,
    _send_not_sync: PhantomData<UnsafeCell<()>>,
}

assert_impl_all!(UsbDevice: Send);
assert_not_impl_all!(UsbDevice: Sync);

impl UsbDevice {
    pub fn open(identity: &DeviceIdentity, paths: &Paths) -> Result<Self> {
        let address = find_bus_address(identity, &paths.usb_topology)?;
        Self::open_path(&address.control_node_path(&paths.usbfs))
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| Error::ControlNode {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _send_not_sync: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reset(&self) -> Result<()> {
        unsafe { usbdevfs_reset(self.file.as_raw_fd()) }
            .map(drop)
            .map_err(|source| Error::Reset {
                path: self.path.clone(),
                source,
            })
    }
}

/// Port reset of the UPS through usbfs. Failures are logged, never returned.
#[derive(Debug, Clone, Copy)]
pub struct UsbReset<'a> {
    identity: &'a DeviceIdentity,
    paths: &'a Paths,
}

impl<'a> UsbReset<'a> {
    pub fn new(identity: &'a DeviceIdentity, paths: &'a Paths) -> Self {
        Self { identity, paths }
    }

    fn try_reset(&self) -> Result<()> {
        let device = UsbDevice::open(self.identity, self.paths)?;
        debug!("Resetting {}", device.path().display());
        device.reset()
    }

    fn report_outcome(outcome: Result<()>) {
        match outcome {
            Ok(()) => info!("Usbreset successful"),
            Err(error) => warn!("Unable to do usbreset: {}", error),
        }
    }
}

impl Remediation for UsbReset<'_> {
    fn remediate(&mut self) {
        info!("Trying usb reset");
        Self::report_outcome(self.try_reset());
    }
}
