use std::path::PathBuf;

/// Filesystem roots the locators scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Directory holding the `hidrawN` character devices.
    pub device_nodes: PathBuf,
    /// One subdirectory per USB device, with `idVendor`, `idProduct`, `busnum`
    /// and `devnum` attribute files.
    pub usb_topology: PathBuf,
    /// usbfs control nodes, laid out as `<bus>/<dev>`.
    pub usbfs: PathBuf,
}

impl Paths {
    pub const DEVICE_NODES: &'static str = "/dev";
    pub const USB_TOPOLOGY: &'static str = "/sys/bus/usb/devices";
    pub const USBFS: &'static str = "/dev/bus/usb";
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            device_nodes: Self::DEVICE_NODES.into(),
            usb_topology: Self::USB_TOPOLOGY.into(),
            usbfs: Self::USBFS.into(),
        }
    }
}
