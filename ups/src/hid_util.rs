//! hidraw ioctl bindings (`linux/hidraw.h`).

use std::os::fd::AsRawFd;

use nix::{ioctl_read, ioctl_readwrite_buf, libc};

const HIDRAW_IOC_MAGIC: u8 = b'H';

pub const HID_MAX_DESCRIPTOR_SIZE: usize = 4096;

#[repr(C)]
pub struct HidrawReportDescriptor {
    pub size: u32,
    pub value: [u8; HID_MAX_DESCRIPTOR_SIZE],
}

impl HidrawReportDescriptor {
    pub fn with_size(size: u32) -> Box<Self> {
        Box::new(Self {
            size,
            value: [0; HID_MAX_DESCRIPTOR_SIZE],
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HidrawDevinfo {
    pub bustype: u32,
    pub vendor: i16,
    pub product: i16,
}

ioctl_read!(
    hidraw_get_report_descriptor_size,
    HIDRAW_IOC_MAGIC,
    0x01,
    libc::c_int
);
ioctl_read!(
    hidraw_get_report_descriptor,
    HIDRAW_IOC_MAGIC,
    0x02,
    HidrawReportDescriptor
);
ioctl_read!(hidraw_get_raw_info, HIDRAW_IOC_MAGIC, 0x03, HidrawDevinfo);
ioctl_readwrite_buf!(hidraw_get_feature, HIDRAW_IOC_MAGIC, 0x07, u8);

/// Runs the descriptor-size, descriptor and raw-info queries in that order and
/// returns the raw info. Any failing query fails the whole probe.
pub(crate) fn query_raw_info(fd: &impl AsRawFd) -> nix::Result<HidrawDevinfo> {
    let fd = fd.as_raw_fd();

    let mut descriptor_size: libc::c_int = 0;
    unsafe { hidraw_get_report_descriptor_size(fd, &mut descriptor_size)? };

    let size = u32::try_from(descriptor_size)
        .ok()
        .filter(|&size| size as usize <= HID_MAX_DESCRIPTOR_SIZE)
        .ok_or(nix::Error::EINVAL)?;
    let mut descriptor = HidrawReportDescriptor::with_size(size);
    unsafe { hidraw_get_report_descriptor(fd, &mut *descriptor)? };

    let mut info = HidrawDevinfo::default();
    unsafe { hidraw_get_raw_info(fd, &mut info)? };

    Ok(info)
}

/// Issues `HIDIOCGFEATURE` sized to `buffer`. `buffer[0]` must hold the report
/// id. Returns the number of bytes the device supplied.
pub(crate) fn get_feature_report(fd: &impl AsRawFd, buffer: &mut [u8]) -> nix::Result<usize> {
    let length = unsafe { hidraw_get_feature(fd.as_raw_fd(), buffer)? };
    Ok(usize::try_from(length).unwrap_or(0))
}
