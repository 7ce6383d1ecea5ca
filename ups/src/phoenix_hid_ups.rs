use log::debug;

use crate::{
    config::Paths,
    error::Result,
    hid_device::{FeatureReportDevice, HidDevice},
    identity::DeviceIdentity,
    report::{FlagsReport, Remediation, ReportReader, ValuesReport},
    ups::{Ups, UpsStatus},
    usb_device::UsbReset,
};

/// UPS of the Phoenix family, exposing status through feature reports 0x06 and
/// 0x01.
#[derive(Debug)]
pub struct PhoenixHidUps<D, M> {
    reader: ReportReader<D, M>,
}

impl<'a> PhoenixHidUps<HidDevice, UsbReset<'a>> {
    /// Locates the hidraw node for `identity`. With `auto_reset`, a failed
    /// read triggers a USB port reset before the retry.
    pub fn open(identity: &'a DeviceIdentity, paths: &'a Paths, auto_reset: bool) -> Result<Self> {
        let device = HidDevice::open(identity, paths)?;
        let remediation = auto_reset.then(|| UsbReset::new(identity, paths));

        Ok(Self::new(device, remediation))
    }
}

impl<D, M> PhoenixHidUps<D, M>
where
    D: FeatureReportDevice,
    M: Remediation,
{
    pub fn new(device: D, remediation: Option<M>) -> Self {
        Self {
            reader: ReportReader::new(device, remediation),
        }
    }
}

impl<D, M> Ups for PhoenixHidUps<D, M>
where
    D: FeatureReportDevice,
    M: Remediation,
{
    fn status(&mut self) -> Result<UpsStatus> {
        // The values report is settled before the flags report is requested.
        let values: ValuesReport = self.reader.read()?;
        let flags: FlagsReport = self.reader.read()?;

        let status = UpsStatus::decode(&values, &flags);
        debug!("{:?}", status);

        Ok(status)
    }
}
