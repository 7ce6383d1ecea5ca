//! Feature report buffers, their fixed layouts, and the bounded retry used to
//! fetch them.

use log::{debug, warn};

use crate::{
    error::{Error, Result},
    hid_device::FeatureReportDevice,
};

pub const REPORT_BUFFER_SIZE: usize = 64;

/// Buffer handed to `HIDIOCGFEATURE`. Byte 0 carries the requested report id
/// until the device overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    buffer: [u8; REPORT_BUFFER_SIZE],
    length: usize,
}

impl RawReport {
    pub fn request(report_id: u8) -> Self {
        let mut buffer = [0; REPORT_BUFFER_SIZE];
        buffer[0] = report_id;
        Self { buffer, length: 0 }
    }

    /// Bytes the device actually supplied.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn fetch(&mut self, device: &mut impl FeatureReportDevice) {
        self.length = match device.get_feature_report(&mut self.buffer) {
            Ok(length) => length.min(REPORT_BUFFER_SIZE),
            Err(error) => {
                debug!("HIDIOCGFEATURE({:#04x}) failed: {}", self.buffer[0], error);
                0
            }
        };
    }
}

/// A report with a hardcoded layout.
pub trait FeatureReport: Sized {
    const REPORT_ID: u8;

    /// Shortest reply that still covers every field of the layout.
    const MIN_LENGTH: usize;

    /// Only called with reports of at least `MIN_LENGTH` bytes.
    fn from_valid(raw: RawReport) -> Self;

    fn try_from_raw(raw: RawReport) -> Option<Self> {
        if raw.len() >= Self::MIN_LENGTH {
            Some(Self::from_valid(raw))
        } else {
            None
        }
    }
}

/// Report 0x06: charge level and remaining runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesReport(RawReport);

impl ValuesReport {
    const CHARGE: usize = 1;
    const RUNTIME_LOW: usize = 2;
    const RUNTIME_HIGH: usize = 3;

    pub fn charge_percent(&self) -> u8 {
        self.0.bytes()[Self::CHARGE]
    }

    /// Little-endian.
    pub fn runtime_minutes(&self) -> u16 {
        let bytes = self.0.bytes();
        u16::from_le_bytes([bytes[Self::RUNTIME_LOW], bytes[Self::RUNTIME_HIGH]])
    }
}

impl FeatureReport for ValuesReport {
    const REPORT_ID: u8 = 0x06;
    const MIN_LENGTH: usize = 4;

    fn from_valid(raw: RawReport) -> Self {
        Self(raw)
    }
}

/// Report 0x01: one byte per power flag, non-zero meaning set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsReport(RawReport);

impl FlagsReport {
    const LINE_POWER: usize = 1;
    const BATTERY_LOW: usize = 2;
    const CHARGING: usize = 3;
    const DISCHARGING: usize = 4;

    fn flag(&self, offset: usize) -> bool {
        self.0.bytes()[offset] != 0
    }

    pub fn line_powered(&self) -> bool {
        self.flag(Self::LINE_POWER)
    }

    pub fn battery_low(&self) -> bool {
        self.flag(Self::BATTERY_LOW)
    }

    pub fn charging(&self) -> bool {
        self.flag(Self::CHARGING)
    }

    pub fn discharging(&self) -> bool {
        self.flag(Self::DISCHARGING)
    }
}

impl FeatureReport for FlagsReport {
    const REPORT_ID: u8 = 0x01;
    const MIN_LENGTH: usize = 5;

    fn from_valid(raw: RawReport) -> Self {
        Self(raw)
    }
}

/// Something to try between two failed report reads.
pub trait Remediation {
    /// Best effort. Whatever happens, the second attempt follows.
    fn remediate(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    FirstAttempt,
    Remediate,
    SecondAttempt,
    Fatal,
}

/// Reads feature reports with two attempts each, optionally remediating in
/// between.
#[derive(Debug)]
pub struct ReportReader<D, M> {
    device: D,
    remediation: Option<M>,
}

impl<D, M> ReportReader<D, M>
where
    D: FeatureReportDevice,
    M: Remediation,
{
    pub fn new(device: D, remediation: Option<M>) -> Self {
        Self {
            device,
            remediation,
        }
    }

    /// Fetches one report. Each call gets its own budget of two attempts.
    pub fn read<R: FeatureReport>(&mut self) -> Result<R> {
        let mut state = ReadState::FirstAttempt;
        loop {
            state = match state {
                ReadState::FirstAttempt | ReadState::SecondAttempt => {
                    if let Some(report) = self.attempt::<R>() {
                        return Ok(report);
                    }
                    warn!("Unable to fetch report {:#04x}", R::REPORT_ID);

                    match (state, self.remediation.is_some()) {
                        (ReadState::FirstAttempt, true) => ReadState::Remediate,
                        (ReadState::FirstAttempt, false) => ReadState::SecondAttempt,
                        _ => ReadState::Fatal,
                    }
                }
                ReadState::Remediate => {
                    if let Some(remediation) = self.remediation.as_mut() {
                        remediation.remediate();
                    }
                    ReadState::SecondAttempt
                }
                ReadState::Fatal => {
                    return Err(Error::ReportRead {
                        report_id: R::REPORT_ID,
                    })
                }
            };
        }
    }

    fn attempt<R: FeatureReport>(&mut self) -> Option<R> {
        let mut raw = RawReport::request(R::REPORT_ID);
        raw.fetch(&mut self.device);
        R::try_from_raw(raw)
    }
}
