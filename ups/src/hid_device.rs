use std::{
    cell::UnsafeCell,
    fmt::Debug,
    fs::{self, File, OpenOptions},
    io,
    marker::PhantomData,
    os::{
        fd::{AsRawFd, RawFd},
        unix::fs::{FileTypeExt, OpenOptionsExt},
    },
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, log_enabled, trace, Level};
use nix::libc;
use static_assertions::{assert_impl_all, assert_not_impl_all};

use crate::{
    config::Paths,
    error::{DeviceKind, Error, Result},
    hid_util::{get_feature_report, query_raw_info},
    identity::DeviceIdentity,
};

const HIDRAW_PREFIX: &str = "hidraw";

/// Anything feature reports can be requested from.
pub trait FeatureReportDevice {
    /// `buffer[0]` holds the report id on entry. Returns how many bytes the
    /// device supplied, which may be fewer than requested.
    fn get_feature_report(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// A device node that may turn out to be the UPS.
pub trait HidCandidate: Debug {
    type Device;

    /// Opens the candidate and reports the identity it claims.
    fn probe(self) -> anyhow::Result<(DeviceIdentity, Self::Device)>;
}

/// Probes candidates in order and returns the first one whose identity equals
/// `identity`. Non-matching devices are dropped before the next probe, so at
/// most one is open at a time.
///
/// When several devices share the same identity the winner is whichever the
/// iterator yields first.
pub fn first_match<I>(
    candidates: I,
    identity: &DeviceIdentity,
) -> Option<<I::Item as HidCandidate>::Device>
where
    I: IntoIterator,
    I::Item: HidCandidate,
{
    candidates.into_iter().find_map(|candidate| {
        trace!("Probing {:?}", candidate);
        let name = log_enabled!(Level::Debug).then(|| format!("{:?}", candidate));
        let name = name.as_deref().unwrap_or_default();
        match candidate.probe() {
            Ok((found, device)) if found == *identity => Some(device),
            Ok((found, _device)) => {
                trace!("{} is {}, skipping", name, found);
                None
            }
            Err(error) => {
                debug!("Skipping {}: {:#}", name, error);
                None
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidrawNode {
    path: PathBuf,
}

impl HidrawNode {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HidCandidate for HidrawNode {
    type Device = HidDevice;

    fn probe(self) -> anyhow::Result<(DeviceIdentity, HidDevice)> {
        let device = HidDevice::open_path(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let info = query_raw_info(&device)
            .with_context(|| format!("querying {}", self.path.display()))?;

        let identity = DeviceIdentity::new(info.vendor as u16, info.product as u16);
        Ok((identity, device))
    }
}

/// Lists the `hidrawN` character devices under `directory` in the order the
/// OS returns them.
pub fn hidraw_nodes(directory: &Path) -> Result<impl Iterator<Item = HidrawNode>> {
    let entries = fs::read_dir(directory).map_err(|source| Error::Enumeration {
        path: directory.to_path_buf(),
        source,
    })?;

    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_type()
                .map(|file_type| file_type.is_char_device())
                .unwrap_or(false)
        })
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.len() > HIDRAW_PREFIX.len() && name.starts_with(HIDRAW_PREFIX)
        })
        .map(|entry| HidrawNode::new(entry.path())))
}

/// An open hidraw node. Closed when dropped.
#[derive(Debug)]
pub struct HidDevice {
    file: File,
    path: PathBuf,
    _send_not_sync: PhantomData<UnsafeCell<()>>,
}

assert_impl_all!(HidDevice: Send);
assert_not_impl_all!(HidDevice: Sync);

impl HidDevice {
    /// Finds the hidraw node belonging to `identity` and leaves it open.
    pub fn open(identity: &DeviceIdentity, paths: &Paths) -> Result<Self> {
        let nodes = hidraw_nodes(&paths.device_nodes)?;

        let device = first_match(nodes, identity).ok_or(Error::DeviceNotFound {
            kind: DeviceKind::Hid,
            identity: *identity,
        })?;
        debug!("Using {}", device.path.display());

        Ok(device)
    }

    /// Opens a node read-only and non-blocking, without checking what it is.
    pub fn open_path(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _send_not_sync: PhantomData,
        })
    }

}

impl AsRawFd for HidDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl FeatureReportDevice for HidDevice {
    fn get_feature_report(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        Ok(get_feature_report(&*self, buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    #[derive(Debug)]
    struct FakeCandidate {
        name: &'static str,
        identity: Option<DeviceIdentity>,
        open: Rc<Cell<usize>>,
        peak: Rc<Cell<usize>>,
    }

    #[derive(Debug)]
    struct FakeDevice {
        name: &'static str,
        open: Rc<Cell<usize>>,
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.open.set(self.open.get() - 1);
        }
    }

    impl HidCandidate for FakeCandidate {
        type Device = FakeDevice;

        fn probe(self) -> anyhow::Result<(DeviceIdentity, FakeDevice)> {
            let identity = self
                .identity
                .ok_or_else(|| anyhow::anyhow!("ioctl failed"))?;

            self.open.set(self.open.get() + 1);
            self.peak.set(self.peak.get().max(self.open.get()));

            Ok((
                identity,
                FakeDevice {
                    name: self.name,
                    open: self.open,
                },
            ))
        }
    }

    struct Bench {
        open: Rc<Cell<usize>>,
        peak: Rc<Cell<usize>>,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                open: Rc::new(Cell::new(0)),
                peak: Rc::new(Cell::new(0)),
            }
        }

        fn candidate(
            &self,
            name: &'static str,
            identity: Option<DeviceIdentity>,
        ) -> FakeCandidate {
            FakeCandidate {
                name,
                identity,
                open: self.open.clone(),
                peak: self.peak.clone(),
            }
        }
    }

    const UPS: DeviceIdentity = DeviceIdentity::new(0x06DA, 0xFFFF);
    const KEYBOARD: DeviceIdentity = DeviceIdentity::new(0x046D, 0xC31C);

    #[test]
    fn first_matching_candidate_wins() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", Some(KEYBOARD)),
            bench.candidate("hidraw1", Some(UPS)),
            bench.candidate("hidraw2", Some(UPS)),
        ];

        let device = first_match(candidates, &UPS).unwrap();
        assert_eq!(device.name, "hidraw1");
    }

    #[test]
    fn failing_candidates_are_skipped() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", None),
            bench.candidate("hidraw1", Some(UPS)),
        ];

        let device = first_match(candidates, &UPS).unwrap();
        assert_eq!(device.name, "hidraw1");
    }

    #[test]
    fn no_match_yields_none() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", Some(KEYBOARD)),
            bench.candidate("hidraw1", None),
        ];

        assert!(first_match(candidates, &UPS).is_none());
        assert_eq!(bench.open.get(), 0);
    }

    #[test]
    fn vendor_and_product_must_both_match() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", Some(DeviceIdentity::new(0x06DA, 0x0001))),
            bench.candidate("hidraw1", Some(DeviceIdentity::new(0x0001, 0xFFFF))),
        ];

        assert!(first_match(candidates, &UPS).is_none());
    }

    #[test]
    fn at_most_one_candidate_is_open() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", Some(KEYBOARD)),
            bench.candidate("hidraw1", Some(KEYBOARD)),
            bench.candidate("hidraw2", Some(UPS)),
        ];

        let device = first_match(candidates, &UPS).unwrap();
        assert_eq!(bench.peak.get(), 1);
        assert_eq!(bench.open.get(), 1);

        drop(device);
        assert_eq!(bench.open.get(), 0);
    }

    #[test]
    fn candidates_after_the_match_are_not_probed() {
        let bench = Bench::new();
        let candidates = vec![
            bench.candidate("hidraw0", Some(UPS)),
            bench.candidate("hidraw1", None),
        ];
        let mut probed = Vec::new();

        let device = first_match(
            candidates.into_iter().inspect(|candidate| probed.push(candidate.name)),
            &UPS,
        );

        assert!(device.is_some());
        assert_eq!(probed, ["hidraw0"]);
    }

    struct CountedCandidate {
        identity: DeviceIdentity,
        formatted: Rc<Cell<usize>>,
    }

    impl Debug for CountedCandidate {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.formatted.set(self.formatted.get() + 1);
            write!(f, "{}", self.identity)
        }
    }

    impl HidCandidate for CountedCandidate {
        type Device = ();

        fn probe(self) -> anyhow::Result<(DeviceIdentity, ())> {
            Ok((self.identity, ()))
        }
    }

    fn counted_candidates(formatted: &Rc<Cell<usize>>) -> Vec<CountedCandidate> {
        [KEYBOARD, UPS]
            .into_iter()
            .map(|identity| CountedCandidate {
                identity,
                formatted: formatted.clone(),
            })
            .collect()
    }

    #[test]
    fn candidates_are_not_formatted_with_logging_off() {
        crate::test_log::install();
        let formatted = Rc::new(Cell::new(0));

        assert!(first_match(counted_candidates(&formatted), &UPS).is_some());
        assert_eq!(formatted.get(), 0);
    }

    #[test]
    fn candidates_are_formatted_with_logging_on() {
        let formatted = Rc::new(Cell::new(0));

        let (device, _) = crate::test_log::capture(|| {
            first_match(counted_candidates(&formatted), &UPS)
        });

        assert!(device.is_some());
        assert!(formatted.get() > 0);
    }

    #[test]
    fn regular_files_are_not_candidates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hidraw0"), b"").unwrap();
        fs::create_dir(dir.path().join("hidraw1")).unwrap();

        assert_eq!(hidraw_nodes(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn only_hidraw_character_devices_are_candidates() {
        for node in hidraw_nodes(Path::new("/dev")).unwrap() {
            let name = node.path().file_name().unwrap().to_string_lossy();
            assert!(name.starts_with(HIDRAW_PREFIX) && name.len() > HIDRAW_PREFIX.len());
            assert!(fs::metadata(node.path()).unwrap().file_type().is_char_device());
        }
    }

    #[test]
    fn unreadable_directory_is_an_enumeration_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(
            hidraw_nodes(&missing),
            Err(Error::Enumeration { path, .. }) if path == missing
        ));
    }

    #[test]
    fn missing_device_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            device_nodes: dir.path().to_path_buf(),
            ..Paths::default()
        };

        assert!(matches!(
            HidDevice::open(&UPS, &paths),
            Err(Error::DeviceNotFound {
                kind: DeviceKind::Hid,
                identity: UPS
            })
        ));
    }

    #[test]
    fn non_hid_nodes_fail_to_probe() {
        // /dev/null opens fine but rejects every hidraw ioctl.
        assert!(HidrawNode::new("/dev/null").probe().is_err());
    }
}
