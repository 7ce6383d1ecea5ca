use std::{io, path::PathBuf};

use thiserror::Error;

use crate::identity::DeviceIdentity;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A directory that has to be scanned could not be opened at all.
    #[error("{} not readable", .path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No {kind} device found for {identity}")]
    DeviceNotFound {
        kind: DeviceKind,
        identity: DeviceIdentity,
    },

    #[error("Unable to fetch report {report_id:#04x}")]
    ReportRead { report_id: u8 },

    #[error("Invalid device id {0:?}, expected <vendor-id>:<product-id>")]
    InvalidIdentity(String),

    #[error("Unable to open control node {}", .path.display())]
    ControlNode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("USBDEVFS_RESET on {} failed", .path.display())]
    Reset {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Hid,
    Bus,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hid => write!(f, "hid"),
            Self::Bus => write!(f, "bus"),
        }
    }
}
