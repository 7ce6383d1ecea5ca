mod config;
mod logger;

use std::{
    env,
    ffi::OsString,
    io::{self, Write},
    process::ExitCode,
};

use anyhow::Context;
use clap::{error::ErrorKind, ArgAction, Parser};
use log::{debug, error};

use config::{HardCodedConfig, RuntimeConfig};
use logger::LOGGER;
use ups::{identity::DeviceIdentity, phoenix_hid_ups::PhoenixHidUps, ups::Ups};

const RETURN_VALUES: &str = "\
Example: print device data of device 06da:ffff (and try usb reset)
  phoenix_upshid -a 06da:ffff

Return values:
  0: Success (valid data will be returned on stdout)
  1: User input error
  2: Ups state unknown
  3: Ups is dead (\"not found\")";

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Prints the status of a HID UPS as a single JSON line",
    disable_help_flag = true,
    disable_version_flag = true,
    after_help = RETURN_VALUES
)]
struct Args {
    /// Automatically try usb reset on failed read
    #[arg(short = 'a')]
    auto_reset: bool,

    /// Show this help message and exit
    #[arg(short = 'h', action = ArgAction::Help)]
    help: Option<bool>,

    /// Print version and exit
    #[arg(short = 'v', action = ArgAction::Version)]
    version: Option<bool>,

    /// Vendor-id and product-id of the hid-device, each 1-4 plain hexadecimal
    /// digits without a 0x prefix (eg. '06da:ffff')
    #[arg(value_name = "VENDOR-ID:PRODUCT-ID")]
    device: DeviceIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    Success = 0,
    UserInputError = 1,
    StatusUnknown = 2,
    DeviceAbsent = 3,
}

impl ExitStatus {
    fn of(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<ups::Error>() {
            Some(ups::Error::DeviceNotFound { .. }) => Self::DeviceAbsent,
            Some(ups::Error::InvalidIdentity(_)) => Self::UserInputError,
            _ => Self::StatusUnknown,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

fn main() -> ExitCode {
    if log::set_logger(&LOGGER).is_err() {
        return ExitStatus::StatusUnknown.into();
    }
    log::set_max_level(HardCodedConfig::DEFAULT_LOG_LEVEL);

    let args = match parse_args(env::args_os()) {
        Ok(args) => args,
        Err(status) => return status.into(),
    };

    let log_level = env::var(HardCodedConfig::LOG_LEVEL_VARIABLE).ok();
    let config = RuntimeConfig::new(args.device, args.auto_reset, log_level.as_deref());
    log::set_max_level(config.log_level);
    debug!("{:?}", config);

    match query_status(&config) {
        Ok(line) => {
            let mut stdout = io::stdout().lock();
            match stdout.write_all(line.as_bytes()).and_then(|()| stdout.flush()) {
                Ok(()) => ExitStatus::Success.into(),
                Err(error) => {
                    error!("Writing status failed with {}", error);
                    ExitStatus::StatusUnknown.into()
                }
            }
        }
        Err(error) => {
            error!("{:#}", error);
            ExitStatus::of(&error).into()
        }
    }
}

/// Help and version go to stdout and end the run successfully. Anything else
/// clap rejects is logged as a user input error.
fn parse_args<I, T>(args: I) -> Result<Args, ExitStatus>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|error| match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            ExitStatus::Success
        }
        _ => {
            error!("{}", describe_parse_error(&error));
            ExitStatus::UserInputError
        }
    })
}

/// First line of clap's message, without its own `error:` tag.
fn describe_parse_error(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let summary = rendered.lines().next().unwrap_or_default();
    let summary = summary.strip_prefix("error:").unwrap_or(summary).trim();
    format!("{}; use -h flag for help", summary)
}

/// Finds the UPS, reads it and renders the status line. The device is closed
/// before this returns, whatever the outcome.
fn query_status(config: &RuntimeConfig) -> anyhow::Result<String> {
    let status = {
        let mut ups = PhoenixHidUps::open(&config.identity, &config.paths, config.auto_reset)?;
        ups.status()?
    };

    status.to_json().context("Serializing status")
}
