use log::LevelFilter;
use ups::{config::Paths, identity::DeviceIdentity};

#[derive(Debug, Clone)]
pub(crate) struct RuntimeConfig {
    pub identity: DeviceIdentity,
    pub auto_reset: bool,
    pub log_level: LevelFilter,
    pub paths: Paths,
}

impl RuntimeConfig {
    /// `log_level` is the raw value of [`HardCodedConfig::LOG_LEVEL_VARIABLE`],
    /// if set.
    pub fn new(identity: DeviceIdentity, auto_reset: bool, log_level: Option<&str>) -> Self {
        Self {
            identity,
            auto_reset,
            log_level: log_level
                .and_then(|level| level.trim().parse().ok())
                .unwrap_or(HardCodedConfig::DEFAULT_LOG_LEVEL),
            paths: Paths::default(),
        }
    }
}

pub(crate) struct HardCodedConfig;

impl HardCodedConfig {
    pub const LOG_LEVEL_VARIABLE: &'static str = "UPSHID_LOG";

    pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;
}
