use std::io::{self, Write};

pub(crate) static LOGGER: Logger = Logger;

/// Writes `[LEVEL] message` lines to standard error. Standard output carries
/// nothing but the status line.
pub(crate) struct Logger;

impl Logger {
    fn format(record: &log::Record) -> String {
        format!("[{:<5}] {}\n", record.level(), record.args())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = io::stderr().lock().write_all(Self::format(record).as_bytes());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
