//! Per-thread log capture for tests. Each test thread sees only its own
//! records, so tests stay independent while sharing the global logger.

use std::{cell::RefCell, sync::Once};

use log::{Level, LevelFilter, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Option<Vec<(Level, String)>>> = RefCell::new(None);
}

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        RECORDS.with(|records| records.borrow().is_some())
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            if let Some(records) = records.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

pub(crate) fn install() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Runs `f` and returns what it logged at `Info` or above.
pub(crate) fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<(Level, String)>) {
    install();
    RECORDS.with(|records| *records.borrow_mut() = Some(Vec::new()));
    let result = f();
    let records = RECORDS
        .with(|records| records.borrow_mut().take())
        .unwrap_or_default()
        .into_iter()
        .filter(|(level, _)| *level <= Level::Info)
        .collect();
    (result, records)
}
