// pico-retro/src/libretro/logger.rs

//! `log` backend writing through the frontend's log interface.

use std::ffi::c_int;
use std::sync::{Mutex, PoisonError};

use log::{Level, LevelFilter, Log, Metadata, Record};

use super::host::c_string;
use super::sys::{
    retro_log_printf_t, RETRO_LOG_DEBUG, RETRO_LOG_ERROR, RETRO_LOG_INFO, RETRO_LOG_WARN,
};

static CALLBACK: Mutex<Option<retro_log_printf_t>> = Mutex::new(None);
static LOGGER: RetroLogger = RetroLogger;

pub struct RetroLogger;

fn level(level: Level) -> c_int {
    match level {
        Level::Error => RETRO_LOG_ERROR,
        Level::Warn => RETRO_LOG_WARN,
        Level::Info => RETRO_LOG_INFO,
        Level::Debug | Level::Trace => RETRO_LOG_DEBUG,
    }
}

fn callback() -> Option<retro_log_printf_t> {
    *CALLBACK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Route `log` records to `printf`. Without one, records are dropped.
///
/// Safe to call on every `retro_init`; only the first call installs the logger.
pub fn install(printf: Option<retro_log_printf_t>) {
    *CALLBACK.lock().unwrap_or_else(PoisonError::into_inner) = printf;

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }
}

impl Log for RetroLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        callback().is_some()
    }

    fn log(&self, record: &Record) {
        let Some(printf) = callback() else {
            return;
        };
        let message = c_string(&format!("{}\n", record.args()));
        unsafe { printf(level(record.level()), b"%s\0".as_ptr().cast(), message.as_ptr()) };
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level(Level::Error), RETRO_LOG_ERROR);
        assert_eq!(level(Level::Warn), RETRO_LOG_WARN);
        assert_eq!(level(Level::Info), RETRO_LOG_INFO);
        assert_eq!(level(Level::Trace), RETRO_LOG_DEBUG);
    }
}
