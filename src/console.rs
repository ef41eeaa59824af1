//! Console output and kernel logger
//!
//! Bare-metal builds send `log` records to UART0 through `KernelLogger`.
//! With the `std` feature the console writes to stderr and the UART is not
//! compiled in; the simulator installs `env_logger` instead.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

// XLR/XLS UART0, uncached KSEG1 mapping of the I/O block
#[cfg(not(any(test, feature = "std")))]
const UART_BASE: usize = 0xbef1_4000;
// Line status register and its transmit-holding-empty bit
#[cfg(not(any(test, feature = "std")))]
const UART_LSR: usize = 0x14;
#[cfg(not(any(test, feature = "std")))]
const UART_LSR_THRE: u32 = 0x20;

/// Longest log line emitted; longer records are truncated
pub const MAX_LINE_LEN: usize = 256;

#[cfg(not(any(test, feature = "std")))]
struct Uart {
    base: usize,
}

#[cfg(not(any(test, feature = "std")))]
impl Uart {
    const fn new(base: usize) -> Self {
        Self { base }
    }

    unsafe fn putc(&self, c: u8) {
        let lsr = (self.base + UART_LSR) as *const u32;
        while lsr.read_volatile() & UART_LSR_THRE == 0 {
            core::hint::spin_loop();
        }
        let thr = self.base as *mut u32;
        thr.write_volatile(c as u32);
    }
}

/// Console writer interface
pub struct Console {
    #[cfg(test)]
    buffer: heapless::String<1024>,
}

impl Console {
    /// Create a new console instance
    pub const fn new() -> Self {
        Console {
            #[cfg(test)]
            buffer: heapless::String::new(),
        }
    }

    /// Write a byte to the console
    pub fn write_byte(&mut self, byte: u8) {
        #[cfg(test)]
        {
            if byte.is_ascii() {
                let _ = self.buffer.push(byte as char);
            }
        }

        #[cfg(all(not(test), feature = "std"))]
        {
            use std::io::Write as _;
            let _ = std::io::stderr().write_all(&[byte]);
        }

        #[cfg(not(any(test, feature = "std")))]
        unsafe {
            Uart::new(UART_BASE).putc(byte);
        }
    }

    /// Write a string to the console
    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    /// Clear the console
    pub fn clear(&mut self) {
        #[cfg(test)]
        self.buffer.clear();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_str(s);
        Ok(())
    }
}

/// Global console instance
static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

/// Print formatted text to console
pub fn print(args: fmt::Arguments) {
    let _ = CONSOLE.lock().write_fmt(args);
}

// ============================================================================
// Logger
// ============================================================================

/// `log` backend writing to the console
pub struct KernelLogger {
    level: AtomicUsize,
}

impl KernelLogger {
    pub const fn new() -> Self {
        Self {
            level: AtomicUsize::new(LevelFilter::Info as usize),
        }
    }

    fn max_level(&self) -> usize {
        self.level.load(Ordering::Relaxed)
    }

    pub fn set_level(&self, level: LevelFilter) {
        self.level.store(level as usize, Ordering::Relaxed);
    }
}

impl Default for KernelLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Format one record the way the console shows it
pub fn format_record(record: &Record<'_>) -> heapless::String<MAX_LINE_LEN> {
    let mut line = heapless::String::new();
    let tag = match record.level() {
        Level::Error => "ERR",
        Level::Warn => "WRN",
        Level::Info => "INF",
        Level::Debug => "DBG",
        Level::Trace => "TRC",
    };
    // A full buffer truncates the line
    let _ = write!(line, "[{} {}] {}", tag, record.target(), record.args());
    line
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() as usize <= self.max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        let mut console = CONSOLE.lock();
        console.write_str(&line);
        console.write_str("\n");
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger::new();
static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the console logger; later calls only change the level
pub fn init_logger(level: LevelFilter) {
    LOGGER.set_level(level);
    if LOGGER_INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
        && log::set_logger(&LOGGER).is_err()
    {
        print(format_args!("[log] install failed\n"));
    }
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_write() {
        let mut console = Console::new();
        console.write_str("msgring up\n");
        assert_eq!(console.buffer.as_str(), "msgring up\r\n");
    }

    #[test]
    fn test_console_formatting() {
        let mut console = Console::new();
        write!(&mut console, "core{} bucket{}", 3, 7).unwrap();
        assert!(console.buffer.contains("core3 bucket7"));
    }

    #[test]
    fn test_format_record() {
        let line = format_record(
            &Record::builder()
                .level(Level::Warn)
                .target("msgring::fmn")
                .args(format_args!("dropping {}", 9))
                .build(),
        );
        assert_eq!(line.as_str(), "[WRN msgring::fmn] dropping 9");
    }

    #[test]
    fn test_logger_level_filter() {
        let logger = KernelLogger::new();
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));

        logger.set_level(LevelFilter::Trace);
        assert!(logger.enabled(&debug));
    }
}
