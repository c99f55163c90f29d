//! Reset line control through the sysfs GPIO interface
//!
//! The target's reset pin is driven via `/sys/class/gpio`. Exporting a pin
//! is asynchronous: the kernel (and udev, which may fix up permissions)
//! populates `gpioN/` some time after the write to `export` returns, so
//! every control file is opened with a bounded retry.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use avrisp_core::retry::{Attempt, Retry};

use crate::error::{GpioError, LinuxSpiError};

/// Default sysfs GPIO class directory
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Attempts made to open a control file before giving up
pub const OPEN_ATTEMPTS: u32 = 100;

/// Pause between open attempts
pub const OPEN_INTERVAL: Duration = Duration::from_millis(20);

/// Inversion flag in the packed pin encoding
pub const PIN_INVERSE: u32 = 0x80;

/// Pin number bits in the packed pin encoding
pub const PIN_MASK: u32 = 0x7F;

/// A GPIO line plus its polarity
///
/// `inverted` never appears in a sysfs path or in the exported number; it
/// only flips the mapping between logical and physical levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinRef {
    /// Kernel GPIO number; 0 means unassigned
    pub id: u32,
    /// Physical level is the inverse of the logical level
    pub inverted: bool,
}

impl PinRef {
    /// A non-inverted pin
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            inverted: false,
        }
    }

    /// An inverted pin
    pub const fn inverted(id: u32) -> Self {
        Self { id, inverted: true }
    }

    /// Decode the packed form where bit 7 carries the inversion flag
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            id: raw & PIN_MASK,
            inverted: raw & PIN_INVERSE != 0,
        }
    }

    /// Whether a GPIO number has been given
    pub const fn is_assigned(&self) -> bool {
        self.id != 0
    }

    /// Physical level for a logical level
    pub const fn physical(&self, active: bool) -> bool {
        active != self.inverted
    }
}

impl FromStr for PinRef {
    type Err = LinuxSpiError;

    /// Parse `25`, or `~25` / `!25` for an inverted pin
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, inverted) = match s.strip_prefix(['~', '!']) {
            Some(rest) => (rest.trim_start(), true),
            None => (s, false),
        };
        let id = digits
            .parse::<u32>()
            .map_err(|_| LinuxSpiError::InvalidParameter(format!("invalid GPIO pin: {}", s)))?;
        Ok(Self { id, inverted })
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "~{}", self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// Sysfs control file to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioOp {
    /// `export`
    Export,
    /// `unexport`
    Unexport,
    /// `gpioN/direction`
    SetDirection,
    /// `gpioN/value`
    SetValue,
}

/// Values accepted by `gpioN/direction`
///
/// `High` and `Low` switch to output and set the level in one write, which
/// avoids a glitch on a freshly exported pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input
    In,
    /// Output, level unspecified
    Out,
    /// Output, driven high
    High,
    /// Output, driven low
    Low,
}

impl Direction {
    /// Output with the given initial physical level
    pub const fn output(high: bool) -> Self {
        if high {
            Direction::High
        } else {
            Direction::Low
        }
    }

    /// Sysfs spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::High => "high",
            Direction::Low => "low",
        }
    }
}

/// Writer for sysfs GPIO control files
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    retry: Retry,
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsGpio {
    /// Use `/sys/class/gpio` with the standard open retry budget
    pub fn new() -> Self {
        Self::with_root(SYSFS_GPIO_ROOT)
    }

    /// Use a different class directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retry: Retry::new(OPEN_ATTEMPTS, OPEN_INTERVAL),
        }
    }

    /// Override the open retry budget
    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    /// Control file for `op` on `pin`
    pub fn path(&self, op: GpioOp, pin: PinRef) -> PathBuf {
        match op {
            GpioOp::Export => self.root.join("export"),
            GpioOp::Unexport => self.root.join("unexport"),
            GpioOp::SetDirection => self.root.join(format!("gpio{}", pin.id)).join("direction"),
            GpioOp::SetValue => self.root.join(format!("gpio{}", pin.id)).join("value"),
        }
    }

    /// Open the control file for `op`, write `value` once and close it
    pub fn write(&self, op: GpioOp, pin: PinRef, value: &str) -> Result<(), GpioError> {
        let path = self.path(op, pin);

        let mut file = self
            .retry
            .run(|_| match OpenOptions::new().write(true).truncate(true).open(&path) {
                Ok(file) => Attempt::Done(file),
                Err(e) => Attempt::Retry(e),
            })
            .map_err(|e| GpioError::OpenTimeout {
                path: path.display().to_string(),
                attempts: self.retry.attempts(),
                source: e.into_inner(),
            })?;

        log::debug!("linux_spi: {} <- {}", path.display(), value);

        file.write_all(value.as_bytes())
            .map_err(|source| GpioError::WriteFailed {
                path: path.display().to_string(),
                value: value.to_string(),
                source,
            })
    }

    /// Request the kernel to expose `pin`
    pub fn export(&self, pin: PinRef) -> Result<(), GpioError> {
        self.write(GpioOp::Export, pin, &pin.id.to_string())
    }

    /// Hand `pin` back to the kernel
    pub fn unexport(&self, pin: PinRef) -> Result<(), GpioError> {
        self.write(GpioOp::Unexport, pin, &pin.id.to_string())
    }

    /// Set the direction (and, for `High`/`Low`, the level) of `pin`
    pub fn set_direction(&self, pin: PinRef, dir: Direction) -> Result<(), GpioError> {
        self.write(GpioOp::SetDirection, pin, dir.as_str())
    }

    /// Drive `pin` to a logical level, honouring inversion
    pub fn set_value(&self, pin: PinRef, active: bool) -> Result<(), GpioError> {
        let value = if pin.physical(active) { "1" } else { "0" };
        self.write(GpioOp::SetValue, pin, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Instant;

    fn sysfs_with_pin(id: u32) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("export"), "").unwrap();
        fs::write(dir.path().join("unexport"), "").unwrap();
        let pin_dir = dir.path().join(format!("gpio{}", id));
        fs::create_dir(&pin_dir).unwrap();
        fs::write(pin_dir.join("direction"), "in").unwrap();
        fs::write(pin_dir.join("value"), "0").unwrap();
        dir
    }

    fn fast() -> Retry {
        Retry::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_paths() {
        let gpio = SysfsGpio::new();
        let pin = PinRef::new(25);
        assert_eq!(
            gpio.path(GpioOp::Export, pin),
            PathBuf::from("/sys/class/gpio/export")
        );
        assert_eq!(
            gpio.path(GpioOp::Unexport, pin),
            PathBuf::from("/sys/class/gpio/unexport")
        );
        assert_eq!(
            gpio.path(GpioOp::SetDirection, pin),
            PathBuf::from("/sys/class/gpio/gpio25/direction")
        );
        assert_eq!(
            gpio.path(GpioOp::SetValue, pin),
            PathBuf::from("/sys/class/gpio/gpio25/value")
        );
    }

    #[test]
    fn test_inversion_never_reaches_path() {
        let gpio = SysfsGpio::new();
        for id in [1, 4, 25, 127] {
            for op in [
                GpioOp::Export,
                GpioOp::Unexport,
                GpioOp::SetDirection,
                GpioOp::SetValue,
            ] {
                assert_eq!(
                    gpio.path(op, PinRef::inverted(id)),
                    gpio.path(op, PinRef::new(id))
                );
                assert_eq!(
                    gpio.path(op, PinRef::from_raw(id | PIN_INVERSE)),
                    gpio.path(op, PinRef::new(id))
                );
            }
        }
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(PinRef::from_raw(25), PinRef::new(25));
        assert_eq!(PinRef::from_raw(25 | PIN_INVERSE), PinRef::inverted(25));
    }

    #[test]
    fn test_parse_pin() {
        assert_eq!("25".parse::<PinRef>().unwrap(), PinRef::new(25));
        assert_eq!("~25".parse::<PinRef>().unwrap(), PinRef::inverted(25));
        assert_eq!("!4".parse::<PinRef>().unwrap(), PinRef::inverted(4));
        assert!("gpio25".parse::<PinRef>().is_err());
        assert_eq!(PinRef::inverted(7).to_string(), "~7");
    }

    #[test]
    fn test_export_writes_plain_id() {
        let dir = sysfs_with_pin(25);
        let gpio = SysfsGpio::with_root(dir.path()).with_retry(fast());

        gpio.export(PinRef::inverted(25)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "25");

        gpio.unexport(PinRef::inverted(25)).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("unexport")).unwrap(),
            "25"
        );
    }

    #[test]
    fn test_write_replaces_contents() {
        let dir = sysfs_with_pin(25);
        let gpio = SysfsGpio::with_root(dir.path()).with_retry(fast());
        let pin = PinRef::new(25);

        gpio.set_direction(pin, Direction::High).unwrap();
        gpio.set_direction(pin, Direction::In).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("gpio25/direction")).unwrap(),
            "in"
        );
    }

    #[test]
    fn test_set_value_honours_inversion() {
        let dir = sysfs_with_pin(8);
        let gpio = SysfsGpio::with_root(dir.path()).with_retry(fast());
        let value = dir.path().join("gpio8/value");

        gpio.set_value(PinRef::new(8), true).unwrap();
        assert_eq!(fs::read_to_string(&value).unwrap(), "1");

        gpio.set_value(PinRef::inverted(8), true).unwrap();
        assert_eq!(fs::read_to_string(&value).unwrap(), "0");
    }

    #[test]
    fn test_missing_file_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let gpio = SysfsGpio::with_root(dir.path()).with_retry(fast());

        let err = gpio
            .set_direction(PinRef::new(25), Direction::Low)
            .unwrap_err();
        match err {
            GpioError::OpenTimeout { attempts, path, .. } => {
                assert_eq!(attempts, 3);
                assert!(path.ends_with("gpio25/direction"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_budget_is_about_two_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let gpio = SysfsGpio::with_root(dir.path());

        let start = Instant::now();
        let err = gpio.set_value(PinRef::new(3), true).unwrap_err();
        // 100 attempts, 99 pauses of 20 ms
        assert!(start.elapsed() >= Duration::from_millis(99 * 20));
        assert!(matches!(
            err,
            GpioError::OpenTimeout {
                attempts: OPEN_ATTEMPTS,
                ..
            }
        ));
    }

    #[test]
    fn test_waits_for_late_export() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let gpio = SysfsGpio::with_root(&root).with_retry(Retry::new(200, Duration::from_millis(5)));

        let kernel = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let pin_dir = root.join("gpio17");
            fs::create_dir(&pin_dir).unwrap();
            fs::write(pin_dir.join(".direction"), "in").unwrap();
            fs::rename(pin_dir.join(".direction"), pin_dir.join("direction")).unwrap();
        });

        gpio.set_direction(PinRef::new(17), Direction::Out).unwrap();
        kernel.join().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("gpio17/direction")).unwrap(),
            "out"
        );
    }
}
