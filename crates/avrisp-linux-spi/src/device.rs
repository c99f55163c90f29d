//! Linux SPI AVR programmer session
//!
//! [`LinuxSpi`] owns one spidev descriptor and the exported reset GPIO for
//! as long as the session is open. Only one session should drive a given
//! SPI node and reset line at a time; nothing here enforces that.
//!
//! ## Lifecycle
//!
//! 1. [`LinuxSpi::open`] validates the configuration, opens the device node,
//!    exports the reset pin and drives RESET low (asserted) in one
//!    `direction` write.
//! 2. [`LinuxSpi::initialize`] runs the program-enable handshake.
//! 3. [`LinuxSpi::close`] (or drop) closes the device, returns the reset
//!    pin to input and unexports it. Every step is attempted even if an
//!    earlier one failed.

use std::thread;
use std::time::Duration;

use avrisp_core::error::{Error as CoreError, Result as CoreResult};
use avrisp_core::part::{AvrOp, Part};
use avrisp_core::programmer::AvrProgrammer;
use avrisp_core::retry::{Attempt, Retry, RetryError};

use crate::error::{LinuxSpiError, Result};
use crate::gpio::{Direction, PinRef, SysfsGpio};
use crate::spidev::{SpiBus, Spidev};

/// Programmer name used for dispatch and diagnostics
pub const PROGRAMMER_NAME: &str = "linux_spi";

/// Default SPI clock speed in Hz (400 kHz)
pub const DEFAULT_SPEED_HZ: u32 = 400_000;

/// Length of a serial programming instruction
pub const CMD_LEN: usize = 4;

/// Program-enable attempts before giving up (1 + 65 retries)
pub const PROGRAM_ENABLE_ATTEMPTS: u32 = 66;

/// Back-to-back handshake attempts, no pause in between
const HANDSHAKE: Retry = Retry::new(PROGRAM_ENABLE_ATTEMPTS, Duration::ZERO);

/// Release budget for a reset pin whose direction was never set
const RELEASE_UNCONFIGURED: Retry = Retry::new(1, Duration::ZERO);

/// Port name the CLI uses when none was given
const UNKNOWN_PORT: &str = "unknown";

/// Configuration for opening a Linux SPI programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// GPIO wired to the target's RESET pin
    pub reset: PinRef,
    /// SPI clock speed in Hz; 0 selects the default
    pub speed_hz: u32,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            reset: PinRef::default(),
            speed_hz: DEFAULT_SPEED_HZ,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the reset GPIO
    pub fn with_reset(mut self, reset: PinRef) -> Self {
        self.reset = reset;
        self
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Clock speed that will actually be used
    pub fn effective_speed(&self) -> u32 {
        if self.speed_hz == 0 {
            DEFAULT_SPEED_HZ
        } else {
            self.speed_hz
        }
    }

    /// Reject configurations that cannot establish a session
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() || self.device == UNKNOWN_PORT {
            return Err(LinuxSpiError::NoDevice);
        }
        if !self.reset.is_assigned() {
            return Err(LinuxSpiError::NoResetPin);
        }
        Ok(())
    }
}

/// AVR ISP programmer on a Linux spidev node with a sysfs reset GPIO
pub struct LinuxSpi<B: SpiBus = Spidev> {
    /// Device handle; `None` once closed
    bus: Option<B>,
    /// Device path, for diagnostics
    device: String,
    gpio: SysfsGpio,
    reset: PinRef,
    /// Whether the reset pin is currently exported by us
    exported: bool,
    /// Whether the reset pin's direction write went through
    configured: bool,
    speed_hz: u32,
}

impl LinuxSpi<Spidev> {
    /// Open a session on the real spidev node and `/sys/class/gpio`
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        Self::open_with(config, SysfsGpio::new(), Spidev::open)
    }
}

impl<B: SpiBus> LinuxSpi<B> {
    /// Open a session using `open_bus` to obtain the SPI link
    ///
    /// If claiming the reset pin fails, whatever was already set up is torn
    /// down again before the error is returned.
    pub fn open_with<F>(config: &LinuxSpiConfig, gpio: SysfsGpio, open_bus: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<B>,
    {
        config.validate()?;

        let bus = open_bus(&config.device)?;

        let mut spi = Self {
            bus: Some(bus),
            device: config.device.clone(),
            gpio,
            reset: config.reset,
            exported: false,
            configured: false,
            speed_hz: config.effective_speed(),
        };
        spi.claim_reset()?;

        log::info!(
            "linux_spi: Opened {} (reset={}, speed={} kHz)",
            spi.device,
            spi.reset,
            spi.speed_hz / 1000
        );

        Ok(spi)
    }

    /// Export the reset pin and drive RESET low
    fn claim_reset(&mut self) -> Result<()> {
        self.gpio.export(self.reset)?;
        self.exported = true;

        // "low"/"high" sets direction and level in one write
        let level = self.reset.physical(false);
        self.gpio
            .set_direction(self.reset, Direction::output(level))?;
        self.configured = true;
        Ok(())
    }

    /// Device path this session was opened on
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Reset GPIO in use
    pub fn reset_pin(&self) -> PinRef {
        self.reset
    }

    /// SPI clock speed in Hz
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Whether the session still holds the device
    pub fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    /// Transfer the first `len` bytes of `tx` while receiving into `rx`
    pub fn duplex(&mut self, tx: &[u8], rx: &mut [u8], len: usize) -> Result<()> {
        if tx.len() < len || rx.len() < len {
            return Err(LinuxSpiError::InvalidParameter(format!(
                "transfer of {} bytes with {}-byte tx and {}-byte rx buffers",
                len,
                tx.len(),
                rx.len()
            )));
        }

        let bus = self.bus.as_mut().ok_or(LinuxSpiError::NotOpen)?;
        let actual = bus
            .transfer(&tx[..len], &mut rx[..len], self.speed_hz)
            .map_err(LinuxSpiError::TransferFailed)?;

        if actual != len {
            return Err(LinuxSpiError::ShortTransfer {
                expected: len,
                actual,
            });
        }
        Ok(())
    }

    /// Exchange one 4-byte instruction
    pub fn cmd(&mut self, tx: &[u8; 4], rx: &mut [u8; 4]) -> Result<()> {
        let result = self.duplex(tx, rx, CMD_LEN);
        log::trace!("linux_spi: {:02X?} -> {:02X?}", tx, rx);
        result
    }

    /// Send program-enable once and check that the target echoed it
    ///
    /// A synchronised target returns the second instruction byte while the
    /// third is being sent; nothing else in the response matters.
    pub fn program_enable(&mut self, part: &Part) -> Result<()> {
        let template = part
            .op(AvrOp::ProgramEnable)
            .ok_or_else(|| missing_opcode(part, AvrOp::ProgramEnable))?;

        let tx = template.frame();
        let mut rx = [0u8; 4];
        self.cmd(&tx, &mut rx)?;

        if rx[2] != tx[1] {
            return Err(LinuxSpiError::EchoMismatch {
                expected: tx[1],
                got: rx[2],
            });
        }
        Ok(())
    }

    /// Bring the target into programming mode
    ///
    /// Retries program-enable while the target answers out of sync; a
    /// transport failure ends the handshake at once.
    pub fn initialize(&mut self, part: &Part) -> Result<()> {
        if part.has_tpi() {
            return Err(LinuxSpiError::TpiNotSupported {
                part: part.name.clone(),
            });
        }

        let outcome = HANDSHAKE.run(|attempt| match self.program_enable(part) {
            Ok(()) => Attempt::Done(attempt + 1),
            Err(e) if e.is_hard_failure() => Attempt::Abort(e),
            Err(e) => {
                log::debug!("linux_spi: attempt {}: {}", attempt + 1, e);
                Attempt::Retry(e)
            }
        });

        match outcome {
            Ok(attempts) => {
                log::debug!(
                    "linux_spi: {} in programming mode after {} attempt(s)",
                    part.name,
                    attempts
                );
                Ok(())
            }
            Err(RetryError::Aborted(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(LinuxSpiError::ProgramEnableExhausted { attempts })
            }
        }
    }

    /// Erase the chip, wait for it to finish and re-enter programming mode
    ///
    /// The erase exchange is not checked: the wait and the new handshake
    /// always follow, and the handshake's result is returned.
    pub fn chip_erase(&mut self, part: &Part) -> Result<()> {
        let template = part
            .op(AvrOp::ChipErase)
            .ok_or_else(|| missing_opcode(part, AvrOp::ChipErase))?;

        let tx = template.frame();
        let mut rx = [0u8; 4];
        if let Err(e) = self.cmd(&tx, &mut rx) {
            log::warn!("linux_spi: chip erase command: {}", e);
        }

        thread::sleep(part.chip_erase_delay);

        // erase drops the target out of programming mode
        self.initialize(part)
    }

    /// Release the device and the reset pin
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn close(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(bus) = self.bus.take() {
            if let Err(e) = bus.close() {
                log::warn!("linux_spi: Failed to close {}: {}", self.device, e);
            }
        }

        if self.exported {
            self.exported = false;

            // gpioN/ may never have appeared; don't wait for it a second time
            let single_try;
            let gpio = if self.configured {
                &self.gpio
            } else {
                single_try = self.gpio.clone().with_retry(RELEASE_UNCONFIGURED);
                &single_try
            };
            self.configured = false;

            if let Err(e) = gpio.set_direction(self.reset, Direction::In) {
                log::warn!("linux_spi: {}", e);
            }
            if let Err(e) = gpio.unexport(self.reset) {
                log::warn!("linux_spi: {}", e);
            }
            log::debug!("linux_spi: Released reset pin {}", self.reset);
        }
    }
}

impl<B: SpiBus> Drop for LinuxSpi<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn missing_opcode(part: &Part, op: AvrOp) -> LinuxSpiError {
    LinuxSpiError::MissingOpcode {
        part: part.name.clone(),
        op,
    }
}

/// Log the detailed error and reduce it to the core error
fn core_error(e: LinuxSpiError) -> CoreError {
    log::error!("linux_spi: {}", e);
    CoreError::from(&e)
}

impl<B: SpiBus> AvrProgrammer for LinuxSpi<B> {
    fn name(&self) -> &'static str {
        PROGRAMMER_NAME
    }

    fn display(&self, prefix: &str) {
        log::info!("{}Programmer type : {}", prefix, PROGRAMMER_NAME);
        log::info!("{}Device          : {}", prefix, self.device);
        log::info!("{}Reset GPIO      : {}", prefix, self.reset);
        log::info!("{}SPI clock       : {} Hz", prefix, self.speed_hz);
    }

    fn initialize(&mut self, part: &Part) -> CoreResult<()> {
        LinuxSpi::initialize(self, part).map_err(core_error)
    }

    fn program_enable(&mut self, part: &Part) -> CoreResult<()> {
        LinuxSpi::program_enable(self, part).map_err(core_error)
    }

    fn chip_erase(&mut self, part: &Part) -> CoreResult<()> {
        LinuxSpi::chip_erase(self, part).map_err(core_error)
    }

    fn cmd(&mut self, tx: &[u8; 4], rx: &mut [u8; 4]) -> CoreResult<()> {
        LinuxSpi::cmd(self, tx, rx).map_err(core_error)
    }

    fn close(&mut self) {
        LinuxSpi::close(self)
    }
}

/// Parse programmer options from a list of key-value pairs
///
/// - `dev=/dev/spidevX.Y` - required
/// - `reset=N` - required; `~N` or `!N` for an inverted line
/// - `baudrate=N` - SPI clock in Hz
/// - `spispeed=N` - SPI clock in kHz
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxSpiConfig, String> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "reset" => {
                config.reset = value.parse().map_err(|e: LinuxSpiError| e.to_string())?;
            }
            "baudrate" => {
                config.speed_hz = value
                    .parse()
                    .map_err(|_| format!("Invalid baudrate value: {}", value))?;
            }
            "spispeed" => {
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid spispeed value: {}", value))?;
                config.speed_hz = speed_khz
                    .checked_mul(1000)
                    .ok_or_else(|| format!("spispeed out of range: {}", value))?;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/spidevX.Y".to_string());
    }
    if !config.reset.is_assigned() {
        return Err("No reset pin specified. Use reset=<gpio>".to_string());
    }

    Ok(config)
}
