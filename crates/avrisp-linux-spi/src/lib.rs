//! avrisp-linux-spi - AVR ISP over Linux spidev
//!
//! This crate programs AVR microcontrollers through a spidev character
//! device (`/dev/spidevX.Y`), holding the target in reset with a GPIO line
//! driven through `/sys/class/gpio`.
//!
//! # Wiring
//!
//! | AVR pin | Host side                |
//! |---------|--------------------------|
//! | SCK     | SPI SCLK                 |
//! | MOSI    | SPI MOSI                 |
//! | MISO    | SPI MISO                 |
//! | RESET   | any GPIO (`reset=N`)     |
//! | GND     | GND                      |
//!
//! The SPI chip select is not used. Pass `reset=~N` when the reset line
//! goes through an inverting driver.
//!
//! # Example
//!
//! ```no_run
//! use avrisp_core::part::PartDatabase;
//! use avrisp_linux_spi::{LinuxSpi, LinuxSpiConfig, PinRef};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0").with_reset(PinRef::new(25));
//! let mut spi = LinuxSpi::open(&config)?;
//!
//! let db = PartDatabase::builtin()?;
//! let part = db.find("m328p").expect("part in database");
//! spi.initialize(part)?;
//! spi.chip_erase(part)?;
//! spi.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with avrisp CLI
//!
//! ```bash
//! avrisp probe -p linux_spi:dev=/dev/spidev0.0,reset=25 -c m328p
//! avrisp erase -p linux_spi:dev=/dev/spidev0.0,reset=~25,baudrate=200000 -c t85
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev (`CONFIG_SPI_SPIDEV`) and sysfs GPIO
//!   (`CONFIG_GPIO_SYSFS`)
//! - Write access to the spidev node and `/sys/class/gpio`
//!
//! TPI-only parts (ATtiny4/5/9/10/20/40) are not supported.

pub mod device;
pub mod error;
pub mod gpio;
pub mod spidev;

// Re-exports
pub use device::{parse_options, LinuxSpi, LinuxSpiConfig, DEFAULT_SPEED_HZ, PROGRAMMER_NAME};
pub use error::{GpioError, LinuxSpiError, Result};
pub use gpio::{Direction, GpioOp, PinRef, SysfsGpio};
pub use spidev::{SpiBus, Spidev};

/// Open a Linux SPI programmer and return it boxed
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `dev=/dev/spidev0.0` - Required: device path
/// - `reset=25` - Required: reset GPIO, `~25` if inverted
/// - `baudrate=400000` - Optional: SPI clock in Hz (default: 400000)
/// - `spispeed=400` - Optional: SPI clock in kHz
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn avrisp_core::programmer::AvrProgrammer>, Box<dyn std::error::Error>>
{
    let config = parse_options(options)?;
    let spi = LinuxSpi::open(&config)?;
    Ok(Box::new(spi))
}
