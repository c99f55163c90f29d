//! spidev transport
//!
//! One `SPI_IOC_MESSAGE(1)` ioctl per call: a single full-duplex transfer
//! with a 1 µs inter-byte delay and 8-bit words.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, IntoRawFd};

use crate::error::{LinuxSpiError, Result};

/// Delay after each transfer, in microseconds
pub const DELAY_USECS: u16 = 1;

/// Word width used for every transfer
pub const BITS_PER_WORD: u8 = 8;

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_buf;

    use super::SpiIocTransfer;

    const SPI_IOC_MAGIC: u8 = b'k';
    const SPI_IOC_TYPE_MESSAGE: u8 = 0;

    // SPI_IOC_MESSAGE(n): the size field encodes n * sizeof(struct spi_ioc_transfer)
    ioctl_write_buf!(
        spi_ioc_message,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MESSAGE,
        SpiIocTransfer
    );
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub(crate) struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// A byte-exact full-duplex SPI link
pub trait SpiBus {
    /// Clock `tx` out while clocking `rx` in
    ///
    /// `tx` and `rx` have the same length. Returns the number of bytes the
    /// driver reports as transferred; the caller decides whether a short
    /// count is an error.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], speed_hz: u32) -> io::Result<usize>;

    /// Release the link, reporting errors a plain drop would swallow
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// An open `/dev/spidevX.Y` node
#[derive(Debug)]
pub struct Spidev {
    file: File,
}

impl Spidev {
    /// Open the device node for reading and writing
    pub fn open(path: &str) -> Result<Self> {
        log::debug!("linux_spi: Opening device {}", path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: path.to_string(),
                source: e,
            })?;

        Ok(Self { file })
    }
}

impl SpiBus for Spidev {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], speed_hz: u32) -> io::Result<usize> {
        if tx.len() != rx.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "transmit and receive buffers differ in length",
            ));
        }

        let xfer = [SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz,
            delay_usecs: DELAY_USECS,
            bits_per_word: BITS_PER_WORD,
            ..Default::default()
        }];

        // The kernel writes into rx through the raw pointer while `rx` is
        // mutably borrowed for the duration of this call.
        let ret = unsafe { ioctl::spi_ioc_message(self.file.as_raw_fd(), &xfer) }
            .map_err(io::Error::from)?;

        Ok(ret as usize)
    }

    fn close(self) -> io::Result<()> {
        nix::unistd::close(self.file.into_raw_fd()).map_err(io::Error::from)
    }
}
