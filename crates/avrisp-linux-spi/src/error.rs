//! Error types for Linux SPI programmer operations

use avrisp_core::part::AvrOp;
use avrisp_core::Error as CoreError;
use thiserror::Error;

/// Sysfs GPIO errors
#[derive(Debug, Error)]
pub enum GpioError {
    /// Control file never became available
    #[error("Timed out opening {path} after {attempts} attempts: {source}")]
    OpenTimeout {
        path: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Writing the control file failed
    #[error("Failed to write '{value}' to {path}: {source}")]
    WriteFailed {
        path: String,
        value: String,
        #[source]
        source: std::io::Error,
    },
}

/// Linux SPI programmer errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Device not specified
    #[error("No device specified. Use dev=/dev/spidevX.Y")]
    NoDevice,

    /// Reset pin not specified
    #[error("No reset pin specified. Use reset=<gpio>")]
    NoResetPin,

    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Session has already been closed
    #[error("SPI device is not open")]
    NotOpen,

    /// SPI transfer ioctl failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// Kernel moved fewer bytes than requested
    #[error("Short SPI transfer: {actual} of {expected} bytes")]
    ShortTransfer { expected: usize, actual: usize },

    /// Reset GPIO control failed
    #[error(transparent)]
    Gpio(#[from] GpioError),

    /// Part needs TPI
    #[error("{part} requires TPI, which linux_spi does not support")]
    TpiNotSupported { part: String },

    /// Part lacks an op-code template
    #[error("{part} has no {op} instruction defined")]
    MissingOpcode { part: String, op: AvrOp },

    /// Program-enable was not echoed
    #[error("Program enable not echoed: expected {expected:#04x}, got {got:#04x}")]
    EchoMismatch { expected: u8, got: u8 },

    /// Target never acknowledged program-enable
    #[error("Target did not enter programming mode after {attempts} attempts")]
    ProgramEnableExhausted { attempts: u32 },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl LinuxSpiError {
    /// Whether the failure came from the transport rather than the target
    ///
    /// The program-enable loop gives up immediately on these.
    pub fn is_hard_failure(&self) -> bool {
        !matches!(self, LinuxSpiError::EchoMismatch { .. })
    }
}

impl From<&LinuxSpiError> for CoreError {
    fn from(e: &LinuxSpiError) -> Self {
        match e {
            LinuxSpiError::NoDevice
            | LinuxSpiError::NoResetPin
            | LinuxSpiError::InvalidParameter(_) => CoreError::InvalidConfig,
            LinuxSpiError::OpenFailed { .. } => CoreError::ProgrammerError,
            LinuxSpiError::NotOpen => CoreError::ProgrammerNotReady,
            LinuxSpiError::TransferFailed(_) | LinuxSpiError::ShortTransfer { .. } => {
                CoreError::TransferFailed
            }
            LinuxSpiError::Gpio(_) => CoreError::GpioError,
            LinuxSpiError::TpiNotSupported { .. } => CoreError::TpiNotSupported,
            LinuxSpiError::MissingOpcode { op, .. } => CoreError::MissingOpcode(*op),
            LinuxSpiError::EchoMismatch { .. } => CoreError::ProgramEnableMismatch,
            LinuxSpiError::ProgramEnableExhausted { .. } => CoreError::ProgramEnableFailed,
        }
    }
}

/// Result type for Linux SPI operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
