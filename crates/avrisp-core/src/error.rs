//! Error types for avrisp-core
//!
//! The core error is a small `Copy` enum shared by every programmer backend.
//! Backends keep their own detailed error types and convert at the
//! [`AvrProgrammer`](crate::programmer::AvrProgrammer) boundary.

use core::fmt;

use crate::part::AvrOp;

/// Core error type - Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    /// Programmer configuration is missing or invalid
    InvalidConfig,

    // Transport errors
    /// Transfer to or from the programmer failed
    TransferFailed,
    /// Programmer session is not open
    ProgrammerNotReady,
    /// General programmer error
    ProgrammerError,
    /// GPIO control failed
    GpioError,

    // Protocol errors
    /// The part does not define an op-code template for this operation
    MissingOpcode(AvrOp),
    /// The part needs TPI, which the programmer cannot speak
    TpiNotSupported,
    /// The target did not echo the program-enable command
    ProgramEnableMismatch,
    /// The target never entered programming mode
    ProgramEnableFailed,
    /// The target reported a signature that does not match the part
    SignatureMismatch {
        /// Signature from the part database
        expected: [u8; 3],
        /// Signature read from the device
        found: [u8; 3],
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig => write!(f, "invalid programmer configuration"),
            Self::TransferFailed => write!(f, "transfer failed"),
            Self::ProgrammerNotReady => write!(f, "programmer not ready"),
            Self::ProgrammerError => write!(f, "programmer error"),
            Self::GpioError => write!(f, "GPIO control failed"),
            Self::MissingOpcode(op) => write!(f, "part has no op-code template for {}", op),
            Self::TpiNotSupported => write!(f, "part requires TPI, which is not supported"),
            Self::ProgramEnableMismatch => write!(f, "program enable: target rejected handshake"),
            Self::ProgramEnableFailed => write!(f, "program enable: target not responding"),
            Self::SignatureMismatch { expected, found } => write!(
                f,
                "signature mismatch: expected {:02X} {:02X} {:02X}, found {:02X} {:02X} {:02X}",
                expected[0], expected[1], expected[2], found[0], found[1], found[2]
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
