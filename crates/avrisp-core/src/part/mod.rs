//! AVR part descriptors and database
//!
//! A part describes one target microcontroller: its signature, the
//! programming interfaces it speaks and, for each logical operation, the
//! op-code template that tells a programmer how to build the 4-byte
//! serial programming frame.

mod database;
mod flags;
mod opcode;
mod types;

pub use database::*;
pub use flags::PartFlags;
pub use opcode::*;
pub use types::*;
