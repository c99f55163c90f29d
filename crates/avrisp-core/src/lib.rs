//! avrisp-core - Core library for AVR in-system programming
//!
//! This crate holds everything that is shared between the CLI and the
//! programmer backends:
//!
//! - [`part`] - part descriptors, op-code templates and the part database
//! - [`programmer`] - the [`AvrProgrammer`](programmer::AvrProgrammer) trait,
//!   i.e. the fixed set of named operations every backend implements
//! - [`protocol`] - generic AVR serial programming helpers built on top of
//!   the raw 4-byte command exchange
//! - [`retry`] - a bounded retry combinator with fixed backoff
//!
//! # Example
//!
//! ```ignore
//! use avrisp_core::{part::PartDatabase, programmer::AvrProgrammer, protocol::avr};
//!
//! fn probe<P: AvrProgrammer>(pgm: &mut P) -> avrisp_core::Result<()> {
//!     let db = PartDatabase::builtin().expect("built-in part database");
//!     let part = db.find("m328p").unwrap();
//!     pgm.initialize(part)?;
//!     let sig = avr::read_signature(pgm, part)?;
//!     println!("Signature: {:02X} {:02X} {:02X}", sig[0], sig[1], sig[2]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod part;
pub mod programmer;
pub mod protocol;
pub mod retry;

pub use error::{Error, Result};
