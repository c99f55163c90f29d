//! Programmer abstraction
//!
//! Every backend implements [`AvrProgrammer`], the fixed set of named
//! operations the CLI dispatches through.

mod traits;

pub use traits::*;
