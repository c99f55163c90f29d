//! CLI command implementations
//!
//! Session commands (`probe`, `erase`, `info`) work with any
//! [`AvrProgrammer`](avrisp_core::programmer::AvrProgrammer); the
//! programmer is opened by the caller and always closed here.

mod list;
mod session;

pub use list::{list_parts, list_programmers};
pub use session::{run_erase, run_info, run_probe};
