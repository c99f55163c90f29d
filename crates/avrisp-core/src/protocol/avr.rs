//! AVR serial programming helpers
//!
//! Everything here is built on [`AvrProgrammer::cmd`] and the part's
//! op-code templates, so it works with any backend that can exchange a
//! 4-byte frame.

use crate::error::{Error, Result};
use crate::part::{AvrOp, Part};
use crate::programmer::AvrProgrammer;

/// Fuse and lock bytes, where the part defines a read instruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fuses {
    /// Low fuse
    pub low: Option<u8>,
    /// High fuse
    pub high: Option<u8>,
    /// Extended fuse
    pub ext: Option<u8>,
    /// Lock byte
    pub lock: Option<u8>,
}

/// Read one byte using the template for `op` at address `addr`
pub fn read_byte<P: AvrProgrammer + ?Sized>(
    pgm: &mut P,
    part: &Part,
    op: AvrOp,
    addr: u32,
) -> Result<u8> {
    let template = part.op(op).ok_or(Error::MissingOpcode(op))?;

    let mut tx = template.frame();
    template.set_addr(&mut tx, addr);
    let mut rx = [0u8; 4];
    pgm.cmd(&tx, &mut rx)?;

    let value = template.get_output(&rx);
    log::trace!("{} @ {:#x} -> {:#04x}", op, addr, value);
    Ok(value)
}

/// Read the three signature bytes
pub fn read_signature<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part) -> Result<[u8; 3]> {
    let mut sig = [0u8; 3];
    for (addr, byte) in sig.iter_mut().enumerate() {
        *byte = read_byte(pgm, part, AvrOp::ReadSignature, addr as u32)?;
    }
    Ok(sig)
}

/// Compare a signature read from the device against the part
///
/// All-zero and all-ones signatures mean nothing answered on the bus,
/// which is reported as a missing target rather than a wrong one.
pub fn check_signature(part: &Part, found: [u8; 3]) -> Result<()> {
    if found == [0x00; 3] || found == [0xFF; 3] {
        return Err(Error::ProgramEnableFailed);
    }
    if found != part.signature {
        return Err(Error::SignatureMismatch {
            expected: part.signature,
            found,
        });
    }
    Ok(())
}

/// Read every fuse and lock byte the part knows how to read
pub fn read_fuses<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part) -> Result<Fuses> {
    let mut read = |op| -> Result<Option<u8>> {
        if part.op(op).is_some() {
            read_byte(pgm, part, op, 0).map(Some)
        } else {
            Ok(None)
        }
    };

    Ok(Fuses {
        low: read(AvrOp::ReadLowFuse)?,
        high: read(AvrOp::ReadHighFuse)?,
        ext: read(AvrOp::ReadExtFuse)?,
        lock: read(AvrOp::ReadLock)?,
    })
}
