//! Part type definitions

use core::fmt;
use std::collections::BTreeMap;
use std::time::Duration;

use super::flags::PartFlags;
use super::opcode::OpcodeTemplate;

/// Logical serial programming operations a part may define a template for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AvrOp {
    /// Enter serial programming mode
    ProgramEnable,
    /// Erase flash and EEPROM
    ChipErase,
    /// Read one signature byte (address 0..=2)
    ReadSignature,
    /// Read the low fuse byte
    ReadLowFuse,
    /// Read the high fuse byte
    ReadHighFuse,
    /// Read the extended fuse byte
    ReadExtFuse,
    /// Read the lock byte
    ReadLock,
}

impl AvrOp {
    /// All operations, in database order
    pub const ALL: [AvrOp; 7] = [
        AvrOp::ProgramEnable,
        AvrOp::ChipErase,
        AvrOp::ReadSignature,
        AvrOp::ReadLowFuse,
        AvrOp::ReadHighFuse,
        AvrOp::ReadExtFuse,
        AvrOp::ReadLock,
    ];

    /// Short name used in the part database and diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            AvrOp::ProgramEnable => "pgm_enable",
            AvrOp::ChipErase => "chip_erase",
            AvrOp::ReadSignature => "read_sig",
            AvrOp::ReadLowFuse => "read_lfuse",
            AvrOp::ReadHighFuse => "read_hfuse",
            AvrOp::ReadExtFuse => "read_efuse",
            AvrOp::ReadLock => "read_lock",
        }
    }
}

impl fmt::Display for AvrOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An AVR microcontroller as seen by a serial programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Short identifier, e.g. "m328p"
    pub id: String,
    /// Marketing name, e.g. "ATmega328P"
    pub name: String,
    /// Three-byte device signature
    pub signature: [u8; 3],
    /// Programming interfaces besides ISP
    pub flags: PartFlags,
    /// Time the target needs to finish a chip erase
    pub chip_erase_delay: Duration,
    ops: BTreeMap<AvrOp, OpcodeTemplate>,
}

impl Part {
    /// Create a part with no op-code templates
    pub fn new(id: impl Into<String>, name: impl Into<String>, signature: [u8; 3]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            signature,
            flags: PartFlags::empty(),
            chip_erase_delay: Duration::ZERO,
            ops: BTreeMap::new(),
        }
    }

    /// Set the interface flags
    pub fn with_flags(mut self, flags: PartFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the chip erase delay
    pub fn with_chip_erase_delay(mut self, delay: Duration) -> Self {
        self.chip_erase_delay = delay;
        self
    }

    /// Define the template for `op`
    pub fn with_op(mut self, op: AvrOp, template: OpcodeTemplate) -> Self {
        self.ops.insert(op, template);
        self
    }

    /// Template for `op`, if the part defines one
    pub fn op(&self, op: AvrOp) -> Option<&OpcodeTemplate> {
        self.ops.get(&op)
    }

    /// All defined templates
    pub fn ops(&self) -> impl Iterator<Item = (AvrOp, &OpcodeTemplate)> {
        self.ops.iter().map(|(op, t)| (*op, t))
    }

    /// Whether the part can only be programmed over TPI
    pub fn has_tpi(&self) -> bool {
        self.flags.contains(PartFlags::TPI)
    }
}
