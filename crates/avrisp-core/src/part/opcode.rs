//! Op-code templates for the AVR serial programming instruction set
//!
//! Every serial programming instruction is a 32-bit frame. A template
//! describes each of the 32 bit slots: a fixed value, an address bit, a
//! data bit travelling to or from the target, or "don't care".
//!
//! Templates are written MSB first, one whitespace-separated token per bit:
//!
//! ```text
//! 1 0 1 0  1 1 0 0  0 1 0 1  0 0 1 1  x x x x  x x x x  x x x x  x x x x
//! ```
//!
//! Slot 31 is bit 7 of frame byte 0, slot 0 is bit 0 of frame byte 3.

use core::fmt;
use core::str::FromStr;

/// Number of bit slots in a serial programming instruction
pub const OPCODE_BITS: usize = 32;

/// Meaning of one bit slot in a command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpBit {
    /// Don't care, transmitted as 0
    Ignore,
    /// Fixed instruction bit
    Value(bool),
    /// Bit N of the memory address
    Address(u8),
    /// Bit N of the data byte written to the target
    Input(u8),
    /// Bit N of the data byte read back from the target
    Output(u8),
}

/// Error returned when an op-code template string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeParseError {
    /// Template does not contain exactly 32 tokens
    WrongLength(usize),
    /// Token is not one of `0`, `1`, `x`, `aN`, `i`, `o`
    BadToken(String),
}

impl fmt::Display for OpcodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength(n) => write!(f, "op-code template has {} bits, expected 32", n),
            Self::BadToken(tok) => write!(f, "invalid op-code template token '{}'", tok),
        }
    }
}

impl std::error::Error for OpcodeParseError {}

/// Bit layout of one serial programming instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTemplate {
    /// Indexed by bit number, 0 = LSB of the last frame byte
    bits: [OpBit; OPCODE_BITS],
}

/// Frame byte index and mask for bit slot `i`
fn slot(i: usize) -> (usize, u8) {
    (3 - i / 8, 1 << (i % 8))
}

fn put(frame: &mut [u8; 4], i: usize, on: bool) {
    let (byte, mask) = slot(i);
    if on {
        frame[byte] |= mask;
    } else {
        frame[byte] &= !mask;
    }
}

impl OpcodeTemplate {
    /// Build a template from slots given MSB first
    pub fn from_msb_first(slots: [OpBit; OPCODE_BITS]) -> Self {
        let mut bits = slots;
        bits.reverse();
        Self { bits }
    }

    /// Merge the fixed instruction bits into `frame`
    pub fn set_bits(&self, frame: &mut [u8; 4]) {
        for (i, bit) in self.bits.iter().enumerate() {
            if let OpBit::Value(on) = *bit {
                put(frame, i, on);
            }
        }
    }

    /// Merge the address bits of `addr` into `frame`
    pub fn set_addr(&self, frame: &mut [u8; 4], addr: u32) {
        for (i, bit) in self.bits.iter().enumerate() {
            if let OpBit::Address(n) = *bit {
                put(frame, i, addr & (1 << n) != 0);
            }
        }
    }

    /// Merge the data bits of `data` into `frame`
    pub fn set_input(&self, frame: &mut [u8; 4], data: u8) {
        for (i, bit) in self.bits.iter().enumerate() {
            if let OpBit::Input(n) = *bit {
                put(frame, i, data & (1 << n) != 0);
            }
        }
    }

    /// Extract the data byte returned by the target from a response frame
    pub fn get_output(&self, response: &[u8; 4]) -> u8 {
        let mut data = 0u8;
        for (i, bit) in self.bits.iter().enumerate() {
            if let OpBit::Output(n) = *bit {
                let (byte, mask) = slot(i);
                if response[byte] & mask != 0 {
                    data |= 1 << n;
                }
            }
        }
        data
    }

    /// Build a zeroed frame carrying only the fixed instruction bits
    pub fn frame(&self) -> [u8; 4] {
        let mut frame = [0u8; 4];
        self.set_bits(&mut frame);
        frame
    }
}

impl FromStr for OpcodeTemplate {
    type Err = OpcodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() != OPCODE_BITS {
            return Err(OpcodeParseError::WrongLength(tokens.len()));
        }

        let mut slots = [OpBit::Ignore; OPCODE_BITS];
        for (pos, tok) in tokens.iter().enumerate() {
            let bitno = (OPCODE_BITS - 1 - pos) as u8;
            slots[pos] = match *tok {
                "0" => OpBit::Value(false),
                "1" => OpBit::Value(true),
                "x" | "X" => OpBit::Ignore,
                "i" => OpBit::Input(bitno % 8),
                "o" => OpBit::Output(bitno % 8),
                t => match t.strip_prefix('a').map(str::parse::<u8>) {
                    Some(Ok(n)) if n < OPCODE_BITS as u8 => OpBit::Address(n),
                    _ => return Err(OpcodeParseError::BadToken(t.to_string())),
                },
            };
        }

        Ok(Self::from_msb_first(slots))
    }
}

impl fmt::Display for OpcodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, bit) in self.bits.iter().rev().enumerate() {
            if pos > 0 {
                f.write_str(if pos % 4 == 0 { "  " } else { " " })?;
            }
            match bit {
                OpBit::Ignore => f.write_str("x")?,
                OpBit::Value(on) => f.write_str(if *on { "1" } else { "0" })?,
                OpBit::Address(n) => write!(f, "a{}", n)?,
                OpBit::Input(_) => f.write_str("i")?,
                OpBit::Output(_) => f.write_str("o")?,
            }
        }
        Ok(())
    }
}
