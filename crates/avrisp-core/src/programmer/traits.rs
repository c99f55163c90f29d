//! Programmer trait definitions

use crate::error::Result;
use crate::part::Part;

/// An AVR serial (ISP) programmer
///
/// Sessions are opened by backend-specific constructors; once a value
/// implementing this trait exists it owns the underlying hardware until
/// [`close`](AvrProgrammer::close) is called or it is dropped.
///
/// `enable`/`disable`/`powerup`/`powerdown` default to no-ops because most
/// programmers have nothing to switch.
pub trait AvrProgrammer {
    /// Programmer name, as used on the command line
    fn name(&self) -> &'static str;

    /// Log a description of the programmer and its settings
    fn display(&self, prefix: &str);

    /// Take control of the programming lines
    fn enable(&mut self) {}

    /// Release the programming lines
    fn disable(&mut self) {}

    /// Power up the target
    fn powerup(&mut self) {}

    /// Power down the target
    fn powerdown(&mut self) {}

    /// Bring the target into programming mode
    fn initialize(&mut self, part: &Part) -> Result<()>;

    /// Send a single program-enable instruction and check the echo
    fn program_enable(&mut self, part: &Part) -> Result<()>;

    /// Erase the whole chip and re-enter programming mode
    fn chip_erase(&mut self, part: &Part) -> Result<()>;

    /// Exchange one 4-byte serial programming instruction
    fn cmd(&mut self, tx: &[u8; 4], rx: &mut [u8; 4]) -> Result<()>;

    /// Release the hardware; never fails and may be called more than once
    fn close(&mut self);
}

impl<P: AvrProgrammer + ?Sized> AvrProgrammer for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn display(&self, prefix: &str) {
        (**self).display(prefix)
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn powerup(&mut self) {
        (**self).powerup()
    }

    fn powerdown(&mut self) {
        (**self).powerdown()
    }

    fn initialize(&mut self, part: &Part) -> Result<()> {
        (**self).initialize(part)
    }

    fn program_enable(&mut self, part: &Part) -> Result<()> {
        (**self).program_enable(part)
    }

    fn chip_erase(&mut self, part: &Part) -> Result<()> {
        (**self).chip_erase(part)
    }

    fn cmd(&mut self, tx: &[u8; 4], rx: &mut [u8; 4]) -> Result<()> {
        (**self).cmd(tx, rx)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
