//! Part capability flags

use bitflags::bitflags;

bitflags! {
    /// Programming interfaces a part needs besides (or instead of) ISP
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PartFlags: u32 {
        /// Tiny Programming Interface (reduced-pin ATtiny4/5/9/10/20/40)
        const TPI  = 1 << 0;
        /// Program and Debug Interface (ATxmega)
        const PDI  = 1 << 1;
        /// Unified Program and Debug Interface
        const UPDI = 1 << 2;
    }
}
