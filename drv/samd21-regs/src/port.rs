// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PORT: pin direction, multiplexing and pad configuration.
//!
//! Registers are per group (port A, port B); group `n` is at `n * GROUP`.

use super::{field, Reg};

pub const GROUP: usize = 0x80;

pub const DIRSET: Reg = Reg::u32(0x08);
pub const OUTCLR: Reg = Reg::u32(0x14);
pub const OUTSET: Reg = Reg::u32(0x18);
pub const WRCONFIG: Reg = Reg::u32(0x28);
/// First of 32 byte-wide PINCFG registers.
pub const PINCFG0: Reg = Reg::u8(0x40);

pub mod wrconfig {
    use super::field;

    pub const PMUXEN: u32 = 1 << 16;
    pub const INEN: u32 = 1 << 17;
    pub const PULLEN: u32 = 1 << 18;
    pub const DRVSTR: u32 = 1 << 22;
    pub const WRPMUX: u32 = 1 << 28;
    pub const WRPINCFG: u32 = 1 << 30;
    /// Apply PINMASK to pins 16..31 instead of 0..15.
    pub const HWSEL: u32 = 1 << 31;

    pub const fn pinmask(mask: u16) -> u32 {
        field(mask as u32, 0, 16)
    }

    pub const fn pmux(function: u8) -> u32 {
        field(function as u32, 24, 4)
    }
}

pub mod pincfg {
    pub const PMUXEN: u32 = 1 << 0;
    pub const INEN: u32 = 1 << 1;
    pub const PULLEN: u32 = 1 << 2;
    pub const DRVSTR: u32 = 1 << 6;
}
