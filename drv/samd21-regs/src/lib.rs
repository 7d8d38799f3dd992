// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register definitions and access for the ATSAMD21.
//!
//! Rather than a generated PAC, drivers see a peripheral as a
//! [`RegisterBlock`]: something you can read and write at an offset, with a
//! width. On the part that is [`Mmio`], a base address dereferenced with
//! volatile accesses. On the host it is [`sim::SimBlock`], which records every
//! access and lets tests plug in a model of the hardware. The drivers are the
//! same code either way.
//!
//! The per-peripheral modules hold offsets, bit flags and field builders
//! straight out of the datasheet. Only what the drivers in this workspace use
//! is described.

#![cfg_attr(target_os = "none", no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod adc;
pub mod gclk;
pub mod nvm;
pub mod pm;
pub mod port;
pub mod rtc;
pub mod sercom;

#[cfg(not(target_os = "none"))]
pub mod sim;

use vcell::VolatileCell;

/// Access width of a register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub const fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Half => 0xFFFF,
            Width::Word => 0xFFFF_FFFF,
        }
    }
}

/// A register: byte offset from the start of its block, plus width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg {
    pub offset: usize,
    pub width: Width,
}

impl Reg {
    pub const fn u8(offset: usize) -> Self {
        Self {
            offset,
            width: Width::Byte,
        }
    }

    pub const fn u16(offset: usize) -> Self {
        Self {
            offset,
            width: Width::Half,
        }
    }

    pub const fn u32(offset: usize) -> Self {
        Self {
            offset,
            width: Width::Word,
        }
    }

    /// The same register, `bytes` further along. Used for register arrays
    /// and for the per-group copies of the PORT registers.
    pub const fn at(self, bytes: usize) -> Self {
        Self {
            offset: self.offset + bytes,
            width: self.width,
        }
    }
}

/// Something that has registers.
///
/// Values are always passed as `u32`; byte and half-word registers only use
/// the low bits, and writes are truncated to the register's width.
pub trait RegisterBlock {
    fn read(&self, reg: Reg) -> u32;

    fn write(&self, reg: Reg, value: u32);

    /// Read-modify-write. Not atomic: the caller owns the block.
    fn modify(&self, reg: Reg, f: impl FnOnce(u32) -> u32) {
        let v = self.read(reg);
        self.write(reg, f(v));
    }

    fn set_bits(&self, reg: Reg, bits: u32) {
        self.modify(reg, |v| v | bits);
    }

    fn clear_bits(&self, reg: Reg, bits: u32) {
        self.modify(reg, |v| v & !bits);
    }

    fn is_set(&self, reg: Reg, bits: u32) -> bool {
        self.read(reg) & bits == bits
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &T {
    fn read(&self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// Fixed base addresses.
pub mod base {
    pub const PM: usize = 0x4000_0400;
    pub const GCLK: usize = 0x4000_0C00;
    pub const RTC: usize = 0x4000_1400;
    pub const PORT: usize = 0x4100_4400;
    pub const SERCOM0: usize = 0x4200_0800;
    pub const SERCOM1: usize = 0x4200_0C00;
    pub const SERCOM2: usize = 0x4200_1000;
    pub const SERCOM3: usize = 0x4200_1400;
    pub const SERCOM4: usize = 0x4200_1800;
    pub const SERCOM5: usize = 0x4200_1C00;
    pub const ADC: usize = 0x4200_4000;
    /// Software calibration row in the NVM user area.
    pub const NVM_SW_CALIB: usize = 0x0080_6020;
}

/// A memory-mapped register block.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block, and the
    /// returned value must be the only handle used to access that block.
    /// Drivers assume they are alone with their registers: nothing arbitrates
    /// between two owners, and read-modify-write sequences are not atomic.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBlock for Mmio {
    fn read(&self, reg: Reg) -> u32 {
        let addr = self.base + reg.offset;
        // Safety: the constructor's contract puts a live register at every
        // offset the register modules define, and VolatileCell is
        // repr(transparent) over the value, so these casts are just volatile
        // loads of the right width.
        unsafe {
            match reg.width {
                Width::Byte => {
                    u32::from((*(addr as *const VolatileCell<u8>)).get())
                }
                Width::Half => {
                    u32::from((*(addr as *const VolatileCell<u16>)).get())
                }
                Width::Word => (*(addr as *const VolatileCell<u32>)).get(),
            }
        }
    }

    fn write(&self, reg: Reg, value: u32) {
        let addr = self.base + reg.offset;
        // Safety: as for `read`. Truncation to the register width is
        // intended.
        unsafe {
            match reg.width {
                Width::Byte => {
                    (*(addr as *const VolatileCell<u8>)).set(value as u8)
                }
                Width::Half => {
                    (*(addr as *const VolatileCell<u16>)).set(value as u16)
                }
                Width::Word => (*(addr as *const VolatileCell<u32>)).set(value),
            }
        }
    }
}

/// Places `value` into the field at `pos` that is `width` bits wide.
pub const fn field(value: u32, pos: u32, width: u32) -> u32 {
    (value & ((1 << width) - 1)) << pos
}

/// Extracts the field at `pos` that is `width` bits wide.
pub const fn extract(reg: u32, pos: u32, width: u32) -> u32 {
    (reg >> pos) & ((1 << width) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_round_trips_and_masks() {
        assert_eq!(field(0x3, 8, 3), 0x300);
        // Bits beyond the field width are dropped.
        assert_eq!(field(0xFF, 8, 3), 0x700);
        assert_eq!(extract(0x0000_1F00, 8, 3), 0x7);
    }

    #[test]
    fn reg_at_offsets_keep_width() {
        let r = Reg::u8(0x40).at(13);
        assert_eq!(r.offset, 0x4D);
        assert_eq!(r.width, Width::Byte);
    }

    #[test]
    fn modify_helpers_through_sim() {
        let sim = sim::SimBlock::new();
        let r = Reg::u16(0x2);
        sim.write(r, 0x0F0F);
        (&sim).set_bits(r, 0x1000);
        sim.clear_bits(r, 0x000F);
        assert_eq!(sim.peek(r), 0x1F00);
        assert!(sim.is_set(r, 0x1000));
        // Writes are truncated to the register width.
        sim.write(r, 0xABCD_1234);
        assert_eq!(sim.peek(r), 0x1234);
    }
}
