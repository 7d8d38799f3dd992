// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic Clock Controller.

use super::{field, Reg};

pub const CTRL: Reg = Reg::u8(0x0);
pub const STATUS: Reg = Reg::u8(0x1);
pub const CLKCTRL: Reg = Reg::u16(0x2);
pub const GENCTRL: Reg = Reg::u32(0x4);
pub const GENDIV: Reg = Reg::u32(0x8);

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        const SYNCBUSY = 1 << 7;
    }
}

pub mod clkctrl {
    use super::field;

    pub const CLKEN: u32 = 1 << 14;
    pub const WRTLOCK: u32 = 1 << 15;

    pub const fn id(id: u8) -> u32 {
        field(id as u32, 0, 6)
    }

    pub const fn gen(gen: u8) -> u32 {
        field(gen as u32, 8, 4)
    }
}

pub mod genctrl {
    use super::field;

    pub const GENEN: u32 = 1 << 16;
    pub const IDC: u32 = 1 << 17;
    /// Divide by 2^(GENDIV.DIV + 1) instead of by GENDIV.DIV.
    pub const DIVSEL: u32 = 1 << 20;
    pub const RUNSTDBY: u32 = 1 << 21;

    pub const fn id(gen: u8) -> u32 {
        field(gen as u32, 0, 4)
    }

    pub const fn src(src: u8) -> u32 {
        field(src as u32, 8, 5)
    }
}

pub mod gendiv {
    use super::field;

    pub const fn id(gen: u8) -> u32 {
        field(gen as u32, 0, 4)
    }

    pub const fn div(div: u16) -> u32 {
        field(div as u32, 8, 16)
    }
}

/// Generic clock channel ids (CLKCTRL.ID).
pub mod id {
    pub const RTC: u8 = 0x04;
    /// SERCOMn core clock is at `SERCOM0_CORE + n`.
    pub const SERCOM0_CORE: u8 = 0x14;
    pub const ADC: u8 = 0x1E;
}

/// Clock sources a generator can be fed from (GENCTRL.SRC).
pub mod src {
    pub const XOSC: u8 = 0x00;
    pub const GCLKIN: u8 = 0x01;
    pub const GCLKGEN1: u8 = 0x02;
    pub const OSCULP32K: u8 = 0x03;
    pub const OSC32K: u8 = 0x04;
    pub const XOSC32K: u8 = 0x05;
    pub const OSC8M: u8 = 0x06;
    pub const DFLL48M: u8 = 0x07;
    pub const FDPLL: u8 = 0x08;
}
