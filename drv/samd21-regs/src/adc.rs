// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analog-to-Digital Converter.

use super::{field, Reg};

pub const CTRLA: Reg = Reg::u8(0x00);
pub const REFCTRL: Reg = Reg::u8(0x01);
pub const AVGCTRL: Reg = Reg::u8(0x02);
pub const SAMPCTRL: Reg = Reg::u8(0x03);
pub const CTRLB: Reg = Reg::u16(0x04);
pub const SWTRIG: Reg = Reg::u8(0x0C);
pub const INPUTCTRL: Reg = Reg::u32(0x10);
pub const INTFLAG: Reg = Reg::u8(0x18);
pub const STATUS: Reg = Reg::u8(0x19);
pub const RESULT: Reg = Reg::u16(0x1A);
pub const CALIB: Reg = Reg::u16(0x28);

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CtrlA: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
        const RUNSTDBY = 1 << 2;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SwTrig: u32 {
        const FLUSH = 1 << 0;
        const START = 1 << 1;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct IntFlag: u32 {
        const RESRDY = 1 << 0;
        const OVERRUN = 1 << 1;
        const WINMON = 1 << 2;
        const SYNCRDY = 1 << 3;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        const SYNCBUSY = 1 << 7;
    }
}

pub mod refctrl {
    use super::field;

    pub const REFCOMP: u32 = 1 << 7;

    pub const fn refsel(sel: u8) -> u32 {
        field(sel as u32, 0, 4)
    }
}

pub mod sampctrl {
    use super::field;

    pub const fn samplen(len: u8) -> u32 {
        field(len as u32, 0, 6)
    }
}

pub mod ctrlb {
    use super::field;

    pub const DIFFMODE: u32 = 1 << 0;
    pub const LEFTADJ: u32 = 1 << 1;
    pub const FREERUN: u32 = 1 << 2;
    pub const CORREN: u32 = 1 << 3;

    pub const fn ressel(sel: u8) -> u32 {
        field(sel as u32, 4, 2)
    }

    pub const fn prescaler(div: u8) -> u32 {
        field(div as u32, 8, 3)
    }

    pub const PRESCALER_POS: u32 = 8;
    pub const PRESCALER_WIDTH: u32 = 3;
}

pub mod inputctrl {
    use super::field;

    pub const MUXPOS_MASK: u32 = 0x1F;
    /// Negative input tied to internal ground, for single-ended use.
    pub const MUXNEG_GND: u32 = 0x18 << 8;

    pub const fn muxpos(ch: u8) -> u32 {
        field(ch as u32, 0, 5)
    }

    pub const fn gain(gain: u8) -> u32 {
        field(gain as u32, 24, 4)
    }
}

pub mod calib {
    use super::field;

    pub const fn linearity_cal(v: u32) -> u32 {
        field(v, 0, 8)
    }

    pub const fn bias_cal(v: u32) -> u32 {
        field(v, 8, 3)
    }
}
