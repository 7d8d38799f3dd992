// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Real-Time Counter, mode 2 (clock/calendar).

use super::{extract, field, Reg};

pub const CTRL: Reg = Reg::u16(0x00);
pub const READREQ: Reg = Reg::u16(0x02);
pub const STATUS: Reg = Reg::u8(0x0A);
pub const CLOCK: Reg = Reg::u32(0x10);

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Ctrl: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
        /// 12-hour clock with AM/PM flag in HOUR[4].
        const CLKREP = 1 << 6;
        const MATCHCLR = 1 << 7;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ReadReq: u32 {
        const RCONT = 1 << 14;
        const RREQ = 1 << 15;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        const SYNCBUSY = 1 << 7;
    }
}

pub mod ctrl {
    use super::field;

    pub const MODE_CLOCK: u32 = field(2, 2, 2);

    pub const fn prescaler(div: u8) -> u32 {
        field(div as u32, 8, 4)
    }
}

pub mod readreq {
    use super::field;

    pub const fn addr(offset: usize) -> u32 {
        field(offset as u32, 0, 6)
    }
}

/// Field positions in the CLOCK register.
pub mod clock {
    use super::{extract, field};

    pub const SECOND: (u32, u32) = (0, 6);
    pub const MINUTE: (u32, u32) = (6, 6);
    pub const HOUR: (u32, u32) = (12, 5);
    pub const DAY: (u32, u32) = (17, 5);
    pub const MONTH: (u32, u32) = (22, 4);
    pub const YEAR: (u32, u32) = (26, 6);

    pub const fn get(reg: u32, (pos, width): (u32, u32)) -> u32 {
        extract(reg, pos, width)
    }

    pub const fn put(value: u32, (pos, width): (u32, u32)) -> u32 {
        field(value, pos, width)
    }
}
