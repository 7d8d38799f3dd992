// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial Communication Interface, in SPI and USART modes.
//!
//! The two modes share a register layout; the bits that differ are split
//! into [`spi`] and [`usart`].

use super::{field, Reg};

pub const CTRLA: Reg = Reg::u32(0x00);
pub const CTRLB: Reg = Reg::u32(0x04);
pub const INTENCLR: Reg = Reg::u8(0x14);
pub const INTFLAG: Reg = Reg::u8(0x18);
pub const STATUS: Reg = Reg::u16(0x1A);
pub const SYNCBUSY: Reg = Reg::u32(0x1C);
pub const DATA: Reg = Reg::u32(0x28);

bitflags::bitflags! {
    /// CTRLA bits common to every mode.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CtrlA: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
        const RUNSTDBY = 1 << 7;
        /// LSB first.
        const DORD = 1 << 30;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SyncBusy: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
        const CTRLB = 1 << 2;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct IntFlag: u32 {
        /// Data register empty: DATA can take another unit.
        const DRE = 1 << 0;
        const TXC = 1 << 1;
        /// Receive complete: DATA holds an unread unit.
        const RXC = 1 << 2;
        const ERROR = 1 << 7;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        const PERR = 1 << 0;
        const FERR = 1 << 1;
        const BUFOVF = 1 << 2;
    }
}

pub const fn mode(mode: u8) -> u32 {
    field(mode as u32, 2, 3)
}

pub mod spi {
    use super::{field, Reg};

    pub const BAUD: Reg = Reg::u8(0x0C);

    pub const MODE_MASTER: u8 = 0x3;

    pub const CPHA: u32 = 1 << 28;
    pub const CPOL: u32 = 1 << 29;

    /// Data out / clock / slave-select pad assignment.
    pub const fn dopo(dopo: u8) -> u32 {
        field(dopo as u32, 16, 2)
    }

    /// Data in pad.
    pub const fn dipo(pad: u8) -> u32 {
        field(pad as u32, 20, 2)
    }

    pub mod ctrlb {
        use super::field;

        pub const RXEN: u32 = 1 << 17;
        pub const MSSEN: u32 = 1 << 13;

        pub const fn chsize(bits: u8) -> u32 {
            field(bits as u32, 0, 3)
        }
    }
}

pub mod usart {
    use super::{field, Reg};

    pub const BAUD: Reg = Reg::u16(0x0C);

    pub const MODE_INTERNAL_CLOCK: u8 = 0x1;

    /// 16x oversampling, arithmetic baud generation.
    pub const fn sampr(sampr: u8) -> u32 {
        field(sampr as u32, 13, 3)
    }

    pub const fn txpo(txpo: u8) -> u32 {
        field(txpo as u32, 16, 2)
    }

    pub const fn rxpo(pad: u8) -> u32 {
        field(pad as u32, 20, 2)
    }

    pub const fn form(form: u8) -> u32 {
        field(form as u32, 24, 4)
    }

    pub mod ctrlb {
        use super::field;

        /// Two stop bits.
        pub const SBMODE: u32 = 1 << 6;
        /// Odd parity (when FORM selects parity).
        pub const PMODE: u32 = 1 << 13;
        pub const TXEN: u32 = 1 << 16;
        pub const RXEN: u32 = 1 << 17;

        pub const fn chsize(code: u8) -> u32 {
            field(code as u32, 0, 3)
        }
    }
}
