// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pin naming and multiplexer routing.

use drv_samd21_regs::{port, Reg};

/// A PORT group. The G18A only bonds out A and B.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Group {
    A = 0,
    B = 1,
}

impl Group {
    /// Offset of this group's register copy within PORT.
    pub const fn offset(self) -> usize {
        self as usize * port::GROUP
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    pub group: Group,
    /// 0..=31 within the group.
    pub number: u8,
}

impl Pin {
    pub const PA11: Self = Self::new(Group::A, 11);
    pub const PA12: Self = Self::new(Group::A, 12);
    pub const PA13: Self = Self::new(Group::A, 13);
    pub const PA14: Self = Self::new(Group::A, 14);
    pub const PA15: Self = Self::new(Group::A, 15);
    pub const PB22: Self = Self::new(Group::B, 22);
    pub const PB23: Self = Self::new(Group::B, 23);

    pub const fn new(group: Group, number: u8) -> Self {
        Self {
            group,
            number: number & 0x1F,
        }
    }

    pub(crate) fn pincfg(self) -> Reg {
        port::PINCFG0.at(self.group.offset() + self.number as usize)
    }
}

/// Peripheral multiplexer function, A through H.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Function {
    /// EIC
    A = 0,
    /// Analog: ADC, AC, DAC
    B = 1,
    /// SERCOM
    C = 2,
    /// SERCOM-ALT
    D = 3,
    /// TC/TCC
    E = 4,
    F = 5,
    /// COM: USB, I2S
    G = 6,
    /// GCLK/AC outputs
    H = 7,
}

/// A pin handed to a peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinRoute {
    pub pin: Pin,
    pub function: Function,
    /// Enable the input buffer. Needed for anything the peripheral reads.
    pub input: bool,
    pub pull: bool,
    pub strong_drive: bool,
}

impl PinRoute {
    pub const fn output(pin: Pin, function: Function) -> Self {
        Self {
            pin,
            function,
            input: false,
            pull: false,
            strong_drive: false,
        }
    }

    pub const fn input(pin: Pin, function: Function) -> Self {
        Self {
            input: true,
            ..Self::output(pin, function)
        }
    }

    pub const fn with_strong_drive(self) -> Self {
        Self {
            strong_drive: true,
            ..self
        }
    }

    /// The WRCONFIG value that applies this route in one write.
    ///
    /// WRCONFIG addresses a half of the group at a time: HWSEL picks the
    /// upper half, and the mask bit is the pin's position within that half.
    pub(crate) fn wrconfig(&self) -> u32 {
        use port::wrconfig::*;

        let n = self.pin.number;
        let mut v = WRPINCFG
            | WRPMUX
            | PMUXEN
            | pmux(self.function as u8)
            | pinmask(1 << (n % 16));
        if n >= 16 {
            v |= HWSEL;
        }
        if self.input {
            v |= INEN;
        }
        if self.pull {
            v |= PULLEN;
        }
        if self.strong_drive {
            v |= DRVSTR;
        }
        v
    }
}
