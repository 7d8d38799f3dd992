// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power Manager: bus clock masks.

use super::Reg;

pub const APBAMASK: Reg = Reg::u32(0x18);
pub const APBBMASK: Reg = Reg::u32(0x1C);
pub const APBCMASK: Reg = Reg::u32(0x20);

/// APBAMASK bit positions.
pub mod apba {
    pub const GCLK: u8 = 3;
    pub const RTC: u8 = 5;
}

/// APBCMASK bit positions.
pub mod apbc {
    /// SERCOMn is at `SERCOM0 + n`.
    pub const SERCOM0: u8 = 2;
    pub const ADC: u8 = 16;
}
