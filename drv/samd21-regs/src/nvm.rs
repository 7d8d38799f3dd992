// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NVM software calibration row (read-only, factory programmed).
//!
//! Offsets are relative to [`crate::base::NVM_SW_CALIB`].

use super::Reg;

pub const CALIB_WORD0: Reg = Reg::u32(0x0);
pub const CALIB_WORD1: Reg = Reg::u32(0x4);

/// ADC linearity trim: bits 27..34 of the 64-bit row, straddling the two
/// words.
pub const ADC_LINEARITY_POS: u32 = 27;
pub const ADC_LINEARITY_WIDTH: u32 = 8;

/// ADC bias trim: bits 3..5 of the second word.
pub const ADC_BIASCAL_POS: u32 = 3;
pub const ADC_BIASCAL_WIDTH: u32 = 3;
