// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the SAMD21 ADC, single-ended, software triggered.
//!
//! Bring-up goes clock gate, reset, configure (factory calibration first),
//! enable. After that, [`Adc::read_channel`] takes one sample: select the
//! input, trigger with FLUSH so nothing already in the pipeline can come out
//! first, then poll for the result.

#![cfg_attr(target_os = "none", no_std)]

use bringup::{BringupError, Configure, Sequencer, State, Synchronized};
use busywait::{TimedOut, Wait};
use drv_samd21_regs::{adc, extract, nvm, RegisterBlock};
use drv_samd21_sys::{ClockError, ClockGenerator, Peripheral, PinRoute, Sys};
use ringbuf::{ringbuf, ringbuf_entry};

/// Highest MUXPOS value. Above AIN19 are the internal inputs (temperature
/// sensor, bandgap, scaled supplies).
pub const MAX_CHANNEL: u8 = 0x1F;

/// Rated maximum for CLK_ADC.
pub const MAX_ADC_HZ: u32 = 2_100_000;

/// Factory trim values from the NVM software calibration row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Calibration {
    pub linearity: u8,
    pub bias: u8,
}

impl Calibration {
    /// Reads both trims out of the calibration row.
    ///
    /// The linearity trim straddles the two words, so the row is read as one
    /// 64-bit value.
    pub fn from_fuses(fuses: &impl RegisterBlock) -> Self {
        let lo = u64::from(fuses.read(nvm::CALIB_WORD0));
        let hi = fuses.read(nvm::CALIB_WORD1);
        let row = lo | (u64::from(hi) << 32);
        let linearity = (row >> nvm::ADC_LINEARITY_POS)
            & ((1 << nvm::ADC_LINEARITY_WIDTH) - 1);
        let bias = extract(hi, nvm::ADC_BIASCAL_POS, nvm::ADC_BIASCAL_WIDTH);
        Self {
            linearity: linearity as u8,
            bias: bias as u8,
        }
    }

    /// The value for the CALIB register.
    pub const fn calib(self) -> u32 {
        adc::calib::linearity_cal(self.linearity as u32)
            | adc::calib::bias_cal(self.bias as u32)
    }
}

/// REFCTRL.REFSEL
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// 1.0 V internal
    Int1V = 0,
    /// VDDANA / 1.48
    IntVcc0 = 1,
    /// VDDANA / 2
    IntVcc1 = 2,
    ArefA = 3,
    ArefB = 4,
}

/// CTRLB.RESSEL
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Bits12 = 0,
    /// Only meaningful with averaging.
    Bits16 = 1,
    Bits10 = 2,
    Bits8 = 3,
}

/// CTRLB.PRESCALER: CLK_ADC = GCLK_ADC / 2^(n + 2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Prescaler {
    Div4 = 0,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
    Div256,
    Div512,
}

impl Prescaler {
    const ALL: [Prescaler; 8] = [
        Prescaler::Div4,
        Prescaler::Div8,
        Prescaler::Div16,
        Prescaler::Div32,
        Prescaler::Div64,
        Prescaler::Div128,
        Prescaler::Div256,
        Prescaler::Div512,
    ];

    pub const fn divisor(self) -> u32 {
        4 << self as u32
    }

    /// The smallest division of `gclk_hz` that is no faster than `max_hz`,
    /// or `None` if even the largest is too fast.
    pub const fn for_clock(gclk_hz: u32, max_hz: u32) -> Option<Self> {
        let mut i = 0;
        while i < Self::ALL.len() {
            let p = Self::ALL[i];
            if gclk_hz / p.divisor() <= max_hz {
                return Some(p);
            }
            i += 1;
        }
        None
    }
}

const MAIN_PRESCALER: Prescaler =
    match Prescaler::for_clock(drv_samd21_sys::MAIN_CLK_HZ, MAX_ADC_HZ) {
        Some(p) => p,
        None => Prescaler::Div512,
    };

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdcConfig {
    pub generator: ClockGenerator,
    /// Frequency `generator` runs at.
    pub gclk_hz: u32,
    pub reference: Reference,
    /// Extra half-cycles of CLK_ADC per sample, 0..=63.
    pub sample_length: u8,
    pub resolution: Resolution,
    pub prescaler: Prescaler,
    /// Analog pins to hand over to the ADC (function B).
    pub pins: &'static [PinRoute],
}

impl AdcConfig {
    /// Sampling from the 48 MHz main clock, referenced to VDDANA.
    pub const DEFAULT: Self = Self {
        generator: ClockGenerator::MAIN,
        gclk_hz: drv_samd21_sys::MAIN_CLK_HZ,
        reference: Reference::IntVcc0,
        sample_length: 10,
        resolution: Resolution::Bits12,
        prescaler: MAIN_PRESCALER,
        pins: &[],
    };

    #[cfg(feature = "mkrzero")]
    pub const MKRZERO_A0: Self = Self {
        pins: &[drv_samd21_sys::board::mkrzero::a0::ROUTE],
        ..Self::DEFAULT
    };
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdcError {
    Clock(ClockError),
    Bringup(BringupError),
    /// Channel number above [`MAX_CHANNEL`].
    BadChannel(u8),
    /// Sample length does not fit SAMPLEN.
    BadSampleLength(u8),
    /// The prescaler leaves CLK_ADC above [`MAX_ADC_HZ`].
    ClockTooFast { adc_hz: u32 },
    /// A bounded wait expired during a conversion.
    TimedOut,
}

impl From<ClockError> for AdcError {
    fn from(e: ClockError) -> Self {
        AdcError::Clock(e)
    }
}

impl From<BringupError> for AdcError {
    fn from(e: BringupError) -> Self {
        AdcError::Bringup(e)
    }
}

impl From<TimedOut> for AdcError {
    fn from(_: TimedOut) -> Self {
        AdcError::TimedOut
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Init,
    Calibration(u8, u8),
    Sample(u8, u16),
    BadChannel(u8),
    TimedOut,
}

ringbuf!(Trace, 16, Trace::None);

/// Register values for one configuration, computed before any of them is
/// written.
struct Settings {
    calib: u32,
    refctrl: u32,
    sampctrl: u32,
    ctrlb: u32,
}

impl Settings {
    fn new(config: &AdcConfig, cal: Calibration) -> Self {
        Self {
            calib: cal.calib(),
            refctrl: adc::refctrl::refsel(config.reference as u8),
            sampctrl: adc::sampctrl::samplen(config.sample_length),
            ctrlb: adc::ctrlb::ressel(config.resolution as u8)
                | adc::ctrlb::prescaler(config.prescaler as u8),
        }
    }
}

struct Regs<B>(B);

impl<B: RegisterBlock> Regs<B> {
    fn ctrla(&self) -> adc::CtrlA {
        adc::CtrlA::from_bits_truncate(self.0.read(adc::CTRLA))
    }

    fn await_sync(&self, wait: Wait) -> Result<(), TimedOut> {
        busywait::wait_while(wait, || self.sync_busy())
    }
}

impl<B: RegisterBlock> Synchronized for Regs<B> {
    fn request_reset(&self) {
        self.0.write(adc::CTRLA, adc::CtrlA::SWRST.bits());
    }

    fn reset_pending(&self) -> bool {
        self.ctrla().contains(adc::CtrlA::SWRST)
    }

    fn sync_busy(&self) -> bool {
        adc::Status::from_bits_truncate(self.0.read(adc::STATUS))
            .contains(adc::Status::SYNCBUSY)
    }

    fn is_enabled(&self) -> bool {
        self.ctrla().contains(adc::CtrlA::ENABLE)
    }

    fn request_enable(&self) {
        self.0.write(adc::CTRLA, adc::CtrlA::ENABLE.bits());
    }

    fn request_disable(&self) {
        self.0.clear_bits(adc::CTRLA, adc::CtrlA::ENABLE.bits());
    }
}

impl<B: RegisterBlock> Configure for Regs<B> {
    type Config = Settings;

    fn write_config(&self, s: &Settings, wait: Wait) -> Result<(), TimedOut> {
        self.0.write(adc::CALIB, s.calib);
        self.0.write(adc::REFCTRL, s.refctrl);
        self.0.write(adc::SAMPCTRL, s.sampctrl);
        self.0.write(adc::CTRLB, s.ctrlb);
        self.await_sync(wait)
    }
}

pub struct Adc<B> {
    regs: Regs<B>,
    fuses: B,
    seq: Sequencer,
}

impl Adc<drv_samd21_regs::Mmio> {
    /// Claims the ADC and the calibration row at their fixed addresses.
    ///
    /// # Safety
    ///
    /// There must be no other live handle to the ADC.
    pub unsafe fn claim() -> Self {
        use drv_samd21_regs::{base, Mmio};
        // Safety: forwarded to our caller. The calibration row is read-only.
        unsafe {
            Self::new(Mmio::new(base::ADC), Mmio::new(base::NVM_SW_CALIB))
        }
    }
}

impl<B: RegisterBlock> Adc<B> {
    pub fn new(regs: B, fuses: B) -> Self {
        Self {
            regs: Regs(regs),
            fuses,
            seq: Sequencer::default(),
        }
    }

    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.seq.set_wait(wait);
        self
    }

    pub fn state(&self) -> State {
        self.seq.state()
    }

    /// Brings the ADC up from whatever state it is in.
    ///
    /// Safe to call again to change configuration: the reset at the start of
    /// the sequence disables the ADC first.
    pub fn init<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &AdcConfig,
    ) -> Result<(), AdcError> {
        if config.sample_length > 0x3F {
            return Err(AdcError::BadSampleLength(config.sample_length));
        }
        let adc_hz = config.gclk_hz / config.prescaler.divisor();
        if adc_hz > MAX_ADC_HZ {
            return Err(AdcError::ClockTooFast { adc_hz });
        }
        ringbuf_entry!(Trace::Init);

        sys.enable_clock(Peripheral::Adc, config.generator)?;
        sys.configure_pins(config.pins);

        let cal = Calibration::from_fuses(&self.fuses);
        ringbuf_entry!(Trace::Calibration(cal.linearity, cal.bias));

        self.seq.bring_up(&self.regs, &Settings::new(config, cal))?;
        Ok(())
    }

    /// Converts one sample from `channel` and returns it.
    pub fn read_channel(&mut self, channel: u8) -> Result<i32, AdcError> {
        if channel > MAX_CHANNEL {
            ringbuf_entry!(Trace::BadChannel(channel));
            return Err(AdcError::BadChannel(channel));
        }
        self.seq.require_enabled()?;

        let r = &self.regs.0;
        let wait = self.seq.wait();

        r.modify(adc::INPUTCTRL, |v| {
            (v & !adc::inputctrl::MUXPOS_MASK) | adc::inputctrl::muxpos(channel)
        });
        self.timed(|| self.regs.await_sync(wait))?;

        // A result nobody read would otherwise satisfy the poll below.
        r.write(adc::INTFLAG, adc::IntFlag::RESRDY.bits());
        r.write(adc::SWTRIG, (adc::SwTrig::START | adc::SwTrig::FLUSH).bits());

        self.timed(|| {
            busywait::wait_until(wait, || {
                adc::IntFlag::from_bits_truncate(r.read(adc::INTFLAG))
                    .contains(adc::IntFlag::RESRDY)
            })
        })?;

        // Reading RESULT clears RESRDY.
        let result = r.read(adc::RESULT) as u16;
        ringbuf_entry!(Trace::Sample(channel, result));
        Ok(i32::from(result))
    }

    fn timed(
        &self,
        f: impl FnOnce() -> Result<(), TimedOut>,
    ) -> Result<(), AdcError> {
        f().map_err(|e| {
            ringbuf_entry!(Trace::TimedOut);
            e.into()
        })
    }
}
