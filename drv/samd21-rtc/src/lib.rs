// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the SAMD21 RTC in clock/calendar mode (MODE2).
//!
//! The RTC counts seconds from a 1.024 kHz generic clock, derived here from
//! the always-on ultra low power 32 kHz oscillator divided by 32, and
//! prescaled by 1024 inside the RTC. The whole date and time lives in one
//! CLOCK register, which is write-synchronized: both reads and writes go
//! through a SYNCBUSY wait.

#![cfg_attr(target_os = "none", no_std)]

use bringup::{BringupError, Configure, Sequencer, State, Synchronized};
use busywait::{TimedOut, Wait};
use drv_samd21_regs::{rtc, RegisterBlock};
use drv_samd21_sys::{ClockError, ClockGenerator, ClockSource, Peripheral, Sys};
use ringbuf::{ringbuf, ringbuf_entry};

/// The year a CLOCK.YEAR of 0 stands for.
pub const REFERENCE_YEAR: u16 = 2000;
/// CLOCK.YEAR is six bits.
pub const LAST_YEAR: u16 = REFERENCE_YEAR + 63;

/// CTRL.PRESCALER value for divide-by-1024.
const PRESCALER_DIV1024: u8 = 0xA;

/// A calendar date and 24-hour time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime {
    pub year: u16,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Which part of a [`ClockTime`] was out of range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl ClockTime {
    pub const EPOCH: Self = Self {
        year: REFERENCE_YEAR,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub fn validate(&self) -> Result<(), TimeField> {
        if !(REFERENCE_YEAR..=LAST_YEAR).contains(&self.year) {
            return Err(TimeField::Year);
        }
        if !(1..=12).contains(&self.month) {
            return Err(TimeField::Month);
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err(TimeField::Day);
        }
        if self.hour > 23 {
            return Err(TimeField::Hour);
        }
        if self.minute > 59 {
            return Err(TimeField::Minute);
        }
        if self.second > 59 {
            return Err(TimeField::Second);
        }
        Ok(())
    }

    /// Packs into a CLOCK register value. Assumes `validate` passed.
    fn to_register(self) -> u32 {
        use rtc::clock::*;

        put(u32::from(self.second), SECOND)
            | put(u32::from(self.minute), MINUTE)
            | put(u32::from(self.hour), HOUR)
            | put(u32::from(self.day), DAY)
            | put(u32::from(self.month), MONTH)
            | put(u32::from(self.year - REFERENCE_YEAR), YEAR)
    }

    fn from_register(v: u32) -> Self {
        use rtc::clock::*;

        Self {
            year: REFERENCE_YEAR + get(v, YEAR) as u16,
            month: get(v, MONTH) as u8,
            day: get(v, DAY) as u8,
            hour: get(v, HOUR) as u8,
            minute: get(v, MINUTE) as u8,
            second: get(v, SECOND) as u8,
        }
    }
}

impl core::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// The hardware's leap rule: every fourth year from the reference year.
/// That is right through 2099, which is past what YEAR can hold.
fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RtcConfig {
    /// Generator to set up as the RTC's 1.024 kHz clock.
    pub generator: ClockGenerator,
    pub source: ClockSource,
    pub divisor: u16,
    /// Time the calendar starts from.
    pub initial: ClockTime,
}

impl RtcConfig {
    pub const DEFAULT: Self = Self {
        generator: ClockGenerator::OSCULP32K,
        source: ClockSource::OscUlp32k,
        divisor: 32,
        initial: ClockTime::EPOCH,
    };
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RtcError {
    Clock(ClockError),
    Bringup(BringupError),
    InvalidTime(TimeField),
    TimedOut,
}

impl From<ClockError> for RtcError {
    fn from(e: ClockError) -> Self {
        RtcError::Clock(e)
    }
}

impl From<BringupError> for RtcError {
    fn from(e: BringupError) -> Self {
        RtcError::Bringup(e)
    }
}

impl From<TimeField> for RtcError {
    fn from(f: TimeField) -> Self {
        RtcError::InvalidTime(f)
    }
}

impl From<TimedOut> for RtcError {
    fn from(_: TimedOut) -> Self {
        RtcError::TimedOut
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Init,
    Set(ClockTime),
    Invalid(TimeField),
    TimedOut,
}

ringbuf!(Trace, 16, Trace::None);

struct Settings {
    ctrl: u32,
    readreq: u32,
    clock: u32,
}

struct Regs<B>(B);

impl<B: RegisterBlock> Regs<B> {
    fn ctrl(&self) -> rtc::Ctrl {
        rtc::Ctrl::from_bits_truncate(self.0.read(rtc::CTRL))
    }

    fn await_sync(&self, wait: Wait) -> Result<(), TimedOut> {
        busywait::wait_while(wait, || self.sync_busy())
    }
}

impl<B: RegisterBlock> Synchronized for Regs<B> {
    fn request_reset(&self) {
        self.0.write(rtc::CTRL, rtc::Ctrl::SWRST.bits());
    }

    fn reset_pending(&self) -> bool {
        self.ctrl().contains(rtc::Ctrl::SWRST)
    }

    fn sync_busy(&self) -> bool {
        rtc::Status::from_bits_truncate(self.0.read(rtc::STATUS))
            .contains(rtc::Status::SYNCBUSY)
    }

    fn is_enabled(&self) -> bool {
        self.ctrl().contains(rtc::Ctrl::ENABLE)
    }

    fn request_enable(&self) {
        self.0.set_bits(rtc::CTRL, rtc::Ctrl::ENABLE.bits());
    }

    fn request_disable(&self) {
        self.0.clear_bits(rtc::CTRL, rtc::Ctrl::ENABLE.bits());
    }
}

impl<B: RegisterBlock> Configure for Regs<B> {
    type Config = Settings;

    fn write_config(&self, s: &Settings, wait: Wait) -> Result<(), TimedOut> {
        self.0.write(rtc::CTRL, s.ctrl);
        self.await_sync(wait)?;
        self.0.write(rtc::READREQ, s.readreq);
        self.0.write(rtc::CLOCK, s.clock);
        self.await_sync(wait)
    }
}

pub struct Rtc<B> {
    regs: Regs<B>,
    seq: Sequencer,
}

impl Rtc<drv_samd21_regs::Mmio> {
    /// Claims the RTC at its fixed address.
    ///
    /// # Safety
    ///
    /// There must be no other live handle to the RTC.
    pub unsafe fn claim() -> Self {
        use drv_samd21_regs::{base, Mmio};
        // Safety: forwarded to our caller.
        Self::new(unsafe { Mmio::new(base::RTC) })
    }
}

impl<B: RegisterBlock> Rtc<B> {
    pub fn new(regs: B) -> Self {
        Self {
            regs: Regs(regs),
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

    /// Sets up the RTC's clock and starts the calendar at `config.initial`.
    pub fn init<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &RtcConfig,
    ) -> Result<(), RtcError> {
        self.check(&config.initial)?;
        ringbuf_entry!(Trace::Init);

        sys.configure_generator(
            config.generator,
            config.source,
            config.divisor,
        )?;
        sys.enable_clock(Peripheral::Rtc, config.generator)?;

        let settings = Settings {
            // CLKREP clear: 24-hour.
            ctrl: rtc::ctrl::MODE_CLOCK
                | rtc::ctrl::prescaler(PRESCALER_DIV1024),
            // Keep CLOCK's read copy continuously refreshed.
            readreq: (rtc::ReadReq::RCONT | rtc::ReadReq::RREQ).bits()
                | rtc::readreq::addr(rtc::CLOCK.offset),
            clock: config.initial.to_register(),
        };
        self.seq.bring_up(&self.regs, &settings)?;
        Ok(())
    }

    /// The current date and time.
    pub fn read_time(&self) -> Result<ClockTime, RtcError> {
        self.seq.require_enabled()?;
        self.synced()?;
        Ok(ClockTime::from_register(self.regs.0.read(rtc::CLOCK)))
    }

    /// Moves the calendar to `time`. Doesn't return until the write has
    /// synchronized, so a `read_time` straight after sees it.
    pub fn set_time(&mut self, time: ClockTime) -> Result<(), RtcError> {
        self.check(&time)?;
        self.seq.require_enabled()?;
        ringbuf_entry!(Trace::Set(time));

        self.synced()?;
        self.regs.0.write(rtc::CLOCK, time.to_register());
        self.synced()
    }

    fn check(&self, time: &ClockTime) -> Result<(), RtcError> {
        time.validate().map_err(|f| {
            ringbuf_entry!(Trace::Invalid(f));
            RtcError::from(f)
        })
    }

    fn synced(&self) -> Result<(), RtcError> {
        self.regs.await_sync(self.seq.wait()).map_err(|e| {
            ringbuf_entry!(Trace::TimedOut);
            e.into()
        })
    }
}
