// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A driver for the SAMD21 PM, GCLK and PORT blocks, combined for
//! compactness.
//!
//! Every peripheral needs two clocks before its registers do anything useful:
//!
//! 1. The bus clock, gated by a bit in one of the PM `APBxMASK` registers.
//!    Without it, register writes go nowhere.
//!
//! 2. The generic (functional) clock, routed from one of the clock
//!    generators to the peripheral through GCLK `CLKCTRL`. Without it, the
//!    peripheral's synchronizer never runs and every sync-busy flag stays up
//!    forever.
//!
//! [`Sys::enable_clock`] turns on both, in that order, and waits for the
//! hardware to acknowledge each.
//!
//! Pin multiplexing lives here too, since it's the other thing every
//! peripheral needs from a shared block before it can be brought up.

#![cfg_attr(target_os = "none", no_std)]

#[cfg(feature = "mkrzero")]
pub mod board;
mod port;

pub use port::{Function, Group, Pin, PinRoute};

use busywait::{TimedOut, Wait};
use drv_samd21_regs::{gclk, pm, port as portregs, Reg, RegisterBlock};
use ringbuf::{ringbuf, ringbuf_entry};

/// Peripherals this workspace knows how to clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Peripheral {
    Rtc,
    Sercom0,
    Sercom1,
    Sercom2,
    Sercom3,
    Sercom4,
    Sercom5,
    Adc,
}

impl Peripheral {
    /// The PM mask register and bit that gate this peripheral's bus clock.
    pub const fn bus_mask(self) -> (Reg, u32) {
        match (self, self.sercom_index()) {
            (_, Some(n)) => (pm::APBCMASK, 1 << (pm::apbc::SERCOM0 + n)),
            (Peripheral::Rtc, None) => (pm::APBAMASK, 1 << pm::apba::RTC),
            (_, None) => (pm::APBCMASK, 1 << pm::apbc::ADC),
        }
    }

    /// The GCLK channel that feeds this peripheral.
    pub const fn gclk_id(self) -> u8 {
        match (self, self.sercom_index()) {
            (_, Some(n)) => gclk::id::SERCOM0_CORE + n,
            (Peripheral::Rtc, None) => gclk::id::RTC,
            (_, None) => gclk::id::ADC,
        }
    }

    pub const fn sercom_index(self) -> Option<u8> {
        match self {
            Peripheral::Sercom0 => Some(0),
            Peripheral::Sercom1 => Some(1),
            Peripheral::Sercom2 => Some(2),
            Peripheral::Sercom3 => Some(3),
            Peripheral::Sercom4 => Some(4),
            Peripheral::Sercom5 => Some(5),
            Peripheral::Rtc | Peripheral::Adc => None,
        }
    }
}

/// A generic clock generator, by index (0..=8).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockGenerator(pub u8);

impl ClockGenerator {
    /// Main clock: DFLL48M, also the CPU clock.
    pub const MAIN: Self = Self(0);
    pub const XOSC32K: Self = Self(1);
    /// Fed from OSCULP32K out of reset, for the watchdog.
    pub const OSCULP32K: Self = Self(2);
    pub const OSC8M: Self = Self(3);
}

/// Frequency of [`ClockGenerator::MAIN`] once the DFLL is locked.
pub const MAIN_CLK_HZ: u32 = 48_000_000;
/// Nominal frequency of the 32 kHz oscillators.
pub const CLK_32K_HZ: u32 = 32_768;

/// What a generator is fed from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockSource {
    Xosc = gclk::src::XOSC,
    GclkIn = gclk::src::GCLKIN,
    GclkGen1 = gclk::src::GCLKGEN1,
    OscUlp32k = gclk::src::OSCULP32K,
    Osc32k = gclk::src::OSC32K,
    Xosc32k = gclk::src::XOSC32K,
    Osc8m = gclk::src::OSC8M,
    Dfll48m = gclk::src::DFLL48M,
    Fdpll = gclk::src::FDPLL,
}

/// Which wait gave up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockStep {
    /// The PM mask bit did not read back.
    BusMask,
    /// GCLK stayed busy after a CLKCTRL write.
    ClockSelect,
    /// GCLK stayed busy after a GENDIV/GENCTRL write.
    Generator,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockError {
    TimedOut(ClockStep),
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    EnableClock(Peripheral, u8),
    DisableClock(Peripheral),
    Generator(u8, ClockSource, u16),
    Pin(Group, u8, Function),
    TimedOut(ClockStep),
}

ringbuf!(Trace, 16, Trace::None);

/// Handles to the system blocks, owned together.
pub struct Sys<B> {
    pm: B,
    gclk: B,
    port: B,
    wait: Wait,
}

impl Sys<drv_samd21_regs::Mmio> {
    /// Claims the PM, GCLK and PORT blocks at their fixed addresses.
    ///
    /// # Safety
    ///
    /// There must be no other live handle to any of the three blocks.
    pub unsafe fn claim() -> Self {
        use drv_samd21_regs::{base, Mmio};
        // Safety: forwarded to our caller.
        unsafe {
            Self::new(
                Mmio::new(base::PM),
                Mmio::new(base::GCLK),
                Mmio::new(base::PORT),
            )
        }
    }
}

impl<B: RegisterBlock> Sys<B> {
    pub fn new(pm: B, gclk: B, port: B) -> Self {
        Self {
            pm,
            gclk,
            port,
            wait: Wait::default(),
        }
    }

    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    pub fn wait(&self) -> Wait {
        self.wait
    }

    /// Turns on the bus clock and the generic clock for `periph`, with the
    /// generic clock taken from `gen`.
    ///
    /// On success the peripheral's functional clock is running and GCLK is
    /// idle.
    pub fn enable_clock(
        &self,
        periph: Peripheral,
        gen: ClockGenerator,
    ) -> Result<(), ClockError> {
        ringbuf_entry!(Trace::EnableClock(periph, gen.0));

        let (mask, bit) = periph.bus_mask();
        self.pm.set_bits(mask, bit);
        self.await_step(ClockStep::BusMask, || self.pm.is_set(mask, bit))?;

        // Channel, generator and enable have to land in one write: CLKCTRL
        // latches all three together, and enabling before the generator is
        // selected binds the channel to whatever generator was there.
        self.gclk.write(
            gclk::CLKCTRL,
            gclk::clkctrl::id(periph.gclk_id())
                | gclk::clkctrl::gen(gen.0)
                | gclk::clkctrl::CLKEN,
        );
        self.await_gclk(ClockStep::ClockSelect)
    }

    /// Reverses [`Sys::enable_clock`]: generic clock off, then bus clock off.
    pub fn disable_clock(&self, periph: Peripheral) -> Result<(), ClockError> {
        ringbuf_entry!(Trace::DisableClock(periph));

        // Writing the channel id with CLKEN clear disables it.
        self.gclk
            .write(gclk::CLKCTRL, gclk::clkctrl::id(periph.gclk_id()));
        self.await_gclk(ClockStep::ClockSelect)?;

        let (mask, bit) = periph.bus_mask();
        self.pm.clear_bits(mask, bit);
        self.await_step(ClockStep::BusMask, || {
            self.pm.read(mask) & bit == 0
        })
    }

    /// Whether the bus clock for `periph` is on.
    pub fn bus_clock_enabled(&self, periph: Peripheral) -> bool {
        let (mask, bit) = periph.bus_mask();
        self.pm.is_set(mask, bit)
    }

    /// Sets up generator `gen` to run from `source`, divided by `divisor`
    /// (0 and 1 both mean undivided).
    pub fn configure_generator(
        &self,
        gen: ClockGenerator,
        source: ClockSource,
        divisor: u16,
    ) -> Result<(), ClockError> {
        ringbuf_entry!(Trace::Generator(gen.0, source, divisor));

        self.gclk.write(
            gclk::GENDIV,
            gclk::gendiv::id(gen.0) | gclk::gendiv::div(divisor),
        );
        self.await_gclk(ClockStep::Generator)?;

        // As with CLKCTRL: source and enable together.
        self.gclk.write(
            gclk::GENCTRL,
            gclk::genctrl::id(gen.0)
                | gclk::genctrl::src(source as u8)
                | gclk::genctrl::GENEN,
        );
        self.await_gclk(ClockStep::Generator)
    }

    /// Routes pins to their peripheral functions.
    pub fn configure_pins(&self, routes: &[PinRoute]) {
        for route in routes {
            ringbuf_entry!(Trace::Pin(
                route.pin.group,
                route.pin.number,
                route.function
            ));
            self.port.write(
                portregs::WRCONFIG.at(route.pin.group.offset()),
                route.wrconfig(),
            );
        }
    }

    /// Sets or clears the strong drive bit on one pin.
    pub fn set_drive_strength(&self, pin: Pin, strong: bool) {
        let reg = pin.pincfg();
        if strong {
            self.port.set_bits(reg, portregs::pincfg::DRVSTR);
        } else {
            self.port.clear_bits(reg, portregs::pincfg::DRVSTR);
        }
    }

    fn await_gclk(&self, step: ClockStep) -> Result<(), ClockError> {
        self.await_step(step, || {
            !gclk::Status::from_bits_truncate(self.gclk.read(gclk::STATUS))
                .contains(gclk::Status::SYNCBUSY)
        })
    }

    fn await_step(
        &self,
        step: ClockStep,
        ready: impl FnMut() -> bool,
    ) -> Result<(), ClockError> {
        busywait::wait_until(self.wait, ready).map_err(|TimedOut| {
            ringbuf_entry!(Trace::TimedOut(step));
            ClockError::TimedOut(step)
        })
    }
}
