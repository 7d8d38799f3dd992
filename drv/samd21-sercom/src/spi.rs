// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SPI host mode.
//!
//! Transfers are one byte at a time and strictly paired: every byte sent
//! clocks one byte back in, and [`Spi::exchange`] doesn't return until it
//! has that byte. Chip select is not ours; the caller drives it as a GPIO.
//!
//! The rate is fixed at bring-up. To change it (SD cards start at 400 kHz
//! and speed up after identification) call [`Spi::init`] again with the new
//! configuration, which resets the SERCOM first.

use bringup::{BringupError, Sequencer, State};
use busywait::{TimedOut, Wait};
use drv_samd21_regs::{sercom, Mmio, RegisterBlock};
use drv_samd21_sys::{ClockError, ClockGenerator, Peripheral, PinRoute, Sys};
use embedded_hal::spi::{FullDuplex, Mode, Phase, Polarity};
use ringbuf::{ringbuf, ringbuf_entry};

use crate::baud::{self, BaudError};
use crate::{sercom_base, Core, Settings};

// embedded-hal 0.2's `Mode` has no `Debug`, so that impl is written out.
#[derive(Copy, Clone, PartialEq)]
pub struct SpiConfig {
    pub sercom: Peripheral,
    pub generator: ClockGenerator,
    /// Frequency of `generator`.
    pub ref_hz: u32,
    pub rate_hz: u32,
    pub mode: Mode,
    /// CTRLA.DOPO: which pads carry data out, SCK and SS.
    pub dopo: u8,
    /// CTRLA.DIPO: the data in pad.
    pub dipo: u8,
    pub pins: &'static [PinRoute],
}

impl core::fmt::Debug for SpiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiConfig")
            .field("sercom", &self.sercom)
            .field("generator", &self.generator)
            .field("ref_hz", &self.ref_hz)
            .field("rate_hz", &self.rate_hz)
            .field("cpol", &(self.mode.polarity == Polarity::IdleHigh))
            .field(
                "cpha",
                &(self.mode.phase == Phase::CaptureOnSecondTransition),
            )
            .field("dopo", &self.dopo)
            .field("dipo", &self.dipo)
            .field("pins", &self.pins)
            .finish()
    }
}

#[cfg(feature = "mkrzero")]
impl SpiConfig {
    /// The MKR Zero SD socket at identification speed.
    pub const SD_SLOW: Self = {
        use drv_samd21_sys::board::mkrzero::sd;
        Self {
            sercom: sd::SERCOM,
            generator: ClockGenerator::MAIN,
            ref_hz: drv_samd21_sys::MAIN_CLK_HZ,
            rate_hz: 400_000,
            mode: embedded_hal::spi::MODE_0,
            dopo: sd::DOPO,
            dipo: sd::DIPO,
            pins: &sd::ROUTES,
        }
    };

    /// The MKR Zero SD socket at data-transfer speed.
    pub const SD_FAST: Self = Self {
        rate_hz: 12_000_000,
        ..Self::SD_SLOW
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpiError {
    Clock(ClockError),
    Bringup(BringupError),
    Baud(BaudError),
    /// The configured peripheral is not a SERCOM.
    NotSercom(Peripheral),
    /// A received byte was lost before it was read.
    Overrun,
    /// A bounded wait expired mid-transfer.
    TimedOut,
}

impl From<ClockError> for SpiError {
    fn from(e: ClockError) -> Self {
        SpiError::Clock(e)
    }
}

impl From<BringupError> for SpiError {
    fn from(e: BringupError) -> Self {
        SpiError::Bringup(e)
    }
}

impl From<BaudError> for SpiError {
    fn from(e: BaudError) -> Self {
        SpiError::Baud(e)
    }
}

impl From<TimedOut> for SpiError {
    fn from(_: TimedOut) -> Self {
        SpiError::TimedOut
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Init(Peripheral, u32, u8),
    Exchange(u8, u8),
    Overrun,
    Error(SpiError),
}

ringbuf!(Trace, 32, Trace::None);

pub struct Spi<B> {
    core: Core<B>,
    seq: Sequencer,
}

impl Spi<Mmio> {
    /// Claims `sercom` for SPI.
    ///
    /// # Safety
    ///
    /// There must be no other live handle to that SERCOM.
    pub unsafe fn claim(sercom: Peripheral) -> Result<Self, SpiError> {
        let base = sercom_base(sercom).ok_or(SpiError::NotSercom(sercom))?;
        // Safety: forwarded to our caller.
        Ok(Self::new(unsafe { Mmio::new(base) }))
    }
}

impl<B: RegisterBlock> Spi<B> {
    pub fn new(regs: B) -> Self {
        Self {
            core: Core(regs),
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

    /// Brings the SERCOM up as an SPI host per `config`.
    ///
    /// Everything that can be checked is checked before any register is
    /// touched.
    pub fn init<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &SpiConfig,
    ) -> Result<(), SpiError> {
        let r = self.bring_up(sys, config);
        if let Err(e) = r {
            ringbuf_entry!(Trace::Error(e));
        }
        r
    }

    fn bring_up<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &SpiConfig,
    ) -> Result<(), SpiError> {
        if sercom_base(config.sercom).is_none() {
            return Err(SpiError::NotSercom(config.sercom));
        }
        let baud = baud::spi_baud(config.ref_hz, config.rate_hz)?;
        ringbuf_entry!(Trace::Init(config.sercom, config.rate_hz, baud));

        sys.enable_clock(config.sercom, config.generator)?;
        sys.configure_pins(config.pins);

        self.seq.bring_up(&self.core, &settings(config, baud))?;
        Ok(())
    }

    /// Sends `byte` and returns the byte clocked in alongside it.
    pub fn exchange(&mut self, byte: u8) -> Result<u8, SpiError> {
        self.seq.require_enabled()?;
        let wait = self.seq.wait();

        self.core.await_flag(wait, sercom::IntFlag::DRE)?;
        self.core.write_data(byte);
        self.core.await_flag(wait, sercom::IntFlag::RXC)?;
        let rx = self.core.read_data();

        ringbuf_entry!(Trace::Exchange(byte, rx));
        Ok(rx)
    }

    /// Sends a byte, returning whatever came back.
    pub fn send_byte(&mut self, byte: u8) -> Result<u8, SpiError> {
        self.exchange(byte)
    }

    /// Clocks in a byte, holding MOSI high.
    pub fn read_byte(&mut self) -> Result<u8, SpiError> {
        self.exchange(0xFF)
    }

    /// Exchanges `buf` in place.
    pub fn transfer(&mut self, buf: &mut [u8]) -> Result<(), SpiError> {
        for b in buf {
            *b = self.exchange(*b)?;
        }
        Ok(())
    }
}

fn settings(config: &SpiConfig, baud: u8) -> Settings {
    use sercom::spi;

    let mut ctrla = sercom::mode(spi::MODE_MASTER)
        | spi::dopo(config.dopo)
        | spi::dipo(config.dipo);
    if config.mode.polarity == Polarity::IdleHigh {
        ctrla |= spi::CPOL;
    }
    if config.mode.phase == Phase::CaptureOnSecondTransition {
        ctrla |= spi::CPHA;
    }
    // DORD clear: MSB first.

    Settings {
        ctrla,
        ctrlb: spi::ctrlb::RXEN | spi::ctrlb::chsize(0),
        baud: spi::BAUD,
        baud_value: baud.into(),
    }
}

impl<B: RegisterBlock> FullDuplex<u8> for Spi<B> {
    type Error = SpiError;

    fn read(&mut self) -> nb::Result<u8, SpiError> {
        self.seq.require_enabled().map_err(SpiError::from)?;
        let status = self.core.status();
        if status.contains(sercom::Status::BUFOVF) {
            ringbuf_entry!(Trace::Overrun);
            self.core.clear_status(sercom::Status::BUFOVF);
            return Err(nb::Error::Other(SpiError::Overrun));
        }
        if self.core.intflag().contains(sercom::IntFlag::RXC) {
            Ok(self.core.read_data())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn send(&mut self, byte: u8) -> nb::Result<(), SpiError> {
        self.seq.require_enabled().map_err(SpiError::from)?;
        if self.core.intflag().contains(sercom::IntFlag::DRE) {
            self.core.write_data(byte);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<B: RegisterBlock> embedded_hal::blocking::spi::transfer::Default<u8>
    for Spi<B>
{
}

impl<B: RegisterBlock> embedded_hal::blocking::spi::write::Default<u8>
    for Spi<B>
{
}

// The tests run against the MKR Zero presets.
#[cfg(all(test, feature = "mkrzero"))]
mod tests {
    use super::*;
    use crate::sim::{Sercom, Wire};
    use drv_samd21_regs::sim::{Access, SimBlock};
    use drv_samd21_sys::board::mkrzero::sd;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sys() -> Sys<SimBlock> {
        Sys::new(SimBlock::new(), SimBlock::new(), SimBlock::new())
    }

    fn spi() -> (Spi<SimBlock>, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let model = Sercom::new(wire.clone(), true);
        let spi = Spi::new(SimBlock::with_model(model))
            .with_wait(Wait::bounded(100));
        (spi, wire)
    }

    #[test]
    fn bring_up_register_values() {
        let sys = sys();
        let (mut spi, _) = spi();
        spi.init(&sys, &SpiConfig::SD_SLOW).unwrap();
        assert_eq!(spi.state(), State::Enabled);

        let r = &spi.core.0;
        // Host mode, DO on PAD0 / SCK on PAD1, DI on PAD3, mode 0, MSB
        // first, then the same plus ENABLE.
        let ctrla = (3 << 2) | (0 << 16) | (3 << 20);
        assert_eq!(
            r.writes_to(sercom::CTRLA),
            [1, ctrla, ctrla | sercom::CtrlA::ENABLE.bits()]
        );
        assert_eq!(r.writes_to(sercom::CTRLB), [1 << 17]);
        assert_eq!(r.writes_to(sercom::spi::BAUD), [59]);

        // CTRLA, then CTRLB, then BAUD.
        let writes: Vec<_> = r
            .accesses()
            .into_iter()
            .filter_map(|a| match a {
                Access::Write { reg, .. } => Some(reg),
                _ => None,
            })
            .collect();
        assert_eq!(
            writes,
            [
                sercom::CTRLA,
                sercom::CTRLA,
                sercom::CTRLB,
                sercom::spi::BAUD,
                sercom::CTRLA,
            ]
        );

        assert!(sys.bus_clock_enabled(Peripheral::Sercom2));
    }

    #[test]
    fn speed_change_is_a_fresh_bring_up() {
        let sys = sys();
        let (mut spi, _) = spi();
        spi.init(&sys, &SpiConfig::SD_SLOW).unwrap();
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        assert_eq!(spi.core.0.writes_to(sercom::spi::BAUD), [59, 1]);

        // Between the two, the SERCOM was disabled and reset before the new
        // BAUD went in.
        let log = spi.core.0.accesses();
        let first = log
            .iter()
            .position(|a| a.is_write_to(sercom::spi::BAUD))
            .unwrap();
        let second = log
            .iter()
            .rposition(|a| a.is_write_to(sercom::spi::BAUD))
            .unwrap();
        assert!(log[first..second].contains(&Access::Write {
            reg: sercom::CTRLA,
            value: sercom::CtrlA::SWRST.bits(),
        }));
    }

    #[test]
    fn exchanges_pair_up_in_order() {
        let sys = sys();
        let (mut spi, wire) = spi();
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        wire.borrow_mut().incoming.extend([0x01, 0x02, 0x03]);
        spi.core.0.clear_log();

        assert_eq!(spi.send_byte(0x40), Ok(0x01));
        assert_eq!(spi.exchange(0x00), Ok(0x02));
        assert_eq!(spi.read_byte(), Ok(0x03));
        // Nothing left to send back: the line idles high.
        assert_eq!(spi.read_byte(), Ok(0xFF));
        assert_eq!(wire.borrow().sent, [0x40, 0x00, 0xFF, 0xFF]);

        // Each DATA write follows an INTFLAG read showing DRE, each DATA
        // read follows one showing RXC, and they alternate.
        let mut last_flags = 0;
        let mut events = vec![];
        for a in spi.core.0.accesses() {
            match a {
                Access::Read { reg, value } if reg == sercom::INTFLAG => {
                    last_flags = value;
                }
                Access::Write { reg, .. } if reg == sercom::DATA => {
                    assert_ne!(last_flags & sercom::IntFlag::DRE.bits(), 0);
                    events.push('w');
                }
                Access::Read { reg, .. } if reg == sercom::DATA => {
                    assert_ne!(last_flags & sercom::IntFlag::RXC.bits(), 0);
                    events.push('r');
                }
                _ => (),
            }
        }
        assert_eq!(events.iter().collect::<String>(), "wrwrwrwr");
    }

    #[test]
    fn transfer_in_place() {
        let sys = sys();
        let (mut spi, wire) = spi();
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        wire.borrow_mut().incoming.extend([9, 8, 7]);
        let mut buf = [1, 2, 3];
        spi.transfer(&mut buf).unwrap();
        assert_eq!(buf, [9, 8, 7]);
        assert_eq!(wire.borrow().sent, [1, 2, 3]);
    }

    #[test]
    fn refuses_before_bring_up() {
        let (mut spi, _) = spi();
        assert_eq!(
            spi.exchange(0),
            Err(SpiError::Bringup(BringupError::WrongState {
                op: bringup::Step::Io,
                state: State::Unconfigured,
            }))
        );
        assert!(spi.core.0.accesses().is_empty());
    }

    #[test]
    fn bad_rate_touches_nothing() {
        let sys = sys();
        let (mut spi, _) = spi();
        let config = SpiConfig {
            rate_hz: 9600,
            ..SpiConfig::SD_SLOW
        };
        assert_eq!(
            spi.init(&sys, &config),
            Err(SpiError::Baud(BaudError::TooSlow { requested: 9600 }))
        );
        assert!(spi.core.0.accesses().is_empty());
        assert!(!sys.bus_clock_enabled(sd::SERCOM));
    }

    #[test]
    fn not_a_sercom() {
        let sys = sys();
        let (mut spi, _) = spi();
        let config = SpiConfig {
            sercom: Peripheral::Adc,
            ..SpiConfig::SD_SLOW
        };
        assert_eq!(
            spi.init(&sys, &config),
            Err(SpiError::NotSercom(Peripheral::Adc))
        );
    }

    #[test]
    fn stuck_transmitter_times_out() {
        let sys = sys();
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut model = Sercom::new(wire, true);
        model.stuck_tx = true;
        let mut spi = Spi::new(SimBlock::with_model(model))
            .with_wait(Wait::bounded(10));
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        assert_eq!(spi.exchange(0xAA), Err(SpiError::TimedOut));
        assert!(spi.core.0.writes_to(sercom::DATA).is_empty());
    }

    #[test]
    fn full_duplex_is_nonblocking() {
        let sys = sys();
        let (mut spi, wire) = spi();
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        wire.borrow_mut().incoming.push_back(0x5A);

        nb::block!(FullDuplex::send(&mut spi, 0xA5)).unwrap();
        // Shifting takes a few polls.
        assert_eq!(FullDuplex::read(&mut spi), Err(nb::Error::WouldBlock));
        assert_eq!(nb::block!(FullDuplex::read(&mut spi)), Ok(0x5A));
    }

    #[test]
    fn config_debug_shows_clock_mode() {
        let config = SpiConfig {
            mode: embedded_hal::spi::MODE_3,
            ..SpiConfig::SD_FAST
        };
        let text = format!("{config:?}");
        assert!(text.starts_with("SpiConfig { sercom: Sercom2"), "{text}");
        assert!(text.contains("rate_hz: 12000000"), "{text}");
        assert!(text.contains("cpol: true, cpha: true"), "{text}");
    }

    #[test]
    fn overrun_is_reported_and_cleared() {
        let sys = sys();
        let (mut spi, _) = spi();
        spi.init(&sys, &SpiConfig::SD_FAST).unwrap();
        spi.core.0.poke(sercom::STATUS, sercom::Status::BUFOVF.bits());
        assert_eq!(
            FullDuplex::read(&mut spi),
            Err(nb::Error::Other(SpiError::Overrun))
        );
        assert_eq!(spi.core.0.peek(sercom::STATUS), 0);
    }
}
