// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USART mode, internal clock, 8N1.
//!
//! Polled and unbuffered: the only storage is the SERCOM's own holding
//! registers, so [`Usart::write`] waits for room and [`Usart::read`] waits
//! for a byte. [`Usart::has_data`] lets a caller skip the read rather than
//! block on it.

use bringup::{BringupError, Sequencer, State};
use busywait::{TimedOut, Wait};
use drv_samd21_regs::{sercom, Mmio, RegisterBlock};
use drv_samd21_sys::{ClockError, ClockGenerator, Peripheral, PinRoute, Sys};
use embedded_hal::serial;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::baud::{self, BaudError};
use crate::{sercom_base, Core, Settings};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UsartConfig {
    pub sercom: Peripheral,
    pub generator: ClockGenerator,
    /// Frequency of `generator`.
    pub ref_hz: u32,
    pub baud: u32,
    /// CTRLA.TXPO: the TX pad (0 = PAD0, 1 = PAD2).
    pub txpo: u8,
    /// CTRLA.RXPO: the RX pad.
    pub rxpo: u8,
    pub pins: &'static [PinRoute],
}

#[cfg(feature = "mkrzero")]
impl UsartConfig {
    /// Serial1 on the MKR Zero header, 9600 baud.
    pub const MKRZERO_SERIAL: Self = {
        use drv_samd21_sys::board::mkrzero::serial;
        Self {
            sercom: serial::SERCOM,
            generator: ClockGenerator::MAIN,
            ref_hz: drv_samd21_sys::MAIN_CLK_HZ,
            baud: 9600,
            txpo: serial::TXPO,
            rxpo: serial::RXPO,
            pins: &serial::ROUTES,
        }
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UsartError {
    Clock(ClockError),
    Bringup(BringupError),
    Baud(BaudError),
    /// The configured peripheral is not a SERCOM.
    NotSercom(Peripheral),
    /// Bad stop bit on a received byte.
    Frame,
    Parity,
    /// A received byte was lost before it was read.
    Overrun,
    /// A bounded wait expired mid-transfer.
    TimedOut,
}

impl From<ClockError> for UsartError {
    fn from(e: ClockError) -> Self {
        UsartError::Clock(e)
    }
}

impl From<BringupError> for UsartError {
    fn from(e: BringupError) -> Self {
        UsartError::Bringup(e)
    }
}

impl From<BaudError> for UsartError {
    fn from(e: BaudError) -> Self {
        UsartError::Baud(e)
    }
}

impl From<TimedOut> for UsartError {
    fn from(_: TimedOut) -> Self {
        UsartError::TimedOut
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Init(Peripheral, u32, u16),
    Rx(u8),
    RxError(UsartError),
    Error(UsartError),
}

ringbuf!(Trace, 32, Trace::None);

pub struct Usart<B> {
    core: Core<B>,
    seq: Sequencer,
    /// Set by a DATA write, cleared once TXC has been seen.
    tx_pending: bool,
}

impl Usart<Mmio> {
    /// Claims `sercom` for USART use.
    ///
    /// # Safety
    ///
    /// There must be no other live handle to that SERCOM.
    pub unsafe fn claim(sercom: Peripheral) -> Result<Self, UsartError> {
        let base =
            sercom_base(sercom).ok_or(UsartError::NotSercom(sercom))?;
        // Safety: forwarded to our caller.
        Ok(Self::new(unsafe { Mmio::new(base) }))
    }
}

impl<B: RegisterBlock> Usart<B> {
    pub fn new(regs: B) -> Self {
        Self {
            core: Core(regs),
            seq: Sequencer::default(),
            tx_pending: false,
        }
    }

    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.seq.set_wait(wait);
        self
    }

    pub fn state(&self) -> State {
        self.seq.state()
    }

    pub fn init<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &UsartConfig,
    ) -> Result<(), UsartError> {
        let r = self.bring_up(sys, config);
        if let Err(e) = r {
            ringbuf_entry!(Trace::Error(e));
        }
        r
    }

    fn bring_up<S: RegisterBlock>(
        &mut self,
        sys: &Sys<S>,
        config: &UsartConfig,
    ) -> Result<(), UsartError> {
        if sercom_base(config.sercom).is_none() {
            return Err(UsartError::NotSercom(config.sercom));
        }
        let baud = baud::usart_arithmetic(config.ref_hz, config.baud)?;
        ringbuf_entry!(Trace::Init(config.sercom, config.baud, baud));

        sys.enable_clock(config.sercom, config.generator)?;
        sys.configure_pins(config.pins);

        self.tx_pending = false;
        self.seq.bring_up(&self.core, &settings(config, baud))?;
        Ok(())
    }

    /// Waits for room in the transmitter, then queues `byte`.
    pub fn write(&mut self, byte: u8) -> Result<(), UsartError> {
        self.seq.require_enabled()?;
        self.core.await_flag(self.seq.wait(), sercom::IntFlag::DRE)?;
        self.core.write_data(byte);
        self.tx_pending = true;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), UsartError> {
        for &b in bytes {
            self.write(b)?;
        }
        Ok(())
    }

    /// Waits for a byte and returns it.
    pub fn read(&mut self) -> Result<u8, UsartError> {
        self.seq.require_enabled()?;
        self.core.await_flag(self.seq.wait(), sercom::IntFlag::RXC)?;
        let b = self.core.read_data();
        ringbuf_entry!(Trace::Rx(b));
        Ok(b)
    }

    /// Whether a received byte is waiting. Never blocks, and only reads
    /// INTFLAG, so asking again doesn't change the answer.
    pub fn has_data(&self) -> bool {
        self.seq.is_enabled()
            && self.core.intflag().contains(sercom::IntFlag::RXC)
    }

    /// Takes and clears any receive error flags.
    fn rx_error(&self) -> Option<UsartError> {
        let status = self.core.status();
        let err = if status.contains(sercom::Status::BUFOVF) {
            UsartError::Overrun
        } else if status.contains(sercom::Status::FERR) {
            UsartError::Frame
        } else if status.contains(sercom::Status::PERR) {
            UsartError::Parity
        } else {
            return None;
        };
        self.core.clear_status(status);
        ringbuf_entry!(Trace::RxError(err));
        Some(err)
    }
}

fn settings(config: &UsartConfig, baud: u16) -> Settings {
    use sercom::usart;

    Settings {
        // LSB first, 16x arithmetic sampling, plain USART frame.
        ctrla: sercom::mode(usart::MODE_INTERNAL_CLOCK)
            | sercom::CtrlA::DORD.bits()
            | usart::sampr(0)
            | usart::txpo(config.txpo)
            | usart::rxpo(config.rxpo)
            | usart::form(0),
        // 8 data bits, one stop bit.
        ctrlb: usart::ctrlb::chsize(0)
            | usart::ctrlb::TXEN
            | usart::ctrlb::RXEN,
        baud: usart::BAUD,
        baud_value: baud.into(),
    }
}

impl<B: RegisterBlock> serial::Write<u8> for Usart<B> {
    type Error = UsartError;

    fn write(&mut self, byte: u8) -> nb::Result<(), UsartError> {
        self.seq.require_enabled().map_err(UsartError::from)?;
        if self.core.intflag().contains(sercom::IntFlag::DRE) {
            self.core.write_data(byte);
            self.tx_pending = true;
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Done once the last frame written has left the shift register. TXC
    /// stays clear until something is sent, so with nothing written this
    /// returns straight away.
    fn flush(&mut self) -> nb::Result<(), UsartError> {
        self.seq.require_enabled().map_err(UsartError::from)?;
        if !self.tx_pending {
            return Ok(());
        }
        if self.core.intflag().contains(sercom::IntFlag::TXC) {
            self.tx_pending = false;
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<B: RegisterBlock> serial::Read<u8> for Usart<B> {
    type Error = UsartError;

    fn read(&mut self) -> nb::Result<u8, UsartError> {
        self.seq.require_enabled().map_err(UsartError::from)?;
        if let Some(e) = self.rx_error() {
            return Err(nb::Error::Other(e));
        }
        if self.core.intflag().contains(sercom::IntFlag::RXC) {
            Ok(self.core.read_data())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<B: RegisterBlock> core::fmt::Write for Usart<B> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_bytes(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}

// The tests run against the MKR Zero presets.
#[cfg(all(test, feature = "mkrzero"))]
mod tests {
    use super::*;
    use crate::sim::{Sercom, Wire};
    use core::fmt::Write as _;
    use drv_samd21_regs::sim::SimBlock;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sys() -> Sys<SimBlock> {
        Sys::new(SimBlock::new(), SimBlock::new(), SimBlock::new())
    }

    fn usart() -> (Usart<SimBlock>, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let model = Sercom::new(wire.clone(), false);
        let usart = Usart::new(SimBlock::with_model(model))
            .with_wait(Wait::bounded(100));
        (usart, wire)
    }

    fn up() -> (Usart<SimBlock>, Rc<RefCell<Wire>>) {
        let (mut usart, wire) = usart();
        usart.init(&sys(), &UsartConfig::MKRZERO_SERIAL).unwrap();
        (usart, wire)
    }

    #[test]
    fn bring_up_register_values() {
        let (pm, gclk, port) =
            (SimBlock::new(), SimBlock::new(), SimBlock::new());
        let sys = Sys::new(&pm, &gclk, &port);
        let (mut usart, _) = usart();
        usart.init(&sys, &UsartConfig::MKRZERO_SERIAL).unwrap();
        assert_eq!(usart.state(), State::Enabled);

        let r = &usart.core.0;
        // Internal clock, LSB first, TX on PAD2, RX on PAD3.
        let ctrla = (1 << 2) | (1 << 30) | (1 << 16) | (3 << 20);
        assert_eq!(
            r.writes_to(sercom::CTRLA),
            [1, ctrla, ctrla | sercom::CtrlA::ENABLE.bits()]
        );
        assert_eq!(r.writes_to(sercom::CTRLB), [(1 << 16) | (1 << 17)]);
        assert_eq!(r.writes_to(sercom::usart::BAUD), [65326]);

        // SERCOM5 bus clock, and its core clock from generator 0.
        assert!(sys.bus_clock_enabled(Peripheral::Sercom5));
        assert_eq!(
            gclk.writes_to(drv_samd21_regs::gclk::CLKCTRL),
            [0x19 | (0 << 8) | (1 << 14)]
        );
        // PB22 and PB23 on function D, in group B's upper half.
        assert_eq!(
            port.writes_to(
                drv_samd21_regs::port::WRCONFIG
                    .at(drv_samd21_regs::port::GROUP)
            )
            .len(),
            2
        );
    }

    #[test]
    fn write_text() {
        let (mut usart, wire) = up();
        usart.write_bytes(b"ADC Reading: ").unwrap();
        write!(usart, "{}\r\n", 1907).unwrap();
        // The last bytes are still going out until TXC.
        nb::block!(serial::Write::flush(&mut usart)).unwrap();
        assert_eq!(wire.borrow().sent, b"ADC Reading: 1907\r\n");
    }

    #[test]
    fn flush_waits_for_the_last_frame() {
        let (mut usart, wire) = up();
        usart.core.0.clear_log();
        // Nothing sent yet: nothing to wait for, and no register access.
        assert_eq!(serial::Write::flush(&mut usart), Ok(()));
        assert!(usart.core.0.accesses().is_empty());

        usart.write(b'a').unwrap();
        // The byte went straight to the shifter, so DRE is already back...
        assert!(usart.core.intflag().contains(sercom::IntFlag::DRE));
        // ...but the frame isn't on the wire yet.
        assert_eq!(
            serial::Write::flush(&mut usart),
            Err(nb::Error::WouldBlock)
        );
        assert!(wire.borrow().sent.is_empty());

        nb::block!(serial::Write::flush(&mut usart)).unwrap();
        assert_eq!(wire.borrow().sent, b"a");
    }

    #[test]
    fn has_data_is_idempotent() {
        let (mut usart, wire) = up();
        assert!(!usart.has_data());

        wire.borrow_mut().incoming.push_back(b'x');
        // The byte arrives on the next look at INTFLAG.
        let _ = usart.has_data();
        for _ in 0..10 {
            assert!(usart.has_data());
        }
        // Nothing was consumed by asking.
        assert_eq!(usart.read(), Ok(b'x'));
        assert!(!usart.has_data());
        assert_eq!(usart.core.0.reads_of(sercom::DATA), 1);
    }

    #[test]
    fn read_waits_for_byte() {
        let (mut usart, wire) = up();
        wire.borrow_mut().incoming.extend(*b"ok");
        assert_eq!(usart.read(), Ok(b'o'));
        assert_eq!(usart.read(), Ok(b'k'));
    }

    #[test]
    fn silent_line_times_out() {
        let (mut usart, _) = up();
        assert_eq!(usart.read(), Err(UsartError::TimedOut));
    }

    #[test]
    fn refused_until_enabled() {
        let (mut usart, _) = usart();
        assert!(!usart.has_data());
        assert_eq!(
            usart.write(b'a'),
            Err(UsartError::Bringup(BringupError::WrongState {
                op: bringup::Step::Io,
                state: State::Unconfigured,
            }))
        );
        assert!(usart.core.0.accesses().is_empty());
    }

    #[test]
    fn nonblocking_read_reports_errors() {
        let (mut usart, wire) = up();
        usart.core.0.poke(sercom::STATUS, sercom::Status::FERR.bits());
        assert_eq!(
            serial::Read::read(&mut usart),
            Err(nb::Error::Other(UsartError::Frame))
        );
        assert_eq!(usart.core.0.peek(sercom::STATUS), 0);

        wire.borrow_mut().incoming.push_back(0x55);
        assert_eq!(nb::block!(serial::Read::read(&mut usart)), Ok(0x55));
    }

    #[test]
    fn rate_too_fast() {
        let (mut usart, _) = usart();
        let config = UsartConfig {
            baud: 4_000_000,
            ..UsartConfig::MKRZERO_SERIAL
        };
        assert_eq!(
            usart.init(&sys(), &config),
            Err(UsartError::Baud(BaudError::TooFast {
                requested: 4_000_000
            }))
        );
        assert_eq!(usart.state(), State::Unconfigured);
    }
}
