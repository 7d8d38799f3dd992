// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drivers for SERCOM instances in SPI host and USART modes.
//!
//! Both modes share the SERCOM's control and synchronization bits, so they
//! share bring-up: CTRLA (mode and pads) is written first, then CTRLB (which
//! synchronizes), then BAUD. Only the values differ; see [`spi`] and
//! [`usart`].

#![cfg_attr(target_os = "none", no_std)]

pub mod baud;
pub mod spi;
pub mod usart;

pub use baud::BaudError;
pub use spi::{Spi, SpiConfig, SpiError};
pub use usart::{Usart, UsartConfig, UsartError};

use bringup::{Configure, Synchronized};
use busywait::{TimedOut, Wait};
use drv_samd21_regs::{base, sercom, Reg, RegisterBlock};
use drv_samd21_sys::Peripheral;

/// Base address of a SERCOM, or `None` if `p` isn't one.
pub const fn sercom_base(p: Peripheral) -> Option<usize> {
    match p {
        Peripheral::Sercom0 => Some(base::SERCOM0),
        Peripheral::Sercom1 => Some(base::SERCOM1),
        Peripheral::Sercom2 => Some(base::SERCOM2),
        Peripheral::Sercom3 => Some(base::SERCOM3),
        Peripheral::Sercom4 => Some(base::SERCOM4),
        Peripheral::Sercom5 => Some(base::SERCOM5),
        Peripheral::Rtc | Peripheral::Adc => None,
    }
}

/// Register values for one bring-up, in the order they are written.
pub(crate) struct Settings {
    pub ctrla: u32,
    pub ctrlb: u32,
    pub baud: Reg,
    pub baud_value: u32,
}

/// The parts of a SERCOM that don't depend on its mode.
pub(crate) struct Core<B>(pub B);

impl<B: RegisterBlock> Core<B> {
    fn ctrla(&self) -> sercom::CtrlA {
        sercom::CtrlA::from_bits_truncate(self.0.read(sercom::CTRLA))
    }

    pub fn intflag(&self) -> sercom::IntFlag {
        sercom::IntFlag::from_bits_truncate(self.0.read(sercom::INTFLAG))
    }

    /// Polls INTFLAG until `flag` is set.
    pub fn await_flag(
        &self,
        wait: Wait,
        flag: sercom::IntFlag,
    ) -> Result<(), TimedOut> {
        busywait::wait_until(wait, || self.intflag().contains(flag))
    }

    pub fn status(&self) -> sercom::Status {
        sercom::Status::from_bits_truncate(self.0.read(sercom::STATUS))
    }

    /// STATUS error bits are write-one-to-clear.
    pub fn clear_status(&self, bits: sercom::Status) {
        self.0.write(sercom::STATUS, bits.bits());
    }

    pub fn write_data(&self, byte: u8) {
        self.0.write(sercom::DATA, u32::from(byte));
    }

    pub fn read_data(&self) -> u8 {
        self.0.read(sercom::DATA) as u8
    }
}

impl<B: RegisterBlock> Synchronized for Core<B> {
    fn request_reset(&self) {
        self.0.write(sercom::CTRLA, sercom::CtrlA::SWRST.bits());
    }

    fn reset_pending(&self) -> bool {
        self.ctrla().contains(sercom::CtrlA::SWRST)
    }

    fn sync_busy(&self) -> bool {
        !sercom::SyncBusy::from_bits_truncate(self.0.read(sercom::SYNCBUSY))
            .is_empty()
    }

    fn is_enabled(&self) -> bool {
        self.ctrla().contains(sercom::CtrlA::ENABLE)
    }

    fn request_enable(&self) {
        self.0.set_bits(sercom::CTRLA, sercom::CtrlA::ENABLE.bits());
    }

    fn request_disable(&self) {
        self.0.clear_bits(sercom::CTRLA, sercom::CtrlA::ENABLE.bits());
    }
}

impl<B: RegisterBlock> Configure for Core<B> {
    type Config = Settings;

    fn write_config(&self, s: &Settings, wait: Wait) -> Result<(), TimedOut> {
        // ENABLE stays clear; the sequencer sets it once BAUD is in.
        self.0.write(sercom::CTRLA, s.ctrla & !sercom::CtrlA::ENABLE.bits());
        self.0.write(sercom::CTRLB, s.ctrlb);
        busywait::wait_while(wait, || self.sync_busy())?;
        self.0.write(s.baud, s.baud_value);
        Ok(())
    }
}

#[cfg(all(test, feature = "mkrzero"))]
pub(crate) mod sim {
    //! A SERCOM model shared by the SPI and USART tests.

    use super::*;
    use drv_samd21_regs::sim::{Model, Registers, SyncBehavior, SyncLayout};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    pub const LAYOUT: SyncLayout = SyncLayout {
        ctrl: sercom::CTRLA,
        swrst: 1 << 0,
        enable: 1 << 1,
        busy: sercom::SYNCBUSY,
        busy_mask: 0x7,
    };

    /// What the far end of the wire does.
    #[derive(Default)]
    pub struct Wire {
        /// Bytes that came out of DATA, in order.
        pub sent: Vec<u8>,
        /// Bytes waiting to arrive, in order.
        pub incoming: VecDeque<u8>,
    }

    /// A SERCOM data path with a holding register in front of the shifter.
    ///
    /// A DATA write goes straight to the shifter if it is idle, so DRE stays
    /// set; otherwise it waits in the holding register with DRE clear. A
    /// unit is on the wire `shift` INTFLAG polls after it starts shifting.
    /// TXC is set once the shifter empties with nothing held, and cleared by
    /// the next DATA write. If `full_duplex`, each finished unit brings in
    /// the next incoming byte (0xFF if none) with RXC set. Without
    /// `full_duplex`, incoming bytes are delivered one per INTFLAG poll while
    /// RXC is clear. A DATA read returns the received byte and clears RXC.
    pub struct Sercom {
        pub sync: SyncBehavior,
        pub wire: Rc<RefCell<Wire>>,
        pub shift: u32,
        pub full_duplex: bool,
        pub stuck_tx: bool,
        holding: Option<u8>,
        shifting: Option<(u8, u32)>,
        txc: bool,
        rx: Option<u8>,
    }

    impl Sercom {
        pub fn new(wire: Rc<RefCell<Wire>>, full_duplex: bool) -> Self {
            Self {
                sync: SyncBehavior::new(LAYOUT, 2),
                wire,
                shift: 2,
                full_duplex,
                stuck_tx: false,
                holding: None,
                shifting: None,
                txc: false,
                rx: None,
            }
        }

        fn flags(&self) -> u32 {
            let mut f = sercom::IntFlag::empty();
            if self.holding.is_none() && !self.stuck_tx {
                f |= sercom::IntFlag::DRE;
            }
            if self.txc {
                f |= sercom::IntFlag::TXC;
            }
            if self.rx.is_some() {
                f |= sercom::IntFlag::RXC;
            }
            f.bits()
        }

        fn step(&mut self) {
            match self.shifting {
                Some((byte, 0)) => {
                    let mut wire = self.wire.borrow_mut();
                    wire.sent.push(byte);
                    if self.full_duplex {
                        let rx = wire.incoming.pop_front().unwrap_or(0xFF);
                        self.rx = Some(rx);
                    }
                    let shift = self.shift;
                    self.shifting = self.holding.take().map(|b| (b, shift));
                    self.txc = self.shifting.is_none();
                }
                Some((byte, n)) => self.shifting = Some((byte, n - 1)),
                None => (),
            }
            if !self.full_duplex && self.rx.is_none() {
                self.rx = self.wire.borrow_mut().incoming.pop_front();
            }
        }

        fn send(&mut self, byte: u8) {
            self.txc = false;
            if self.shifting.is_none() {
                self.shifting = Some((byte, self.shift));
            } else {
                self.holding = Some(byte);
            }
        }
    }

    impl Model for Sercom {
        fn read(&mut self, regs: &mut Registers, reg: Reg) -> u32 {
            if self.sync.on_read(regs, reg) {
                return regs.get(reg);
            }
            if reg == sercom::INTFLAG {
                let f = self.flags();
                self.step();
                return f;
            }
            if reg == sercom::DATA {
                return self.rx.take().map(u32::from).unwrap_or(0);
            }
            regs.get(reg)
        }

        fn write(&mut self, regs: &mut Registers, reg: Reg, value: u32) {
            if self.sync.on_write(regs, reg, value) {
                return;
            }
            if reg == sercom::DATA {
                self.send(value as u8);
                return;
            }
            if reg == sercom::INTFLAG {
                if value & sercom::IntFlag::TXC.bits() != 0 {
                    self.txc = false;
                }
                return;
            }
            if reg == sercom::STATUS {
                regs.clear_bits(reg, value);
                return;
            }
            regs.set(reg, value);
            if reg == sercom::CTRLB {
                self.sync.start_sync(regs);
            }
        }
    }
}
