// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reset / configure / enable sequencing for write-synchronized peripherals.
//!
//! Peripherals on this family live in a different clock domain from the bus
//! that writes their registers. Writes to the control bits (software reset,
//! enable) and to a handful of configuration registers do not take effect
//! until they have crossed into the peripheral's domain, and the hardware
//! reports the crossing through a synchronization-busy flag. Every peripheral
//! gets brought up the same way:
//!
//! ```text
//! Unconfigured --reset--> Resetting --configure--> Configured
//!      ^                                               |
//!      |                                            enable
//!      |                                               v
//!      +--------------- reset (any state) ----- Enabling -> Enabled
//! ```
//!
//! The [`Sequencer`] holds that state explicitly and refuses operations that
//! are invalid for it, instead of relying on whoever calls it to remember
//! that configuration registers are only writable while disabled.
//!
//! A bounded wait that expires leaves the sequencer in the state it was
//! entering (`Resetting` or `Enabling`). Calling the same operation again
//! resumes the wait; calling `reset` starts over. The disable that `reset`
//! issues on an enabled peripheral drops the state to `Unconfigured` before
//! the write, so I/O is refused from then on even if that wait expires.

#![cfg_attr(target_os = "none", no_std)]

use busywait::{TimedOut, Wait};
use ringbuf::{ringbuf, ringbuf_entry};

/// Where a peripheral is in its bring-up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    /// Reset has been issued. Once it settles, configuration may be written.
    Resetting,
    Configured,
    /// Enable has been issued but has not synchronized yet.
    Enabling,
    Enabled,
}

/// The operation that failed or was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Disable,
    Reset,
    Configure,
    Enable,
    Io,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BringupError {
    /// A bounded wait expired during `Step`.
    TimedOut(Step),
    /// `op` is not valid in `state`.
    WrongState { op: Step, state: State },
    /// The enable bit read back as set right before configuration would have
    /// been written.
    StillEnabled,
}

/// Control bits shared by every write-synchronized peripheral.
///
/// Implementations are thin: each method is one register access.
pub trait Synchronized {
    /// Sets the software reset bit.
    fn request_reset(&self);
    /// Whether the software reset bit still reads as set.
    fn reset_pending(&self) -> bool;
    /// Whether any write is still crossing clock domains.
    fn sync_busy(&self) -> bool;
    /// Whether the enable bit reads as set.
    fn is_enabled(&self) -> bool;
    fn request_enable(&self);
    fn request_disable(&self);
}

/// A peripheral that can have its configuration written while disabled.
pub trait Configure: Synchronized {
    type Config;

    /// Writes every configuration field, mode and routing first, then data
    /// path, then rates. May wait on synchronization between registers.
    fn write_config(
        &self,
        config: &Self::Config,
        wait: Wait,
    ) -> Result<(), TimedOut>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Disable,
    Reset,
    ResetSettled,
    Configured,
    Enable,
    Enabled,
    TimedOut(Step),
    Refused(Step, State),
    StillEnabled,
}

ringbuf!(Trace, 32, Trace::None);

/// Bring-up state for one peripheral instance.
#[derive(Debug)]
pub struct Sequencer {
    state: State,
    wait: Wait,
}

impl Sequencer {
    pub const fn new(wait: Wait) -> Self {
        Self {
            state: State::Unconfigured,
            wait,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn wait(&self) -> Wait {
        self.wait
    }

    pub fn set_wait(&mut self, wait: Wait) {
        self.wait = wait;
    }

    /// Runs the whole sequence: reset, configure, enable.
    pub fn bring_up<P: Configure>(
        &mut self,
        periph: &P,
        config: &P::Config,
    ) -> Result<(), BringupError> {
        self.reset(periph)?;
        self.configure(periph, config)?;
        self.enable(periph)
    }

    /// Issues a software reset and waits for it to settle. Valid from any
    /// state; this is the only way back to a configurable peripheral.
    pub fn reset<P: Synchronized>(
        &mut self,
        periph: &P,
    ) -> Result<(), BringupError> {
        // Whatever was in flight before us has to land first, or the reset
        // write can be dropped.
        self.settle(periph, Step::Reset)?;

        if periph.is_enabled() {
            ringbuf_entry!(Trace::Disable);
            self.state = State::Unconfigured;
            periph.request_disable();
            self.settle(periph, Step::Disable)?;
        }

        ringbuf_entry!(Trace::Reset);
        self.state = State::Resetting;
        periph.request_reset();
        self.settle_reset(periph)
    }

    /// Writes configuration. Only valid straight after a reset.
    pub fn configure<P: Configure>(
        &mut self,
        periph: &P,
        config: &P::Config,
    ) -> Result<(), BringupError> {
        self.expect(State::Resetting, Step::Configure)?;

        // Resumes a reset wait that timed out earlier; otherwise this is one
        // poll of each flag.
        self.settle_reset(periph)?;

        if periph.is_enabled() {
            ringbuf_entry!(Trace::StillEnabled);
            return Err(BringupError::StillEnabled);
        }

        periph.write_config(config, self.wait).map_err(|TimedOut| {
            ringbuf_entry!(Trace::TimedOut(Step::Configure));
            BringupError::TimedOut(Step::Configure)
        })?;

        ringbuf_entry!(Trace::Configured);
        self.state = State::Configured;
        Ok(())
    }

    /// Sets the enable bit and waits for it to synchronize.
    pub fn enable<P: Synchronized>(
        &mut self,
        periph: &P,
    ) -> Result<(), BringupError> {
        match self.state {
            State::Configured => {
                ringbuf_entry!(Trace::Enable);
                self.state = State::Enabling;
                periph.request_enable();
            }
            // A previous enable timed out; just keep waiting.
            State::Enabling => (),
            state => {
                ringbuf_entry!(Trace::Refused(Step::Enable, state));
                return Err(BringupError::WrongState {
                    op: Step::Enable,
                    state,
                });
            }
        }

        self.settle(periph, Step::Enable)?;
        ringbuf_entry!(Trace::Enabled);
        self.state = State::Enabled;
        Ok(())
    }

    /// Fails unless the peripheral is enabled. Drivers call this at the top
    /// of every steady-state I/O operation.
    pub fn require_enabled(&self) -> Result<(), BringupError> {
        self.expect(State::Enabled, Step::Io)
    }

    pub fn is_enabled(&self) -> bool {
        self.state == State::Enabled
    }

    fn expect(&self, want: State, op: Step) -> Result<(), BringupError> {
        if self.state == want {
            Ok(())
        } else {
            ringbuf_entry!(Trace::Refused(op, self.state));
            Err(BringupError::WrongState {
                op,
                state: self.state,
            })
        }
    }

    fn settle<P: Synchronized>(
        &self,
        periph: &P,
        step: Step,
    ) -> Result<(), BringupError> {
        busywait::wait_while(self.wait, || periph.sync_busy()).map_err(
            |TimedOut| {
                ringbuf_entry!(Trace::TimedOut(step));
                BringupError::TimedOut(step)
            },
        )
    }

    fn settle_reset<P: Synchronized>(
        &self,
        periph: &P,
    ) -> Result<(), BringupError> {
        // Reset is only done when the SWRST bit has self-cleared _and_ the
        // synchronizer is idle. Either one alone can read clear while the
        // other is still in progress.
        busywait::wait_until(self.wait, || {
            !periph.reset_pending() && !periph.sync_busy()
        })
        .map_err(|TimedOut| {
            ringbuf_entry!(Trace::TimedOut(Step::Reset));
            BringupError::TimedOut(Step::Reset)
        })?;
        ringbuf_entry!(Trace::ResetSettled);
        Ok(())
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(Wait::default())
    }
}
