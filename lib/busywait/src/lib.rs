// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Busy-waiting.
//!
//! Two things live here:
//!
//! - Instruction-count delays (`delay_cycles` and friends) for settle times
//!   that have no hardware-ready flag. These are not a clock; they return
//!   after _at least_ the requested number of core cycles.
//!
//! - The polling helper every driver uses to wait on a hardware flag. Every
//!   wait goes through a [`Wait`] policy. [`Wait::TrustHardware`] spins with
//!   no bound and is the default; a dead clock source then hangs the caller
//!   forever. [`Wait::Bounded`] gives up after a fixed number of polls and
//!   reports [`TimedOut`].

#![cfg_attr(target_os = "none", no_std)]

/// Core clock once the DFLL48M is locked and selected as GCLK0.
pub const CPU_HZ: u32 = 48_000_000;

/// Spins for at least `n` core cycles. `n == 0` returns immediately.
#[inline]
pub fn delay_cycles(n: u32) {
    if n == 0 {
        return;
    }
    imp::delay(n);
}

/// Spins for at least `ms` milliseconds at [`CPU_HZ`].
pub fn delay_ms(ms: u32) {
    // One millisecond at a time so that `ms * CPU_HZ / 1000` can't overflow.
    for _ in 0..ms {
        delay_cycles(CPU_HZ / 1000);
    }
}

/// Spins for at least `s` seconds at [`CPU_HZ`].
pub fn delay_s(s: u32) {
    for _ in 0..s {
        delay_ms(1000);
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        mod imp {
            pub fn delay(n: u32) {
                cortex_m::asm::delay(n);
            }
        }
    } else {
        mod imp {
            use core::hint::black_box;

            pub fn delay(n: u32) {
                // black_box keeps the loop from being folded away.
                let mut i = black_box(n);
                while black_box(i) != 0 {
                    core::hint::spin_loop();
                    i -= 1;
                }
            }
        }
    }
}

/// Cycle-counting delay provider for code written against `embedded-hal`.
#[derive(Copy, Clone, Debug)]
pub struct CycleDelay {
    cpu_hz: u32,
}

impl CycleDelay {
    pub const fn new(cpu_hz: u32) -> Self {
        Self { cpu_hz }
    }

    pub fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }
}

impl Default for CycleDelay {
    fn default() -> Self {
        Self::new(CPU_HZ)
    }
}

impl embedded_hal::blocking::delay::DelayMs<u32> for CycleDelay {
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            delay_cycles(self.cpu_hz / 1000);
        }
    }
}

impl embedded_hal::blocking::delay::DelayUs<u32> for CycleDelay {
    fn delay_us(&mut self, us: u32) {
        let per_us = (self.cpu_hz / 1_000_000).max(1);
        for _ in 0..us {
            delay_cycles(per_us);
        }
    }
}

/// How long to keep polling a hardware flag.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Wait {
    /// Poll until the flag changes, however long that takes. This is what the
    /// hardware documentation promises will always terminate; if it doesn't,
    /// the caller hangs.
    #[default]
    TrustHardware,
    /// Give up after `polls` reads of the flag.
    Bounded { polls: u32 },
}

impl Wait {
    pub const fn bounded(polls: u32) -> Self {
        Wait::Bounded { polls }
    }
}

/// A bounded wait ran out of polls before the condition became true.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimedOut;

/// Polls `ready` until it returns `true`, subject to `wait`.
///
/// `ready` is always evaluated at least once, so a condition that already
/// holds succeeds even with `Wait::Bounded { polls: 0 }`.
pub fn wait_until(
    wait: Wait,
    mut ready: impl FnMut() -> bool,
) -> Result<(), TimedOut> {
    match wait {
        Wait::TrustHardware => {
            while !ready() {
                core::hint::spin_loop();
            }
            Ok(())
        }
        Wait::Bounded { polls } => {
            if ready() {
                return Ok(());
            }
            for _ in 0..polls {
                if ready() {
                    return Ok(());
                }
                core::hint::spin_loop();
            }
            Err(TimedOut)
        }
    }
}

/// Polls `busy` until it returns `false`, subject to `wait`.
pub fn wait_while(
    wait: Wait,
    mut busy: impl FnMut() -> bool,
) -> Result<(), TimedOut> {
    wait_until(wait, || !busy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn zero_delay_returns() {
        delay_cycles(0);
        delay_ms(0);
        delay_s(0);
    }

    #[test]
    fn small_delay_returns() {
        delay_cycles(1_000);
    }

    #[test]
    fn trust_hardware_waits_for_flag() {
        let polls = Cell::new(0);
        let r = wait_until(Wait::TrustHardware, || {
            polls.set(polls.get() + 1);
            polls.get() == 50
        });
        assert_eq!(r, Ok(()));
        assert_eq!(polls.get(), 50);
    }

    #[test]
    fn bounded_wait_succeeds_within_bound() {
        let polls = Cell::new(0);
        let r = wait_until(Wait::bounded(10), || {
            polls.set(polls.get() + 1);
            polls.get() == 5
        });
        assert_eq!(r, Ok(()));
        assert_eq!(polls.get(), 5);
    }

    #[test]
    fn bounded_wait_on_dead_flag_times_out() {
        let polls = Cell::new(0u32);
        let r = wait_until(Wait::bounded(100), || {
            polls.set(polls.get() + 1);
            false
        });
        assert_eq!(r, Err(TimedOut));
        // One initial check plus the budget, then no more.
        assert_eq!(polls.get(), 101);
    }

    #[test]
    fn zero_budget_still_checks_once() {
        assert_eq!(wait_until(Wait::bounded(0), || true), Ok(()));
        assert_eq!(wait_until(Wait::bounded(0), || false), Err(TimedOut));
    }

    #[test]
    fn wait_while_inverts() {
        let busy = Cell::new(3);
        let r = wait_while(Wait::bounded(10), || {
            busy.set(busy.get() - 1);
            busy.get() > 0
        });
        assert_eq!(r, Ok(()));
    }

    #[test]
    fn default_is_unbounded() {
        assert_eq!(Wait::default(), Wait::TrustHardware);
    }

    #[test]
    fn cycle_delay_traits() {
        use embedded_hal::blocking::delay::{DelayMs, DelayUs};
        // A slow fake clock keeps this quick on the host.
        let mut d = CycleDelay::new(1_000_000);
        d.delay_ms(2u32);
        d.delay_us(10u32);
        assert_eq!(d.cpu_hz(), 1_000_000);
    }
}
