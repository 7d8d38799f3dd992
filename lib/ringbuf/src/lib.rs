// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing peripheral bring-up and polling
//!
//! This is a static, fixed-size trace buffer that drivers use in place of a
//! console. Nothing is ever printed: entries sit in RAM where a debugger can
//! read them (`print drv_samd21_adc::__RINGBUF` in GDB), and host tests can
//! inspect them through [`Ringbuf::iter`].
//!
//! ## Constraints
//!
//! The payload type must implement both `Copy` and `PartialEq`. If you use
//! the variants of the macros that leave the name of the buffer implicit, you
//! can only have one per module.
//!
//! ## Creating a ring buffer
//!
//! ```ignore
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! enum Trace {
//!     None,
//!     Reset,
//!     TimedOut(u8),
//! }
//!
//! ringbuf!(Trace, 16, Trace::None);
//!
//! ringbuf_entry!(Trace::Reset);
//! ```
//!
//! When an entry is recorded with an identical payload from the same source
//! line as the most recent entry, that entry's `count` is incremented instead
//! of consuming a new slot. Busy-poll loops that trace on every iteration
//! therefore cost one slot, not the whole buffer.
//!
//! ## Locking
//!
//! Each buffer lives in a `critical_section::Mutex`. On the target the
//! critical section is provided by the `cortex-m` single-core implementation;
//! host builds use the `std` implementation.

#![cfg_attr(target_os = "none", no_std)]

pub use critical_section;

use core::cell::RefCell;

/// Storage type produced by [`ringbuf!`].
pub type StaticRingbuf<T, const N: usize> =
    critical_section::Mutex<RefCell<Ringbuf<T, N>>>;

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// If you omit the name, it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::StaticRingbuf<$t, $n> =
            $crate::critical_section::Mutex::new(::core::cell::RefCell::new(
                $crate::Ringbuf::new($init),
            ));
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Inserts data into a named ringbuffer (which should have been declared with
/// the `ringbuf!` macro).
///
/// `ringbuf_entry!(NAME, expr)` will insert `expr` into the ringbuffer called
/// `NAME`. Without a name, it defaults to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload, without letting them access each
        // other.
        let (p, buf) = ($payload, &$buf);
        $crate::critical_section::with(|cs| {
            $crate::Ringbuf::entry(
                &mut *buf.borrow_ref_mut(cs),
                line!() as u16,
                p,
            );
        });
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// Runs `f` against a ringbuffer declared with [`ringbuf!`].
///
/// Mostly useful from tests, which want to look at what a driver traced.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_inspect {
    ($buf:expr, $f:expr) => {{
        let buf = &$buf;
        $crate::critical_section::with(|cs| ($f)(&*buf.borrow_ref(cs)))
    }};
}

/// A single [`Ringbuf`] entry.
///
/// When an entry is generated with an identical payload to the most recent
/// entry (in terms of both `line` and `payload`), `count` is incremented
/// rather than generating a new entry.
#[derive(Debug, Copy, Clone)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// A ring buffer of parametrized type and size. In practice you want the
/// [`ringbuf!`] macro rather than instantiating this directly.
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // None is treated as an out-of-range index so that the first entry
        // lands in slot 0 and never merges with the initializer.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // No hardware divide on the M0+, so no remainder here either.
        let ndx = {
            let next = last.wrapping_add(1);
            if next >= N {
                0
            } else {
                next
            }
        };

        let Some(ent) = self.buffer.get_mut(ndx) else {
            // Zero-length buffer.
            return;
        };
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Iterates over recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last + 1,
            None => N,
        };
        self.buffer[start.min(N)..]
            .iter()
            .chain(self.buffer[..start.min(N)].iter())
            .filter(|e| e.count != 0)
    }

    /// Returns the payload of the most recent entry, if any.
    pub fn last_payload(&self) -> Option<T> {
        self.last
            .and_then(|i| self.buffer.get(i))
            .map(|e| e.payload)
    }
}
