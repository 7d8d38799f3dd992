// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-side register simulation.
//!
//! A [`SimBlock`] is a register block backed by a map. Every access through
//! the [`RegisterBlock`] trait is appended to a log in program order, which
//! is what tests assert against. Hardware behavior (flags that take a while
//! to clear, data registers with side effects) comes from a [`Model`] that
//! sees each access before the default storage behavior is applied.
//!
//! `peek` and `poke` go around both the log and the model, so a test can set
//! up or inspect state without disturbing what it is measuring.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{Reg, RegisterBlock};

/// One access, as seen by the block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read { reg: Reg, value: u32 },
    Write { reg: Reg, value: u32 },
}

impl Access {
    pub fn reg(&self) -> Reg {
        match *self {
            Access::Read { reg, .. } | Access::Write { reg, .. } => reg,
        }
    }

    pub fn is_write_to(&self, r: Reg) -> bool {
        matches!(*self, Access::Write { reg, .. } if reg == r)
    }

    pub fn is_read_of(&self, r: Reg) -> bool {
        matches!(*self, Access::Read { reg, .. } if reg == r)
    }
}

/// Backing storage for a simulated block. Unwritten registers read as 0.
#[derive(Debug, Default)]
pub struct Registers {
    values: BTreeMap<usize, u32>,
}

impl Registers {
    pub fn get(&self, reg: Reg) -> u32 {
        self.values.get(&reg.offset).copied().unwrap_or(0) & reg.width.mask()
    }

    pub fn set(&mut self, reg: Reg, value: u32) {
        self.values.insert(reg.offset, value & reg.width.mask());
    }

    pub fn set_bits(&mut self, reg: Reg, bits: u32) {
        let v = self.get(reg);
        self.set(reg, v | bits);
    }

    pub fn clear_bits(&mut self, reg: Reg, bits: u32) {
        let v = self.get(reg);
        self.set(reg, v & !bits);
    }
}

/// Simulated hardware behavior.
///
/// The defaults make a block of plain memory.
pub trait Model {
    /// Produces the value for a read of `reg`.
    fn read(&mut self, regs: &mut Registers, reg: Reg) -> u32 {
        regs.get(reg)
    }

    /// Applies a write of `value` to `reg`.
    fn write(&mut self, regs: &mut Registers, reg: Reg, value: u32) {
        regs.set(reg, value);
    }
}

/// Plain memory.
#[derive(Debug, Default)]
pub struct Inert;

impl Model for Inert {}

struct Inner {
    regs: Registers,
    model: Box<dyn Model>,
    log: Vec<Access>,
}

/// A simulated register block.
pub struct SimBlock {
    inner: RefCell<Inner>,
}

impl SimBlock {
    /// A block of plain memory.
    pub fn new() -> Self {
        Self::with_model(Inert)
    }

    pub fn with_model(model: impl Model + 'static) -> Self {
        Self {
            inner: RefCell::new(Inner {
                regs: Registers::default(),
                model: Box::new(model),
                log: Vec::new(),
            }),
        }
    }

    /// Reads storage directly, bypassing the model and the log.
    pub fn peek(&self, reg: Reg) -> u32 {
        self.inner.borrow().regs.get(reg)
    }

    /// Writes storage directly, bypassing the model and the log.
    pub fn poke(&self, reg: Reg, value: u32) {
        self.inner.borrow_mut().regs.set(reg, value);
    }

    /// Every access so far, oldest first.
    pub fn accesses(&self) -> Vec<Access> {
        self.inner.borrow().log.clone()
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: Reg) -> Vec<u32> {
        self.inner
            .borrow()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write { reg: r, value } if r == reg => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of reads of `reg` so far.
    pub fn reads_of(&self, reg: Reg) -> usize {
        self.inner
            .borrow()
            .log
            .iter()
            .filter(|a| a.is_read_of(reg))
            .count()
    }

    pub fn clear_log(&self) {
        self.inner.borrow_mut().log.clear();
    }
}

impl Default for SimBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBlock for SimBlock {
    fn read(&self, reg: Reg) -> u32 {
        let mut inner = self.inner.borrow_mut();
        let Inner { regs, model, log } = &mut *inner;
        let value = model.read(regs, reg) & reg.width.mask();
        log.push(Access::Read { reg, value });
        value
    }

    fn write(&self, reg: Reg, value: u32) {
        let value = value & reg.width.mask();
        let mut inner = self.inner.borrow_mut();
        let Inner { regs, model, log } = &mut *inner;
        log.push(Access::Write { reg, value });
        model.write(regs, reg, value);
    }
}

/// Where a peripheral keeps its reset, enable and sync-busy bits.
#[derive(Copy, Clone, Debug)]
pub struct SyncLayout {
    pub ctrl: Reg,
    pub swrst: u32,
    pub enable: u32,
    pub busy: Reg,
    pub busy_mask: u32,
}

/// Common write-synchronization behavior, for models to build on.
///
/// A write to `ctrl` raises the busy flag for `latency` polls, where a poll
/// is a read of either `busy` or `ctrl`.
/// Setting SWRST additionally clears every register in the block (so a
/// reset really does wipe configuration) and keeps SWRST set until the busy
/// period ends. If `stuck` is set the busy flag never drops.
#[derive(Debug)]
pub struct SyncBehavior {
    pub layout: SyncLayout,
    pub latency: u32,
    pub stuck: bool,
    remaining: u32,
}

impl SyncBehavior {
    pub fn new(layout: SyncLayout, latency: u32) -> Self {
        Self {
            layout,
            latency,
            stuck: false,
            remaining: 0,
        }
    }

    pub fn stuck(layout: SyncLayout) -> Self {
        Self {
            stuck: true,
            ..Self::new(layout, 0)
        }
    }

    /// Marks the block busy, as any write-synchronized register does.
    pub fn start_sync(&mut self, regs: &mut Registers) {
        self.remaining = self.latency;
        self.publish(regs);
    }

    pub fn is_busy(&self) -> bool {
        self.stuck || self.remaining > 0
    }

    fn publish(&mut self, regs: &mut Registers) {
        let l = self.layout;
        if self.is_busy() {
            regs.set_bits(l.busy, l.busy_mask);
        } else {
            regs.clear_bits(l.busy, l.busy_mask);
            regs.clear_bits(l.ctrl, l.swrst);
        }
    }

    /// Call from `Model::read`. Returns `true` if the access was handled.
    pub fn on_read(&mut self, regs: &mut Registers, reg: Reg) -> bool {
        if reg != self.layout.busy && reg != self.layout.ctrl {
            return false;
        }
        self.publish(regs);
        // Polling either register counts against the busy period, so a
        // wait on SWRST alone still sees the reset finish.
        self.remaining = self.remaining.saturating_sub(1);
        true
    }

    /// Call from `Model::write`. Returns `true` if the access was handled.
    pub fn on_write(
        &mut self,
        regs: &mut Registers,
        reg: Reg,
        value: u32,
    ) -> bool {
        if reg != self.layout.ctrl {
            return false;
        }
        if value & self.layout.swrst != 0 {
            let busy = regs.get(self.layout.busy);
            regs.values.clear();
            regs.set(self.layout.busy, busy);
            regs.set(self.layout.ctrl, self.layout.swrst);
        } else {
            regs.set(reg, value);
        }
        self.start_sync(regs);
        true
    }
}

/// A model that is nothing but [`SyncBehavior`] over plain memory.
#[derive(Debug)]
pub struct Syncing(pub SyncBehavior);

impl Model for Syncing {
    fn read(&mut self, regs: &mut Registers, reg: Reg) -> u32 {
        self.0.on_read(regs, reg);
        regs.get(reg)
    }

    fn write(&mut self, regs: &mut Registers, reg: Reg, value: u32) {
        if !self.0.on_write(regs, reg, value) {
            regs.set(reg, value);
        }
    }
}
