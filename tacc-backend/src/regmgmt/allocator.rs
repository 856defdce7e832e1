//! Linear-scan style register allocator
//!
//! Names are bound to registers on demand while the selector walks a
//! function. Each name has at most one home at a time: a register, or its
//! frame slot. A name that is pushed out of its register gets a permanent
//! slot the first time it is spilled and keeps it for the rest of the
//! function, so every spill and reload of that name agrees on the address.
//!
//! The allocator owns the function's `Frame` while it is working on it;
//! spill slots and preserved `$s` registers are recorded there directly.

use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};
use tacc_codegen::{CallingConvention, Frame, FrameError, Reg};

/// Where a name currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Reg(Reg),
    /// Word offset from `$fp`
    Spilled(i32),
}

/// A register taken from another name to satisfy a request. The caller
/// must store `reg` to `offset` before reusing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub reg: Reg,
    pub name: String,
    pub offset: i32,
}

/// Result of `acquire`
///
/// - `reg: Some(r)` with `spill_offset: Some(k)`: the name was spilled; its
///   value has to be reloaded from `k` into `r` before it is read
/// - `reg: None`: no register was available, the name lives at
///   `spill_offset` and must be accessed through a scratch register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub reg: Option<Reg>,
    pub spill_offset: Option<i32>,
    pub evicted: Option<Eviction>,
}

impl Placement {
    fn bound(reg: Reg) -> Self {
        Self { reg: Some(reg), spill_offset: None, evicted: None }
    }
}

pub struct RegisterAllocator {
    frame: Frame,

    /// Current home of every name the allocator knows about
    locations: BTreeMap<String, Location>,

    /// Permanent frame slot per name, handed out on first spill
    slots: BTreeMap<String, i32>,

    /// Free registers; `BTreeSet` order is scan order
    free_temps: BTreeSet<Reg>,
    free_saved: BTreeSet<Reg>,

    saved_enabled: bool,

    /// `$s` registers handed out so far; the prologue must preserve them
    used_saved: BTreeSet<Reg>,

    /// Operands of the quad being selected (BTreeSet for determinism)
    pinned: BTreeSet<String>,
}

impl RegisterAllocator {
    /// Fresh allocator for one function
    pub fn new(frame: Frame, saved_enabled: bool) -> Self {
        debug!(
            "Register allocator for '{}' (saved registers {})",
            frame.function(),
            if saved_enabled { "enabled" } else { "disabled" }
        );
        Self {
            frame,
            locations: BTreeMap::new(),
            slots: BTreeMap::new(),
            free_temps: CallingConvention::TEMPORARIES.into_iter().collect(),
            free_saved: CallingConvention::SAVED.into_iter().collect(),
            saved_enabled,
            used_saved: BTreeSet::new(),
            pinned: BTreeSet::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    /// Hand the frame back, with every used `$s` register recorded for
    /// preservation by the prologue
    pub fn into_frame(mut self) -> Result<Frame, FrameError> {
        for &reg in &self.used_saved {
            self.frame.preserve_register(reg)?;
        }
        Ok(self.frame)
    }

    pub fn location(&self, name: &str) -> Option<Location> {
        self.locations.get(name).copied()
    }

    /// The name currently bound to `reg`
    pub fn holder(&self, reg: Reg) -> Option<&str> {
        self.locations.iter().find_map(|(name, loc)| match loc {
            Location::Reg(r) if *r == reg => Some(name.as_str()),
            _ => None,
        })
    }

    /// Registers currently bound, in scan order
    pub fn bound_registers(&self) -> Vec<Reg> {
        let mut regs: Vec<Reg> = self
            .locations
            .values()
            .filter_map(|loc| match loc {
                Location::Reg(r) => Some(*r),
                Location::Spilled(_) => None,
            })
            .collect();
        regs.sort();
        regs
    }

    pub fn used_saved(&self) -> &BTreeSet<Reg> {
        &self.used_saved
    }

    /// Protect a name from eviction until `unpin_all`
    pub fn pin(&mut self, name: &str) {
        self.pinned.insert(name.to_string());
    }

    pub fn unpin_all(&mut self) {
        self.pinned.clear();
    }

    /// Permanent slot of `name`, allocating it on first request
    pub fn home_slot(&mut self, name: &str) -> Result<i32, FrameError> {
        if let Some(&offset) = self.slots.get(name) {
            return Ok(offset);
        }
        let offset = self.frame.allocate_spill()?;
        self.slots.insert(name.to_string(), offset);
        Ok(offset)
    }

    /// Find or create a home for `name`
    ///
    /// A name that must survive a call is placed in the `$s` pool when that
    /// pool is enabled, and in memory when it is disabled or exhausted.
    /// Other names take the first free `$t` register, evicting the first
    /// unpinned occupant in scan order when none is free.
    pub fn acquire(&mut self, name: &str, must_survive_call: bool) -> Result<Placement, FrameError> {
        let spilled = match self.locations.get(name) {
            Some(Location::Reg(r)) => return Ok(Placement::bound(*r)),
            Some(Location::Spilled(offset)) => Some(*offset),
            None => None,
        };

        let (reg, evicted) = if must_survive_call {
            (self.take_saved(), None)
        } else {
            match self.free_temps.pop_first() {
                Some(r) => (Some(r), None),
                None => {
                    let evicted = self.evict()?;
                    (evicted.as_ref().map(|e| e.reg), evicted)
                }
            }
        };

        match reg {
            Some(r) => {
                trace!("  '{name}' -> {r}");
                self.locations.insert(name.to_string(), Location::Reg(r));
                Ok(Placement { reg: Some(r), spill_offset: spilled, evicted })
            }
            None => {
                let offset = match spilled {
                    Some(offset) => offset,
                    None => self.home_slot(name)?,
                };
                trace!("  '{name}' -> memory [fp{offset}]");
                self.locations.insert(name.to_string(), Location::Spilled(offset));
                Ok(Placement { reg: None, spill_offset: Some(offset), evicted: None })
            }
        }
    }

    fn take_saved(&mut self) -> Option<Reg> {
        if !self.saved_enabled {
            return None;
        }
        let reg = self.free_saved.pop_first()?;
        self.used_saved.insert(reg);
        Some(reg)
    }

    /// Spill the first unpinned `$t` occupant in scan order. The register
    /// is handed straight to the caller, not returned to the free pool.
    fn evict(&mut self) -> Result<Option<Eviction>, FrameError> {
        let victim = CallingConvention::TEMPORARIES.into_iter().find_map(|reg| {
            self.holder(reg)
                .filter(|name| !self.pinned.contains(*name))
                .map(|name| (reg, name.to_string()))
        });
        let Some((reg, name)) = victim else {
            return Ok(None);
        };
        let offset = self.home_slot(&name)?;
        debug!("  spill '{name}' from {reg} to [fp{offset}]");
        self.locations.insert(name.clone(), Location::Spilled(offset));
        Ok(Some(Eviction { reg, name, offset }))
    }

    /// Spill every name held in a caller-saved register ahead of a call.
    /// Returns the `(register, slot)` stores the caller has to emit.
    pub fn on_call(&mut self) -> Result<Vec<(Reg, i32)>, FrameError> {
        let held: Vec<(String, Reg)> = self
            .locations
            .iter()
            .filter_map(|(name, loc)| match loc {
                Location::Reg(r) if r.is_temporary() => Some((name.clone(), *r)),
                _ => None,
            })
            .collect();

        let mut saves = Vec::with_capacity(held.len());
        for (name, reg) in held {
            let offset = self.home_slot(&name)?;
            self.locations.insert(name, Location::Spilled(offset));
            saves.push((reg, offset));
        }
        saves.sort();
        self.free_temps = CallingConvention::TEMPORARIES.into_iter().collect();
        if !saves.is_empty() {
            debug!("  {} caller-saved register(s) spilled around call", saves.len());
        }
        Ok(saves)
    }

    /// Forget a name, returning its register to the free pool. Its slot
    /// stays reserved.
    pub fn release(&mut self, name: &str) {
        if let Some(Location::Reg(reg)) = self.locations.remove(name) {
            trace!("  release '{name}' ({reg})");
            if reg.is_saved() {
                self.free_saved.insert(reg);
            } else {
                self.free_temps.insert(reg);
            }
        }
    }

    /// Release every unpinned name that is not in `live`
    pub fn release_dead(&mut self, live: &BTreeSet<String>) {
        let dead: Vec<String> = self
            .locations
            .keys()
            .filter(|name| !live.contains(*name) && !self.pinned.contains(*name))
            .cloned()
            .collect();
        for name in dead {
            self.release(&name);
        }
    }

    /// Drop every register binding at a basic block boundary
    ///
    /// Register-resident names are stored to their slots (only those in
    /// `live` unless `keep_dead`), and every name in `live` ends up
    /// memory-resident so the next read reloads it. Returns the stores to
    /// emit.
    pub fn flush(&mut self, live: &BTreeSet<String>, keep_dead: bool) -> Result<Vec<(Reg, i32)>, FrameError> {
        let held: Vec<(String, Reg)> = self
            .locations
            .iter()
            .filter_map(|(name, loc)| match loc {
                Location::Reg(r) => Some((name.clone(), *r)),
                Location::Spilled(_) => None,
            })
            .collect();

        let mut stores = Vec::new();
        for (name, reg) in held {
            if keep_dead || live.contains(&name) {
                let offset = self.home_slot(&name)?;
                self.locations.insert(name, Location::Spilled(offset));
                stores.push((reg, offset));
            } else {
                self.locations.remove(&name);
            }
        }

        // A live name the allocator has not seen yet reaches this point
        // along a jump, which stored it to its slot
        for name in live {
            if !self.locations.contains_key(name) {
                let offset = self.home_slot(name)?;
                self.locations.insert(name.clone(), Location::Spilled(offset));
            }
        }

        self.free_temps = CallingConvention::TEMPORARIES.into_iter().collect();
        self.free_saved = CallingConvention::SAVED.into_iter().collect();
        stores.sort();
        Ok(stores)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
