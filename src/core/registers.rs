// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// registers.rs
//
// The architectural register file (32 FP + 32 integer, §4.1) and its
// register alias table. Generalizes the teacher's
// `timing_simulator::tomasulo::RegisterAliasTable`, which mapped register ->
// ROB entry; here there is no ROB, so the RAT maps register name directly to
// the producing station's id, and the CDB writes registers itself instead of
// going through a reorder buffer.

use std::collections::HashMap;

use serde::Serialize;

use crate::errors::SimulatorError;
use crate::instruction::RegName;

/// A single architectural register: a value plus the tag of the station
/// that will next produce it. `qi == None` iff `value` is authoritative.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Register {
    pub value: f64,
    pub qi: Option<usize>,
}

pub struct RegisterFile {
    fp: [Register; 32],
    int: [Register; 32],
    /// Inverse view of every non-`None` `qi`; kept bit-identical to the
    /// union of register `qi` fields on every mutation.
    rat: HashMap<RegName, usize>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            fp: [Register::default(); 32],
            int: [Register::default(); 32],
            rat: HashMap::new(),
        }
    }

    fn slot(&self, reg: RegName) -> &Register {
        match reg {
            RegName::F(i) => &self.fp[i as usize],
            RegName::R(i) => &self.int[i as usize],
        }
    }

    fn slot_mut(&mut self, reg: RegName) -> &mut Register {
        match reg {
            RegName::F(i) => &mut self.fp[i as usize],
            RegName::R(i) => &mut self.int[i as usize],
        }
    }

    /// Preload a value at reset time. Architectural `R0` stays wired to
    /// zero in this ISA subset (there is no instruction that writes it a
    /// destination-less way, but callers should not rely on preloading it).
    pub fn preload(&mut self, reg: RegName, value: f64) {
        let slot = self.slot_mut(reg);
        slot.value = value;
        slot.qi = None;
        self.rat.remove(&reg);
    }

    pub fn status(&self, reg: RegName) -> Option<usize> {
        self.slot(reg).qi
    }

    /// Read the authoritative value of `reg`, failing if a producer is
    /// still pending.
    pub fn read_value(&self, reg: RegName) -> Result<f64, SimulatorError> {
        let slot = self.slot(reg);
        if slot.qi.is_some() {
            return Err(SimulatorError::RegisterBusy(reg.to_string()));
        }
        Ok(slot.value)
    }

    /// Rename `reg` to be produced by `tag`. Overwrites any prior producer
    /// (WAW): a later-issued instruction writing the same register captures
    /// the name, and the earlier producer's eventual broadcast must not
    /// mutate the register (see `write_from_cdb`).
    pub fn set_qi(&mut self, reg: RegName, tag: usize) {
        self.slot_mut(reg).qi = Some(tag);
        self.rat.insert(reg, tag);
    }

    /// Apply a CDB broadcast from station `tag` carrying `value`. Only
    /// registers whose `qi` still names `tag` are updated; a register whose
    /// `qi` has since moved to a later producer is left untouched (the
    /// WAW guard of §4.8).
    pub fn write_from_cdb(&mut self, tag: usize, value: f64) {
        for reg in Self::all_names() {
            let slot = self.slot_mut(reg);
            if slot.qi == Some(tag) {
                slot.value = value;
                slot.qi = None;
                self.rat.remove(&reg);
            }
        }
    }

    pub fn rat_snapshot(&self) -> &HashMap<RegName, usize> {
        &self.rat
    }

    pub fn dump(&self) -> Vec<(RegName, Register)> {
        Self::all_names().map(|r| (r, *self.slot(r))).collect()
    }

    fn all_names() -> impl Iterator<Item = RegName> {
        (0..32u8).map(RegName::F).chain((0..32u8).map(RegName::R))
    }
}
