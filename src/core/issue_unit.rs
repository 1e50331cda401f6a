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

// issue_unit.rs
//
// Single in-order issue slot (§4.6): allocate a station, capture ready
// operands or subscribe to their producers, then rename the destination.
// Generalizes the teacher's `TomasuloProcessor::issue`, which additionally
// allocates a reorder-buffer entry; here the station itself is what the RAT
// points at. Memory-op address computation is split into a second step,
// `dispatch_memory_ops`, because a load/store's base register (and a
// store's value) may still be pending when the station is first allocated —
// the teacher's `issue` has the same problem and defers in the same way via
// its `FunctionalUnit` busy check before `execute_instructions` runs.

use crate::core::memory_system::MemorySystem;
use crate::core::registers::RegisterFile;
use crate::core::reservation_station::{StationId, StationKind};
use crate::core::station_pool::StationPool;
use crate::errors::SimulatorError;
use crate::instruction::Instruction;

pub enum IssueOutcome {
    Issued(StationId),
    StructuralHazard,
}

pub struct IssueUnit;

impl IssueUnit {
    /// Attempt to issue `instruction` this cycle. Returns
    /// `StructuralHazard` (not an error) when every station of the required
    /// kind is busy; the caller must retry the same instruction next cycle.
    pub fn try_issue(
        instruction: &Instruction,
        pool: &mut StationPool,
        registers: &mut RegisterFile,
        cycle: i64,
    ) -> Result<IssueOutcome, SimulatorError> {
        let kind = instruction.op.station_kind();
        let Some(id) = pool.allocate(kind) else {
            return Ok(IssueOutcome::StructuralHazard);
        };

        let station = pool.get_mut(id);
        station.busy = true;
        station.op = Some(instruction.op);
        station.issue_cycle = cycle;
        station.instruction = Some(instruction.clone());

        if instruction.op.is_memory() {
            if let Some(base) = instruction.base_reg {
                match registers.status(base) {
                    None => station.vj = Some(registers.read_value(base)?),
                    Some(tag) => station.qj = Some(tag),
                }
            }
            station.a = Some(instruction.offset);
            if instruction.op.is_store() {
                if let Some(src) = instruction.src1 {
                    match registers.status(src) {
                        None => station.vk = Some(registers.read_value(src)?),
                        Some(tag) => station.qk = Some(tag),
                    }
                }
            } else {
                station.dest = instruction.dest;
            }
        } else if instruction.op.is_branch() {
            if let Some(src1) = instruction.src1 {
                match registers.status(src1) {
                    None => station.vj = Some(registers.read_value(src1)?),
                    Some(tag) => station.qj = Some(tag),
                }
            }
            if let Some(src2) = instruction.src2 {
                match registers.status(src2) {
                    None => station.vk = Some(registers.read_value(src2)?),
                    Some(tag) => station.qk = Some(tag),
                }
            }
            // Branch target: the absolute instruction index to jump to when
            // the comparison holds, carried in `immediate`.
            station.a = Some(instruction.immediate);
        } else {
            if let Some(src1) = instruction.src1 {
                match registers.status(src1) {
                    None => station.vj = Some(registers.read_value(src1)?),
                    Some(tag) => station.qj = Some(tag),
                }
            }
            if instruction.op.is_immediate() {
                station.a = Some(instruction.immediate);
            } else if let Some(src2) = instruction.src2 {
                match registers.status(src2) {
                    None => station.vk = Some(registers.read_value(src2)?),
                    Some(tag) => station.qk = Some(tag),
                }
            }
            station.dest = instruction.dest;
        }

        // Rename last so a destination that coincides with a source captures
        // the *prior* producer above, not itself.
        if let Some(dest) = station.dest {
            registers.set_qi(dest, id);
        }

        Ok(IssueOutcome::Issued(id))
    }

    /// Hand every ready, not-yet-dispatched load/store station's address (and
    /// store data) to the memory system. Runs every cycle so a station whose
    /// operands arrived late, or that missed a full load/store buffer
    /// earlier, is retried.
    pub fn dispatch_memory_ops(
        pool: &mut StationPool,
        memory: &mut MemorySystem,
        cycle: i64,
    ) -> Result<(), SimulatorError> {
        let ids: Vec<StationId> = pool
            .iter()
            .filter(|(_, s)| {
                s.busy
                    && !s.mem_dispatched
                    && matches!(s.kind, StationKind::Load | StationKind::Store)
                    && s.issue_cycle < cycle
            })
            .map(|(id, _)| id)
            .collect();

        for id in ids {
            let station = pool.get(id);
            let ready = match station.kind {
                StationKind::Load => station.qj.is_none(),
                StationKind::Store => station.qj.is_none() && station.qk.is_none(),
                _ => false,
            };
            if !ready {
                continue;
            }
            let base = station.vj.unwrap_or(0.0);
            let offset = station.a.unwrap_or(0) as f64;
            let address = base + offset;
            if address < 0.0 {
                return Err(SimulatorError::BadAddress(0));
            }
            let address = address as usize;
            let is_load = station.kind == StationKind::Load;
            let store_value = if is_load { None } else { station.vk };
            let dest = station.dest;
            let op = station.op.expect("dispatched station has an op");

            match memory.issue(op, address, is_load, store_value, dest, id) {
                Some((seq, _hit)) => {
                    let station = pool.get_mut(id);
                    station.mem_dispatched = true;
                    station.lsb_seq = Some(seq);
                },
                None => {
                    // Load/store buffer is full; leave mem_dispatched false
                    // and retry next cycle.
                    continue;
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::core::byte_memory::ByteMemory;
    use crate::core::cache::CacheSimulator;
    use crate::instruction::{OpCode, RegName};

    fn pool() -> StationPool {
        let mut counts = HashMap::new();
        counts.insert(StationKind::IntAdd, 2);
        counts.insert(StationKind::Load, 1);
        StationPool::new(counts)
    }

    #[test]
    fn structural_hazard_when_bank_exhausted() {
        let mut pool = pool();
        let mut regs = RegisterFile::new();
        regs.preload(RegName::R(1), 5.0);
        let instr = Instruction::new(0, OpCode::Daddi).with_dest(RegName::R(2)).with_src1(RegName::R(1)).with_immediate(1);

        assert!(matches!(IssueUnit::try_issue(&instr, &mut pool, &mut regs, 0).unwrap(), IssueOutcome::Issued(_)));
        assert!(matches!(IssueUnit::try_issue(&instr, &mut pool, &mut regs, 0).unwrap(), IssueOutcome::Issued(_)));
        assert!(matches!(
            IssueUnit::try_issue(&instr, &mut pool, &mut regs, 0).unwrap(),
            IssueOutcome::StructuralHazard
        ));
    }

    #[test]
    fn destination_equal_to_source_captures_prior_producer() {
        let mut pool = pool();
        let mut regs = RegisterFile::new();
        regs.set_qi(RegName::R(1), 99); // some earlier in-flight producer

        let instr =
            Instruction::new(1, OpCode::Daddi).with_dest(RegName::R(1)).with_src1(RegName::R(1)).with_immediate(4);
        let id = match IssueUnit::try_issue(&instr, &mut pool, &mut regs, 0).unwrap() {
            IssueOutcome::Issued(id) => id,
            _ => panic!("expected issue to succeed"),
        };
        assert_eq!(pool.get(id).qj, Some(99));
        assert_eq!(regs.status(RegName::R(1)), Some(id));
    }

    #[test]
    fn load_dispatch_waits_for_pending_base_register() {
        let mut pool = pool();
        let mut regs = RegisterFile::new();
        regs.set_qi(RegName::R(2), 7); // base register not yet ready
        let mut memory = MemorySystem::new(ByteMemory::new(4096), CacheSimulator::new(256, 16, 1, 10).unwrap(), 4);

        let instr = Instruction::new(2, OpCode::Lw).with_dest(RegName::R(3)).with_base(RegName::R(2), 0);
        let id = match IssueUnit::try_issue(&instr, &mut pool, &mut regs, 0).unwrap() {
            IssueOutcome::Issued(id) => id,
            _ => panic!("expected issue to succeed"),
        };
        IssueUnit::dispatch_memory_ops(&mut pool, &mut memory, 1).unwrap();
        assert!(!pool.get(id).mem_dispatched);

        regs.write_from_cdb(7, 100.0);
        pool.get_mut(id).vj = Some(100.0);
        pool.get_mut(id).qj = None;
        IssueUnit::dispatch_memory_ops(&mut pool, &mut memory, 2).unwrap();
        assert!(pool.get(id).mem_dispatched);
    }
}
