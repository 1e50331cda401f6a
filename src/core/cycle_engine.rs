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

// cycle_engine.rs
//
// Top-level per-cycle orchestration (§4.10): Write, then Execute-tick, then
// Memory-tick, then Issue — in that fixed order, so a station freed by this
// cycle's Write step can be reused by this same cycle's Issue step.
// Generalizes the teacher's `TomasuloProcessor::tick`
// (`process_cdb -> execute_instructions -> commit_instructions`), adding the
// Memory-tick phase this design needs (the teacher folds memory timing into
// a flat pipeline stage instead of a load/store buffer) and replacing
// ROB commit with direct CDB-driven register writeback.

use std::collections::HashMap;

use crate::core::byte_memory::ByteMemory;
use crate::core::cache::CacheSimulator;
use crate::core::cdb::{BroadcastRequest, CommonDataBus};
use crate::core::execution_unit::ExecutionUnit;
use crate::core::issue_unit::{IssueOutcome, IssueUnit};
use crate::core::memory_system::{CompletedOp, MemorySystem};
use crate::core::registers::RegisterFile;
use crate::core::reservation_station::{StationId, StationKind};
use crate::core::station_pool::StationPool;
use crate::errors::SimulatorError;
use crate::instruction::{Instruction, OpCode, RegName};

pub struct CycleEngine {
    program: Vec<Instruction>,
    pc: usize,
    cycle: i64,
    station_pool: StationPool,
    registers: RegisterFile,
    memory: MemorySystem,
    execution: ExecutionUnit,
    cdb: CommonDataBus,
    /// The station id of an issued-but-unresolved branch; while set, the
    /// Issue phase stalls (this design has no speculation to issue past it).
    branch_pending: Option<StationId>,
    retired: Vec<Instruction>,
}

#[allow(clippy::too_many_arguments)]
pub struct EngineParams {
    pub program: Vec<Instruction>,
    pub station_counts: HashMap<StationKind, usize>,
    pub latencies: HashMap<OpCode, usize>,
    pub memory_size: usize,
    pub cache_size: usize,
    pub block_size: usize,
    pub hit_latency: usize,
    pub miss_penalty: usize,
    pub lsb_capacity: usize,
    pub register_presets: Vec<(RegName, f64)>,
}

impl CycleEngine {
    pub fn new(params: EngineParams) -> Result<Self, SimulatorError> {
        let mut registers = RegisterFile::new();
        for (reg, value) in params.register_presets {
            registers.preload(reg, value);
        }
        let station_pool = StationPool::new(params.station_counts);
        let execution = ExecutionUnit::new(params.latencies);
        let cache =
            CacheSimulator::new(params.cache_size, params.block_size, params.hit_latency, params.miss_penalty)?;
        let memory = MemorySystem::new(ByteMemory::new(params.memory_size), cache, params.lsb_capacity);

        Ok(Self {
            program: params.program,
            pc: 0,
            cycle: 0,
            station_pool,
            registers,
            memory,
            execution,
            cdb: CommonDataBus::new(),
            branch_pending: None,
            retired: Vec::new(),
        })
    }

    pub fn cycle(&self) -> i64 {
        self.cycle
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn station_pool(&self) -> &StationPool {
        &self.station_pool
    }

    pub fn memory(&self) -> &MemorySystem {
        &self.memory
    }

    /// Mutable access to the backing memory, for test/setup harnesses that
    /// need to seed initial contents before the program runs (there is no
    /// configuration-time memory preload, only register presets, §6).
    pub fn memory_mut(&mut self) -> &mut MemorySystem {
        &mut self.memory
    }

    pub fn retired(&self) -> &[Instruction] {
        &self.retired
    }

    pub fn is_finished(&self) -> bool {
        self.pc >= self.program.len()
            && self.branch_pending.is_none()
            && self.station_pool.all_idle()
            && self.cdb.pending_len() == 0
            && self.memory.lsb_len() == 0
    }

    pub fn run(&mut self, max_cycles: i64) -> Result<(), SimulatorError> {
        while !self.is_finished() && self.cycle < max_cycles {
            self.tick()?;
        }
        Ok(())
    }

    pub fn tick(&mut self) -> Result<(), SimulatorError> {
        self.cycle += 1;
        let cycle = self.cycle;
        log::debug!("cycle {cycle}: write phase");
        self.write_phase(cycle);

        log::debug!("cycle {cycle}: execute-tick phase");
        self.execute_tick(cycle)?;

        log::debug!("cycle {cycle}: memory-tick phase");
        self.memory_tick(cycle)?;

        log::debug!("cycle {cycle}: issue phase");
        self.issue_phase(cycle)?;

        Ok(())
    }

    fn write_phase(&mut self, cycle: i64) {
        let Some(req) = self.cdb.select() else { return };
        let BroadcastRequest { producing_station, result_value, op, .. } = req;

        // Branches resolve here too, gated by the same one-per-cycle
        // arbiter as every other broadcast (§4.7 step 1, §4.10 step 1),
        // rather than bypassing the CDB by resolving in Execute-tick.
        if op.is_branch() {
            let station = self.station_pool.get_mut(producing_station);
            let target = station.a.unwrap_or(0) as usize;
            if result_value != 0.0 {
                self.pc = target;
            }
            if let Some(mut instr) = station.instruction.take() {
                instr.write_cycle = Some(cycle);
                self.retired.push(instr);
            }
            self.station_pool.release(producing_station);
            self.branch_pending = None;
            return;
        }

        self.registers.write_from_cdb(producing_station, result_value);
        for station in self.station_pool.iter_mut() {
            if station.qj == Some(producing_station) {
                station.qj = None;
                station.vj = Some(result_value);
            }
            if station.qk == Some(producing_station) {
                station.qk = None;
                station.vk = Some(result_value);
            }
        }

        let station = self.station_pool.get_mut(producing_station);
        if let Some(mut instr) = station.instruction.take() {
            instr.write_cycle = Some(cycle);
            self.retired.push(instr);
        }
        self.station_pool.release(producing_station);
    }

    fn execute_tick(&mut self, cycle: i64) -> Result<(), SimulatorError> {
        let compute_ids: Vec<StationId> = self
            .station_pool
            .iter()
            .filter(|(_, s)| s.busy && !matches!(s.kind, StationKind::Load | StationKind::Store))
            .map(|(id, _)| id)
            .collect();

        for id in &compute_ids {
            let station = self.station_pool.get_mut(*id);
            match self.execution.try_start(station, cycle) {
                Ok(true) => {
                    if let Some(instr) = station.instruction.as_mut() {
                        instr.exec_start = Some(cycle);
                    }
                },
                Ok(false) => {},
                Err(err) => {
                    // §7: an unconfigured latency stalls only this station
                    // forever; it must not abort the whole simulation.
                    log::warn!("cycle {cycle}: {err}; station {} will never complete", station.name);
                },
            }
        }

        for id in compute_ids {
            let station = self.station_pool.get_mut(id);
            let Some(result) = self.execution.tick(station) else { continue };
            if let Some(instr) = station.instruction.as_mut() {
                instr.exec_end = Some(cycle);
            }

            let dest_reg = station.dest;
            let op = station.op.expect("executing station has an op");
            self.cdb.request(BroadcastRequest {
                producing_station: id,
                result_value: result,
                dest_reg,
                op,
                ready_cycle: cycle,
            });
        }
        Ok(())
    }

    fn memory_tick(&mut self, cycle: i64) -> Result<(), SimulatorError> {
        IssueUnit::dispatch_memory_ops(&mut self.station_pool, &mut self.memory, cycle)?;

        for completed in self.memory.tick()? {
            match completed {
                CompletedOp::Store { owning_station, .. } => {
                    let station = self.station_pool.get_mut(owning_station);
                    if let Some(mut instr) = station.instruction.take() {
                        instr.exec_end = Some(cycle);
                        instr.write_cycle = Some(cycle);
                        self.retired.push(instr);
                    }
                    self.station_pool.release(owning_station);
                },
                CompletedOp::Load { owning_station, dest_reg, value, op } => {
                    if let Some(instr) = self.station_pool.get_mut(owning_station).instruction.as_mut() {
                        instr.exec_end = Some(cycle);
                    }
                    self.cdb.request(BroadcastRequest {
                        producing_station: owning_station,
                        result_value: value,
                        dest_reg,
                        op,
                        ready_cycle: cycle,
                    });
                },
            }
        }
        Ok(())
    }

    fn issue_phase(&mut self, cycle: i64) -> Result<(), SimulatorError> {
        if self.branch_pending.is_some() {
            log::debug!("cycle {cycle}: issue stalled on unresolved branch");
            return Ok(());
        }
        let Some(instruction) = self.program.get(self.pc).cloned() else { return Ok(()) };

        match IssueUnit::try_issue(&instruction, &mut self.station_pool, &mut self.registers, cycle)? {
            IssueOutcome::Issued(id) => {
                if let Some(instr) = self.station_pool.get_mut(id).instruction.as_mut() {
                    instr.issue_cycle = Some(cycle);
                }
                if instruction.op.is_branch() {
                    self.branch_pending = Some(id);
                }
                self.pc += 1;
            },
            IssueOutcome::StructuralHazard => {
                log::warn!("cycle {cycle}: structural hazard issuing {}", instruction.op);
            },
        }
        Ok(())
    }
}
