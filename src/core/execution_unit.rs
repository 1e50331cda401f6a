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

// execution_unit.rs
//
// Per-station latency countdown and result computation for the non-memory
// station kinds (§4.7). Unlike the teacher's `timing_simulator::tomasulo`,
// which books execution against a separate `FunctionalUnit` pool sized
// independently of the reservation stations, this design has no second
// pool: a station's own `exec_started`/`remaining_cycles` fields are its
// functional-unit slot, so station count alone already bounds how many
// operations of a kind run concurrently.

use std::collections::HashMap;

use crate::core::reservation_station::{ReservationStation, StationKind};
use crate::errors::SimulatorError;
use crate::instruction::OpCode;

pub struct ExecutionUnit {
    latencies: HashMap<OpCode, usize>,
}

impl ExecutionUnit {
    pub fn new(latencies: HashMap<OpCode, usize>) -> Self {
        Self { latencies }
    }

    pub fn latency(&self, op: OpCode) -> Result<usize, SimulatorError> {
        self.latencies
            .get(&op)
            .copied()
            .ok_or_else(|| SimulatorError::UnconfiguredLatency(op.mnemonic().to_string()))
    }

    /// Begin execution of a newly-ready compute station. Memory stations are
    /// started by `MemorySystem::issue` instead and are ignored here. Per
    /// §4.7, a station issued this very cycle may not also start executing
    /// in it.
    pub fn try_start(&self, station: &mut ReservationStation, cycle: i64) -> Result<bool, SimulatorError> {
        if matches!(station.kind, StationKind::Load | StationKind::Store) {
            return Ok(false);
        }
        if !station.is_ready() || station.issue_cycle >= cycle {
            return Ok(false);
        }
        let op = station.op.expect("ready station has an op");
        let latency = self.latency(op)?;
        station.exec_started = true;
        station.remaining_cycles = latency as i64;
        Ok(true)
    }

    /// Decrement a running compute station by one cycle. Returns the
    /// computed result once `remaining_cycles` reaches zero.
    pub fn tick(&self, station: &mut ReservationStation) -> Option<f64> {
        if matches!(station.kind, StationKind::Load | StationKind::Store) || !station.exec_started {
            return None;
        }
        station.remaining_cycles -= 1;
        if station.remaining_cycles > 0 {
            return None;
        }
        let op = station.op.expect("executing station has an op");
        Some(compute(op, station.vj, station.vk, station.a))
    }
}

fn compute(op: OpCode, vj: Option<f64>, vk: Option<f64>, a: Option<i32>) -> f64 {
    let j = vj.unwrap_or(0.0);
    let k = vk.unwrap_or(0.0);
    match op {
        OpCode::Daddi => j + a.unwrap_or(0) as f64,
        OpCode::Dsubi => j - a.unwrap_or(0) as f64,
        OpCode::AddS | OpCode::AddD => j + k,
        OpCode::SubS | OpCode::SubD => j - k,
        OpCode::MulS | OpCode::MulD => j * k,
        OpCode::DivS | OpCode::DivD => {
            if k == 0.0 {
                log::warn!("{op}: division by zero; yielding 0.0");
                0.0
            } else {
                j / k
            }
        },
        OpCode::Beq => {
            if j == k {
                1.0
            } else {
                0.0
            }
        },
        OpCode::Bne => {
            if j != k {
                1.0
            } else {
                0.0
            }
        },
        other => panic!("{other} has no arithmetic execution step"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latencies() -> HashMap<OpCode, usize> {
        let mut m = HashMap::new();
        m.insert(OpCode::AddD, 2);
        m.insert(OpCode::DivD, 4);
        m
    }

    #[test]
    fn unconfigured_latency_is_reported() {
        let eu = ExecutionUnit::new(HashMap::new());
        assert!(matches!(eu.latency(OpCode::AddD), Err(SimulatorError::UnconfiguredLatency(_))));
    }

    #[test]
    fn station_completes_after_configured_latency() {
        let eu = ExecutionUnit::new(latencies());
        let mut station = ReservationStation::new("Add1".into(), StationKind::FpAdd);
        station.busy = true;
        station.op = Some(OpCode::AddD);
        station.vj = Some(2.0);
        station.vk = Some(3.5);
        station.issue_cycle = 0;

        assert!(eu.try_start(&mut station, 1).unwrap());
        assert_eq!(station.remaining_cycles, 2);
        assert!(eu.tick(&mut station).is_none());
        assert_eq!(eu.tick(&mut station), Some(5.5));
    }

    #[test]
    fn division_computes_quotient() {
        assert_eq!(compute(OpCode::DivD, Some(7.0), Some(2.0), None), 3.5);
    }

    #[test]
    fn division_by_zero_yields_zero_instead_of_inf_or_nan() {
        assert_eq!(compute(OpCode::DivD, Some(7.0), Some(0.0), None), 0.0);
    }
}
